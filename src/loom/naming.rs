//! Milestone document naming.
//!
//! A one-time, best-effort request for a short 2-4 word title, triggered by
//! the session at a fixed round. One call, no retries - any failure is
//! logged by the caller and swallowed, never aborting the loop.

use crate::context::truncate_to_budget;
use crate::llm::{CompletionClient, CompletionRequest, GenerationParams, LlmError};

/// Longest accepted title, in characters
const MAX_NAME_LEN: usize = 50;

/// Ask the instruct model for a short document title.
pub async fn generate_document_name<C>(
    client: &C,
    model: &str,
    full_text: &str,
    grader_context_limit: usize,
) -> Result<String, LlmError>
where
    C: CompletionClient + ?Sized,
{
    if !client.is_ready() {
        return Err(LlmError::MissingToken);
    }

    let content = truncate_to_budget(full_text, grader_context_limit);

    let prompt = format!(
        "Based on this text content, generate a short, descriptive document name that is \
         2-4 words long. The name should capture the main theme, setting, or key elements \
         of the story.\n\n\
         Text content:\n{}\n\n\
         Respond with ONLY the document name, nothing else. Example formats:\n\
         - \"Lighthouse Mystery\"\n\
         - \"Ocean Storm Night\"\n\
         - \"Ancient Forest Discovery\"\n\
         - \"Desert Caravan Journey\"\n\n\
         Document name:",
        content
    );

    let params = GenerationParams {
        max_tokens: 20,
        ..GenerationParams::default()
    };
    let response = client
        .complete(CompletionRequest::new(model, prompt, &params))
        .await?;

    Ok(sanitize_name(&response))
}

/// Clean up a raw title: first non-empty line, surrounding quotes stripped,
/// capped length, never empty.
pub fn sanitize_name(raw: &str) -> String {
    let name = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();

    if name.is_empty() {
        return "Untitled".to_string();
    }

    name.chars().take(MAX_NAME_LEN).collect()
}
