//! Configuration collaborator.
//!
//! Loaded from ~/.config/selfloom/selfloom.yml or .selfloom.yml. Holds the
//! credential, model ids, numeric generation defaults, and the two context
//! budgets. Sessions take an immutable snapshot of these values; the only
//! write-back path is the explicit `save` after changing models or token.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persistent configuration for Selfloom.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoomConfig {
    /// OpenRouter API token (empty = unset, falls back to env)
    pub token: String,

    /// Generation model id
    pub model: String,

    /// Judging/naming model id
    pub instruct_model: String,

    pub temperature: f64,
    pub min_p: f64,
    pub presence_penalty: f64,
    pub repetition_penalty: f64,

    /// Max new tokens per completion
    pub max_new_tokens: u32,

    /// Context budget (tokens) for generation calls
    pub base_context_limit: usize,

    /// Context budget (tokens) for judging calls
    pub grader_context_limit: usize,
}

impl Default for LoomConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            model: "z-ai/glm-4.5-air:free".to_string(),
            instruct_model: "z-ai/glm-4.5-air:free".to_string(),
            temperature: 1.0,
            min_p: 0.02,
            presence_penalty: 0.1,
            repetition_penalty: 1.1,
            max_new_tokens: 128,
            base_context_limit: 8000,
            grader_context_limit: 4000,
        }
    }
}

impl LoomConfig {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .selfloom.yml in current directory
    /// 3. ~/.config/selfloom/selfloom.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        let project_config = PathBuf::from(".selfloom.yml");
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from .selfloom.yml");
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load .selfloom.yml: {}", e);
                }
            }
        }

        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// The user-level config location
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("selfloom").join("selfloom.yml"))
    }

    /// Persist to the user config path.
    pub fn save(&self) -> Result<()> {
        let path = Self::user_config_path()
            .ok_or_else(|| eyre::eyre!("Could not determine config directory"))?;
        self.save_to(&path)
    }

    /// Persist to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Resolve the credential: config token first, environment second.
    pub fn resolved_token(&self) -> Option<String> {
        if !self.token.is_empty() {
            return Some(self.token.clone());
        }
        std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|t| !t.is_empty())
    }

    /// Record the last-used model ids.
    pub fn set_models(&mut self, base_model: Option<&str>, grader_model: Option<&str>) {
        if let Some(model) = base_model {
            self.model = model.to_string();
        }
        if let Some(model) = grader_model {
            self.instruct_model = model.to_string();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.base_context_limit == 0 {
            eyre::bail!("base_context_limit must be > 0");
        }
        if self.grader_context_limit == 0 {
            eyre::bail!("grader_context_limit must be > 0");
        }
        if self.max_new_tokens == 0 {
            eyre::bail!("max_new_tokens must be > 0");
        }
        Ok(())
    }
}
