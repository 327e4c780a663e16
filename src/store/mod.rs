//! Document store - file CRUD for named text blobs.
//!
//! The generation core itself never touches this; the caller persists a
//! finished (or named) document here. Plain `.txt` files under one
//! directory, listed newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LoomError, Result};

/// Metadata for one stored document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    pub modified: DateTime<Utc>,
}

/// File-backed document store.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Open a store rooted at `dir`, creating it if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return Err(LoomError::Document(format!("Invalid document name: {:?}", name)));
        }
        Ok(self.dir.join(format!("{}.txt", name)))
    }

    /// Save a document, overwriting any existing one with the same name.
    pub fn save(&self, name: &str, content: &str) -> Result<()> {
        let path = self.path_for(name)?;
        fs::write(&path, content)?;
        log::info!("Saved document: {}", name);
        Ok(())
    }

    /// Load a document by name, `None` if it does not exist.
    pub fn load(&self, name: &str) -> Result<Option<String>> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    /// List all documents, newest first.
    pub fn list(&self) -> Result<Vec<DocumentInfo>> {
        let mut documents = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "txt") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let modified = entry
                .metadata()?
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            documents.push(DocumentInfo {
                name: name.to_string(),
                modified,
            });
        }

        documents.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(documents)
    }

    /// Rename a document. The old name must exist and the new one must not.
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<()> {
        let old_path = self.path_for(old_name)?;
        let new_path = self.path_for(new_name)?;

        if !old_path.exists() {
            return Err(LoomError::Document(format!("Document not found: {}", old_name)));
        }
        if new_path.exists() {
            return Err(LoomError::Document(format!(
                "Document already exists: {}",
                new_name
            )));
        }

        fs::rename(old_path, new_path)?;
        Ok(())
    }

    /// Delete a document by name.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(LoomError::Document(format!("Document not found: {}", name)));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}
