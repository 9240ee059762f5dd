use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{SourceFile, SourceModel};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read source model {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid source model: {0}")]
    Json(#[from] serde_json::Error),
    #[error("source model lists {path} more than once")]
    DuplicateFile { path: String },
}

/// Serialized form of a whole program: `{ "files": [ ... ] }`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ModelDocument {
    #[serde(default)]
    files: Vec<SourceFile>,
}

/// Simple in-memory source model, also used as the on-disk interchange format.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceModel {
    files: BTreeMap<PathBuf, SourceFile>,
}

impl MemorySourceModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let doc: ModelDocument = serde_json::from_str(text)?;
        let mut model = Self::new();
        for file in doc.files {
            if model.files.contains_key(&file.path) {
                return Err(ModelError::DuplicateFile {
                    path: file.path.display().to_string(),
                });
            }
            model.insert(file);
        }
        Ok(model)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        let doc = ModelDocument {
            files: self.files.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Inserts or replaces the file at `file.path`, returning the previous version.
    pub fn insert(&mut self, file: SourceFile) -> Option<SourceFile> {
        self.files.insert(file.path.clone(), file)
    }

    pub fn remove(&mut self, path: &Path) -> Option<SourceFile> {
        self.files.remove(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<SourceFile> for MemorySourceModel {
    fn from_iter<T: IntoIterator<Item = SourceFile>>(iter: T) -> Self {
        let mut model = Self::new();
        for file in iter {
            model.insert(file);
        }
        model
    }
}

impl SourceModel for MemorySourceModel {
    fn file(&self, path: &Path) -> Option<&SourceFile> {
        self.files.get(path)
    }

    fn files(&self) -> Vec<&SourceFile> {
        self.files.values().collect()
    }
}
