use std::path::{Path as StdPath, PathBuf};

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::value::Value;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum LoadError {
    #[error("document `{}` not found", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read `{}`: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

/// Supplies the raw tree behind an `$import` path.
///
/// The processor always passes an absolute, lexically normalized path.
/// Markup decoding and filesystem access live behind this trait, outside
/// the core.
pub trait DocumentLoader {
    fn load(&self, path: &StdPath) -> Result<Value, LoadError>;
}

/// Path-keyed in-memory table of documents. The default loader: good for
/// tests, embedded configuration sets and caching front-ends.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    documents: FxHashMap<PathBuf, Value>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, document: Value) {
        self.documents.insert(path.into(), document);
    }

    pub fn with_document(mut self, path: impl Into<PathBuf>, document: Value) -> Self {
        self.insert(path, document);
        self
    }
}

impl DocumentLoader for MemoryLoader {
    fn load(&self, path: &StdPath) -> Result<Value, LoadError> {
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(path.to_path_buf()))
    }
}
