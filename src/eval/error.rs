use std::path::PathBuf;

use thiserror::Error;

use crate::path::Path;

#[derive(Error, Debug, PartialEq)]
pub enum EvalError {
    #[error("variable `{0}` is not defined")]
    UnresolvedVariable(Path),
    #[error("environment variable `{0}` is not set")]
    UnresolvedEnvVariable(String),
    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("import cycle through `{}`", .0.display())]
    ImportCycle(PathBuf),
    #[error("imported document `{}` not found", .0.display())]
    ImportNotFound(PathBuf),
    #[error("failed to load `{}`: {message}", .path.display())]
    ImportLoad { path: PathBuf, message: String },
    #[error("failed to compile imported document `{}`", .path.display())]
    ImportCompile {
        path: PathBuf,
        #[source]
        source: Box<crate::error::Error>,
    },
    #[error("cannot resolve symbol `{0}`")]
    SymbolResolutionFailed(String),
    #[error("call to `{symbol}` failed: {message}")]
    CallFailed { symbol: String, message: String },
    #[error("`{0}` is not a registered model")]
    NotAModel(String),
    #[error("`{0}` does not name an enclosing loop")]
    UnknownLoopRef(Path),
    #[error("`$item`/`$index` used outside of a loop")]
    NoActiveLoop,
    #[error("duplicate key `{0}` after evaluation")]
    DuplicateKey(String),
    #[error("invalid date format `{0}`")]
    BadDateFormat(String),
}
