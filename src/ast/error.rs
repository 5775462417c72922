use compact_str::CompactString;
use thiserror::Error;

use crate::lexer::error::LexerError;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum ParseError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error("unknown directive `${0}`")]
    UnknownDirective(CompactString),
    #[error("directive `${name}` {reason}")]
    BadDirectiveForm { name: CompactString, reason: String },
    #[error("invalid arguments for `${name}`: {reason}")]
    BadArgumentSchema { name: CompactString, reason: String },
    #[error("map mixes special keys `{0}` and `{1}`")]
    MixedSpecialKeys(String, String),
    #[error("`{0}` is not a valid dotted identifier")]
    BadIdentifier(String),
}

impl ParseError {
    pub(crate) fn form(name: &str, reason: impl Into<String>) -> Self {
        ParseError::BadDirectiveForm {
            name: CompactString::from(name),
            reason: reason.into(),
        }
    }

    pub(crate) fn schema(name: &str, reason: impl Into<String>) -> Self {
        ParseError::BadArgumentSchema {
            name: CompactString::from(name),
            reason: reason.into(),
        }
    }
}
