use thiserror::Error;

use super::token::Span;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum LexerError {
    #[error("nested parentheses are not supported inside a directive call")]
    UnsupportedNesting { span: Span },
    #[error("directive call is missing its closing `)`")]
    UnterminatedCall { span: Span },
    #[error("`{text}` is not a valid identifier")]
    BadIdentifier { text: String, span: Span },
    #[error("malformed directive arguments: {message}")]
    BadArgumentSyntax { message: String, span: Span },
}

impl LexerError {
    pub fn span(&self) -> Span {
        match self {
            LexerError::UnsupportedNesting { span }
            | LexerError::UnterminatedCall { span }
            | LexerError::BadIdentifier { span, .. }
            | LexerError::BadArgumentSyntax { span, .. } => *span,
        }
    }
}
