use miette::SourceSpan;

use crate::ast::error::ParseError;
use crate::eval::error::EvalError;
use crate::lexer::error::LexerError;
use crate::lexer::token::Span;
use crate::path::Path;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InnerError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// The crate-wide error: a stage error plus the tree location it happened
/// at. When the failure is inside a directive-bearing string, the string is
/// attached as source code so the diagnostic can underline the spot.
#[derive(Debug, thiserror::Error, miette::Diagnostic, PartialEq)]
#[error("{cause} (at `{location}`)")]
pub struct Error {
    pub cause: InnerError,
    pub location: Path,
    #[source_code]
    pub source_code: String,
    #[label("{cause}")]
    pub span: Option<SourceSpan>,
}

impl Error {
    pub(crate) fn new(cause: InnerError, location: Path) -> Self {
        Self {
            cause,
            location,
            source_code: String::new(),
            span: None,
        }
    }

    pub(crate) fn with_source(mut self, source: impl Into<String>, span: Span) -> Self {
        self.source_code = source.into();
        self.span = Some(span.into());
        self
    }
}
