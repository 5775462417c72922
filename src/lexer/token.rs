use std::fmt::{self, Display, Formatter};

use compact_str::CompactString;
use itertools::Itertools;
use smallvec::SmallVec;

use crate::path::Path;
use crate::value::Value;

/// Byte range within the scanned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.end.saturating_sub(span.start)).into()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Literal text between directives.
    Plain(String),
    /// A `$name` or `$name(...)` occurrence, with its arguments parsed.
    Directive(DirectiveCall),
}

pub type Args = SmallVec<[Argument; 4]>;
pub type Kwargs = Vec<(CompactString, Argument)>;

/// A parsed directive occurrence: name plus positional and keyword
/// arguments. Schema checks (arity, known keywords) happen later, in the
/// tree compiler, where the directive name gives them meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveCall {
    pub name: CompactString,
    pub args: Args,
    pub kwargs: Kwargs,
}

impl DirectiveCall {
    pub fn compact(name: &str) -> Self {
        Self {
            name: CompactString::from(name),
            args: Args::new(),
            kwargs: Kwargs::new(),
        }
    }

    pub fn is_compact(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }
}

/// A single directive argument: a scalar literal or a dotted identifier.
/// No other expression forms exist.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Literal(Value),
    Ident(Path),
}

impl Display for Argument {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Ident(path) => write!(f, "{path}"),
            Argument::Literal(Value::String(s)) => write!(f, "'{}'", escape(s)),
            Argument::Literal(value) => match value.to_text() {
                Some(text) => write!(f, "{text}"),
                None => write!(f, "{value}"),
            },
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}

impl Display for DirectiveCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name)?;
        if self.is_compact() {
            return Ok(());
        }
        let rendered = self
            .args
            .iter()
            .map(|a| a.to_string())
            .chain(self.kwargs.iter().map(|(k, v)| format!("{k}={v}")))
            .join(", ");
        write!(f, "({rendered})")
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Plain(text) => write!(f, "{text}"),
            TokenKind::Directive(call) => write!(f, "{call}"),
        }
    }
}
