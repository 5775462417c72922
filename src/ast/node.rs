use compact_str::CompactString;

use crate::path::Path;
use crate::value::Value;

/// Ordered key/value pairs of a map node. Keys are full nodes: a map key may
/// itself be a directive or a string bundle and participate in branching.
pub type Entries = Vec<(Node, Node)>;

/// A compiled template node. Immutable after compilation; a single tree may
/// be evaluated many times against different contexts.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A primitive resolved at compile time.
    Lit(Value),
    Map(Entries),
    Seq(Vec<Node>),
    /// Directives interleaved with plain text; evaluates by concatenation.
    Bundle(Vec<Node>),
    Var(Var),
    /// Inclusion of another document; the path may itself be an expression.
    Import(Box<Node>),
    /// Branching node: each option contributes its own alternatives.
    Sweep(Vec<Node>),
    Call(Invocation),
    Model(Invocation),
    For(For),
    /// Current item of an enclosing loop, or a sub-path within it.
    Item(Option<Path>),
    /// Current index of an enclosing loop.
    Index(Option<CompactString>),
    Uuid,
    Date(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub id: Path,
    pub default: Option<Box<Node>>,
    pub env: bool,
}

/// `$call`/`$model` payload: a symbol expression and keyword arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub symbol: Box<Node>,
    pub args: Entries,
}

#[derive(Debug, Clone, PartialEq)]
pub struct For {
    pub iterable: Path,
    pub id: LoopId,
    pub body: Box<Node>,
    pub mode: BodyMode,
}

/// Loop identifier: user-supplied, or a compiler-assigned token that
/// `$item(ref)`/`$index(ref)` can never name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopId {
    Named(CompactString),
    Auto(u64),
}

/// How the iterations of a `$for` body combine, fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    Map,
    Seq,
    Text,
}

impl Node {
    pub fn is_directive(&self) -> bool {
        !matches!(self, Node::Lit(_) | Node::Map(_) | Node::Seq(_) | Node::Bundle(_))
    }

    /// Number of nodes in this subtree, itself included.
    pub fn count(&self) -> usize {
        1 + match self {
            Node::Lit(_) | Node::Item(_) | Node::Index(_) | Node::Uuid | Node::Date(_) => 0,
            Node::Map(entries) => entries.iter().map(|(k, v)| k.count() + v.count()).sum(),
            Node::Seq(items) | Node::Bundle(items) | Node::Sweep(items) => {
                items.iter().map(Node::count).sum()
            }
            Node::Var(var) => var.default.as_deref().map_or(0, Node::count),
            Node::Import(path) => path.count(),
            Node::Call(invocation) | Node::Model(invocation) => {
                invocation.symbol.count()
                    + invocation
                        .args
                        .iter()
                        .map(|(k, v)| k.count() + v.count())
                        .sum::<usize>()
            }
            Node::For(for_node) => for_node.body.count(),
        }
    }
}
