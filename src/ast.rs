pub mod error;
pub mod node;
pub mod parser;

use std::path::{Path as StdPath, PathBuf};

pub use node::Node;
pub use parser::Compiler;

/// A compiled template: the root [`Node`] plus the directory its relative
/// imports resolve against. Immutable; share freely across evaluations.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub(crate) root: Node,
    pub(crate) base_dir: Option<PathBuf>,
}

impl Ast {
    pub fn new(root: Node, base_dir: Option<PathBuf>) -> Self {
        Self { root, base_dir }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn base_dir(&self) -> Option<&StdPath> {
        self.base_dir.as_deref()
    }
}
