use std::fmt::{self, Debug, Formatter};
use std::path::PathBuf;
use std::rc::Rc;

use crate::ast::{Ast, Compiler};
use crate::error::Error;
use crate::eval::loader::{DocumentLoader, MemoryLoader};
use crate::eval::symbol::{SymbolResolver, SymbolTable};
use crate::eval::Processor;
use crate::inspect::{Inspection, Inspector};
use crate::value::Value;

/// Front door of the crate: wires a [`DocumentLoader`] and a
/// [`SymbolResolver`] to the compile → process → inspect pipeline.
///
/// The default engine has no documents and no symbols registered, so
/// `$import` and `$call` fail until real collaborators are supplied.
#[derive(Clone)]
pub struct Engine {
    loader: Rc<dyn DocumentLoader>,
    resolver: Rc<dyn SymbolResolver>,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            loader: Rc::new(MemoryLoader::new()),
            resolver: Rc::new(SymbolTable::new()),
        }
    }
}

impl Engine {
    pub fn new(loader: Rc<dyn DocumentLoader>, resolver: Rc<dyn SymbolResolver>) -> Self {
        Self { loader, resolver }
    }

    pub fn with_loader(mut self, loader: impl DocumentLoader + 'static) -> Self {
        self.loader = Rc::new(loader);
        self
    }

    pub fn with_resolver(mut self, resolver: impl SymbolResolver + 'static) -> Self {
        self.resolver = Rc::new(resolver);
        self
    }

    /// Compiles a raw tree. `base_dir` anchors the tree's relative imports;
    /// without one they resolve against the process working directory.
    pub fn compile(&self, tree: &Value, base_dir: Option<PathBuf>) -> Result<Ast, Error> {
        let root = Compiler::new().compile(tree)?;
        tracing::debug!(nodes = root.count(), base_dir = ?base_dir, "compiled configuration");
        Ok(Ast::new(root, base_dir))
    }

    /// Evaluates to a single tree: every sweep degrades to its first option.
    pub fn process(&self, ast: &Ast, context: &Value) -> Result<Value, Error> {
        tracing::debug!(branching = false, "processing");
        let mut processor = Processor::new(
            context,
            self.loader.as_ref(),
            self.resolver.as_ref(),
            ast.base_dir.clone(),
            false,
        );
        let mut alternatives = processor.process(ast.root())?;
        match alternatives.pop() {
            Some(value) if alternatives.is_empty() => Ok(value),
            _ => unreachable!("non-branching evaluation yields exactly one tree"),
        }
    }

    /// Evaluates to every alternative tree, in row-major sweep order: the
    /// last sweep encountered depth-first varies fastest.
    pub fn process_all(&self, ast: &Ast, context: &Value) -> Result<Vec<Value>, Error> {
        tracing::debug!(branching = true, "processing");
        let mut processor = Processor::new(
            context,
            self.loader.as_ref(),
            self.resolver.as_ref(),
            ast.base_dir.clone(),
            true,
        );
        processor.process(ast.root())
    }

    /// Reports the variables, environment keys, imports and symbols the
    /// template needs, without evaluating anything.
    pub fn inspect(&self, ast: &Ast) -> Result<Inspection, Error> {
        Inspector::new(self.loader.as_ref(), ast.base_dir.clone()).inspect(ast.root())
    }
}

impl Debug for Engine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}
