use std::path::{Path as StdPath, PathBuf};

use rustc_hash::FxHashSet;

use crate::ast::node::{Entries, Node};
use crate::ast::Compiler;
use crate::error::Error;
use crate::eval::loader::DocumentLoader;
use crate::path::{set_in, walk, Path};
use crate::value::{Map, Value};

/// Static report over a compiled template: everything an evaluation would
/// need, gathered without evaluating anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    /// Absolute paths of statically-known imports, including transitive
    /// ones that could be loaded.
    pub imports: FxHashSet<PathBuf>,
    /// Tree of required variables; leaves hold literal defaults or null.
    pub variables: Value,
    /// Flat map from environment keys (full dotted ids) to defaults.
    pub environ: Value,
    /// Statically-known `$call`/`$model` symbols.
    pub symbols: FxHashSet<String>,
    /// Whether any directive was visited at all.
    pub processed: bool,
}

impl Default for Inspection {
    fn default() -> Self {
        Self {
            imports: FxHashSet::default(),
            variables: Value::Map(Map::new()),
            environ: Value::Map(Map::new()),
            symbols: FxHashSet::default(),
            processed: false,
        }
    }
}

impl Inspection {
    /// Unions another report into this one. Existing variable entries win
    /// over incoming ones.
    pub fn merge(&mut self, other: Inspection) {
        self.imports.extend(other.imports);
        self.symbols.extend(other.symbols);
        self.processed |= other.processed;
        for (path, leaf) in walk(&other.variables) {
            if path.get(&self.variables).is_none() {
                set_in(&mut self.variables, &path, leaf.clone());
            }
        }
        for (path, leaf) in walk(&other.environ) {
            if path.get(&self.environ).is_none() {
                set_in(&mut self.environ, &path, leaf.clone());
            }
        }
    }
}

/// Mirrors the processor's walk but collects metadata instead of values:
/// never fails on missing variables or unloadable imports, only on
/// structural compile errors inside imported documents.
pub struct Inspector<'a> {
    loader: &'a dyn DocumentLoader,
    base_dir: Option<PathBuf>,
    report: Inspection,
}

impl<'a> Inspector<'a> {
    pub fn new(loader: &'a dyn DocumentLoader, base_dir: Option<PathBuf>) -> Self {
        Self {
            loader,
            base_dir,
            report: Inspection::default(),
        }
    }

    pub fn inspect(mut self, node: &Node) -> Result<Inspection, Error> {
        self.walk_node(node)?;
        Ok(self.report)
    }

    fn walk_node(&mut self, node: &Node) -> Result<(), Error> {
        match node {
            Node::Lit(_) => {}
            Node::Map(entries) => self.walk_entries(entries)?,
            Node::Seq(items) | Node::Bundle(items) => {
                for item in items {
                    self.walk_node(item)?;
                }
            }
            Node::Var(var) => {
                self.report.processed = true;
                let default = match var.default.as_deref() {
                    Some(Node::Lit(value)) => value.clone(),
                    Some(other) => {
                        self.walk_node(other)?;
                        Value::Null
                    }
                    None => Value::Null,
                };
                if var.env {
                    if let Value::Map(environ) = &mut self.report.environ {
                        environ.insert(var.id.to_string(), default.clone());
                    }
                }
                set_in(&mut self.report.variables, &var.id, default);
            }
            Node::Import(path) => {
                self.report.processed = true;
                match &**path {
                    Node::Lit(Value::String(text)) => self.walk_import(text)?,
                    // Dynamic path: collect what the expression needs and
                    // stop recursion on this branch.
                    dynamic => self.walk_node(dynamic)?,
                }
            }
            Node::Sweep(options) => {
                self.report.processed = true;
                for option in options {
                    self.walk_node(option)?;
                }
            }
            Node::Call(invocation) | Node::Model(invocation) => {
                self.report.processed = true;
                match &*invocation.symbol {
                    Node::Lit(Value::String(symbol)) => {
                        self.report.symbols.insert(symbol.clone());
                    }
                    dynamic => self.walk_node(dynamic)?,
                }
                self.walk_entries(&invocation.args)?;
            }
            Node::For(for_node) => {
                self.report.processed = true;
                if for_node.iterable.get(&self.report.variables).is_none() {
                    set_in(
                        &mut self.report.variables,
                        &for_node.iterable,
                        Value::Seq(Vec::new()),
                    );
                }
                self.walk_node(&for_node.body)?;
            }
            Node::Item(_) | Node::Index(_) | Node::Uuid | Node::Date(_) => {
                self.report.processed = true;
            }
        }
        Ok(())
    }

    fn walk_entries(&mut self, entries: &Entries) -> Result<(), Error> {
        for (key, value) in entries {
            self.walk_node(key)?;
            self.walk_node(value)?;
        }
        Ok(())
    }

    fn walk_import(&mut self, text: &str) -> Result<(), Error> {
        let absolute = self.absolutize(StdPath::new(text));
        if !self.report.imports.insert(absolute.clone()) {
            return Ok(());
        }
        let document = match self.loader.load(&absolute) {
            Ok(document) => document,
            // Unloadable: the path is still reported, recursion stops.
            Err(_) => return Ok(()),
        };
        let compiled = Compiler::new().compile(&document)?;
        let saved = std::mem::replace(
            &mut self.base_dir,
            absolute.parent().map(|p| p.to_path_buf()),
        );
        let outcome = self.walk_node(&compiled);
        self.base_dir = saved;
        outcome
    }

    fn absolutize(&self, path: &StdPath) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            match &self.base_dir {
                Some(base) => base.join(path),
                None => std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf()),
            }
        };
        crate::eval::normalize(&joined)
    }
}
