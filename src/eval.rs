pub mod error;
pub mod loader;
pub mod symbol;

use std::path::{Component, Path as StdPath, PathBuf};

use itertools::Itertools;

use crate::ast::node::{BodyMode, Entries, For, Invocation, LoopId, Node, Var};
use crate::ast::Compiler;
use crate::error::{Error, InnerError};
use crate::path::{get_in, Path};
use crate::value::{Map, Value};
use error::EvalError;
use loader::{DocumentLoader, LoadError};
use symbol::{ResolveError, SymbolResolver};

/// One `$for` activation: its id, current index and current item.
struct Frame {
    id: LoopId,
    index: usize,
    item: Value,
}

/// Evaluates a compiled template against a read-only context.
///
/// Every node evaluates to a list of alternatives; non-branching nodes
/// contribute exactly one. Composite nodes combine their children by
/// cartesian product in insertion order, with the last child varying
/// fastest, and a sweep's alternatives are the concatenation of its
/// options' alternatives. In non-branching mode sweeps degrade to their
/// first option, so the list always has length one.
///
/// The processor holds per-evaluation state only (loop stack, import
/// stack, base directory); the AST is never mutated and can be shared.
pub struct Processor<'a> {
    context: &'a Value,
    loader: &'a dyn DocumentLoader,
    resolver: &'a dyn SymbolResolver,
    branching: bool,
    base_dir: Option<PathBuf>,
    import_stack: Vec<PathBuf>,
    loop_stack: Vec<Frame>,
    at: Path,
}

impl<'a> Processor<'a> {
    pub fn new(
        context: &'a Value,
        loader: &'a dyn DocumentLoader,
        resolver: &'a dyn SymbolResolver,
        base_dir: Option<PathBuf>,
        branching: bool,
    ) -> Self {
        Self {
            context,
            loader,
            resolver,
            branching,
            base_dir,
            import_stack: Vec::new(),
            loop_stack: Vec::new(),
            at: Path::root(),
        }
    }

    /// Evaluates `node` to its list of alternative trees.
    pub fn process(&mut self, node: &Node) -> Result<Vec<Value>, Error> {
        self.eval(node)
    }

    fn eval(&mut self, node: &Node) -> Result<Vec<Value>, Error> {
        match node {
            Node::Lit(value) => Ok(vec![value.clone()]),
            Node::Map(entries) => {
                let maps = self.eval_entries(entries)?;
                Ok(maps.into_iter().map(Value::Map).collect())
            }
            Node::Seq(items) => self.eval_seq(items),
            Node::Bundle(parts) => self.eval_bundle(parts),
            Node::Var(var) => self.eval_var(var),
            Node::Import(path) => self.eval_import_expr(path),
            Node::Sweep(options) => self.eval_sweep(options),
            Node::Call(invocation) => self.eval_invocation(invocation, false),
            Node::Model(invocation) => self.eval_invocation(invocation, true),
            Node::For(for_node) => self.eval_for(for_node),
            Node::Item(reference) => self.eval_item(reference.as_ref()),
            Node::Index(reference) => self.eval_index(reference.as_deref()),
            Node::Uuid => Ok(vec![Value::String(uuid::Uuid::new_v4().to_string())]),
            Node::Date(format) => self.eval_date(format.as_deref()),
        }
    }

    /// Evaluates ordered key/value pairs into alternative maps. Shared by
    /// map nodes and invocation arguments.
    fn eval_entries(&mut self, entries: &Entries) -> Result<Vec<Map>, Error> {
        let mut alternatives: Vec<Map> = vec![Map::new()];
        for (position, (key_node, value_node)) in entries.iter().enumerate() {
            match key_node {
                Node::Lit(Value::String(key)) => self.at.push_key(key),
                _ => self.at.push_index(position),
            }

            let mut keys = Vec::new();
            for key_value in self.eval(key_node)? {
                keys.push(self.text_of(&key_value)?);
            }
            let values = self.eval(value_node)?;

            let mut next = Vec::with_capacity(alternatives.len() * keys.len() * values.len());
            for base in &alternatives {
                for key in &keys {
                    for value in &values {
                        let mut map = base.clone();
                        if map.insert(key.clone(), value.clone()).is_some() {
                            return Err(self.err(EvalError::DuplicateKey(key.clone())));
                        }
                        next.push(map);
                    }
                }
            }
            alternatives = next;
            self.at.pop();
        }
        Ok(alternatives)
    }

    fn eval_seq(&mut self, items: &[Node]) -> Result<Vec<Value>, Error> {
        let mut alternatives: Vec<Vec<Value>> = vec![Vec::new()];
        for (index, item) in items.iter().enumerate() {
            self.at.push_index(index);
            let options = self.eval(item)?;
            self.at.pop();

            let mut next = Vec::with_capacity(alternatives.len() * options.len());
            for base in &alternatives {
                for option in &options {
                    let mut seq = base.clone();
                    seq.push(option.clone());
                    next.push(seq);
                }
            }
            alternatives = next;
        }
        Ok(alternatives.into_iter().map(Value::Seq).collect())
    }

    fn eval_bundle(&mut self, parts: &[Node]) -> Result<Vec<Value>, Error> {
        let mut alternatives: Vec<String> = vec![String::new()];
        for part in parts {
            let options = self.eval(part)?;
            let mut texts = Vec::with_capacity(options.len());
            for option in &options {
                texts.push(self.text_of(option)?);
            }

            let mut next = Vec::with_capacity(alternatives.len() * texts.len());
            for base in &alternatives {
                for text in &texts {
                    next.push(format!("{base}{text}"));
                }
            }
            alternatives = next;
        }
        Ok(alternatives.into_iter().map(Value::String).collect())
    }

    fn eval_var(&mut self, var: &Var) -> Result<Vec<Value>, Error> {
        if let Some(value) = var.id.get(self.context) {
            return Ok(vec![value.clone()]);
        }
        if var.env {
            // The full dotted id is the environment key, verbatim.
            if let Ok(text) = std::env::var(var.id.to_string()) {
                return Ok(vec![Value::String(text)]);
            }
        }
        match &var.default {
            Some(default) => self.eval(default),
            None if var.env => Err(self.err(EvalError::UnresolvedEnvVariable(var.id.to_string()))),
            None => Err(self.err(EvalError::UnresolvedVariable(var.id.clone()))),
        }
    }

    fn eval_import_expr(&mut self, path: &Node) -> Result<Vec<Value>, Error> {
        let mut out = Vec::new();
        for path_value in self.eval(path)? {
            let text = match path_value.as_str() {
                Some(text) => text.to_string(),
                None => {
                    return Err(self.err(EvalError::TypeMismatch {
                        expected: "a string import path",
                        actual: path_value.kind(),
                    }));
                }
            };
            out.extend(self.eval_import(StdPath::new(&text))?);
        }
        Ok(out)
    }

    fn eval_import(&mut self, path: &StdPath) -> Result<Vec<Value>, Error> {
        let absolute = self.absolutize(path);
        if self.import_stack.contains(&absolute) {
            return Err(self.err(EvalError::ImportCycle(absolute)));
        }
        tracing::debug!(path = %absolute.display(), "resolving import");

        let document = self.loader.load(&absolute).map_err(|e| {
            self.err(match e {
                LoadError::NotFound(path) => EvalError::ImportNotFound(path),
                LoadError::Io { path, message } => EvalError::ImportLoad { path, message },
            })
        })?;
        let compiled = Compiler::new().compile(&document).map_err(|e| {
            self.err(EvalError::ImportCompile {
                path: absolute.clone(),
                source: Box::new(e),
            })
        })?;

        // The imported file's own directory anchors its relative imports.
        let parent = absolute.parent().map(|p| p.to_path_buf());
        let saved = std::mem::replace(&mut self.base_dir, parent);
        self.import_stack.push(absolute);
        let result = self.eval(&compiled);
        self.import_stack.pop();
        self.base_dir = saved;
        result
    }

    fn eval_sweep(&mut self, options: &[Node]) -> Result<Vec<Value>, Error> {
        if !self.branching {
            return match options.first() {
                Some(first) => self.eval(first),
                None => unreachable!("the compiler rejects empty sweeps"),
            };
        }
        let mut out = Vec::new();
        for option in options {
            out.extend(self.eval(option)?);
        }
        tracing::trace!(alternatives = out.len(), "sweep expanded");
        Ok(out)
    }

    fn eval_invocation(&mut self, invocation: &Invocation, model: bool) -> Result<Vec<Value>, Error> {
        let symbols = self.eval(&invocation.symbol)?;
        let args_alternatives = self.eval_entries(&invocation.args)?;

        let mut out = Vec::new();
        for symbol_value in &symbols {
            let symbol = match symbol_value.as_str() {
                Some(symbol) => symbol,
                None => {
                    return Err(self.err(EvalError::TypeMismatch {
                        expected: "a string symbol",
                        actual: symbol_value.kind(),
                    }));
                }
            };
            let resolved = if model {
                self.resolver.resolve_model(symbol)
            } else {
                self.resolver.resolve(symbol)
            };
            let callable = resolved.map_err(|e| {
                self.err(match e {
                    ResolveError::NotFound(symbol) => EvalError::SymbolResolutionFailed(symbol),
                    ResolveError::NotAModel(symbol) => EvalError::NotAModel(symbol),
                })
            })?;
            for args in &args_alternatives {
                let value = callable(args.clone()).map_err(|message| {
                    self.err(EvalError::CallFailed {
                        symbol: symbol.to_string(),
                        message,
                    })
                })?;
                out.push(value);
            }
        }
        Ok(out)
    }

    fn eval_for(&mut self, for_node: &For) -> Result<Vec<Value>, Error> {
        let iterable = match for_node.iterable.get(self.context) {
            Some(value) => value,
            None => {
                return Err(self.err(EvalError::UnresolvedVariable(for_node.iterable.clone())));
            }
        };
        let items = match iterable.as_seq() {
            Some(items) => items.to_vec(),
            None => {
                return Err(self.err(EvalError::TypeMismatch {
                    expected: "a sequence iterable",
                    actual: iterable.kind(),
                }));
            }
        };
        if items.is_empty() {
            return Ok(vec![identity(for_node.mode)]);
        }

        self.loop_stack.push(Frame {
            id: for_node.id.clone(),
            index: 0,
            item: Value::Null,
        });
        let mut iterations: Vec<Vec<Value>> = Vec::with_capacity(items.len());
        let mut failure = None;
        for (index, item) in items.into_iter().enumerate() {
            if let Some(frame) = self.loop_stack.last_mut() {
                frame.index = index;
                frame.item = item;
            }
            match self.eval(&for_node.body) {
                Ok(alternatives) => iterations.push(alternatives),
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }
        self.loop_stack.pop();
        if let Some(error) = failure {
            return Err(error);
        }

        let mut out = Vec::new();
        for combination in iterations.into_iter().multi_cartesian_product() {
            out.push(self.combine(for_node.mode, combination)?);
        }
        Ok(out)
    }

    /// Folds one iteration-combination into a single value per body mode:
    /// map-merge (later iterations overwrite), list-concat, string-concat.
    fn combine(&self, mode: BodyMode, parts: Vec<Value>) -> Result<Value, Error> {
        match mode {
            BodyMode::Map => {
                let mut merged = Map::new();
                for part in parts {
                    match part {
                        Value::Map(map) => merged.extend(map),
                        other => {
                            return Err(self.err(EvalError::TypeMismatch {
                                expected: "a map loop body",
                                actual: other.kind(),
                            }));
                        }
                    }
                }
                Ok(Value::Map(merged))
            }
            BodyMode::Seq => {
                let mut merged = Vec::new();
                for part in parts {
                    match part {
                        Value::Seq(items) => merged.extend(items),
                        other => {
                            return Err(self.err(EvalError::TypeMismatch {
                                expected: "a sequence loop body",
                                actual: other.kind(),
                            }));
                        }
                    }
                }
                Ok(Value::Seq(merged))
            }
            BodyMode::Text => {
                let mut merged = String::new();
                for part in parts {
                    merged.push_str(&self.text_of(&part)?);
                }
                Ok(Value::String(merged))
            }
        }
    }

    fn eval_item(&mut self, reference: Option<&Path>) -> Result<Vec<Value>, Error> {
        let Some(path) = reference else {
            return match self.loop_stack.last() {
                Some(frame) => Ok(vec![frame.item.clone()]),
                None => Err(self.err(EvalError::NoActiveLoop)),
            };
        };
        let Some(head) = path.head_key() else {
            return Err(self.err(EvalError::UnknownLoopRef(path.clone())));
        };
        let Some(frame) = self.find_frame(head) else {
            return Err(self.err(EvalError::UnknownLoopRef(path.clone())));
        };
        let rest = path.tail();
        if rest.is_empty() {
            return Ok(vec![frame.item.clone()]);
        }
        match get_in(&frame.item, rest) {
            Some(value) => Ok(vec![value.clone()]),
            None => Err(self.err(EvalError::UnresolvedVariable(path.clone()))),
        }
    }

    fn eval_index(&mut self, reference: Option<&str>) -> Result<Vec<Value>, Error> {
        let frame = match reference {
            None => match self.loop_stack.last() {
                Some(frame) => frame,
                None => return Err(self.err(EvalError::NoActiveLoop)),
            },
            Some(name) => match self.find_frame(name) {
                Some(frame) => frame,
                None => {
                    let mut path = Path::root();
                    path.push_key(name);
                    return Err(self.err(EvalError::UnknownLoopRef(path)));
                }
            },
        };
        Ok(vec![Value::Int(frame.index as i64)])
    }

    /// Innermost frame whose user-supplied id matches `name`. Auto ids are
    /// never reachable by name.
    fn find_frame(&self, name: &str) -> Option<&Frame> {
        self.loop_stack
            .iter()
            .rev()
            .find(|frame| matches!(&frame.id, LoopId::Named(id) if id == name))
    }

    fn eval_date(&self, format: Option<&str>) -> Result<Vec<Value>, Error> {
        let now = chrono::Local::now();
        let text = match format {
            None => now.to_rfc3339(),
            Some(format) => {
                use chrono::format::{Item, StrftimeItems};
                if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                    return Err(self.err(EvalError::BadDateFormat(format.to_string())));
                }
                now.format(format).to_string()
            }
        };
        Ok(vec![Value::String(text)])
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
        normalize(&joined)
    }

    fn text_of(&self, value: &Value) -> Result<String, Error> {
        match value.to_text() {
            Some(text) => Ok(text),
            None => Err(self.err(EvalError::TypeMismatch {
                expected: "a textual value",
                actual: value.kind(),
            })),
        }
    }

    fn err(&self, cause: EvalError) -> Error {
        Error::new(InnerError::Eval(cause), self.at.clone())
    }
}

fn identity(mode: BodyMode) -> Value {
    match mode {
        BodyMode::Map => Value::Map(Map::new()),
        BodyMode::Seq => Value::Seq(Vec::new()),
        BodyMode::Text => Value::String(String::new()),
    }
}

/// Resolves `.` and `..` lexically, without touching the filesystem, so
/// import-cycle keys stay stable across spellings of the same path.
pub(crate) fn normalize(path: &StdPath) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
