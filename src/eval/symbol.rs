use std::rc::Rc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::value::{Map, Value};

/// A callable behind a `$call`/`$model` symbol. Invoked with the evaluated
/// keyword arguments; a returned error aborts the whole evaluation.
pub type Callable = Rc<dyn Fn(Map) -> Result<Value, String>>;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum ResolveError {
    #[error("symbol `{0}` is not registered")]
    NotFound(String),
    #[error("`{0}` is not a registered model")]
    NotAModel(String),
}

/// Maps symbol strings to callables. Symbols are matched verbatim and
/// case-sensitively; both `file.ext:name` and `dotted.module.name`
/// spellings are just keys.
pub trait SymbolResolver {
    fn resolve(&self, symbol: &str) -> Result<Callable, ResolveError>;

    /// Like [`resolve`](Self::resolve), but the symbol must denote a model
    /// constructor: a callable that builds a structured object from a
    /// keyword mapping.
    fn resolve_model(&self, symbol: &str) -> Result<Callable, ResolveError>;
}

/// Registration-table resolver: the whole dynamic-invocation surface in an
/// environment without runtime module loading.
#[derive(Clone, Default)]
pub struct SymbolTable {
    callables: FxHashMap<String, Callable>,
    models: FxHashMap<String, Callable>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, symbol: impl Into<String>, callable: F)
    where
        F: Fn(Map) -> Result<Value, String> + 'static,
    {
        self.callables.insert(symbol.into(), Rc::new(callable));
    }

    pub fn register_model<F>(&mut self, symbol: impl Into<String>, constructor: F)
    where
        F: Fn(Map) -> Result<Value, String> + 'static,
    {
        self.models.insert(symbol.into(), Rc::new(constructor));
    }

    pub fn with_callable<F>(mut self, symbol: impl Into<String>, callable: F) -> Self
    where
        F: Fn(Map) -> Result<Value, String> + 'static,
    {
        self.register(symbol, callable);
        self
    }

    pub fn with_model<F>(mut self, symbol: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(Map) -> Result<Value, String> + 'static,
    {
        self.register_model(symbol, constructor);
        self
    }
}

impl SymbolResolver for SymbolTable {
    fn resolve(&self, symbol: &str) -> Result<Callable, ResolveError> {
        self.callables
            .get(symbol)
            .or_else(|| self.models.get(symbol))
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(symbol.to_string()))
    }

    fn resolve_model(&self, symbol: &str) -> Result<Callable, ResolveError> {
        match self.models.get(symbol) {
            Some(constructor) => Ok(constructor.clone()),
            None if self.callables.contains_key(symbol) => {
                Err(ResolveError::NotAModel(symbol.to_string()))
            }
            None => Err(ResolveError::NotFound(symbol.to_string())),
        }
    }
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable")
            .field("callables", &self.callables.keys().collect::<Vec<_>>())
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_registered_callable() {
        let table = SymbolTable::new().with_callable("pkg.answer", |_| Ok(Value::Int(42)));
        let callable = table.resolve("pkg.answer").unwrap();
        assert_eq!(callable(Map::new()), Ok(Value::Int(42)));
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let table = SymbolTable::new().with_callable("pkg.answer", |_| Ok(Value::Null));
        assert_eq!(
            table.resolve("pkg.Answer").err(),
            Some(ResolveError::NotFound("pkg.Answer".to_string()))
        );
    }

    #[test]
    fn test_resolve_model_distinguishes_plain_callables() {
        let table = SymbolTable::new()
            .with_callable("pkg.fn", |_| Ok(Value::Null))
            .with_model("pkg.Net", |args| Ok(Value::Map(args)));
        assert!(table.resolve_model("pkg.Net").is_ok());
        assert_eq!(
            table.resolve_model("pkg.fn").err(),
            Some(ResolveError::NotAModel("pkg.fn".to_string()))
        );
        // A model is still callable through `$call`.
        assert!(table.resolve("pkg.Net").is_ok());
    }
}
