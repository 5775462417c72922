//! `choixe` turns a plain data tree into a parameterizable template.
//!
//! Directives — `$var`, `$import`, `$sweep`, `$call`, `$model`, `$for`,
//! `$item`, `$index` — are recognized inside strings and map keys. A tree
//! compiles once into an immutable AST, then evaluates any number of times
//! against a runtime context, yielding a single resolved tree or, when
//! sweeps are present, the cartesian product of all alternatives.
//!
//! ## Examples
//!
//! ```
//! use choixe::{Engine, Value};
//! use serde_json::json;
//!
//! let engine = Engine::default();
//! let tree = Value::from(json!({
//!     "greeting": "hello $var(name, default='world')",
//!     "retries": "$var(net.retries, default=3)",
//! }));
//! let ast = engine.compile(&tree, None).unwrap();
//!
//! let resolved = engine
//!     .process(&ast, &Value::from(json!({"name": "choixe"})))
//!     .unwrap();
//! assert_eq!(
//!     resolved,
//!     Value::from(json!({"greeting": "hello choixe", "retries": 3}))
//! );
//!
//! // Sweeps branch: `process_all` returns every combination.
//! let tree = Value::from(json!({"lr": "$sweep(0.1, 0.01)"}));
//! let ast = engine.compile(&tree, None).unwrap();
//! let all = engine.process_all(&ast, &Value::from(json!({}))).unwrap();
//! assert_eq!(all.len(), 2);
//! ```

pub mod ast;
pub mod engine;
pub mod error;
pub mod eval;
pub mod inspect;
pub mod lexer;
pub mod path;
pub mod unparse;
pub mod value;

pub use ast::{Ast, Compiler, Node};
pub use engine::Engine;
pub use error::{Error, InnerError};
pub use eval::loader::{DocumentLoader, LoadError, MemoryLoader};
pub use eval::symbol::{Callable, ResolveError, SymbolResolver, SymbolTable};
pub use eval::Processor;
pub use inspect::{Inspection, Inspector};
pub use lexer::token::{Argument, DirectiveCall, Token, TokenKind};
pub use path::Path;
pub use unparse::unparse;
pub use value::{Map, Opaque, Value};

/// Compiles a raw tree with no base directory. Shorthand for
/// [`Engine::compile`] on a default engine.
pub fn compile(tree: &Value) -> Result<Ast, Error> {
    Engine::default().compile(tree, None)
}

/// Evaluates to a single tree on a default engine; sweeps degrade to their
/// first option. Templates with `$import`/`$call` need an [`Engine`] with
/// real collaborators.
pub fn process(ast: &Ast, context: &Value) -> Result<Value, Error> {
    Engine::default().process(ast, context)
}

/// Evaluates to every alternative tree on a default engine.
pub fn process_all(ast: &Ast, context: &Value) -> Result<Vec<Value>, Error> {
    Engine::default().process_all(ast, context)
}

/// Reports a template's requirements on a default engine.
pub fn inspect(ast: &Ast) -> Result<Inspection, Error> {
    Engine::default().inspect(ast)
}

/// Splits a directive-bearing string into plain and directive tokens.
pub fn tokenize(input: &str) -> Result<Vec<Token>, Error> {
    lexer::tokenize(input).map_err(|e| {
        let span = e.span();
        Error::new(InnerError::Lexer(e), Path::root()).with_source(input, span)
    })
}
