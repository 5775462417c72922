use compact_str::CompactString;

use crate::ast::node::{Entries, For, Invocation, LoopId, Node, Var};
use crate::lexer::token::{Argument, DirectiveCall, Kwargs};
use crate::path::Path;
use crate::value::{Map, Value};

/// Reconstructs a raw tree whose compilation yields `node` again.
///
/// Directives render to call form when their arguments are scalars and to
/// the extended map form otherwise; `$call`/`$model`/`$for` render to their
/// special map forms. The surface text may differ from the one originally
/// compiled (quoting, spacing), but the compiled result is identical.
pub fn unparse(node: &Node) -> Value {
    match node {
        Node::Lit(value) => value.clone(),
        Node::Map(entries) => Value::Map(unparse_entries(entries)),
        Node::Seq(items) => Value::Seq(items.iter().map(unparse).collect()),
        Node::Bundle(parts) => {
            let mut text = String::new();
            for part in parts {
                match part {
                    Node::Lit(value) => {
                        if let Some(plain) = value.to_text() {
                            text.push_str(&plain);
                        }
                    }
                    // Bundles come from strings, so their directive parts
                    // always carry call-form (scalar) arguments.
                    directive => {
                        if let Some(rendered) = directive_text(directive) {
                            text.push_str(&rendered);
                        }
                    }
                }
            }
            Value::String(text)
        }
        Node::Var(var) => match directive_text(node) {
            Some(text) => Value::String(text),
            None => extended_var(var),
        },
        Node::Import(path) => match directive_text(node) {
            Some(text) => Value::String(text),
            None => extended("import", vec![unparse(path)], Vec::new()),
        },
        Node::Sweep(options) => match directive_text(node) {
            Some(text) => Value::String(text),
            None => extended("sweep", options.iter().map(unparse).collect(), Vec::new()),
        },
        Node::Call(invocation) => special_invocation("$call", invocation),
        Node::Model(invocation) => special_invocation("$model", invocation),
        Node::For(for_node) => special_for(for_node),
        Node::Item(_) | Node::Index(_) | Node::Uuid | Node::Date(_) => {
            match directive_text(node) {
                Some(text) => Value::String(text),
                None => unreachable!("leaf directives always render to text"),
            }
        }
    }
}

fn unparse_entries(entries: &Entries) -> Map {
    let mut map = Map::new();
    for (key_node, value_node) in entries {
        let key = match unparse(key_node) {
            Value::String(key) => key,
            other => other.to_text().unwrap_or_default(),
        };
        map.insert(key, unparse(value_node));
    }
    map
}

/// Call-form text of a directive, when all of its arguments are scalars.
fn directive_text(node: &Node) -> Option<String> {
    let call = match node {
        Node::Var(var) => {
            let mut kwargs = Kwargs::new();
            if let Some(default) = &var.default {
                kwargs.push((CompactString::from("default"), scalar_argument(default)?));
            }
            if var.env {
                kwargs.push((
                    CompactString::from("env"),
                    Argument::Literal(Value::Bool(true)),
                ));
            }
            DirectiveCall {
                name: CompactString::from("var"),
                args: [Argument::Ident(var.id.clone())].into_iter().collect(),
                kwargs,
            }
        }
        Node::Import(path) => DirectiveCall {
            name: CompactString::from("import"),
            args: [scalar_argument(path)?].into_iter().collect(),
            kwargs: Kwargs::new(),
        },
        Node::Sweep(options) => {
            let args = options
                .iter()
                .map(scalar_argument)
                .collect::<Option<_>>()?;
            DirectiveCall {
                name: CompactString::from("sweep"),
                args,
                kwargs: Kwargs::new(),
            }
        }
        Node::Item(None) => DirectiveCall::compact("item"),
        Node::Item(Some(path)) => DirectiveCall {
            name: CompactString::from("item"),
            args: [Argument::Ident(path.clone())].into_iter().collect(),
            kwargs: Kwargs::new(),
        },
        Node::Index(None) => DirectiveCall::compact("index"),
        Node::Index(Some(name)) => {
            let mut path = Path::root();
            path.push_key(name);
            DirectiveCall {
                name: CompactString::from("index"),
                args: [Argument::Ident(path)].into_iter().collect(),
                kwargs: Kwargs::new(),
            }
        }
        Node::Uuid => DirectiveCall::compact("uuid"),
        Node::Date(None) => DirectiveCall::compact("date"),
        Node::Date(Some(format)) => DirectiveCall {
            name: CompactString::from("date"),
            args: [Argument::Literal(Value::String(format.clone()))]
                .into_iter()
                .collect(),
            kwargs: Kwargs::new(),
        },
        _ => return None,
    };
    Some(call.to_string())
}

fn scalar_argument(node: &Node) -> Option<Argument> {
    match node {
        Node::Lit(value) if !matches!(value, Value::Seq(_) | Value::Map(_) | Value::Opaque(_)) => {
            Some(Argument::Literal(value.clone()))
        }
        _ => None,
    }
}

fn extended(name: &str, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Value {
    let mut map = Map::new();
    map.insert("$directive".to_string(), Value::String(name.to_string()));
    map.insert("$args".to_string(), Value::Seq(args));
    map.insert("$kwargs".to_string(), Value::Map(kwargs.into_iter().collect()));
    Value::Map(map)
}

fn extended_var(var: &Var) -> Value {
    let mut kwargs = Vec::new();
    if let Some(default) = &var.default {
        kwargs.push(("default".to_string(), unparse(default)));
    }
    if var.env {
        kwargs.push(("env".to_string(), Value::Bool(true)));
    }
    extended(
        "var",
        vec![Value::String(var.id.to_string())],
        kwargs,
    )
}

fn special_invocation(key: &str, invocation: &Invocation) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), unparse(&invocation.symbol));
    map.insert(
        "$args".to_string(),
        Value::Map(unparse_entries(&invocation.args)),
    );
    Value::Map(map)
}

fn special_for(for_node: &For) -> Value {
    let key = match &for_node.id {
        LoopId::Named(name) => format!("$for({}, {name})", for_node.iterable),
        LoopId::Auto(_) => format!("$for({})", for_node.iterable),
    };
    let mut map = Map::new();
    map.insert(key, unparse(&for_node.body));
    Value::Map(map)
}
