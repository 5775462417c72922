use compact_str::CompactString;

use super::error::ParseError;
use super::node::{BodyMode, Entries, For, Invocation, LoopId, Node, Var};
use crate::error::{Error, InnerError};
use crate::lexer::{
    self,
    token::{Argument, DirectiveCall, Span, Token, TokenKind},
};
use crate::path::{is_identifier, Path, Segment};
use crate::value::{Map, Value};

/// Directive names that only exist as special map keys.
const SPECIAL_NAMES: [&str; 3] = ["call", "model", "for"];

/// Compiles a raw data tree into a template [`Node`].
///
/// The compiler walks the tree once, recognizing directives in strings and
/// the extended/special map forms, and tracks its position so errors point
/// at the offending node.
pub struct Compiler {
    at: Path,
    loops: u64,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            at: Path::root(),
            loops: 0,
        }
    }

    pub fn compile(&mut self, tree: &Value) -> Result<Node, Error> {
        self.compile_value(tree)
    }

    fn compile_value(&mut self, value: &Value) -> Result<Node, Error> {
        match value {
            Value::String(s) => self.compile_str(s),
            Value::Map(map) => self.compile_map(map),
            Value::Seq(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    self.at.push_index(index);
                    let node = self.compile_value(item)?;
                    self.at.pop();
                    nodes.push(node);
                }
                Ok(Node::Seq(nodes))
            }
            scalar => Ok(Node::Lit(scalar.clone())),
        }
    }

    fn compile_str(&mut self, source: &str) -> Result<Node, Error> {
        let tokens = lexer::tokenize(source).map_err(|e| {
            let span = e.span();
            self.located(InnerError::Lexer(e), source, span)
        })?;

        if tokens.is_empty() {
            return Ok(Node::Lit(Value::String(String::new())));
        }

        let mut parts = Vec::with_capacity(tokens.len());
        for token in tokens {
            let Token { kind, span } = token;
            let part = match kind {
                TokenKind::Plain(text) => Node::Lit(Value::String(text)),
                TokenKind::Directive(call) => self
                    .build_directive(call)
                    .map_err(|e| self.located(InnerError::Parse(e), source, span))?,
            };
            parts.push(part);
        }

        if parts.len() == 1 {
            match parts.pop() {
                Some(node) => Ok(node),
                None => unreachable!("a single part was just pushed"),
            }
        } else {
            Ok(Node::Bundle(parts))
        }
    }

    fn compile_map(&mut self, map: &Map) -> Result<Node, Error> {
        // A key whose whole text is one directive token drives form
        // detection; everything else is an ordinary key.
        let mut directive_keys = Vec::new();
        for key in map.keys() {
            let tokens = lexer::tokenize(key).map_err(|e| {
                let span = e.span();
                self.located(InnerError::Lexer(e), key, span)
            })?;
            if let [Token {
                kind: TokenKind::Directive(call),
                ..
            }] = &tokens[..]
            {
                directive_keys.push((key.as_str(), call.clone()));
            }
        }

        if directive_keys.iter().any(|(_, c)| c.name == "directive") {
            return self.compile_extended(map);
        }

        let special: Vec<(&str, &DirectiveCall)> = directive_keys
            .iter()
            .filter(|(_, c)| SPECIAL_NAMES.contains(&c.name.as_str()))
            .map(|(k, c)| (*k, c))
            .collect();
        if special.len() > 1 {
            return Err(self.here(ParseError::MixedSpecialKeys(
                special[0].0.to_string(),
                special[1].0.to_string(),
            )));
        }
        if let Some((key, call)) = special.first().copied() {
            let call = call.clone();
            return match call.name.as_str() {
                "for" => self.compile_for(map, key, call),
                _ => self.compile_invocation(map, key, call),
            };
        }

        let mut entries = Entries::new();
        for (key, value) in map {
            self.at.push_key(key);
            let key_node = self.compile_str(key)?;
            let value_node = self.compile_value(value)?;
            self.at.pop();
            entries.push((key_node, value_node));
        }
        Ok(Node::Map(entries))
    }

    /// `{$directive: NAME, $args: [...], $kwargs: {...}}` — the only form
    /// where directive arguments may be arbitrary sub-trees.
    fn compile_extended(&mut self, map: &Map) -> Result<Node, Error> {
        let mut name = None;
        let mut raw_args = None;
        let mut raw_kwargs = None;

        for (key, value) in map {
            let field = match extended_field(key) {
                Some(field) => field,
                None => {
                    return Err(self.here(ParseError::form(
                        "directive",
                        format!("form allows only `$args` and `$kwargs` beside `$directive`, got `{key}`"),
                    )));
                }
            };
            match field {
                "directive" => name = Some(value),
                "args" => raw_args = Some(value),
                "kwargs" => raw_kwargs = Some(value),
                _ => unreachable!("extended_field returns a fixed set"),
            }
        }

        let name = match name {
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(self.here(ParseError::form(
                    "directive",
                    format!("name must be a string, got {}", other.kind()),
                )));
            }
            None => unreachable!("caller checked the `$directive` key"),
        };

        let mut args = Vec::new();
        match raw_args {
            None => {}
            Some(Value::Seq(items)) => {
                self.at.push_key("$args");
                for (index, item) in items.iter().enumerate() {
                    self.at.push_index(index);
                    let node = self.compile_value(item)?;
                    self.at.pop();
                    args.push(DirArg::Node(node));
                }
                self.at.pop();
            }
            Some(other) => {
                return Err(self.here(ParseError::form(
                    "directive",
                    format!("`$args` must be a sequence, got {}", other.kind()),
                )));
            }
        }

        let mut kwargs = Vec::new();
        match raw_kwargs {
            None => {}
            Some(Value::Map(entries)) => {
                self.at.push_key("$kwargs");
                for (key, value) in entries {
                    if !is_identifier(key) {
                        self.at.pop();
                        return Err(self.here(ParseError::BadIdentifier(key.clone())));
                    }
                    self.at.push_key(key);
                    let node = self.compile_value(value)?;
                    self.at.pop();
                    kwargs.push((CompactString::from(key.as_str()), DirArg::Node(node)));
                }
                self.at.pop();
            }
            Some(other) => {
                return Err(self.here(ParseError::form(
                    "directive",
                    format!("`$kwargs` must be a map, got {}", other.kind()),
                )));
            }
        }

        self.build_named(&name, args, kwargs)
            .map_err(|e| self.here(e))
    }

    /// `{$call: SYMBOL, $args: {...}}` and the `$model` twin.
    fn compile_invocation(
        &mut self,
        map: &Map,
        key: &str,
        call: DirectiveCall,
    ) -> Result<Node, Error> {
        let name = call.name.as_str();
        if !call.is_compact() {
            return Err(self.here(ParseError::form(name, "takes no arguments in key position")));
        }

        let mut args_value = None;
        for sibling in map.keys() {
            if sibling.as_str() == key {
                continue;
            }
            if extended_field(sibling) == Some("args") {
                args_value = Some(&map[sibling]);
            } else {
                return Err(self.here(ParseError::form(
                    name,
                    format!("allows only a sibling `$args` key, got `{sibling}`"),
                )));
            }
        }

        self.at.push_key(key);
        let symbol = self.compile_value(&map[key])?;
        self.at.pop();

        let mut args = Entries::new();
        match args_value {
            None => {}
            Some(Value::Map(entries)) => {
                self.at.push_key("$args");
                for (arg_key, arg_value) in entries {
                    self.at.push_key(arg_key);
                    let key_node = self.compile_str(arg_key)?;
                    let value_node = self.compile_value(arg_value)?;
                    self.at.pop();
                    args.push((key_node, value_node));
                }
                self.at.pop();
            }
            Some(other) => {
                return Err(self.here(ParseError::form(
                    name,
                    format!("`$args` must be a map, got {}", other.kind()),
                )));
            }
        }

        let invocation = Invocation {
            symbol: Box::new(symbol),
            args,
        };
        Ok(match name {
            "model" => Node::Model(invocation),
            _ => Node::Call(invocation),
        })
    }

    /// `{$for(ITERABLE[, ID]): BODY}` — must be the map's only key.
    fn compile_for(&mut self, map: &Map, key: &str, call: DirectiveCall) -> Result<Node, Error> {
        if map.len() != 1 {
            return Err(self.here(ParseError::form("for", "must be the only key of its map")));
        }
        if !call.kwargs.is_empty() {
            return Err(self.here(ParseError::schema("for", "takes no keyword arguments")));
        }
        if call.args.is_empty() || call.args.len() > 2 {
            return Err(self.here(ParseError::schema(
                "for",
                "expects an iterable and an optional loop identifier",
            )));
        }

        let mut args = call.args.into_iter();
        let iterable = match args.next() {
            Some(argument) => DirArg::from(argument)
                .into_path("for")
                .map_err(|e| self.here(e))?,
            None => unreachable!("arity was just checked"),
        };
        let id = match args.next() {
            Some(argument) => {
                let path = DirArg::from(argument)
                    .into_path("for")
                    .map_err(|e| self.here(e))?;
                match path.segments() {
                    [Segment::Key(name)] => LoopId::Named(name.clone()),
                    _ => {
                        return Err(self.here(ParseError::schema(
                            "for",
                            "the loop identifier must be a single name",
                        )));
                    }
                }
            }
            None => {
                let id = LoopId::Auto(self.loops);
                self.loops += 1;
                id
            }
        };

        self.at.push_key(key);
        let body = self.compile_value(&map[key])?;
        self.at.pop();

        let mode = match &body {
            Node::Map(_) => BodyMode::Map,
            Node::Seq(_) => BodyMode::Seq,
            _ => BodyMode::Text,
        };

        Ok(Node::For(For {
            iterable,
            id,
            body: Box::new(body),
            mode,
        }))
    }

    fn build_directive(&mut self, call: DirectiveCall) -> Result<Node, ParseError> {
        let DirectiveCall { name, args, kwargs } = call;
        let args = args.into_iter().map(DirArg::from).collect();
        let kwargs = kwargs
            .into_iter()
            .map(|(k, a)| (k, DirArg::from(a)))
            .collect();
        self.build_named(&name, args, kwargs)
    }

    fn build_named(
        &mut self,
        name: &str,
        args: Vec<DirArg>,
        kwargs: Vec<(CompactString, DirArg)>,
    ) -> Result<Node, ParseError> {
        match name {
            "var" => build_var(args, kwargs),
            "import" => build_import(args, kwargs),
            "sweep" => build_sweep(args, kwargs),
            "item" => build_item(args, kwargs),
            "index" => build_index(args, kwargs),
            "uuid" => build_uuid(args, kwargs),
            "date" => build_date(args, kwargs),
            special if SPECIAL_NAMES.contains(&special) => Err(ParseError::form(
                special,
                "is only valid as a special map key",
            )),
            unknown => Err(ParseError::UnknownDirective(CompactString::from(unknown))),
        }
    }

    fn here(&self, cause: ParseError) -> Error {
        Error::new(InnerError::Parse(cause), self.at.clone())
    }

    fn located(&self, cause: InnerError, source: &str, span: Span) -> Error {
        Error::new(cause, self.at.clone()).with_source(source, span)
    }
}

/// Returns the field name when `key` is a compact `$directive`, `$args` or
/// `$kwargs` key.
fn extended_field(key: &str) -> Option<&'static str> {
    match key {
        "$directive" => Some("directive"),
        "$args" => Some("args"),
        "$kwargs" => Some("kwargs"),
        _ => None,
    }
}

/// A directive argument after form normalization: call-form identifiers stay
/// identifiers, everything else is already a node.
enum DirArg {
    Ident(Path),
    Node(Node),
}

impl From<Argument> for DirArg {
    fn from(argument: Argument) -> Self {
        match argument {
            Argument::Ident(path) => DirArg::Ident(path),
            Argument::Literal(value) => DirArg::Node(Node::Lit(value)),
        }
    }
}

impl DirArg {
    /// In value position an identifier denotes its own dotted text.
    fn into_value_node(self) -> Node {
        match self {
            DirArg::Ident(path) => Node::Lit(Value::String(path.to_string())),
            DirArg::Node(node) => node,
        }
    }

    /// In identifier position both a bare identifier and a literal string
    /// are accepted; the text must match the dotted identifier shape.
    fn into_path(self, name: &str) -> Result<Path, ParseError> {
        let path = match self {
            DirArg::Ident(path) => path,
            DirArg::Node(Node::Lit(Value::String(s))) => {
                Path::parse(&s).map_err(|_| ParseError::BadIdentifier(s))?
            }
            DirArg::Node(_) => {
                return Err(ParseError::schema(name, "expects a dotted identifier"));
            }
        };
        if path.segments().iter().any(|s| matches!(s, Segment::Index(_))) {
            return Err(ParseError::BadIdentifier(path.to_string()));
        }
        Ok(path)
    }

    fn into_literal(self, name: &str) -> Result<Value, ParseError> {
        match self {
            DirArg::Ident(path) => Ok(Value::String(path.to_string())),
            DirArg::Node(Node::Lit(value)) => Ok(value),
            DirArg::Node(_) => Err(ParseError::schema(name, "expects a literal value")),
        }
    }
}

fn take_kwarg(kwargs: &mut Vec<(CompactString, DirArg)>, name: &str) -> Option<DirArg> {
    let position = kwargs.iter().position(|(k, _)| k == name)?;
    Some(kwargs.remove(position).1)
}

fn expect_no_kwargs(name: &str, kwargs: &[(CompactString, DirArg)]) -> Result<(), ParseError> {
    match kwargs.first() {
        None => Ok(()),
        Some((key, _)) => Err(ParseError::schema(
            name,
            format!("unknown keyword argument `{key}`"),
        )),
    }
}

fn build_var(
    args: Vec<DirArg>,
    mut kwargs: Vec<(CompactString, DirArg)>,
) -> Result<Node, ParseError> {
    let mut args = args.into_iter();
    let id = match (args.next(), args.next()) {
        (Some(argument), None) => argument.into_path("var")?,
        _ => return Err(ParseError::schema("var", "expects exactly one identifier")),
    };

    let default = take_kwarg(&mut kwargs, "default").map(|a| Box::new(a.into_value_node()));
    let env = match take_kwarg(&mut kwargs, "env") {
        None => false,
        Some(argument) => match argument.into_literal("var")? {
            Value::Bool(b) => b,
            other => {
                return Err(ParseError::schema(
                    "var",
                    format!("`env` must be a boolean, got {}", other.kind()),
                ));
            }
        },
    };
    expect_no_kwargs("var", &kwargs)?;

    Ok(Node::Var(Var { id, default, env }))
}

fn build_import(args: Vec<DirArg>, kwargs: Vec<(CompactString, DirArg)>) -> Result<Node, ParseError> {
    expect_no_kwargs("import", &kwargs)?;
    let mut args = args.into_iter();
    let path = match (args.next(), args.next()) {
        (Some(argument), None) => argument,
        _ => return Err(ParseError::schema("import", "expects exactly one path")),
    };
    if let DirArg::Node(Node::Lit(value)) = &path {
        if !matches!(value, Value::String(_)) {
            return Err(ParseError::schema(
                "import",
                format!("the path must be a string, got {}", value.kind()),
            ));
        }
    }
    Ok(Node::Import(Box::new(path.into_value_node())))
}

fn build_sweep(args: Vec<DirArg>, kwargs: Vec<(CompactString, DirArg)>) -> Result<Node, ParseError> {
    expect_no_kwargs("sweep", &kwargs)?;
    if args.is_empty() {
        return Err(ParseError::schema("sweep", "expects at least one option"));
    }
    Ok(Node::Sweep(
        args.into_iter().map(DirArg::into_value_node).collect(),
    ))
}

fn build_item(args: Vec<DirArg>, kwargs: Vec<(CompactString, DirArg)>) -> Result<Node, ParseError> {
    expect_no_kwargs("item", &kwargs)?;
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (None, _) => Ok(Node::Item(None)),
        (Some(argument), None) => Ok(Node::Item(Some(argument.into_path("item")?))),
        _ => Err(ParseError::schema("item", "expects at most one reference")),
    }
}

fn build_index(args: Vec<DirArg>, kwargs: Vec<(CompactString, DirArg)>) -> Result<Node, ParseError> {
    expect_no_kwargs("index", &kwargs)?;
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (None, _) => Ok(Node::Index(None)),
        (Some(argument), None) => {
            let path = argument.into_path("index")?;
            match path.segments() {
                [Segment::Key(name)] => Ok(Node::Index(Some(name.clone()))),
                _ => Err(ParseError::schema(
                    "index",
                    "expects a single loop identifier",
                )),
            }
        }
        _ => Err(ParseError::schema("index", "expects at most one reference")),
    }
}

fn build_uuid(args: Vec<DirArg>, kwargs: Vec<(CompactString, DirArg)>) -> Result<Node, ParseError> {
    expect_no_kwargs("uuid", &kwargs)?;
    if !args.is_empty() {
        return Err(ParseError::schema("uuid", "takes no arguments"));
    }
    Ok(Node::Uuid)
}

fn build_date(args: Vec<DirArg>, kwargs: Vec<(CompactString, DirArg)>) -> Result<Node, ParseError> {
    expect_no_kwargs("date", &kwargs)?;
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (None, _) => Ok(Node::Date(None)),
        (Some(argument), None) => match argument.into_literal("date")? {
            Value::String(format) => Ok(Node::Date(Some(format))),
            other => Err(ParseError::schema(
                "date",
                format!("the format must be a string, got {}", other.kind()),
            )),
        },
        _ => Err(ParseError::schema("date", "expects at most one format")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn compile(tree: serde_json::Value) -> Result<Node, Error> {
        Compiler::new().compile(&Value::from(tree))
    }

    fn parse_cause(result: Result<Node, Error>) -> ParseError {
        match result {
            Err(Error {
                cause: InnerError::Parse(cause),
                ..
            }) => cause,
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_scalars() {
        assert_eq!(compile(json!(10)).unwrap(), Node::Lit(Value::Int(10)));
        assert_eq!(
            compile(json!("hello")).unwrap(),
            Node::Lit(Value::String("hello".into()))
        );
        assert_eq!(compile(json!(null)).unwrap(), Node::Lit(Value::Null));
    }

    #[test]
    fn test_map_and_seq_structure() {
        let node = compile(json!({"a": [1, "b"]})).unwrap();
        assert_eq!(
            node,
            Node::Map(vec![(
                Node::Lit(Value::String("a".into())),
                Node::Seq(vec![
                    Node::Lit(Value::Int(1)),
                    Node::Lit(Value::String("b".into()))
                ]),
            )])
        );
    }

    #[test]
    fn test_var_directive() {
        let node = compile(json!("$var(color.hue, default='blue', env=True)")).unwrap();
        assert_eq!(
            node,
            Node::Var(Var {
                id: Path::parse("color.hue").unwrap(),
                default: Some(Box::new(Node::Lit(Value::String("blue".into())))),
                env: true,
            })
        );
    }

    #[test]
    fn test_sweep_idents_become_strings() {
        let node = compile(json!("$sweep(10, x, variable.x)")).unwrap();
        assert_eq!(
            node,
            Node::Sweep(vec![
                Node::Lit(Value::Int(10)),
                Node::Lit(Value::String("x".into())),
                Node::Lit(Value::String("variable.x".into())),
            ])
        );
    }

    #[test]
    fn test_bundle() {
        let node = compile(json!("a $var(x) b")).unwrap();
        let Node::Bundle(parts) = node else {
            panic!("expected a bundle");
        };
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn test_directive_in_key() {
        let node = compile(json!({"$var(x)": 1})).unwrap();
        let Node::Map(entries) = node else {
            panic!("expected a map");
        };
        assert!(matches!(entries[0].0, Node::Var(_)));
    }

    #[test]
    fn test_extended_form() {
        let node = compile(json!({
            "$directive": "sweep",
            "$args": [{"alpha": 1}, "$var(x)"],
            "$kwargs": {},
        }))
        .unwrap();
        let Node::Sweep(options) = node else {
            panic!("expected a sweep");
        };
        assert!(matches!(options[0], Node::Map(_)));
        assert!(matches!(options[1], Node::Var(_)));
    }

    #[test]
    fn test_extended_form_defaults() {
        let node = compile(json!({"$directive": "item"})).unwrap();
        assert_eq!(node, Node::Item(None));
    }

    #[test]
    fn test_extended_var_with_string_id() {
        let node = compile(json!({"$directive": "var", "$args": ["color.hue"]})).unwrap();
        assert_eq!(
            node,
            Node::Var(Var {
                id: Path::parse("color.hue").unwrap(),
                default: None,
                env: false,
            })
        );
    }

    #[test]
    fn test_call_form() {
        let node = compile(json!({"$call": "pkg.make", "$args": {"a": 1}})).unwrap();
        let Node::Call(invocation) = node else {
            panic!("expected a call");
        };
        assert_eq!(
            *invocation.symbol,
            Node::Lit(Value::String("pkg.make".into()))
        );
        assert_eq!(invocation.args.len(), 1);
    }

    #[test]
    fn test_model_form() {
        let node = compile(json!({"$model": "cfg.Net", "$args": {}})).unwrap();
        assert!(matches!(node, Node::Model(_)));
    }

    #[test]
    fn test_for_form() {
        let node = compile(json!({"$for(params.layers, x)": {"k_$index(x)": "$item(x)"}})).unwrap();
        let Node::For(for_node) = node else {
            panic!("expected a for node");
        };
        assert_eq!(for_node.iterable, Path::parse("params.layers").unwrap());
        assert_eq!(for_node.id, LoopId::Named("x".into()));
        assert_eq!(for_node.mode, BodyMode::Map);
    }

    #[test]
    fn test_for_auto_id_and_text_mode() {
        let node = compile(json!({"$for(xs)": "$index."})).unwrap();
        let Node::For(for_node) = node else {
            panic!("expected a for node");
        };
        assert_eq!(for_node.id, LoopId::Auto(0));
        assert_eq!(for_node.mode, BodyMode::Text);
    }

    #[rstest]
    #[case(json!("$frobnicate(1)"))]
    #[case(json!({"$directive": "frobnicate"}))]
    fn test_unknown_directive(#[case] tree: serde_json::Value) {
        assert!(matches!(
            parse_cause(compile(tree)),
            ParseError::UnknownDirective(_)
        ));
    }

    #[rstest]
    #[case(json!("$for(xs)"))]
    #[case(json!("$call"))]
    #[case(json!({"$for(xs)": [], "other": 1}))]
    #[case(json!({"$call": "pkg.make", "extra": 1}))]
    #[case(json!({"$directive": "var", "$args": ["x"], "stray": 1}))]
    fn test_bad_directive_form(#[case] tree: serde_json::Value) {
        assert!(matches!(
            parse_cause(compile(tree)),
            ParseError::BadDirectiveForm { .. }
        ));
    }

    #[test]
    fn test_mixed_special_keys() {
        let result = compile(json!({"$call": "a", "$model": "b"}));
        assert!(matches!(
            parse_cause(result),
            ParseError::MixedSpecialKeys(_, _)
        ));
    }

    #[rstest]
    #[case(json!("$var()"))]
    #[case(json!("$var(a, b)"))]
    #[case(json!("$var(a, env=3)"))]
    #[case(json!("$var(a, color='red')"))]
    #[case(json!("$import(10)"))]
    #[case(json!("$sweep()"))]
    #[case(json!("$index(a.b)"))]
    #[case(json!("$uuid(1)"))]
    fn test_bad_argument_schema(#[case] tree: serde_json::Value) {
        assert!(matches!(
            parse_cause(compile(tree)),
            ParseError::BadArgumentSchema { .. }
        ));
    }

    #[rstest]
    #[case(json!(10), 1)]
    #[case(json!("$var(x)"), 1)]
    #[case(json!("$var(x, default='y')"), 2)]
    #[case(json!({"a": [1, "$sweep(1, 2)"]}), 7)]
    #[case(json!({"$for(xs, x)": ["$item(x)"]}), 3)]
    #[case(json!({"$call": "pkg.fn", "$args": {"a": 1}}), 4)]
    fn test_node_count(#[case] tree: serde_json::Value, #[case] expected: usize) {
        assert_eq!(compile(tree).unwrap().count(), expected);
    }

    #[test]
    fn test_error_location_path() {
        let result = compile(json!({"outer": {"inner": ["ok", "$var()"]}}));
        let error = result.unwrap_err();
        assert_eq!(error.location.to_string(), "outer.inner[1]");
    }

    #[test]
    fn test_compact_var_is_schema_error() {
        assert!(matches!(
            parse_cause(compile(json!("$var"))),
            ParseError::BadArgumentSchema { .. }
        ));
    }
}
