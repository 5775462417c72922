use std::fmt::{self, Display, Formatter};

use compact_str::CompactString;
use thiserror::Error;

use crate::value::{Map, Value};

#[derive(Error, Debug, PartialEq, Clone)]
#[error("`{0}` is not a valid dotted identifier")]
pub struct InvalidPath(pub String);

/// One step of a [`Path`]: a map key or a sequence position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Key(CompactString),
    Index(usize),
}

/// A dotted access path over a [`Value`] tree.
///
/// Doubles as the identifier type of directives (`color.hue`) and as the
/// location attached to errors (`params.layers[2]`). Lookup never fails: a
/// missing intermediate is simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Path(Vec<Segment>);

/// Checks a single identifier component: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a dotted path. Identifier components become keys, all-digit
    /// components become sequence indices.
    pub fn parse(text: &str) -> Result<Self, InvalidPath> {
        let mut segments = Vec::new();
        for component in text.split('.') {
            if is_identifier(component) {
                segments.push(Segment::Key(CompactString::from(component)));
            } else if !component.is_empty() && component.bytes().all(|b| b.is_ascii_digit()) {
                let index = component
                    .parse()
                    .map_err(|_| InvalidPath(text.to_string()))?;
                segments.push(Segment::Index(index));
            } else {
                return Err(InvalidPath(text.to_string()));
            }
        }
        if segments.is_empty() {
            return Err(InvalidPath(text.to_string()));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Leading key component, if the path starts with one.
    pub fn head_key(&self) -> Option<&str> {
        match self.0.first() {
            Some(Segment::Key(key)) => Some(key.as_str()),
            _ => None,
        }
    }

    /// The path without its first segment.
    pub fn tail(&self) -> &[Segment] {
        match self.0.split_first() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn push_key(&mut self, key: &str) {
        self.0.push(Segment::Key(CompactString::from(key)));
    }

    pub fn push_index(&mut self, index: usize) {
        self.0.push(Segment::Index(index));
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }

    /// Looks the path up in `root`, descending maps by key and sequences by
    /// position. Key segments that look numeric also address sequences.
    pub fn get<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        get_in(root, &self.0)
    }
}

pub(crate) fn get_in<'a>(root: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match (current, segment) {
            (Value::Map(map), Segment::Key(key)) => map.get(key.as_str())?,
            (Value::Seq(items), Segment::Index(index)) => items.get(*index)?,
            (Value::Seq(items), Segment::Key(key)) => {
                items.get(key.parse::<usize>().ok()?)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Deep-sets `value` at `path`, creating intermediate maps as needed.
/// Existing non-map intermediates are replaced.
pub(crate) fn set_in(root: &mut Value, path: &Path, value: Value) {
    let mut current = root;
    let (last, init) = match path.0.split_last() {
        Some(pair) => pair,
        None => return,
    };
    for segment in init {
        let key = segment_key(segment);
        if !matches!(current, Value::Map(_)) {
            *current = Value::Map(Map::new());
        }
        let Value::Map(map) = current else {
            unreachable!("just replaced with a map")
        };
        current = map
            .entry(key)
            .or_insert_with(|| Value::Map(Map::new()));
    }
    if !matches!(current, Value::Map(_)) {
        *current = Value::Map(Map::new());
    }
    if let Value::Map(map) = current {
        map.insert(segment_key(last), value);
    }
}

fn segment_key(segment: &Segment) -> String {
    match segment {
        Segment::Key(key) => key.to_string(),
        Segment::Index(index) => index.to_string(),
    }
}

/// Flattens a tree into `(path, leaf)` pairs in insertion order. Empty
/// containers count as leaves.
pub fn walk(root: &Value) -> Vec<(Path, &Value)> {
    let mut out = Vec::new();
    walk_into(root, &mut Path::root(), &mut out);
    out
}

fn walk_into<'a>(value: &'a Value, at: &mut Path, out: &mut Vec<(Path, &'a Value)>) {
    match value {
        Value::Map(map) if !map.is_empty() => {
            for (key, child) in map {
                at.push_key(key);
                walk_into(child, at, out);
                at.pop();
            }
        }
        Value::Seq(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                at.push_index(index);
                walk_into(child, at, out);
                at.pop();
            }
        }
        leaf => out.push((at.clone(), leaf)),
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "$");
        }
        for (position, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if position == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
