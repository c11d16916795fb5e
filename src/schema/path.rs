//! Compiled path expressions.
//!
//! Columns address values with a JSONPath-style expression that is compiled
//! once when the schema is built and then evaluated against each document
//! node. The supported subset:
//!
//! - optional `$` root anchor
//! - dot keys: `a.b.c`
//! - bracket keys: `['spaced key']` or `["spaced key"]`
//! - numeric indices: `[0]`
//! - wildcards: `[*]` or `.*` (array elements or object member values)
//! - recursive descent: `..key`
//!
//! A path that matches nothing yields an empty list; callers never see a
//! "missing" distinct from "no matches".

use serde_json::Value;
use thiserror::Error;

/// Errors produced while compiling a path expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty path expression")]
    Empty,

    #[error("unterminated `[` at offset {0}")]
    UnterminatedBracket(usize),

    #[error("invalid bracket segment `[{0}]`")]
    InvalidBracket(String),

    #[error("empty key at offset {0}")]
    EmptyKey(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Object member by name.
    Key(String),
    /// Array element by position.
    Index(usize),
    /// Every array element or object member value.
    Wildcard,
    /// `..key`: the named member of any object at any depth, document order.
    Descendant(String),
}

/// A parsed, ready-to-evaluate path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPath {
    raw: String,
    segments: Vec<Segment>,
}

impl CompiledPath {
    /// Compile a path expression.
    pub fn parse(raw: &str) -> Result<CompiledPath, PathError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }

        let bytes = trimmed.as_bytes();
        let mut segments = Vec::new();
        let mut i = 0;

        if bytes[0] == b'$' {
            i = 1;
        }

        while i < bytes.len() {
            match bytes[i] {
                b'.' => {
                    if bytes.get(i + 1) == Some(&b'.') {
                        let (key, next) = read_key(trimmed, i + 2)?;
                        segments.push(Segment::Descendant(key));
                        i = next;
                    } else if bytes.get(i + 1) == Some(&b'*') {
                        segments.push(Segment::Wildcard);
                        i += 2;
                    } else {
                        let (key, next) = read_key(trimmed, i + 1)?;
                        segments.push(Segment::Key(key));
                        i = next;
                    }
                }
                b'[' => {
                    let close = trimmed[i..]
                        .find(']')
                        .map(|off| i + off)
                        .ok_or(PathError::UnterminatedBracket(i))?;
                    let inner = trimmed[i + 1..close].trim();
                    segments.push(parse_bracket(inner)?);
                    i = close + 1;
                }
                // A bare key is only reachable at the start of the
                // expression (or right after `$`); later keys always follow
                // a `.` or a bracket.
                _ => {
                    let (key, next) = read_key(trimmed, i)?;
                    if key == "*" {
                        segments.push(Segment::Wildcard);
                    } else {
                        segments.push(Segment::Key(key));
                    }
                    i = next;
                }
            }
        }

        Ok(CompiledPath {
            raw: trimmed.to_string(),
            segments,
        })
    }

    /// The expression this path was compiled from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Evaluate against a node, returning matches in document order.
    pub fn select<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![root];
        for segment in &self.segments {
            let mut next = Vec::new();
            for node in current {
                match segment {
                    Segment::Key(key) => {
                        if let Value::Object(map) = node {
                            if let Some(value) = map.get(key) {
                                next.push(value);
                            }
                        }
                    }
                    Segment::Index(idx) => {
                        if let Value::Array(items) = node {
                            if let Some(value) = items.get(*idx) {
                                next.push(value);
                            }
                        }
                    }
                    Segment::Wildcard => match node {
                        Value::Array(items) => next.extend(items.iter()),
                        Value::Object(map) => next.extend(map.values()),
                        _ => {}
                    },
                    Segment::Descendant(key) => descend(node, key, &mut next),
                }
            }
            current = next;
        }
        current
    }
}

fn parse_bracket(inner: &str) -> Result<Segment, PathError> {
    if inner == "*" {
        return Ok(Segment::Wildcard);
    }
    if (inner.starts_with('\'') && inner.ends_with('\'') && inner.len() >= 2)
        || (inner.starts_with('"') && inner.ends_with('"') && inner.len() >= 2)
    {
        let key = &inner[1..inner.len() - 1];
        if key.is_empty() {
            return Err(PathError::InvalidBracket(inner.to_string()));
        }
        return Ok(Segment::Key(key.to_string()));
    }
    inner
        .parse::<usize>()
        .map(Segment::Index)
        .map_err(|_| PathError::InvalidBracket(inner.to_string()))
}

/// Consume a key starting at `start`, stopping at `.` or `[`.
fn read_key(path: &str, start: usize) -> Result<(String, usize), PathError> {
    let rest = &path[start..];
    let end = rest
        .find(|c| c == '.' || c == '[')
        .map(|off| start + off)
        .unwrap_or(path.len());
    if end == start {
        return Err(PathError::EmptyKey(start));
    }
    Ok((path[start..end].to_string(), end))
}

/// Depth-first collection for `..key`. A matched value's own subtree is
/// still searched, so repeated keys at different depths all match.
fn descend<'a>(node: &'a Value, key: &str, out: &mut Vec<&'a Value>) {
    match node {
        Value::Object(map) => {
            if let Some(value) = map.get(key) {
                out.push(value);
            }
            for value in map.values() {
                descend(value, key, out);
            }
        }
        Value::Array(items) => {
            for value in items {
                descend(value, key, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn select_owned(path: &str, doc: &Value) -> Vec<Value> {
        CompiledPath::parse(path)
            .unwrap()
            .select(doc)
            .into_iter()
            .cloned()
            .collect()
    }

    #[test]
    fn test_dot_keys() {
        let doc = json!({"a": {"b": {"c": 42}}});
        assert_eq!(select_owned("a.b.c", &doc), vec![json!(42)]);
        assert_eq!(select_owned("$.a.b.c", &doc), vec![json!(42)]);
    }

    #[test]
    fn test_array_wildcard() {
        let doc = json!({"b": [1, 2, 3]});
        assert_eq!(select_owned("b[*]", &doc), vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_index() {
        let doc = json!([10, 20, 30]);
        assert_eq!(select_owned("[1]", &doc), vec![json!(20)]);
        assert_eq!(select_owned("[9]", &doc), Vec::<Value>::new());
    }

    #[test]
    fn test_bracket_key() {
        let doc = json!({"spaced key": 1, "q": 2});
        assert_eq!(select_owned("['spaced key']", &doc), vec![json!(1)]);
        assert_eq!(select_owned("[\"q\"]", &doc), vec![json!(2)]);
    }

    #[test]
    fn test_object_wildcard() {
        let doc = json!({"a": {"x": 1, "y": 2}});
        assert_eq!(select_owned("a.*", &doc), vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_recursive_descent() {
        let doc = json!({"a": {"b": 1}, "c": [{"b": 2}, {"d": {"b": 3}}]});
        assert_eq!(
            select_owned("..b", &doc),
            vec![json!(1), json!(2), json!(3)]
        );
    }

    #[test]
    fn test_missing_path_is_empty() {
        let doc = json!({"a": 1});
        assert_eq!(select_owned("b", &doc), Vec::<Value>::new());
        assert_eq!(select_owned("a.b.c", &doc), Vec::<Value>::new());
    }

    #[test]
    fn test_key_on_non_object_is_empty() {
        let doc = json!([1, 2]);
        assert_eq!(select_owned("foo", &doc), Vec::<Value>::new());
        assert_eq!(select_owned("foo", &json!(5)), Vec::<Value>::new());
    }

    #[test]
    fn test_root_only() {
        let doc = json!({"a": 1});
        assert_eq!(select_owned("$", &doc), vec![doc.clone()]);
    }

    #[test]
    fn test_null_member_matches() {
        let doc = json!({"a": null});
        assert_eq!(select_owned("a", &doc), vec![Value::Null]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(CompiledPath::parse("  "), Err(PathError::Empty));
        assert!(matches!(
            CompiledPath::parse("a["),
            Err(PathError::UnterminatedBracket(_))
        ));
        assert!(matches!(
            CompiledPath::parse("a[x]"),
            Err(PathError::InvalidBracket(_))
        ));
        assert!(matches!(
            CompiledPath::parse("a."),
            Err(PathError::EmptyKey(_))
        ));
    }
}
