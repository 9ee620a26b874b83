//! Dot-notation lookups into JSON documents
//!
//! Paths look like `data.items[0].name`; a leading `$.` is accepted and
//! ignored.

use serde_json::Value;
use std::fmt;

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "'{}'", key),
            Segment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// Split a path into segments
///
/// ```rust
/// use herald_core::json_path::{parse, Segment};
///
/// assert_eq!(
///     parse("$.data.items[0]").unwrap(),
///     vec![
///         Segment::Key("data".into()),
///         Segment::Key("items".into()),
///         Segment::Index(0),
///     ]
/// );
/// ```
pub fn parse(path: &str) -> Result<Vec<Segment>, String> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    let path = if path == "$" { "" } else { path };

    let mut segments = Vec::new();
    for part in path.split('.').filter(|p| !p.is_empty()) {
        let (key, mut rest) = match part.find('[') {
            Some(open) => part.split_at(open),
            None => (part, ""),
        };
        if !key.is_empty() {
            segments.push(Segment::Key(key.to_string()));
        }
        while let Some(stripped) = rest.strip_prefix('[') {
            let close = stripped
                .find(']')
                .ok_or_else(|| format!("unclosed index in '{}'", part))?;
            let index = stripped[..close]
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid index '{}' in '{}'", &stripped[..close], part))?;
            segments.push(Segment::Index(index));
            rest = &stripped[close + 1..];
        }
        if !rest.is_empty() {
            return Err(format!("unexpected '{}' in '{}'", rest, part));
        }
    }
    Ok(segments)
}

/// Resolve a path against a document
pub fn resolve<'a>(value: &'a Value, path: &str) -> Result<&'a Value, String> {
    parse(path)?
        .into_iter()
        .try_fold(value, |current, segment| {
            let next = match &segment {
                Segment::Key(key) => current.as_object().and_then(|o| o.get(key)),
                Segment::Index(index) => current.as_array().and_then(|a| a.get(*index)),
            };
            next.ok_or_else(|| format!("{} not found at this level of '{}'", segment, path))
        })
}
