//! Shared protocol types and conversions
//!
//! LSP positions, ranges, file URIs, and the span-to-range translation the
//! query handlers share. Columns are byte offsets within a line.

use crate::common::{position_at, Span};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Zero-indexed line/column pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// A cursor position within one document
#[derive(Debug, Clone)]
pub struct DocumentPosition {
    /// Canonical path (base-path prefix stripped)
    pub path: String,
    pub position: Position,
}

/// Extract the path from a `file://` URI. Any other scheme is rejected.
pub fn path_from_file_uri(uri: &str) -> Option<String> {
    uri.strip_prefix("file://").map(str::to_string)
}

pub fn to_file_uri(base: &Path, path: &str) -> String {
    let base = base.to_string_lossy();
    if base.is_empty() {
        format!("file://{path}")
    } else if path.starts_with('/') || base.ends_with('/') {
        format!("file://{base}{path}")
    } else {
        format!("file://{base}/{path}")
    }
}

/// Canonicalize a path for keying: strip the base-path prefix when present,
/// otherwise keep the absolute path verbatim.
pub fn strip_base_path(base: &Path, path: &str) -> String {
    let base = base.to_string_lossy();
    if !base.is_empty() && path.starts_with(base.as_ref()) {
        path[base.len()..].to_string()
    } else {
        path.to_string()
    }
}

/// Convert a byte span to an LSP range against `text`, clamping offsets to
/// the buffer bounds.
pub fn span_to_range(text: &str, span: Span) -> Range {
    let (start_line, start_col) = position_at(text, span.start);
    let (end_line, end_col) = position_at(text, span.end);
    Range {
        start: Position {
            line: start_line as u32,
            character: start_col as u32,
        },
        end: Position {
            line: end_line as u32,
            character: end_col as u32,
        },
    }
}

pub fn position_from_json(value: &Value) -> Option<Position> {
    Some(Position {
        line: u32::try_from(value.get("line")?.as_u64()?).ok()?,
        character: u32::try_from(value.get("character")?.as_u64()?).ok()?,
    })
}

pub fn range_from_json(value: &Value) -> Option<Range> {
    Some(Range {
        start: position_from_json(value.get("start")?)?,
        end: position_from_json(value.get("end")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_file_uri_roundtrip() {
        let base = PathBuf::from("/tmp/p");
        assert_eq!(
            path_from_file_uri("file:///tmp/p/a.sbl").as_deref(),
            Some("/tmp/p/a.sbl")
        );
        assert_eq!(path_from_file_uri("untitled:one"), None);
        assert_eq!(strip_base_path(&base, "/tmp/p/a.sbl"), "/a.sbl");
        assert_eq!(strip_base_path(&base, "/other/a.sbl"), "/other/a.sbl");
        assert_eq!(to_file_uri(&base, "/a.sbl"), "file:///tmp/p/a.sbl");
    }

    #[test]
    fn test_span_to_range_clamps() {
        let text = "ab\ncd";
        let range = span_to_range(text, Span::new(3, 99));
        assert_eq!(range.start, Position { line: 1, character: 0 });
        assert_eq!(range.end, Position { line: 1, character: 2 });
    }

    #[test]
    fn test_position_from_json() {
        let position = position_from_json(&json!({"line": 3, "character": 8})).unwrap();
        assert_eq!(position, Position { line: 3, character: 8 });
        assert!(position_from_json(&json!({"line": -1, "character": 0})).is_none());
        assert!(position_from_json(&json!({"line": 0})).is_none());
    }
}
