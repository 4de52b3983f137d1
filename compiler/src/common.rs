//! Common types and utilities used throughout the compiler

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Source span (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Half-open containment check: `start <= offset < end`.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Index of a node in a source unit's AST arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A (line, column) pair exceeded the buffer it was resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("position {line}:{column} is out of bounds")]
pub struct OutOfBounds {
    pub line: usize,
    pub column: usize,
}

/// Resolve a zero-indexed (line, column) pair to a byte offset.
///
/// Lines are delimited by `\n`; a `\r\n` sequence counts as a single break,
/// with the `\r` belonging to the line it terminates. Columns are byte
/// offsets within the line and may point one past its last character.
pub fn translate_position(text: &str, line: usize, column: usize) -> Result<usize, OutOfBounds> {
    let mut line_start = 0usize;
    for _ in 0..line {
        match text[line_start..].find('\n') {
            Some(i) => line_start += i + 1,
            None => return Err(OutOfBounds { line, column }),
        }
    }
    let line_end = text[line_start..]
        .find('\n')
        .map(|i| line_start + i)
        .unwrap_or(text.len());
    if column > line_end - line_start {
        return Err(OutOfBounds { line, column });
    }
    Ok(line_start + column)
}

/// Inverse of [`translate_position`]: byte offset to zero-indexed
/// (line, column). Offsets past the end of the buffer are clamped.
pub fn position_at(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = &text[..offset];
    let line = before.bytes().filter(|&b| b == b'\n').count();
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    (line, offset - line_start)
}

/// Splice `replacement` into the half-open byte interval `[start, end)`.
pub fn apply_range_replace(buf: &mut String, start: usize, end: usize, replacement: &str) {
    buf.replace_range(start..end, replacement);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let s1 = Span::new(5, 10);
        let s2 = Span::new(8, 15);
        let merged = s1.merge(s2);
        assert_eq!(merged.start, 5);
        assert_eq!(merged.end, 15);
    }

    #[test]
    fn test_translate_position() {
        let text = "line 1\nline 2\nline 3";
        assert_eq!(translate_position(text, 0, 0), Ok(0));
        assert_eq!(translate_position(text, 0, 6), Ok(6));
        assert_eq!(translate_position(text, 1, 0), Ok(7));
        assert_eq!(translate_position(text, 2, 6), Ok(20));
        assert!(translate_position(text, 0, 7).is_err());
        assert!(translate_position(text, 3, 0).is_err());
    }

    #[test]
    fn test_translate_position_crlf() {
        let text = "ab\r\ncd";
        // The `\r` belongs to line 0; `\r\n` is a single break.
        assert_eq!(translate_position(text, 1, 0), Ok(4));
        assert_eq!(translate_position(text, 0, 2), Ok(2));
        assert_eq!(translate_position(text, 1, 2), Ok(6));
    }

    #[test]
    fn test_position_roundtrip() {
        let text = "contract C {\n    let x: u256;\n}\n";
        for offset in 0..=text.len() {
            let (line, column) = position_at(text, offset);
            assert_eq!(translate_position(text, line, column), Ok(offset));
        }
    }

    #[test]
    fn test_apply_range_replace() {
        let mut buf = String::from("hello world");
        apply_range_replace(&mut buf, 6, 11, "sable");
        assert_eq!(buf, "hello sable");

        // Replacing a slice with itself is the identity.
        let before = buf.clone();
        apply_range_replace(&mut buf, 0, 5, "hello");
        assert_eq!(buf, before);
    }
}
