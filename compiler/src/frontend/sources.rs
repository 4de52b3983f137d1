//! Source text storage and import resolution
//!
//! The [`FileReader`] owns every source buffer the compiler sees: documents
//! pushed in by the language server and files pulled from disk to satisfy
//! imports. Import paths are rewritten through an ordered remapping table
//! before lookup.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// An import remapping rule, `[context:]prefix=target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remapping {
    /// Only imports issued from files under this prefix are rewritten
    pub context: Option<String>,
    pub prefix: String,
    pub target: String,
}

impl Remapping {
    /// Parse the `[context:]prefix=target` form. The prefix must be
    /// non-empty; everything else may be.
    pub fn parse(value: &str) -> Option<Remapping> {
        let (head, target) = value.split_once('=')?;
        let (context, prefix) = match head.split_once(':') {
            Some((context, prefix)) => (Some(context.to_string()), prefix),
            None => (None, head),
        };
        if prefix.is_empty() {
            return None;
        }
        Some(Remapping {
            context,
            prefix: prefix.to_string(),
            target: target.to_string(),
        })
    }

    fn applies_to(&self, context: &str, path: &str) -> bool {
        if let Some(required) = &self.context {
            if !context.starts_with(required.as_str()) {
                return false;
            }
        }
        path.starts_with(&self.prefix)
    }
}

/// Rewrite an import path through the remapping table. The applicable rule
/// with the longest prefix wins; without a match the path is returned
/// unchanged.
pub fn apply_remappings(remappings: &[Remapping], context: &str, path: &str) -> String {
    let mut best: Option<&Remapping> = None;
    for remapping in remappings {
        if !remapping.applies_to(context, path) {
            continue;
        }
        match best {
            Some(current) if current.prefix.len() >= remapping.prefix.len() => {}
            _ => best = Some(remapping),
        }
    }
    match best {
        Some(remapping) => format!("{}{}", remapping.target, &path[remapping.prefix.len()..]),
        None => path.to_string(),
    }
}

/// Mutable path-to-text mapping with a disk fallback anchored at a base
/// directory
#[derive(Debug, Clone, Default)]
pub struct FileReader {
    base_path: PathBuf,
    sources: BTreeMap<String, String>,
}

impl FileReader {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            sources: BTreeMap::new(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Insert or replace a source buffer.
    pub fn set_source(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.sources.insert(path.into(), text.into());
    }

    pub fn source(&self, path: &str) -> Option<&String> {
        self.sources.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.sources.contains_key(path)
    }

    /// All source buffers, keyed by canonical path.
    pub fn sources(&self) -> &BTreeMap<String, String> {
        &self.sources
    }

    /// Fetch a source, reading it from disk under the base path on a miss.
    /// Loaded files are cached so subsequent compiles see them as regular
    /// sources.
    pub fn read_source(&mut self, path: &str) -> io::Result<&String> {
        if !self.sources.contains_key(path) {
            let disk = self.base_path.join(path.trim_start_matches('/'));
            let text = std::fs::read_to_string(disk)?;
            self.sources.insert(path.to_string(), text);
        }
        Ok(&self.sources[path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remapping() {
        let r = Remapping::parse("lib/=vendor/lib/").unwrap();
        assert_eq!(r.context, None);
        assert_eq!(r.prefix, "lib/");
        assert_eq!(r.target, "vendor/lib/");

        let r = Remapping::parse("/src:lib/=vendor/").unwrap();
        assert_eq!(r.context.as_deref(), Some("/src"));

        assert!(Remapping::parse("noequals").is_none());
        assert!(Remapping::parse("=target/").is_none());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let remappings = vec![
            Remapping::parse("lib/=a/").unwrap(),
            Remapping::parse("lib/deep/=b/").unwrap(),
        ];
        assert_eq!(
            apply_remappings(&remappings, "/main.sbl", "lib/deep/x.sbl"),
            "b/x.sbl"
        );
        assert_eq!(
            apply_remappings(&remappings, "/main.sbl", "lib/x.sbl"),
            "a/x.sbl"
        );
        assert_eq!(
            apply_remappings(&remappings, "/main.sbl", "other/x.sbl"),
            "other/x.sbl"
        );
    }

    #[test]
    fn test_context_restricts_rule() {
        let remappings = vec![Remapping::parse("/src:lib/=vendor/").unwrap()];
        assert_eq!(
            apply_remappings(&remappings, "/src/main.sbl", "lib/x.sbl"),
            "vendor/x.sbl"
        );
        assert_eq!(
            apply_remappings(&remappings, "/test/main.sbl", "lib/x.sbl"),
            "lib/x.sbl"
        );
    }

    #[test]
    fn test_file_reader_set_and_get() {
        let mut reader = FileReader::new(PathBuf::from("/tmp/p"));
        reader.set_source("/a.sbl", "contract A {}");
        assert!(reader.contains("/a.sbl"));
        assert_eq!(reader.source("/a.sbl").unwrap(), "contract A {}");
        assert!(reader.source("/b.sbl").is_none());

        reader.set_source("/a.sbl", "contract B {}");
        assert_eq!(reader.source("/a.sbl").unwrap(), "contract B {}");
    }

    #[test]
    fn test_read_source_misses_on_absent_file() {
        let mut reader = FileReader::new(PathBuf::from("/nonexistent-base"));
        assert!(reader.read_source("/missing.sbl").is_err());
    }
}
