//! Document store
//!
//! The server-side view of every open buffer, keyed by canonical path.
//! Storage is delegated to the frontend's [`FileReader`] so the compiler
//! and the editor always read the same text.

use crate::common::{apply_range_replace, translate_position, OutOfBounds};
use crate::frontend::FileReader;
use crate::lsp::protocol::Range;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct DocumentStore {
    reader: FileReader,
}

impl DocumentStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            reader: FileReader::new(base_path),
        }
    }

    /// Re-anchor the store at a new base path, dropping any buffers. Called
    /// once, at `initialize`.
    pub fn rebase(&mut self, base_path: PathBuf) {
        self.reader = FileReader::new(base_path);
    }

    pub fn base_path(&self) -> &Path {
        self.reader.base_path()
    }

    /// Insert or replace a document.
    pub fn open(&mut self, path: &str, text: String) {
        self.reader.set_source(path, text);
    }

    /// Replace a document's whole buffer. Unknown paths are ignored.
    pub fn full_update(&mut self, path: &str, text: String) -> bool {
        if !self.reader.contains(path) {
            return false;
        }
        self.reader.set_source(path, text);
        true
    }

    /// Patch the byte range addressed by `range`. Unknown paths are
    /// ignored; a range outside the buffer is an error.
    pub fn range_update(
        &mut self,
        path: &str,
        range: Range,
        replacement: &str,
    ) -> Result<bool, OutOfBounds> {
        let Some(text) = self.reader.source(path) else {
            return Ok(false);
        };
        let mut buffer = text.clone();
        let start = translate_position(
            &buffer,
            range.start.line as usize,
            range.start.character as usize,
        )?;
        let end = translate_position(
            &buffer,
            range.end.line as usize,
            range.end.character as usize,
        )?;
        apply_range_replace(&mut buffer, start, end, replacement);
        self.reader.set_source(path, buffer);
        Ok(true)
    }

    /// The client no longer shows the document; the last known contents
    /// are kept so later queries against the path still resolve.
    pub fn close(&mut self, _path: &str) {}

    pub fn contains(&self, path: &str) -> bool {
        self.reader.contains(path)
    }

    pub fn text(&self, path: &str) -> Option<&String> {
        self.reader.source(path)
    }

    pub fn sources(&self) -> &BTreeMap<String, String> {
        self.reader.sources()
    }

    /// Clone of the current path-to-text mapping, handed to the compiler.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.reader.sources().clone()
    }

    pub fn reader_mut(&mut self) -> &mut FileReader {
        &mut self.reader
    }
}
