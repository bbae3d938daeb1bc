//! Text buffer seam between the analysis engine and the hosting editor
//!
//! The editor owns the real document; the binder only needs to read the text,
//! look up positions, and splice replacement text into a byte range.

use super::span::{LineIndex, Span};

/// Minimal mutable text buffer interface
///
/// Different hosts can back this with a plain string, a rope, or a handle into
/// a remote editor document.
pub trait TextBuffer {
    /// Current full text
    fn text(&self) -> &str;

    /// 1-based (line, column) for a byte offset
    fn line_col(&self, offset: usize) -> (usize, usize);

    /// Replace `len` bytes starting at `start` with `new_text`
    ///
    /// Returns false (and leaves the buffer untouched) when the range is out
    /// of bounds or does not fall on char boundaries.
    fn replace(&mut self, start: usize, len: usize, new_text: &str) -> bool;
}

/// String-backed buffer with an eagerly maintained line index
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    text: String,
    index: LineIndex,
    revision: u64,
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let index = LineIndex::new(&text);
        SourceBuffer {
            text,
            index,
            revision: 0,
        }
    }

    /// Replace the whole document
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.index = LineIndex::new(&self.text);
        self.revision += 1;
    }

    /// Monotonic counter bumped on every successful mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl Default for SourceBuffer {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl TextBuffer for SourceBuffer {
    fn text(&self) -> &str {
        &self.text
    }

    fn line_col(&self, offset: usize) -> (usize, usize) {
        self.index.line_col(offset)
    }

    fn replace(&mut self, start: usize, len: usize, new_text: &str) -> bool {
        let span = Span::new(start, start.saturating_add(len));
        if span.end > self.text.len()
            || !self.text.is_char_boundary(span.start)
            || !self.text.is_char_boundary(span.end)
        {
            return false;
        }
        self.text.replace_range(span.start..span.end, new_text);
        self.index = LineIndex::new(&self.text);
        self.revision += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_updates_text_and_lines() {
        let mut buffer = SourceBuffer::new("a = 1;\nb = 2;");
        assert!(buffer.replace(4, 1, "100"));
        assert_eq!(buffer.text(), "a = 100;\nb = 2;");
        assert_eq!(buffer.line_col(9), (2, 1));
        assert_eq!(buffer.revision(), 1);
    }

    #[test]
    fn test_replace_rejects_bad_ranges() {
        let mut buffer = SourceBuffer::new("é");
        assert!(!buffer.replace(1, 1, "x"));
        assert!(!buffer.replace(0, 10, "x"));
        assert_eq!(buffer.text(), "é");
        assert_eq!(buffer.revision(), 0);
    }
}
