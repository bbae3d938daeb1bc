//! Source spans and line lookup
//!
//! All offsets are byte offsets into the UTF-8 source text. Editors that work
//! in UTF-16 code units (JavaScript, CodeMirror) convert at the boundary with
//! [`utf16_offset`].

/// Half-open `[start, end)` byte range into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a byte offset falls inside this span
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Move both ends by `delta` bytes
    pub fn shifted(self, delta: isize) -> Self {
        Span {
            start: shift_offset(self.start, delta),
            end: shift_offset(self.end, delta),
        }
    }

    /// The text covered by this span, if it lies on char boundaries
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end)
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

pub(crate) fn shift_offset(offset: usize, delta: isize) -> usize {
    if delta >= 0 {
        offset + delta as usize
    } else {
        offset.saturating_sub(delta.unsigned_abs())
    }
}

/// Line-start table for offset → (line, column) lookups
///
/// Lines and columns are both 1-based; the column counts bytes from the
/// start of the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        LineIndex {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-based line containing `offset` (offsets past the end map to the last line)
    pub fn line_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.len);
        self.line_starts.partition_point(|&start| start <= offset)
    }

    /// 1-based (line, column) for a byte offset
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.len);
        let line = self.line_of(offset);
        let column = offset - self.line_starts[line - 1] + 1;
        (line, column)
    }

    /// Byte offset of the first character of a 1-based line
    pub fn line_start(&self, line: usize) -> Option<usize> {
        line.checked_sub(1)
            .and_then(|i| self.line_starts.get(i))
            .copied()
    }

    /// Byte range of a 1-based line, excluding its newline
    pub fn line_span(&self, line: usize, text: &str) -> Option<Span> {
        let start = self.line_start(line)?;
        let end = match self.line_start(line + 1) {
            Some(next) => next - 1,
            None => text.len(),
        };
        let end = if end > start && text.as_bytes().get(end - 1) == Some(&b'\r') {
            end - 1
        } else {
            end
        };
        Some(Span::new(start, end))
    }
}

/// Convert a byte offset to a UTF-16 code unit offset (for JavaScript interop)
pub fn utf16_offset(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    text[..offset].encode_utf16().count()
}

/// Convert a UTF-16 code unit offset back to a byte offset
///
/// Offsets inside a surrogate pair land on the start of that character.
pub fn byte_offset(text: &str, utf16: usize) -> usize {
    let mut units = 0;
    for (index, c) in text.char_indices() {
        if units + c.len_utf16() > utf16 {
            return index;
        }
        units += c.len_utf16();
    }
    text.len()
}
