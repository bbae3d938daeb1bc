//! String and comment regions that never contain editable literals
//!
//! One forward pass over the text records every `//` line comment, `/* */`
//! block comment and quoted string as a span. Comments are only recognised
//! outside strings and strings only outside comments, so neither an
//! apostrophe in a comment nor a `//` inside a URL string confuses the other.

use crate::types::Span;

/// Character that turns the following quote into a verbatim string
/// (no backslash escapes, doubled quote for a literal quote, may span lines)
pub const VERBATIM_PREFIX: u8 = b'@';

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExclusionZones {
    /// Sorted, non-overlapping
    zones: Vec<Span>,
}

impl ExclusionZones {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let len = bytes.len();
        let mut zones = Vec::new();
        let mut i = 0;

        while i < len {
            match bytes[i] {
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    let end = text[i..].find('\n').map_or(len, |p| i + p);
                    zones.push(Span::new(i, end));
                    i = end;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    // Unterminated block comments run to the end of the text
                    let end = text[i + 2..].find("*/").map_or(len, |p| i + 2 + p + 2);
                    zones.push(Span::new(i, end));
                    i = end;
                }
                quote @ (b'"' | b'\'') => {
                    let verbatim = i > 0 && bytes[i - 1] == VERBATIM_PREFIX;
                    let end = string_end(bytes, i, quote, verbatim);
                    zones.push(Span::new(i, end));
                    i = end;
                }
                _ => i += 1,
            }
        }

        ExclusionZones { zones }
    }

    /// True if `offset` lies inside a string literal or comment
    pub fn is_excluded(&self, offset: usize) -> bool {
        let idx = self.zones.partition_point(|zone| zone.start <= offset);
        idx > 0 && self.zones[idx - 1].contains(offset)
    }

    pub fn zones(&self) -> &[Span] {
        &self.zones
    }
}

/// Byte offset just past the closing quote of the string opened at `open`
fn string_end(bytes: &[u8], open: usize, quote: u8, verbatim: bool) -> usize {
    let len = bytes.len();
    let mut j = open + 1;
    while j < len {
        let b = bytes[j];
        if verbatim {
            if b == quote {
                if bytes.get(j + 1) == Some(&quote) {
                    j += 2;
                    continue;
                }
                return j + 1;
            }
        } else {
            if b == b'\\' {
                j += 2;
                continue;
            }
            if b == quote {
                return j + 1;
            }
            // Regular strings cannot span lines; stop at the newline
            if b == b'\n' {
                return j;
            }
        }
        j += 1;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excluded_at(text: &str, needle: &str) -> bool {
        let offset = text.find(needle).unwrap();
        ExclusionZones::new(text).is_excluded(offset)
    }

    #[test]
    fn test_line_comment() {
        let text = "x = 1; // y = 2\nz = 3;";
        assert!(!excluded_at(text, "1"));
        assert!(excluded_at(text, "2"));
        assert!(!excluded_at(text, "3"));
    }

    #[test]
    fn test_block_comment() {
        let text = "a = 1; /* b = 2;\n c = 3; */ d = 4;";
        assert!(excluded_at(text, "2"));
        assert!(excluded_at(text, "3"));
        assert!(!excluded_at(text, "4"));
    }

    #[test]
    fn test_unterminated_block_comment_runs_to_end() {
        let text = "a = 1; /* b = 2;\n c = 3;";
        assert!(!excluded_at(text, "1"));
        assert!(excluded_at(text, "3"));
    }

    #[test]
    fn test_strings_and_escapes() {
        let text = r#"Print("say \"120\" now"); x = 7;"#;
        assert!(excluded_at(text, "120"));
        assert!(!excluded_at(text, "7"));
    }

    #[test]
    fn test_verbatim_string() {
        let text = r#"p = @"C:\dir\""5"" 9"; x = 7;"#;
        assert!(excluded_at(text, "5"));
        assert!(excluded_at(text, "9"));
        assert!(!excluded_at(text, "7"));
    }

    #[test]
    fn test_comment_markers_inside_strings() {
        let text = r#"url = "http://host:80"; port = 8080;"#;
        assert!(excluded_at(text, "80\""));
        assert!(!excluded_at(text, "8080"));
    }

    #[test]
    fn test_apostrophe_in_comment_does_not_open_string() {
        let text = "// don't\nx = 5;";
        assert!(!excluded_at(text, "5"));
    }
}
