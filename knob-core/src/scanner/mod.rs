//! Literal Scanner
//!
//! Finds numeric literals in raw script text and attaches a slider range to
//! each one. Pure: the same text always yields the same literals, in
//! left-to-right order.
//!
//! Range selection, highest priority first:
//! 1. a `// @slider(...)` annotation on the literal's line
//! 2. the context label of the surrounding call/assignment (see [`context`])
//! 3. a type-based default

pub mod annotation;
pub mod context;
pub mod exclusion;
pub mod literal;

#[cfg(test)]
mod tests;

pub use exclusion::ExclusionZones;
pub use literal::{DetectedLiteral, SliderConfig};

use crate::error::AnalysisError;
use crate::types::{LineIndex, Span};
use once_cell::sync::Lazy;
use regex::Regex;

/// Digits with optional fraction (or a leading-dot fraction), optional
/// exponent, optional single-character `f`/`d` suffix. Sign and boundaries
/// are checked by hand since the regex crate has no lookbehind.
static NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?[fFdD]?").expect("valid number regex")
});

/// Literals plus any failures hit while scanning
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiteralScan {
    pub literals: Vec<DetectedLiteral>,
    pub errors: Vec<AnalysisError>,
}

/// Detect every editable numeric literal in `text`
pub fn detect_literals(text: &str) -> Vec<DetectedLiteral> {
    let scan = scan_literals(text);
    for error in &scan.errors {
        log::warn!("literal scan: {}", error);
    }
    scan.literals
}

/// Like [`detect_literals`] but hands back the error list too
pub fn scan_literals(text: &str) -> LiteralScan {
    let index = LineIndex::new(text);
    let annotations = annotation::collect_annotations(text, &index);
    let zones = ExclusionZones::new(text);
    let mut scan = LiteralScan::default();

    for m in NUMBER_TOKEN.find_iter(text) {
        let Some(span) = token_span(text, m.start(), m.end()) else {
            continue;
        };
        if zones.is_excluded(span.start) {
            continue;
        }

        let original_text = &text[span.start..span.end];
        let number = match DetectedLiteral::parse(original_text, span) {
            Ok(number) => number,
            Err(err) => {
                scan.errors.push(err);
                continue;
            }
        };

        let (line, column) = index.line_col(span.start);
        let line_start = index.line_start(line).unwrap_or(0);
        let inferred_context = context::infer_context(text, line_start, span.start);

        let slider = match annotations.get(&line) {
            Some(pinned) => pinned.clone(),
            None => inferred_context
                .as_deref()
                .and_then(|ctx| {
                    context::slider_for_context(ctx, number.value, number.is_floating_point)
                })
                .unwrap_or_else(|| {
                    context::default_slider(number.value, number.is_floating_point)
                }),
        };

        scan.literals.push(DetectedLiteral {
            start_offset: span.start,
            end_offset: span.end,
            original_text: original_text.to_string(),
            value: number.value,
            is_floating_point: number.is_floating_point,
            float_suffix: number.float_suffix,
            double_suffix: number.double_suffix,
            line,
            column,
            slider: Some(slider),
            inferred_context,
        });
    }

    log::debug!(
        "literal scan: {} literals, {} annotations, {} errors",
        scan.literals.len(),
        annotations.len(),
        scan.errors.len()
    );
    scan
}

/// The literal containing `offset`, if any
pub fn literal_at(literals: &[DetectedLiteral], offset: usize) -> Option<&DetectedLiteral> {
    literals.iter().find(|l| l.span().contains(offset))
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Validate a raw number match and extend it over a unary sign
///
/// Returns `None` for identifier look-alikes (`x1`, `1x`) and hex literals.
/// Either side of a range operator (`0..10`) keeps only its digits.
fn token_span(text: &str, mut start: usize, mut end: usize) -> Option<Span> {
    if text[..end].ends_with('.') && text[end..].starts_with('.') {
        end -= 1;
    }
    if text[start..].starts_with('.') && text[..start].ends_with('.') {
        start += 1;
    }
    if start >= end {
        return None;
    }

    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();

    if before.is_some_and(is_ident_char) || after.is_some_and(is_ident_char) {
        return None;
    }
    if is_hex_prefix(text, start) {
        return None;
    }

    let start = match before {
        Some('-' | '+') if is_unary_sign(text, start - 1) => start - 1,
        _ => start,
    };
    Some(Span::new(start, end))
}

fn is_hex_prefix(text: &str, start: usize) -> bool {
    let bytes = text.as_bytes();
    bytes.get(start) == Some(&b'0') && matches!(bytes.get(start + 1), Some(b'x' | b'X'))
}

/// A sign is unary unless the previous non-blank character ends an operand
fn is_unary_sign(text: &str, sign: usize) -> bool {
    match text[..sign].trim_end().chars().next_back() {
        Some(c) => !(is_ident_char(c) || c == ')' || c == ']' || c == '.'),
        None => true,
    }
}
