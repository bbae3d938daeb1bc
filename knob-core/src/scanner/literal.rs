//! Detected numeric literals and their slider ranges

use crate::error::{AnalysisError, ErrorKind};
use crate::types::Span;

/// Range, step and optional caption for an on-screen slider
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SliderConfig {
    pub min_value: f64,
    pub max_value: f64,
    pub step: f64,
    pub label: Option<String>,
}

impl SliderConfig {
    pub fn new(min_value: f64, max_value: f64, step: f64) -> Self {
        SliderConfig {
            min_value,
            max_value,
            step: if step > 0.0 { step } else { 1.0 },
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min_value, self.max_value)
    }
}

/// A numeric literal found in source text
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectedLiteral {
    pub start_offset: usize,
    pub end_offset: usize,
    pub original_text: String,
    pub value: f64,
    pub is_floating_point: bool,
    /// Ends in `f`/`F`
    pub float_suffix: bool,
    /// Ends in `d`/`D`
    pub double_suffix: bool,
    /// 1-based
    pub line: usize,
    /// 1-based
    pub column: usize,
    pub slider: Option<SliderConfig>,
    pub inferred_context: Option<String>,
}

impl DetectedLiteral {
    pub fn span(&self) -> Span {
        Span::new(self.start_offset, self.end_offset)
    }

    pub(crate) fn parse(text: &str, span: Span) -> Result<ParsedNumber, AnalysisError> {
        parse_number(text).map_err(|message| AnalysisError::at(ErrorKind::Number, message, span.start))
    }
}

/// The numeric content of a literal token
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ParsedNumber {
    pub value: f64,
    pub is_floating_point: bool,
    pub float_suffix: bool,
    pub double_suffix: bool,
}

/// Parse a literal token, stripping a trailing `f`/`d` suffix first
pub(crate) fn parse_number(token: &str) -> Result<ParsedNumber, String> {
    let (digits, float_suffix, double_suffix) = match token.as_bytes().last() {
        Some(b'f' | b'F') => (&token[..token.len() - 1], true, false),
        Some(b'd' | b'D') => (&token[..token.len() - 1], false, true),
        _ => (token, false, false),
    };

    let value: f64 = digits
        .parse()
        .map_err(|_| format!("unparsable numeric literal '{}'", token))?;
    if !value.is_finite() {
        return Err(format!("numeric literal '{}' is out of range", token));
    }

    let is_floating_point =
        digits.contains('.') || digits.contains(['e', 'E']) || float_suffix || double_suffix;

    Ok(ParsedNumber {
        value,
        is_floating_point,
        float_suffix,
        double_suffix,
    })
}
