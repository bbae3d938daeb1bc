//! `// @slider(min, max[, step][, "label"])` annotations
//!
//! An annotation on a line pins the slider range of every literal on that
//! line. Anything that does not fit the grammar exactly is ignored.

use super::literal::SliderConfig;
use crate::types::LineIndex;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Shared by the scanner and the binder's trailing-annotation scan
pub(crate) const SLIDER_ARGS: &str = r#"@slider\(\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*(?:,\s*(-?\d+(?:\.\d+)?)\s*)?(?:,\s*"([^"]*)"\s*)?\)"#;

static SLIDER_ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"//\s*{}", SLIDER_ARGS)).expect("valid annotation regex"));

/// Collect annotations keyed by 1-based line number
pub fn collect_annotations(text: &str, index: &LineIndex) -> HashMap<usize, SliderConfig> {
    SLIDER_ANNOTATION
        .captures_iter(text)
        .filter_map(|caps| {
            let line = index.line_of(caps.get(0)?.start());
            slider_from_captures(&caps, 1).map(|config| (line, config))
        })
        .collect()
}

/// Build a slider from the four `SLIDER_ARGS` groups starting at `first`
///
/// Rejects inverted ranges and non-positive steps the same way a shape
/// mismatch is rejected.
pub(crate) fn slider_from_captures(caps: &Captures<'_>, first: usize) -> Option<SliderConfig> {
    let number = |i: usize| caps.get(first + i).and_then(|m| m.as_str().parse::<f64>().ok());

    let min = number(0)?;
    let max = number(1)?;
    if min > max {
        return None;
    }
    let step = match caps.get(first + 2) {
        Some(_) => number(2).filter(|s| *s > 0.0)?,
        None => 1.0,
    };

    let mut config = SliderConfig::new(min, max, step);
    if let Some(label) = caps.get(first + 3) {
        config = config.with_label(label.as_str());
    }
    Some(config)
}
