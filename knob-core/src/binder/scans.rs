//! The fixed battery of binding scans
//!
//! Each scan covers one semantic category and runs over the whole text
//! independently. Battery order matters only for identical spans: the first
//! scan to claim a span keeps it.

use super::binding::ParameterType;
use crate::error::{AnalysisError, ErrorKind};
use crate::scanner::annotation::{slider_from_captures, SLIDER_ARGS};
use crate::scanner::literal::parse_number;
use crate::scanner::{is_ident_char, ExclusionZones};
use crate::types::{LineIndex, Span};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;

const NUMBER: &str = r"-?(?:\d+(?:\.\d*)?|\.\d+)[fFdD]?";

struct ScanRule {
    parameter_type: ParameterType,
    regex: Regex,
    /// (min, max, step) for every hit of this rule
    range: (f64, f64, f64),
}

fn rule(parameter_type: ParameterType, pattern: &str, range: (f64, f64, f64)) -> ScanRule {
    let pattern = pattern.replace("{num}", NUMBER);
    ScanRule {
        parameter_type,
        regex: Regex::new(&pattern).expect("valid binding scan regex"),
        range,
    }
}

static BATTERY: Lazy<Vec<ScanRule>> = Lazy::new(|| {
    vec![
        rule(
            ParameterType::Tempo,
            r"\b(?:Tempo|Bpm|BPM)\s*=\s*({num})",
            (20.0, 300.0, 1.0),
        ),
        rule(
            ParameterType::Tempo,
            r"\b(?:SetTempo|SetBpm)\s*\(\s*({num})",
            (20.0, 300.0, 1.0),
        ),
        rule(ParameterType::Velocity, r"\bVelocity\s*=\s*({num})", (0.0, 127.0, 1.0)),
        rule(
            ParameterType::Duration,
            r"\bDuration\s*=\s*({num})",
            (0.0625, 4.0, 0.0625),
        ),
        rule(ParameterType::Beat, r"\bBeat\s*=\s*({num})", (0.0, 16.0, 0.25)),
        rule(ParameterType::Note, r"\bNote\s*=\s*({num})", (0.0, 127.0, 1.0)),
    ]
});

/// `[name =] value; // @slider(...)`
static TRAILING_SLIDER: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"(?:\b([A-Za-z_]\w*)\s*=\s*)?({})\s*;\s*//\s*{}",
        NUMBER, SLIDER_ARGS
    );
    Regex::new(&pattern).expect("valid trailing slider regex")
});

/// A literal the battery decided to bind
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScanHit {
    pub parameter_type: ParameterType,
    pub name: String,
    pub span: Span,
    pub original_text: String,
    pub value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub step: f64,
    pub anchor: usize,
}

#[derive(Debug, Default)]
pub(crate) struct BatteryResult {
    pub hits: Vec<ScanHit>,
    pub errors: Vec<AnalysisError>,
}

/// Run every scan over `text`
pub(crate) fn run_battery(text: &str) -> BatteryResult {
    let zones = ExclusionZones::new(text);
    let index = LineIndex::new(text);
    let mut claimed = HashSet::new();
    let mut result = BatteryResult::default();

    for rule in BATTERY.iter() {
        for caps in rule.regex.captures_iter(text) {
            let Some(literal) = bindable_literal(text, &zones, &caps, 1) else {
                continue;
            };
            let anchor = caps.get(0).map_or(literal.start, |m| m.start());
            let (line, _) = index.line_col(anchor);
            let name = match rule.parameter_type {
                ParameterType::Tempo => "Tempo".to_string(),
                kind => format!("{}@{}", capitalized(kind), line),
            };
            let (min_value, max_value, step) = rule.range;
            push_hit(
                &mut result,
                &mut claimed,
                text,
                literal,
                ScanHit {
                    parameter_type: rule.parameter_type,
                    name,
                    span: literal,
                    original_text: String::new(),
                    value: 0.0,
                    min_value,
                    max_value,
                    step,
                    anchor,
                },
            );
        }
    }

    for caps in TRAILING_SLIDER.captures_iter(text) {
        let Some(literal) = bindable_literal(text, &zones, &caps, 2) else {
            continue;
        };
        let Some(slider) = slider_from_captures(&caps, 3) else {
            continue;
        };
        let name = slider
            .label
            .clone()
            .or_else(|| caps.get(1).map(|m| m.as_str().to_string()))
            .unwrap_or_else(|| format!("Slider@{}", index.line_of(literal.start)));
        push_hit(
            &mut result,
            &mut claimed,
            text,
            literal,
            ScanHit {
                parameter_type: ParameterType::Slider,
                name,
                span: literal,
                original_text: String::new(),
                value: 0.0,
                min_value: slider.min_value,
                max_value: slider.max_value,
                step: slider.step,
                anchor: caps.get(0).map_or(literal.start, |m| m.start()),
            },
        );
    }

    result.hits.sort_by_key(|h| h.span.start);
    result
}

/// Parse the literal and add the hit unless its span is already claimed
fn push_hit(
    result: &mut BatteryResult,
    claimed: &mut HashSet<Span>,
    text: &str,
    literal: Span,
    mut hit: ScanHit,
) {
    if claimed.contains(&literal) {
        return;
    }
    let original_text = &text[literal.start..literal.end];
    match parse_number(original_text) {
        Ok(number) => {
            claimed.insert(literal);
            hit.original_text = original_text.to_string();
            hit.value = number.value;
            result.hits.push(hit);
        }
        Err(message) => {
            result
                .errors
                .push(AnalysisError::at(ErrorKind::Binding, message, literal.start));
        }
    }
}

/// Span of capture `group` if it is a whole token outside strings and comments
fn bindable_literal(
    text: &str,
    zones: &ExclusionZones,
    caps: &Captures<'_>,
    group: usize,
) -> Option<Span> {
    let m = caps.get(group)?;
    if zones.is_excluded(caps.get(0)?.start()) || zones.is_excluded(m.start()) {
        return None;
    }
    if text[m.end()..].chars().next().is_some_and(is_ident_char) {
        return None;
    }
    Some(Span::new(m.start(), m.end()))
}

fn capitalized(kind: ParameterType) -> String {
    let name = kind.to_string();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(text: &str) -> Vec<ScanHit> {
        run_battery(text).hits
    }

    #[test]
    fn test_tempo_forms() {
        let found = hits("Tempo = 120;\nclock.SetBpm(96.5);\nif (BPM == 3) {}");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|h| h.parameter_type == ParameterType::Tempo));
        assert_eq!(found[1].original_text, "96.5");
        assert_eq!((found[0].min_value, found[0].max_value), (20.0, 300.0));
    }

    #[test]
    fn test_note_fields() {
        let text = "p.Add(new NoteEvent { Beat = 1.5, Note = 64, Velocity = 90, Duration = 0.25 });";
        let found = hits(text);
        let kinds: Vec<_> = found.iter().map(|h| h.parameter_type).collect();
        assert_eq!(
            kinds,
            vec![
                ParameterType::Beat,
                ParameterType::Note,
                ParameterType::Velocity,
                ParameterType::Duration
            ]
        );
        assert_eq!(found[2].name, "Velocity@1");
        assert_eq!(found[3].step, 0.0625);
        assert_eq!(&text[found[1].span.start..found[1].span.end], "64");
        assert!(found.iter().all(|h| h.anchor < h.span.start));
    }

    #[test]
    fn test_trailing_slider() {
        let found = hits("cutoff = 0.4; // @slider(0, 1, 0.05, \"Cutoff\")\nx = 3; // @slider(0, 8)");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "Cutoff");
        assert_eq!(found[0].step, 0.05);
        assert_eq!(found[1].name, "x");
        assert_eq!(found[1].max_value, 8.0);
    }

    #[test]
    fn test_first_scan_claims_shared_span() {
        let found = hits("Tempo = 120; // @slider(60, 180)");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].parameter_type, ParameterType::Tempo);
    }

    #[test]
    fn test_commented_and_quoted_text_is_skipped() {
        assert!(hits("// Velocity = 90\nPrint(\"Tempo = 120\");").is_empty());
        assert!(hits("Velocity = 90x;").is_empty());
    }
}
