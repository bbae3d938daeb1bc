//! Context inference and default slider ranges
//!
//! A literal's context is a short label such as `"velocity"` taken from the
//! call or assignment it appears in. Only the literal's own statement on its
//! own line is considered.
//!
//! Rules are tried strictly in table order and the first rule with a match
//! before the literal wins, even if a later rule matches closer to it. Put
//! more specific call names first.

use super::literal::SliderConfig;
use once_cell::sync::Lazy;
use regex::Regex;

struct ContextRule {
    pattern: &'static str,
    /// Used when the literal sits past the last named parameter
    label: &'static str,
    /// Parameter names by comma position after the match
    params: &'static [&'static str],
}

const CONTEXT_RULES: &[ContextRule] = &[
    ContextRule {
        pattern: r"\bNoteOn\s*\(",
        label: "noteon",
        params: &["note", "velocity"],
    },
    ContextRule {
        pattern: r"\bNoteOff\s*\(",
        label: "noteoff",
        params: &["note"],
    },
    ContextRule {
        pattern: r"\bPlayNote\s*\(",
        label: "playnote",
        params: &["note", "velocity", "duration"],
    },
    ContextRule {
        pattern: r"\bAddNote\s*\(",
        label: "addnote",
        params: &["beat", "note", "velocity", "duration"],
    },
    ContextRule {
        pattern: r"\b(?:SetTempo|SetBpm|SetBPM)\s*\(",
        label: "tempo",
        params: &["tempo"],
    },
    ContextRule {
        pattern: r"\b(?:Tempo|Bpm|BPM)\s*=(?:[^=]|$)",
        label: "tempo",
        params: &["tempo"],
    },
    ContextRule {
        pattern: r"\bSetFilter\s*\(",
        label: "filter",
        params: &["cutoff", "resonance"],
    },
    ContextRule {
        pattern: r"\b(?:SetEnvelope|SetAdsr|Adsr)\s*\(",
        label: "envelope",
        params: &["attack", "decay", "sustain", "release"],
    },
    ContextRule {
        pattern: r"\bSetVolume\s*\(",
        label: "volume",
        params: &["volume"],
    },
    ContextRule {
        pattern: r"\bSetPan\s*\(",
        label: "pan",
        params: &["pan"],
    },
    ContextRule {
        pattern: r"\bSetWaveform\s*\(",
        label: "waveform",
        params: &["waveform"],
    },
    ContextRule {
        pattern: r"\bSetOctave\s*\(",
        label: "octave",
        params: &["octave"],
    },
    ContextRule {
        pattern: r"\bTranspose\s*\(",
        label: "transpose",
        params: &["semitone"],
    },
    ContextRule {
        pattern: r"\bSetFrequency\s*\(",
        label: "frequency",
        params: &["frequency"],
    },
];

static COMPILED_RULES: Lazy<Vec<(Regex, &'static ContextRule)>> = Lazy::new(|| {
    CONTEXT_RULES
        .iter()
        .map(|rule| (Regex::new(rule.pattern).expect("valid context rule"), rule))
        .collect()
});

static ASSIGNMENT_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*=").expect("valid assignment regex"));

/// Infer the context label for a literal starting at `literal_start`
///
/// `line_start` is the offset of the first byte of the literal's line.
pub fn infer_context(text: &str, line_start: usize, literal_start: usize) -> Option<String> {
    let prefix = text.get(line_start..literal_start)?;

    for (regex, rule) in COMPILED_RULES.iter() {
        if let Some(m) = regex.find_iter(prefix).last() {
            let index = prefix[m.end()..].matches(',').count();
            let label = rule.params.get(index).copied().unwrap_or(rule.label);
            return Some(label.to_string());
        }
    }

    nearest_assignment_target(prefix)
}

/// Last `identifier =` in the line prefix that is not a comparison
fn nearest_assignment_target(prefix: &str) -> Option<String> {
    ASSIGNMENT_TARGET
        .captures_iter(prefix)
        .filter(|caps| {
            let end = caps.get(0).map_or(0, |m| m.end());
            prefix.as_bytes().get(end) != Some(&b'=')
        })
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

enum RangeKind {
    Fixed {
        min: f64,
        max: f64,
        step: f64,
        label: &'static str,
    },
    /// 0..1 for fractional or unit values, 0..100 otherwise
    Level,
}

struct KeywordRange {
    keywords: &'static [&'static str],
    excluded: &'static [&'static str],
    range: RangeKind,
}

const fn fixed(min: f64, max: f64, step: f64, label: &'static str) -> RangeKind {
    RangeKind::Fixed {
        min,
        max,
        step,
        label,
    }
}

const KEYWORD_RANGES: &[KeywordRange] = &[
    KeywordRange {
        keywords: &["tempo", "bpm"],
        excluded: &[],
        range: fixed(20.0, 300.0, 1.0, "BPM"),
    },
    KeywordRange {
        keywords: &["velocity"],
        excluded: &[],
        range: fixed(0.0, 127.0, 1.0, "Velocity"),
    },
    KeywordRange {
        keywords: &["note"],
        excluded: &["noteon", "noteoff"],
        range: fixed(0.0, 127.0, 1.0, "Note"),
    },
    KeywordRange {
        keywords: &["frequency", "hz"],
        excluded: &[],
        range: fixed(20.0, 20000.0, 1.0, "Hz"),
    },
    KeywordRange {
        keywords: &["volume", "gain", "level"],
        excluded: &[],
        range: RangeKind::Level,
    },
    KeywordRange {
        keywords: &["cutoff", "resonance", "filter"],
        excluded: &[],
        range: fixed(0.0, 1.0, 0.01, "Filter"),
    },
    KeywordRange {
        keywords: &["attack", "decay", "release", "sustain"],
        excluded: &[],
        range: fixed(0.0, 10.0, 0.01, "Time"),
    },
    KeywordRange {
        keywords: &["beat", "duration", "length"],
        excluded: &[],
        range: fixed(0.0, 16.0, 0.25, "Beats"),
    },
    KeywordRange {
        keywords: &["pan"],
        excluded: &[],
        range: fixed(-1.0, 1.0, 0.01, "Pan"),
    },
    KeywordRange {
        keywords: &["waveform", "wave"],
        excluded: &[],
        range: fixed(0.0, 4.0, 1.0, "Waveform"),
    },
    KeywordRange {
        keywords: &["octave"],
        excluded: &[],
        range: fixed(-4.0, 4.0, 1.0, "Octave"),
    },
    KeywordRange {
        keywords: &["semitone", "transpose"],
        excluded: &[],
        range: fixed(-24.0, 24.0, 1.0, "Semitones"),
    },
];

/// Slider range for a context label, if any keyword matches
pub fn slider_for_context(context: &str, value: f64, is_float: bool) -> Option<SliderConfig> {
    let context = context.to_ascii_lowercase();
    let entry = KEYWORD_RANGES.iter().find(|entry| {
        entry.keywords.iter().any(|k| context.contains(k))
            && !entry.excluded.iter().any(|x| context.contains(x))
    })?;

    let config = match entry.range {
        RangeKind::Fixed {
            min,
            max,
            step,
            label,
        } => SliderConfig::new(min, max, step).with_label(label),
        RangeKind::Level if is_float || value <= 1.0 => {
            SliderConfig::new(0.0, 1.0, 0.01).with_label("Level")
        }
        RangeKind::Level => SliderConfig::new(0.0, 100.0, 1.0).with_label("Level"),
    };
    Some(config)
}

/// Range used when nothing about the literal's surroundings is recognised
pub fn default_slider(value: f64, is_float: bool) -> SliderConfig {
    if is_float {
        return SliderConfig::new(0.0, 1.0, 0.01);
    }
    let max = next_power_of_ten(value.abs());
    let min = if value < 0.0 { -max } else { 0.0 };
    SliderConfig::new(min, max, 1.0)
}

/// Smallest power of ten strictly greater than `magnitude` (at least 10)
fn next_power_of_ten(magnitude: f64) -> f64 {
    let mut max = 10.0;
    while max <= magnitude && max.is_finite() {
        max *= 10.0;
    }
    max
}
