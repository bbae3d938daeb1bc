//! Pattern-matching pass that finds instruments, patterns and note literals

use super::definitions::{
    InstrumentDefinition, InstrumentType, NoteDefinition, PatternDefinition, StructureAnalysis,
};
use crate::error::{AnalysisError, ErrorKind};
use crate::scanner::ExclusionZones;
use crate::types::{AnalyzerConfig, LineIndex, Span};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static INSTRUMENT_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:var\s+)?([A-Za-z_]\w*)\s*=\s*(?:new\s+)?(Synth|PolySynth|FMSynth|Sampler|DrumMachine|Oscillator)\s*\([^)]*\)",
    )
    .expect("valid instrument regex")
});

static PLUGIN_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\b(?:var\s+)?([A-Za-z_]\w*)\s*=\s*(?:LoadPlugin|LoadVst|LoadVST)\s*\(\s*"([^"]*)"\s*\)"#,
    )
    .expect("valid plugin regex")
});

static DISPLAY_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b([A-Za-z_]\w*)\s*\.\s*(?:Name\s*=\s*|SetName\s*\(\s*)"([^"]*)""#)
        .expect("valid display name regex")
});

static PATTERN_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:var\s+)?([A-Za-z_]\w*)\s*=\s*(?:new\s+)?Pattern\s*\(\s*([A-Za-z_]\w*)\s*(?:,[^)]*)?\)",
    )
    .expect("valid pattern regex")
});

static NOTE_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bnew\s+(?:NoteEvent|Note)\s*\{[^{}]*\}").expect("valid note regex")
});

static NOTE_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(Beat|Note|Velocity|Duration)\s*=\s*(-?(?:\d+(?:\.\d*)?|\.\d+))[fFdD]?")
        .expect("valid note field regex")
});

/// `pattern.Add(` / `pattern.Events.Add(` right before a note literal
static NOTE_OWNER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z_]\w*)\s*\.\s*(?:Events\s*\.\s*)?Add\s*\(\s*$")
        .expect("valid note owner regex")
});

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z_]\w*").expect("valid identifier regex"));

/// How far back from a note literal to look for its `.Add(` call
const OWNER_LOOKBACK: usize = 160;

const DEFAULT_VELOCITY: u8 = 100;
const DEFAULT_DURATION: f64 = 1.0;

pub struct StructureAnalyzer<'a> {
    text: &'a str,
    config: AnalyzerConfig,
    index: LineIndex,
    zones: ExclusionZones,
    /// Every identifier outside strings and comments
    identifiers: Vec<(Span, &'a str)>,
    errors: Vec<AnalysisError>,
}

impl<'a> StructureAnalyzer<'a> {
    fn new(text: &'a str, config: AnalyzerConfig) -> Self {
        let zones = ExclusionZones::new(text);
        let identifiers = IDENTIFIER
            .find_iter(text)
            .filter(|m| !zones.is_excluded(m.start()))
            .map(|m| (Span::new(m.start(), m.end()), m.as_str()))
            .collect();

        StructureAnalyzer {
            text,
            config,
            index: LineIndex::new(text),
            zones,
            identifiers,
            errors: Vec::new(),
        }
    }

    /// Analyze `text`. Never fails: problems land in `errors` and whatever
    /// was found is still returned.
    pub fn analyze(text: &'a str, config: &AnalyzerConfig) -> StructureAnalysis {
        let mut analyzer = StructureAnalyzer::new(text, *config);

        let instruments = analyzer.find_instruments();
        let mut patterns = analyzer.find_patterns(&instruments);
        analyzer.attribute_notes(&mut patterns);

        log::debug!(
            "structure analysis: {} instruments, {} patterns, {} errors",
            instruments.len(),
            patterns.len(),
            analyzer.errors.len()
        );
        StructureAnalysis {
            instruments,
            patterns,
            errors: analyzer.errors,
        }
    }

    fn find_instruments(&mut self) -> Vec<InstrumentDefinition> {
        let text = self.text;
        let mut instruments = Vec::new();

        for caps in INSTRUMENT_DEF.captures_iter(text) {
            let Some(whole) = self.live_match(&caps) else {
                continue;
            };
            let instrument_type = match InstrumentType::from_constructor(&caps[2]) {
                Some(kind) => kind,
                None => {
                    self.errors.push(AnalysisError::at(
                        ErrorKind::Pattern,
                        format!("unknown instrument constructor '{}'", &caps[2]),
                        whole.start,
                    ));
                    continue;
                }
            };
            let variable_name = caps[1].to_string();
            let name = self
                .display_name(&variable_name, whole.end)
                .unwrap_or_else(|| variable_name.clone());
            instruments.push(self.instrument(name, variable_name, instrument_type, whole));
        }

        for caps in PLUGIN_DEF.captures_iter(text) {
            let Some(whole) = self.live_match(&caps) else {
                continue;
            };
            let variable_name = caps[1].to_string();
            let name = caps[2].to_string();
            instruments.push(self.instrument(name, variable_name, InstrumentType::Plugin, whole));
        }

        instruments.sort_by_key(|i| i.definition_span.start);
        instruments
    }

    fn instrument(
        &self,
        name: String,
        variable_name: String,
        instrument_type: InstrumentType,
        definition_span: Span,
    ) -> InstrumentDefinition {
        let (line, column) = self.index.line_col(definition_span.start);
        let reference_spans = self.references(&variable_name, definition_span.end);
        InstrumentDefinition {
            name,
            variable_name,
            instrument_type,
            definition_span,
            line,
            column,
            reference_spans,
        }
    }

    /// First `.Name = "..."` / `.SetName("...")` for `variable` after `from`
    fn display_name(&self, variable: &str, from: usize) -> Option<String> {
        DISPLAY_NAME
            .captures_iter(self.text.get(from..)?)
            .find(|caps| {
                &caps[1] == variable
                    && caps
                        .get(0)
                        .is_some_and(|m| !self.zones.is_excluded(from + m.start()))
            })
            .map(|caps| caps[2].to_string())
    }

    fn find_patterns(&mut self, instruments: &[InstrumentDefinition]) -> Vec<PatternDefinition> {
        let mut patterns = Vec::new();

        for caps in PATTERN_DEF.captures_iter(self.text) {
            let Some(whole) = self.live_match(&caps) else {
                continue;
            };
            let variable_name = caps[1].to_string();
            let instrument_variable = caps[2].to_string();
            let instrument_name = instruments
                .iter()
                .rev()
                .find(|i| {
                    i.variable_name == instrument_variable
                        && i.definition_span.start < whole.start
                })
                .map_or_else(|| instrument_variable.clone(), |i| i.name.clone());

            let (line, column) = self.index.line_col(whole.start);
            patterns.push(PatternDefinition {
                reference_spans: self.references(&variable_name, whole.end),
                variable_name,
                instrument_name,
                instrument_variable,
                definition_span: whole,
                line,
                column,
                notes: Vec::new(),
            });
        }
        patterns
    }

    fn attribute_notes(&mut self, patterns: &mut [PatternDefinition]) {
        for m in NOTE_LITERAL.find_iter(self.text) {
            if self.zones.is_excluded(m.start()) {
                continue;
            }
            let span = Span::new(m.start(), m.end());
            let note = match self.parse_note(m.as_str(), span) {
                Ok(Some(note)) => note,
                Ok(None) => continue,
                Err(err) => {
                    self.errors.push(err);
                    continue;
                }
            };
            match self.owner_of(span.start, patterns) {
                Some(owner) => patterns[owner].notes.push(note),
                None => log::trace!("note literal at {} has no owning pattern", span),
            }
        }
    }

    /// Parse the fields of one note literal
    ///
    /// `Ok(None)` when the literal has no positive note number.
    fn parse_note(&self, raw: &str, span: Span) -> Result<Option<NoteDefinition>, AnalysisError> {
        let mut note = None;
        let mut velocity = None;
        let mut beat = None;
        let mut duration = None;

        for caps in NOTE_FIELD.captures_iter(raw) {
            let slot = match &caps[1] {
                "Note" => &mut note,
                "Velocity" => &mut velocity,
                "Beat" => &mut beat,
                _ => &mut duration,
            };
            if slot.is_none() {
                *slot = Some(field_value(&caps, span)?);
            }
        }

        let note = match note {
            Some(n) if n > 0.0 => n.round(),
            _ => return Ok(None),
        };
        if note > 127.0 {
            return Err(AnalysisError::at(
                ErrorKind::Pattern,
                format!("note number {} is outside 1..=127", note),
                span.start,
            ));
        }

        let (line, column) = self.index.line_col(span.start);
        Ok(Some(NoteDefinition {
            note: note as u8,
            velocity: velocity.map_or(DEFAULT_VELOCITY, |v: f64| v.round().clamp(0.0, 127.0) as u8),
            beat: beat.unwrap_or(0.0),
            duration: duration.unwrap_or(DEFAULT_DURATION),
            source_span: span,
            line,
            column,
            raw_text: raw.to_string(),
        }))
    }

    /// Index of the pattern that owns a note literal starting at `note_start`
    fn owner_of(&self, note_start: usize, patterns: &[PatternDefinition]) -> Option<usize> {
        let mut from = note_start.saturating_sub(OWNER_LOOKBACK);
        while !self.text.is_char_boundary(from) {
            from += 1;
        }
        let lookback = &self.text[from..note_start];

        if let Some(caps) = NOTE_OWNER.captures(lookback) {
            let owner = patterns.iter().rposition(|p| {
                p.variable_name == caps[1] && p.definition_span.start < note_start
            });
            if owner.is_some() {
                return owner;
            }
        }

        patterns.iter().rposition(|p| {
            p.definition_span.end <= note_start
                && note_start - p.definition_span.end <= self.config.note_proximity_window
        })
    }

    /// Token-bounded uses of `variable` at or after `from`
    fn references(&self, variable: &str, from: usize) -> Vec<Span> {
        self.identifiers
            .iter()
            .filter(|(span, name)| span.start >= from && *name == variable)
            .map(|(span, _)| *span)
            .collect()
    }

    /// Span of the whole match, unless it starts inside a string or comment
    fn live_match(&self, caps: &Captures<'_>) -> Option<Span> {
        let whole = caps.get(0)?;
        if self.zones.is_excluded(whole.start()) {
            return None;
        }
        Some(Span::new(whole.start(), whole.end()))
    }
}

fn field_value(caps: &Captures<'_>, span: Span) -> Result<f64, AnalysisError> {
    let raw = &caps[2];
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            AnalysisError::at(
                ErrorKind::Pattern,
                format!("unparsable {} value '{}'", &caps[1], raw),
                span.start,
            )
        })
}

/// Analyze with the default configuration
pub fn analyze(text: &str) -> StructureAnalysis {
    StructureAnalyzer::analyze(text, &AnalyzerConfig::default())
}
