//! Definition tables produced by the structure analysis
//!
//! Rebuilt from scratch on every analysis pass; nothing here is patched
//! incrementally.

use crate::error::AnalysisError;
use crate::types::{SourceLocationInfo, Span};
use std::collections::HashMap;
use std::fmt;

/// What kind of construction statement created an instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstrumentType {
    Synth,
    PolySynth,
    FmSynth,
    Sampler,
    DrumMachine,
    Oscillator,
    /// Loaded through `LoadPlugin`/`LoadVst`
    Plugin,
}

impl InstrumentType {
    /// Classify a constructor call name
    pub fn from_constructor(name: &str) -> Option<Self> {
        match name {
            "Synth" => Some(InstrumentType::Synth),
            "PolySynth" => Some(InstrumentType::PolySynth),
            "FMSynth" => Some(InstrumentType::FmSynth),
            "Sampler" => Some(InstrumentType::Sampler),
            "DrumMachine" => Some(InstrumentType::DrumMachine),
            "Oscillator" => Some(InstrumentType::Oscillator),
            _ => None,
        }
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrumentType::Synth => "Synth",
            InstrumentType::PolySynth => "PolySynth",
            InstrumentType::FmSynth => "FMSynth",
            InstrumentType::Sampler => "Sampler",
            InstrumentType::DrumMachine => "DrumMachine",
            InstrumentType::Oscillator => "Oscillator",
            InstrumentType::Plugin => "Plugin",
        };
        f.write_str(name)
    }
}

/// An instrument created or loaded by the script
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstrumentDefinition {
    /// Display name (`.Name = "..."`, plugin name, or the variable name)
    pub name: String,
    pub variable_name: String,
    pub instrument_type: InstrumentType,
    /// The whole construction statement
    pub definition_span: Span,
    pub line: usize,
    pub column: usize,
    /// Later token-bounded uses of `variable_name`
    pub reference_spans: Vec<Span>,
}

/// A note event literal inside a pattern
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoteDefinition {
    pub note: u8,
    pub velocity: u8,
    pub beat: f64,
    pub duration: f64,
    /// The `new NoteEvent { ... }` literal, braces included
    pub source_span: Span,
    pub line: usize,
    pub column: usize,
    pub raw_text: String,
}

/// A pattern created by the script, with the notes attributed to it
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternDefinition {
    pub variable_name: String,
    /// Display name of the owning instrument, or the raw constructor argument
    /// when no instrument with that variable was found
    pub instrument_name: String,
    /// Constructor argument as written
    pub instrument_variable: String,
    pub definition_span: Span,
    pub line: usize,
    pub column: usize,
    pub notes: Vec<NoteDefinition>,
    pub reference_spans: Vec<Span>,
}

impl PatternDefinition {
    /// Note whose beat is within `tolerance` and whose number matches exactly
    pub fn find_note(&self, note: u8, beat: f64, tolerance: f64) -> Option<&NoteDefinition> {
        self.notes
            .iter()
            .find(|n| n.note == note && (n.beat - beat).abs() <= tolerance)
    }
}

/// Build the metadata stamped onto a live object for a definition span
pub(crate) fn location_info(
    text: &str,
    span: Span,
    line: usize,
    column: usize,
    instrument_name: &str,
) -> SourceLocationInfo {
    SourceLocationInfo {
        start_offset: span.start,
        end_offset: span.end,
        start_line: line,
        start_column: Some(column),
        source_text: span.slice(text).map(str::to_string),
        instrument_name: instrument_name.to_string(),
    }
}

impl NoteDefinition {
    pub fn location_info(&self, text: &str, instrument_name: &str) -> SourceLocationInfo {
        location_info(text, self.source_span, self.line, self.column, instrument_name)
    }
}

impl PatternDefinition {
    pub fn location_info(&self, text: &str) -> SourceLocationInfo {
        location_info(
            text,
            self.definition_span,
            self.line,
            self.column,
            &self.instrument_name,
        )
    }
}

/// Result of one structure analysis pass
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StructureAnalysis {
    /// In order of appearance
    pub instruments: Vec<InstrumentDefinition>,
    /// In order of appearance
    pub patterns: Vec<PatternDefinition>,
    pub errors: Vec<AnalysisError>,
}

impl StructureAnalysis {
    pub fn instrument(&self, variable_name: &str) -> Option<&InstrumentDefinition> {
        self.instruments
            .iter()
            .find(|i| i.variable_name == variable_name)
    }

    pub fn pattern(&self, variable_name: &str) -> Option<&PatternDefinition> {
        self.patterns.iter().find(|p| p.variable_name == variable_name)
    }

    /// Every note attributed to patterns played by instrument `name`
    pub fn notes_for_instrument<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a NoteDefinition> + 'a {
        self.patterns
            .iter()
            .filter(move |p| p.instrument_name == name)
            .flat_map(|p| p.notes.iter())
    }

    pub fn note_count(&self) -> usize {
        self.patterns.iter().map(|p| p.notes.len()).sum()
    }

    /// Instrument display name to every code region that belongs to it
    ///
    /// Merges the instrument's own definition and reference spans with the
    /// definition, reference and note spans of its patterns. Spans are sorted
    /// and deduplicated.
    pub fn instrument_regions(&self) -> HashMap<String, Vec<Span>> {
        let mut regions: HashMap<String, Vec<Span>> = HashMap::new();

        for instrument in &self.instruments {
            let spans = regions.entry(instrument.name.clone()).or_default();
            spans.push(instrument.definition_span);
            spans.extend(instrument.reference_spans.iter().copied());
        }

        for pattern in &self.patterns {
            let spans = regions.entry(pattern.instrument_name.clone()).or_default();
            spans.push(pattern.definition_span);
            spans.extend(pattern.reference_spans.iter().copied());
            spans.extend(pattern.notes.iter().map(|n| n.source_span));
        }

        for spans in regions.values_mut() {
            spans.sort_by_key(|s| (s.start, s.end));
            spans.dedup();
        }
        regions
    }
}
