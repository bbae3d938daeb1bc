//! Stamp source locations onto live engine objects after script execution

use super::analyzer::StructureAnalyzer;
use super::definitions::{PatternDefinition, StructureAnalysis};
use crate::error::AnalysisError;
use crate::types::{AnalyzerConfig, LivePattern};

/// Counts from one attach pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachReport {
    pub patterns_attached: usize,
    pub patterns_unmatched: usize,
    pub notes_attached: usize,
    pub notes_unmatched: usize,
    /// Errors from the analysis pass the attach ran on
    pub errors: Vec<AnalysisError>,
}

/// Re-analyze `text` and attach source info to `patterns` and their notes
///
/// Live objects with no matching definition have any stale source info
/// cleared, so highlighting never points at text that moved.
pub fn attach_source_info(
    text: &str,
    patterns: &mut [LivePattern],
    config: &AnalyzerConfig,
) -> AttachReport {
    let analysis = StructureAnalyzer::analyze(text, config);
    let mut report = attach_with(&analysis, text, patterns, config.beat_tolerance);
    report.errors = analysis.errors;
    report
}

/// Attach using an analysis that is already up to date with `text`
pub fn attach_with(
    analysis: &StructureAnalysis,
    text: &str,
    patterns: &mut [LivePattern],
    beat_tolerance: f64,
) -> AttachReport {
    let mut report = AttachReport::default();

    for live in patterns.iter_mut() {
        let Some(definition) = matching_definition(analysis, live) else {
            live.source = None;
            for event in &mut live.events {
                event.source = None;
            }
            report.patterns_unmatched += 1;
            report.notes_unmatched += live.events.len();
            continue;
        };

        live.source = Some(definition.location_info(text));
        report.patterns_attached += 1;

        for event in &mut live.events {
            match definition.find_note(event.note, event.beat, beat_tolerance) {
                Some(note) => {
                    event.source = Some(note.location_info(text, &definition.instrument_name));
                    report.notes_attached += 1;
                }
                None => {
                    event.source = None;
                    report.notes_unmatched += 1;
                }
            }
        }
    }

    log::debug!(
        "attach: {}/{} patterns, {}/{} notes",
        report.patterns_attached,
        report.patterns_attached + report.patterns_unmatched,
        report.notes_attached,
        report.notes_attached + report.notes_unmatched
    );
    report
}

/// Pick the definition for a live pattern
///
/// Instrument name first (preferring the definition whose variable is the
/// pattern's own name when several share an instrument), then the pattern's
/// display name against either the instrument name or the variable name.
fn matching_definition<'a>(
    analysis: &'a StructureAnalysis,
    live: &LivePattern,
) -> Option<&'a PatternDefinition> {
    let by_instrument = || {
        analysis
            .patterns
            .iter()
            .filter(|p| p.instrument_name == live.instrument_name)
    };

    by_instrument()
        .find(|p| p.variable_name == live.name)
        .or_else(|| by_instrument().next())
        .or_else(|| {
            analysis
                .patterns
                .iter()
                .find(|p| p.instrument_name == live.name || p.variable_name == live.name)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::analyze;
    use crate::types::{LiveNoteEvent, SourceLocationInfo};

    const SCRIPT: &str = "lead = Synth();\nmelody = Pattern(lead);\nmelody.Add(new NoteEvent { Beat = 0, Note = 60 });\nmelody.Add(new NoteEvent { Beat = 2.0, Note = 64 });\n";

    fn live_melody() -> Vec<LivePattern> {
        vec![LivePattern::new("melody", "lead")
            .with_event(LiveNoteEvent::new(60, 100, 0.0, 1.0))
            .with_event(LiveNoteEvent::new(64, 100, 2.0, 1.0))]
    }

    #[test]
    fn test_note_gets_its_definition_span() {
        let mut patterns = live_melody();
        let report = attach_source_info(SCRIPT, &mut patterns, &AnalyzerConfig::default());
        assert_eq!(report.patterns_attached, 1);
        assert_eq!(report.notes_attached, 2);

        let analysis = analyze(SCRIPT);
        let expected = analysis.pattern("melody").unwrap().notes[1].source_span;
        let source = patterns[0].events[1].source.as_ref().unwrap();
        assert_eq!(source.span(), expected);
        assert_eq!(source.instrument_name, "lead");
        assert_eq!(source.start_line, 4);
        assert!(source.source_text.as_deref().unwrap().contains("Note = 64"));
    }

    #[test]
    fn test_pattern_source_points_at_definition() {
        let mut patterns = live_melody();
        attach_source_info(SCRIPT, &mut patterns, &AnalyzerConfig::default());
        let source = patterns[0].source.as_ref().unwrap();
        assert_eq!(source.source_text.as_deref(), Some("melody = Pattern(lead)"));
        assert_eq!(source.start_column, Some(1));
    }

    #[test]
    fn test_beat_tolerance() {
        let mut patterns = vec![LivePattern::new("melody", "lead")
            .with_event(LiveNoteEvent::new(64, 100, 2.0005, 1.0))
            .with_event(LiveNoteEvent::new(64, 100, 2.01, 1.0))];
        let report = attach_source_info(SCRIPT, &mut patterns, &AnalyzerConfig::default());
        assert!(patterns[0].events[0].source.is_some());
        assert!(patterns[0].events[1].source.is_none());
        assert_eq!(report.notes_unmatched, 1);
    }

    #[test]
    fn test_note_number_must_match_exactly() {
        let mut patterns = vec![
            LivePattern::new("melody", "lead").with_event(LiveNoteEvent::new(65, 100, 2.0, 1.0))
        ];
        attach_source_info(SCRIPT, &mut patterns, &AnalyzerConfig::default());
        assert!(patterns[0].events[0].source.is_none());
    }

    #[test]
    fn test_falls_back_to_display_name() {
        let mut patterns = vec![LivePattern::new("melody", "Unnamed")
            .with_event(LiveNoteEvent::new(60, 100, 0.0, 1.0))];
        let report = attach_source_info(SCRIPT, &mut patterns, &AnalyzerConfig::default());
        assert_eq!(report.patterns_attached, 1);
        assert!(patterns[0].events[0].source.is_some());
    }

    #[test]
    fn test_stale_info_is_cleared() {
        let stale = SourceLocationInfo {
            start_offset: 0,
            end_offset: 3,
            start_line: 1,
            start_column: None,
            source_text: None,
            instrument_name: "gone".to_string(),
        };
        let mut event = LiveNoteEvent::new(60, 100, 0.0, 1.0);
        event.source = Some(stale.clone());
        let mut pattern = LivePattern::new("other", "nobody").with_event(event);
        pattern.source = Some(stale);

        let mut patterns = vec![pattern];
        let report = attach_source_info(SCRIPT, &mut patterns, &AnalyzerConfig::default());
        assert_eq!(report.patterns_unmatched, 1);
        assert!(patterns[0].source.is_none());
        assert!(patterns[0].events[0].source.is_none());
    }
}
