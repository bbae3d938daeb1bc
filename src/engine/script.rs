//! Script instantiation
//!
//! Stands in for running the script: builds the live patterns and initial
//! tempo the script declares, straight from its text. Patterns take their
//! pattern variable as name and the instrument's display name, which is what
//! a real runtime reports back.

use knob_core::scanner::scan_literals;
use knob_core::structure::StructureAnalysis;
use knob_core::types::{LiveNoteEvent, LivePattern};

/// What the engine holds after a script has run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptInstance {
    pub patterns: Vec<LivePattern>,
    /// First tempo literal in the script
    pub tempo: Option<f64>,
}

pub fn instantiate(text: &str, analysis: &StructureAnalysis) -> ScriptInstance {
    let patterns = analysis
        .patterns
        .iter()
        .map(|definition| {
            let mut pattern =
                LivePattern::new(&definition.variable_name, &definition.instrument_name);
            pattern.events = definition
                .notes
                .iter()
                .map(|n| LiveNoteEvent::new(n.note, n.velocity, n.beat, n.duration))
                .collect();
            pattern
        })
        .collect();

    let tempo = scan_literals(text)
        .literals
        .into_iter()
        .find(|l| l.inferred_context.as_deref() == Some("tempo"))
        .map(|l| l.value);

    ScriptInstance { patterns, tempo }
}
