//! Live engine object model
//!
//! These are the objects a running script produces and the sequencer reads
//! while playing. The analysis side never owns them: it only stamps
//! [`SourceLocationInfo`] onto them and mutates individual fields through
//! binding closures.

use super::span::Span;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Where in the source text a live object was defined
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceLocationInfo {
    pub start_offset: usize,
    pub end_offset: usize,
    /// 1-based line of `start_offset`
    pub start_line: usize,
    pub start_column: Option<usize>,
    pub source_text: Option<String>,
    pub instrument_name: String,
}

impl SourceLocationInfo {
    pub fn span(&self) -> Span {
        Span::new(self.start_offset, self.end_offset)
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.span().contains(offset)
    }
}

/// A single note event inside a live pattern
#[derive(Debug, Clone, PartialEq)]
pub struct LiveNoteEvent {
    pub note: u8,
    pub velocity: u8,
    /// Position inside the pattern, in beats
    pub beat: f64,
    /// Length in beats
    pub duration: f64,
    pub source: Option<SourceLocationInfo>,
}

impl LiveNoteEvent {
    pub fn new(note: u8, velocity: u8, beat: f64, duration: f64) -> Self {
        LiveNoteEvent {
            note,
            velocity,
            beat,
            duration,
            source: None,
        }
    }
}

/// A live pattern: an ordered list of note events bound to one instrument
#[derive(Debug, Clone, PartialEq)]
pub struct LivePattern {
    /// Display name of the pattern
    pub name: String,
    /// Display name of the instrument that plays this pattern
    pub instrument_name: String,
    pub events: Vec<LiveNoteEvent>,
    pub source: Option<SourceLocationInfo>,
}

impl LivePattern {
    pub fn new(name: impl Into<String>, instrument_name: impl Into<String>) -> Self {
        LivePattern {
            name: name.into(),
            instrument_name: instrument_name.into(),
            events: Vec::new(),
            source: None,
        }
    }

    pub fn with_event(mut self, event: LiveNoteEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Loop length in whole bars of 4 beats (at least one bar)
    pub fn length_beats(&self) -> f64 {
        let last = self
            .events
            .iter()
            .map(|e| e.beat + e.duration)
            .fold(0.0_f64, f64::max);
        ((last / 4.0).ceil() * 4.0).max(4.0)
    }
}

/// The full set of live objects produced by executing a script
#[derive(Debug, Clone, Default)]
pub struct LiveGraph {
    pub patterns: Vec<LivePattern>,
    /// Free-standing named controls driven by `@slider` annotations
    pub controls: HashMap<String, f64>,
}

impl LiveGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the note event whose attached source span contains `offset`
    pub fn note_event_at_mut(&mut self, offset: usize) -> Option<&mut LiveNoteEvent> {
        self.patterns
            .iter_mut()
            .flat_map(|p| p.events.iter_mut())
            .find(|e| e.source.as_ref().is_some_and(|s| s.contains(offset)))
    }

    pub fn note_event_at(&self, offset: usize) -> Option<&LiveNoteEvent> {
        self.patterns
            .iter()
            .flat_map(|p| p.events.iter())
            .find(|e| e.source.as_ref().is_some_and(|s| s.contains(offset)))
    }

    pub fn event_count(&self) -> usize {
        self.patterns.iter().map(|p| p.events.len()).sum()
    }
}

/// Live graph shared between the editing thread and the sequencer thread
pub type SharedLiveGraph = Arc<RwLock<LiveGraph>>;

pub fn shared_graph(graph: LiveGraph) -> SharedLiveGraph {
    Arc::new(RwLock::new(graph))
}

/// Transport parameters the engine integration layer can set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransportParam {
    /// Beats per minute
    Tempo,
}

/// Setter dispatch for the engine's transport/sequencer object
pub trait TransportControl: Send + Sync {
    fn set_param(&self, param: TransportParam, value: f64);

    fn param(&self, _param: TransportParam) -> Option<f64> {
        None
    }
}

/// Everything a binding closure may touch in the running engine
#[derive(Clone, Default)]
pub struct EngineContext {
    pub graph: SharedLiveGraph,
    pub transport: Option<Arc<dyn TransportControl>>,
}

impl EngineContext {
    pub fn new(graph: SharedLiveGraph) -> Self {
        EngineContext {
            graph,
            transport: None,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn TransportControl>) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("graph", &self.graph)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn located(start: usize, end: usize) -> SourceLocationInfo {
        SourceLocationInfo {
            start_offset: start,
            end_offset: end,
            start_line: 1,
            start_column: None,
            source_text: None,
            instrument_name: "Lead".to_string(),
        }
    }

    #[test]
    fn test_note_event_lookup_by_offset() {
        let mut event = LiveNoteEvent::new(60, 100, 0.0, 1.0);
        event.source = Some(located(10, 40));
        let mut graph = LiveGraph::new();
        graph
            .patterns
            .push(LivePattern::new("melody", "Lead").with_event(event));

        assert!(graph.note_event_at(9).is_none());
        graph.note_event_at_mut(25).unwrap().velocity = 64;
        assert_eq!(graph.patterns[0].events[0].velocity, 64);
    }

    #[test]
    fn test_pattern_length_rounds_to_bars() {
        let pattern = LivePattern::new("p", "i")
            .with_event(LiveNoteEvent::new(60, 100, 0.0, 1.0))
            .with_event(LiveNoteEvent::new(62, 100, 4.5, 0.5));
        assert_eq!(pattern.length_beats(), 8.0);
        assert_eq!(LivePattern::new("empty", "i").length_beats(), 4.0);
    }
}
