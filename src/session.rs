//! Live editing session
//!
//! Owns the text buffer (through the binder), the debouncer and the live
//! graph on the UI thread. Edits from the terminal or a watched file land in
//! the buffer immediately; re-analysis waits until the debounce window has
//! been quiet.

use crate::engine::script::{instantiate, ScriptInstance};
use knob_core::binder::{BinderHandle, BindingId, LiveParameterBinder, ParameterChange};
use knob_core::error::AnalysisError;
use knob_core::structure::{attach_source_info, AttachReport, StructureAnalysis, StructureAnalyzer};
use knob_core::types::{
    shared_graph, AnalyzerConfig, BinderConfig, Debouncer, EngineContext, LiveGraph,
    LivePattern, SharedLiveGraph, SourceBuffer, TextBuffer, TransportControl, TransportParam,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_TEMPO: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub binder: BinderConfig,
    pub analyzer: AnalyzerConfig,
    pub initial_tempo: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            binder: BinderConfig::default(),
            analyzer: AnalyzerConfig::default(),
            initial_tempo: DEFAULT_TEMPO,
        }
    }
}

/// Summary of a script load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub patterns: usize,
    pub notes: usize,
    pub bindings: usize,
    pub tempo: Option<f64>,
    pub attach: AttachReport,
}

pub struct LiveSession {
    config: SessionConfig,
    binder: LiveParameterBinder<SourceBuffer>,
    graph: SharedLiveGraph,
    transport: Option<Arc<dyn TransportControl>>,
    debouncer: Debouncer,
}

impl LiveSession {
    pub fn new(config: SessionConfig, transport: Option<Arc<dyn TransportControl>>) -> Self {
        let graph = shared_graph(LiveGraph::new());
        let mut engine = EngineContext::new(graph.clone());
        if let Some(transport) = &transport {
            transport.set_param(TransportParam::Tempo, config.initial_tempo);
            engine = engine.with_transport(transport.clone());
        }

        LiveSession {
            config,
            binder: LiveParameterBinder::new(SourceBuffer::default(), engine, config.binder),
            graph,
            transport,
            debouncer: Debouncer::new(config.binder.debounce),
        }
    }

    /// Replace the script, re-instantiate the live graph and rebind
    ///
    /// Runs immediately; any pending debounced re-analysis is dropped.
    pub fn load_script(&mut self, text: &str) -> LoadReport {
        self.debouncer.cancel();
        self.binder.buffer_mut().set_text(text);

        let analysis = self.analysis();
        let ScriptInstance { patterns, tempo } = instantiate(text, &analysis);
        if let (Some(tempo), Some(transport)) = (tempo, &self.transport) {
            transport.set_param(TransportParam::Tempo, tempo);
        }

        let attach = self.replace_patterns(patterns);
        self.binder.refresh();

        let report = LoadReport {
            patterns: attach.patterns_attached + attach.patterns_unmatched,
            notes: attach.notes_attached + attach.notes_unmatched,
            bindings: self.binder.bindings().len(),
            tempo,
            attach,
        };
        log::debug!(
            "loaded script: {} patterns, {} notes, {} bindings",
            report.patterns,
            report.notes,
            report.bindings
        );
        report
    }

    /// Splice `new_text` over `len` bytes at `start`; re-analysis is debounced
    pub fn apply_edit(&mut self, start: usize, len: usize, new_text: &str, now: Instant) -> bool {
        if !self.binder.buffer_mut().replace(start, len, new_text) {
            return false;
        }
        self.debouncer.touch(now);
        true
    }

    /// Replace the whole text without re-instantiating; re-analysis is debounced
    pub fn set_text(&mut self, text: &str, now: Instant) {
        self.binder.buffer_mut().set_text(text);
        self.debouncer.touch(now);
    }

    /// Move a binding; the resulting span shifts are re-attached after the
    /// debounce window
    pub fn set_parameter(&mut self, id: BindingId, value: f64, now: Instant) -> Option<ParameterChange> {
        let change = self.binder.update_parameter(id, value)?;
        self.debouncer.touch(now);
        Some(change)
    }

    /// Drain cross-thread binder requests and run a due re-analysis
    ///
    /// Returns true if the debounce fired.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.binder.process_requests() > 0 {
            self.debouncer.touch(now);
        }
        if !self.debouncer.fire_if_due(now) {
            return false;
        }
        self.resync();
        true
    }

    /// Re-attach source info and rebind against the current text
    pub fn resync(&mut self) -> AttachReport {
        let text = self.binder.buffer().text().to_string();
        let report = match self.graph.write() {
            Ok(mut graph) => attach_source_info(&text, &mut graph.patterns, &self.config.analyzer),
            Err(_) => {
                log::warn!("session: live graph poisoned, skipping attach");
                AttachReport::default()
            }
        };
        self.binder.refresh();
        log::debug!(
            "resync: {} notes attached, {} bindings",
            report.notes_attached,
            self.binder.bindings().len()
        );
        report
    }

    /// Time the event loop may wait before the next [`poll`](Self::poll)
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.debouncer.time_until_due(now)
    }

    pub fn analysis(&self) -> StructureAnalysis {
        StructureAnalyzer::analyze(self.binder.buffer().text(), &self.config.analyzer)
    }

    pub fn text(&self) -> &str {
        self.binder.buffer().text()
    }

    pub fn binder(&self) -> &LiveParameterBinder<SourceBuffer> {
        &self.binder
    }

    pub fn binder_mut(&mut self) -> &mut LiveParameterBinder<SourceBuffer> {
        &mut self.binder
    }

    pub fn handle(&self) -> BinderHandle {
        self.binder.handle()
    }

    pub fn graph(&self) -> &SharedLiveGraph {
        &self.graph
    }

    pub fn transport(&self) -> Option<&Arc<dyn TransportControl>> {
        self.transport.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn errors(&self) -> &[AnalysisError] {
        self.binder.errors()
    }

    fn replace_patterns(&self, mut patterns: Vec<LivePattern>) -> AttachReport {
        let report = attach_source_info(self.text(), &mut patterns, &self.config.analyzer);
        match self.graph.write() {
            Ok(mut graph) => graph.patterns = patterns,
            Err(_) => log::warn!("session: live graph poisoned, patterns not replaced"),
        }
        report
    }
}
