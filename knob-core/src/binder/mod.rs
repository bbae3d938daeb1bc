//! Live Parameter Binder
//!
//! Turns numeric literals in the script into live controls. Each binding ties
//! a source span to a mutation closure; moving a control rewrites the literal
//! in the text buffer and pushes the value into the running engine.
//!
//! The binder owns its text buffer and binding table. Other threads talk to
//! it through a [`BinderHandle`]; the owning thread drains their requests with
//! [`LiveParameterBinder::process_requests`].

mod binding;
mod format;
mod handle;
mod scans;

pub use binding::{
    BindingId, BindingRecord, LiveParameterBinding, MutationFn, ParameterChange, ParameterType,
};
pub use format::format_like;
pub use handle::{BinderHandle, BinderRequest};

use crate::error::{AnalysisError, ErrorKind};
use crate::types::{BinderConfig, EngineContext, LiveNoteEvent, TextBuffer, TransportParam};
use binding::BindingTable;
use crossbeam_channel::{unbounded, Receiver, Sender};
use scans::ScanHit;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Oldest errors are dropped past this many
const MAX_ERRORS: usize = 32;

pub struct LiveParameterBinder<B: TextBuffer> {
    buffer: B,
    engine: EngineContext,
    config: BinderConfig,
    table: Arc<Mutex<BindingTable>>,
    /// Text of the last analysis pass, for the unchanged-text short circuit
    last_text: Option<String>,
    active: bool,
    next_id: BindingId,
    observers: Vec<Sender<ParameterChange>>,
    request_tx: Sender<BinderRequest>,
    request_rx: Receiver<BinderRequest>,
    errors: Vec<AnalysisError>,
}

impl<B: TextBuffer> LiveParameterBinder<B> {
    pub fn new(buffer: B, engine: EngineContext, config: BinderConfig) -> Self {
        let (request_tx, request_rx) = unbounded();
        let mut binder = LiveParameterBinder {
            buffer,
            engine,
            config,
            table: Arc::new(Mutex::new(BindingTable::default())),
            last_text: None,
            active: false,
            next_id: 0,
            observers: Vec::new(),
            request_tx,
            request_rx,
            errors: Vec::new(),
        };
        if config.auto_start {
            binder.start();
        }
        binder
    }

    /// Begin tracking and bind the buffer's current text immediately
    pub fn start(&mut self) {
        self.active = true;
        self.last_text = None;
        self.refresh();
    }

    /// Stop tracking and drop every binding
    pub fn stop(&mut self) {
        self.active = false;
        self.last_text = None;
        lock(&self.table).clear();
        log::debug!("binder stopped");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Re-analyze the buffer's current text
    pub fn refresh(&mut self) {
        let text = self.buffer.text().to_string();
        self.analyze_and_bind(&text);
    }

    /// Rebuild the binding table from `text`
    ///
    /// Does nothing while stopped or when `text` equals the last analyzed
    /// text. The previous table is discarded wholesale.
    pub fn analyze_and_bind(&mut self, text: &str) {
        if !self.active || self.last_text.as_deref() == Some(text) {
            return;
        }

        let battery = scans::run_battery(text);
        for error in &battery.errors {
            log::warn!("binder: {}", error);
        }

        let bindings: Vec<_> = battery
            .hits
            .into_iter()
            .map(|hit| self.bind(hit))
            .collect();
        log::debug!("binder: {} bindings", bindings.len());

        lock(&self.table).replace_all(bindings);
        self.errors = battery.errors;
        self.last_text = Some(text.to_string());
    }

    fn bind(&mut self, hit: ScanHit) -> LiveParameterBinding {
        let id = self.next_id;
        self.next_id += 1;
        let mutate = self.mutation_for(&hit);
        LiveParameterBinding {
            id,
            name: hit.name,
            parameter_type: hit.parameter_type,
            value: hit.value,
            min_value: hit.min_value,
            max_value: hit.max_value,
            step: hit.step,
            source_span: hit.span,
            original_text: hit.original_text,
            anchor: hit.anchor,
            mutate,
        }
    }

    /// Build the closure that pushes a value into the engine
    ///
    /// Note-field closures find their event at call time through the source
    /// info attached to it, so they follow whatever live graph exists then.
    fn mutation_for(&self, hit: &ScanHit) -> MutationFn {
        match hit.parameter_type {
            ParameterType::Tempo => {
                let transport = self.engine.transport.clone();
                Arc::new(move |value: f64| match &transport {
                    Some(transport) => transport.set_param(TransportParam::Tempo, value),
                    None => log::trace!("tempo binding: no transport attached"),
                })
            }
            ParameterType::Slider => {
                let graph = self.engine.graph.clone();
                let name = hit.name.clone();
                Arc::new(move |value: f64| match graph.write() {
                    Ok(mut graph) => {
                        graph.controls.insert(name.clone(), value);
                    }
                    Err(_) => log::trace!("slider binding '{}': live graph poisoned", name),
                })
            }
            field => {
                let graph = self.engine.graph.clone();
                let anchor = hit.anchor;
                Arc::new(move |value: f64| {
                    let Ok(mut graph) = graph.write() else {
                        log::trace!("{} binding: live graph poisoned", field);
                        return;
                    };
                    match graph.note_event_at_mut(anchor) {
                        Some(event) => apply_note_field(event, field, value),
                        None => log::trace!("{} binding at {}: no live note event", field, anchor),
                    }
                })
            }
        }
    }

    /// Move binding `id` to `value`
    ///
    /// Clamps, rewrites the literal in the buffer, fixes up spans, runs the
    /// mutation closure and notifies subscribers, in that order. Returns
    /// `None` for an unknown id, a non-finite value or a buffer that no
    /// longer matches the binding; the last two are also recorded in
    /// [`errors`](Self::errors).
    pub fn update_parameter(&mut self, id: BindingId, value: f64) -> Option<ParameterChange> {
        let binding = lock(&self.table).get(id).cloned()?;
        let span = binding.source_span;

        if !value.is_finite() {
            self.fail(AnalysisError::at(
                ErrorKind::Binding,
                format!("'{}' cannot take {}", binding.name, value),
                span.start,
            ));
            return None;
        }

        let new_value = binding.clamp(value);
        let new_text = format_like(&binding.original_text, new_value);

        if binding.source_span.slice(self.buffer.text()) != Some(binding.original_text.as_str()) {
            self.fail(AnalysisError::at(
                ErrorKind::Binding,
                format!("'{}' no longer matches the buffer", binding.name),
                span.start,
            ));
            return None;
        }
        if !self.buffer.replace(span.start, span.len(), &new_text) {
            self.fail(AnalysisError::at(
                ErrorKind::Binding,
                format!("buffer rejected edit for '{}'", binding.name),
                span.start,
            ));
            return None;
        }

        lock(&self.table).apply_edit(id, &new_text, new_value);

        (binding.mutate)(new_value);

        let change = ParameterChange {
            binding_id: id,
            name: binding.name,
            parameter_type: binding.parameter_type,
            old_value: binding.value,
            new_value,
            span,
            new_text,
        };
        self.observers.retain(|tx| tx.send(change.clone()).is_ok());
        Some(change)
    }

    /// Update whichever binding's span contains `offset`
    pub fn update_parameter_at_offset(
        &mut self,
        offset: usize,
        value: f64,
    ) -> Option<ParameterChange> {
        let id = lock(&self.table).at_offset(offset).map(|b| b.id)?;
        self.update_parameter(id, value)
    }

    /// Apply every request queued through a [`BinderHandle`]
    ///
    /// Must be called on the thread that owns the binder. Returns the number
    /// of requests handled.
    pub fn process_requests(&mut self) -> usize {
        let requests: Vec<_> = self.request_rx.try_iter().collect();
        for request in &requests {
            match *request {
                BinderRequest::UpdateParameter { id, value } => {
                    self.update_parameter(id, value);
                }
                BinderRequest::UpdateAtOffset { offset, value } => {
                    self.update_parameter_at_offset(offset, value);
                }
                BinderRequest::Refresh => self.refresh(),
                BinderRequest::Start => self.start(),
                BinderRequest::Stop => self.stop(),
            }
        }
        requests.len()
    }

    pub fn handle(&self) -> BinderHandle {
        BinderHandle::new(self.request_tx.clone())
    }

    /// Receive a [`ParameterChange`] for every successful update
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<ParameterChange> {
        let (tx, rx) = unbounded();
        self.observers.push(tx);
        rx
    }

    pub fn bindings(&self) -> Vec<BindingRecord> {
        lock(&self.table).iter().map(|b| b.record()).collect()
    }

    pub fn binding(&self, id: BindingId) -> Option<BindingRecord> {
        lock(&self.table).get(id).map(|b| b.record())
    }

    pub fn binding_at(&self, offset: usize) -> Option<BindingRecord> {
        lock(&self.table).at_offset(offset).map(|b| b.record())
    }

    pub fn errors(&self) -> &[AnalysisError] {
        &self.errors
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    pub fn engine(&self) -> &EngineContext {
        &self.engine
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Direct buffer access for external edits; call [`refresh`](Self::refresh)
    /// (or let the host's debounce do it) afterwards
    pub fn buffer_mut(&mut self) -> &mut B {
        &mut self.buffer
    }

    pub fn into_buffer(self) -> B {
        self.buffer
    }

    fn fail(&mut self, error: AnalysisError) {
        log::warn!("binder: {}", error);
        if self.errors.len() >= MAX_ERRORS {
            self.errors.remove(0);
        }
        self.errors.push(error);
    }
}

fn apply_note_field(event: &mut LiveNoteEvent, field: ParameterType, value: f64) {
    match field {
        ParameterType::Velocity => event.velocity = midi_byte(value),
        ParameterType::Note => event.note = midi_byte(value),
        ParameterType::Beat => event.beat = value,
        ParameterType::Duration => event.duration = value,
        ParameterType::Tempo | ParameterType::Slider => {}
    }
}

/// Truncates, matching how integer literals are rendered
fn midi_byte(value: f64) -> u8 {
    value.trunc().clamp(0.0, 127.0) as u8
}

fn lock(table: &Mutex<BindingTable>) -> MutexGuard<'_, BindingTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests;
