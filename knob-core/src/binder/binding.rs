//! Bindings between source spans and live engine mutations

use crate::types::Span;
use std::fmt;
use std::sync::Arc;

pub type BindingId = usize;

/// Applies a new value to the running engine
pub type MutationFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Which scan produced a binding, and so what its closure mutates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterType {
    Tempo,
    Velocity,
    Duration,
    Beat,
    Note,
    /// `value; // @slider(...)` with a declared range
    Slider,
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterType::Tempo => "tempo",
            ParameterType::Velocity => "velocity",
            ParameterType::Duration => "duration",
            ParameterType::Beat => "beat",
            ParameterType::Note => "note",
            ParameterType::Slider => "slider",
        };
        f.write_str(name)
    }
}

/// A live, editable association between a literal and an engine mutation
#[derive(Clone)]
pub struct LiveParameterBinding {
    pub id: BindingId,
    pub name: String,
    pub parameter_type: ParameterType,
    pub value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub step: f64,
    pub source_span: Span,
    pub original_text: String,
    /// Offset of the statement the closure resolves live objects through
    pub anchor: usize,
    pub(crate) mutate: MutationFn,
}

impl LiveParameterBinding {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min_value, self.max_value)
    }

    pub fn record(&self) -> BindingRecord {
        BindingRecord {
            id: self.id,
            name: self.name.clone(),
            parameter_type: self.parameter_type,
            span: self.source_span,
            value: self.value,
            min_value: self.min_value,
            max_value: self.max_value,
            step: self.step,
        }
    }
}

impl fmt::Debug for LiveParameterBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveParameterBinding")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parameter_type", &self.parameter_type)
            .field("value", &self.value)
            .field("range", &(self.min_value..=self.max_value))
            .field("source_span", &self.source_span)
            .finish_non_exhaustive()
    }
}

/// Plain-data view of a binding for slider widgets
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BindingRecord {
    pub id: BindingId,
    pub name: String,
    pub parameter_type: ParameterType,
    pub span: Span,
    pub value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub step: f64,
}

/// Sent to subscribers after every successful update
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterChange {
    pub binding_id: BindingId,
    pub name: String,
    pub parameter_type: ParameterType,
    pub old_value: f64,
    pub new_value: f64,
    /// Span before the edit; may already be stale
    pub span: Span,
    pub new_text: String,
}

/// The binder's table, kept sorted by span start
#[derive(Debug, Default)]
pub(crate) struct BindingTable {
    bindings: Vec<LiveParameterBinding>,
}

impl BindingTable {
    pub fn replace_all(&mut self, mut bindings: Vec<LiveParameterBinding>) {
        bindings.sort_by_key(|b| b.source_span.start);
        self.bindings = bindings;
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn get(&self, id: BindingId) -> Option<&LiveParameterBinding> {
        self.bindings.iter().find(|b| b.id == id)
    }

    pub fn at_offset(&self, offset: usize) -> Option<&LiveParameterBinding> {
        self.bindings.iter().find(|b| b.source_span.contains(offset))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveParameterBinding> {
        self.bindings.iter()
    }

    /// Record that binding `id` now renders as `new_text`
    ///
    /// Its span becomes `start..start + new_text.len()`; every binding that
    /// starts after the old start moves by the length delta.
    pub fn apply_edit(&mut self, id: BindingId, new_text: &str, new_value: f64) {
        let Some(edited) = self.get(id) else {
            return;
        };
        let old = edited.source_span;
        let delta = new_text.len() as isize - old.len() as isize;

        for binding in &mut self.bindings {
            if binding.id == id {
                binding.source_span = Span::new(old.start, old.start + new_text.len());
                binding.original_text = new_text.to_string();
                binding.value = new_value;
            } else if binding.source_span.start > old.start {
                binding.source_span = binding.source_span.shifted(delta);
            }
        }
    }
}
