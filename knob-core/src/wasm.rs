//! WASM bindings for knob-core
//!
//! The editor side of the browser build works in UTF-16 code units, so every
//! offset handed to JavaScript is converted here and nowhere else.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use crate::binder::ParameterChange;
use crate::binder::{BindingRecord, LiveParameterBinder};
use crate::scanner::DetectedLiteral;
use crate::structure::StructureAnalysis;
use crate::types::{byte_offset, utf16_offset, Span, TextBuffer};

/// A highlightable code region belonging to one instrument
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodeRegion {
    pub instrument: String,
    /// UTF-16 code unit offset
    pub start: usize,
    /// UTF-16 code unit offset (exclusive)
    pub end: usize,
}

/// Slider widget state for one binding
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SliderWidget {
    pub id: usize,
    pub name: String,
    pub kind: String,
    pub start: usize,
    pub end: usize,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Slider state for one detected literal
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LiteralWidget {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub value: f64,
    pub line: usize,
    pub column: usize,
    pub context: Option<String>,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub label: Option<String>,
}

fn utf16_span(text: &str, span: Span) -> (usize, usize) {
    (utf16_offset(text, span.start), utf16_offset(text, span.end))
}

/// Flatten an analysis into per-instrument regions, sorted by position
pub fn code_regions(text: &str, analysis: &StructureAnalysis) -> Vec<CodeRegion> {
    let mut regions: Vec<CodeRegion> = analysis
        .instrument_regions()
        .into_iter()
        .flat_map(|(instrument, spans)| {
            spans.into_iter().map(move |span| {
                let (start, end) = utf16_span(text, span);
                CodeRegion {
                    instrument: instrument.clone(),
                    start,
                    end,
                }
            })
        })
        .collect();
    regions.sort_by(|a, b| (a.start, a.end, &a.instrument).cmp(&(b.start, b.end, &b.instrument)));
    regions
}

pub fn slider_widget(text: &str, record: &BindingRecord) -> SliderWidget {
    let (start, end) = utf16_span(text, record.span);
    SliderWidget {
        id: record.id,
        name: record.name.clone(),
        kind: record.parameter_type.to_string(),
        start,
        end,
        value: record.value,
        min: record.min_value,
        max: record.max_value,
        step: record.step,
    }
}

pub fn literal_widget(text: &str, literal: &DetectedLiteral) -> LiteralWidget {
    let (start, end) = utf16_span(text, literal.span());
    let slider = literal.slider.clone().unwrap_or_else(|| {
        crate::scanner::context::default_slider(literal.value, literal.is_floating_point)
    });
    LiteralWidget {
        start,
        end,
        text: literal.original_text.clone(),
        value: literal.value,
        line: literal.line,
        column: literal.column,
        context: literal.inferred_context.clone(),
        min: slider.min_value,
        max: slider.max_value,
        step: slider.step,
        label: slider.label,
    }
}

/// Widgets for every binding, with offsets in the binder's current text
pub fn binder_widgets<B: TextBuffer>(binder: &LiveParameterBinder<B>) -> Vec<SliderWidget> {
    let text = binder.buffer().text();
    binder
        .bindings()
        .iter()
        .map(|record| slider_widget(text, record))
        .collect()
}

/// Byte offset for a UTF-16 position reported by the editor
pub fn editor_offset(text: &str, utf16: usize) -> usize {
    byte_offset(text, utf16)
}

// ============================================================================
// WASM Bindings
// ============================================================================

#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub fn detect_literals(text: &str) -> JsValue {
    let widgets: Vec<LiteralWidget> = crate::scanner::detect_literals(text)
        .iter()
        .map(|literal| literal_widget(text, literal))
        .collect();
    serde_wasm_bindgen::to_value(&widgets).unwrap_or(JsValue::NULL)
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub fn analyze_structure(text: &str) -> JsValue {
    let analysis = crate::structure::analyze(text);
    let instruments: Vec<_> = analysis
        .instruments
        .iter()
        .map(|i| {
            let (start, end) = utf16_span(text, i.definition_span);
            serde_json::json!({
                "name": i.name,
                "variable": i.variable_name,
                "type": i.instrument_type.to_string(),
                "start": start,
                "end": end,
                "line": i.line,
                "references": i.reference_spans.len(),
            })
        })
        .collect();
    let patterns: Vec<_> = analysis
        .patterns
        .iter()
        .map(|p| {
            let (start, end) = utf16_span(text, p.definition_span);
            serde_json::json!({
                "variable": p.variable_name,
                "instrument": p.instrument_name,
                "start": start,
                "end": end,
                "line": p.line,
                "notes": p.notes.iter().map(|n| serde_json::json!({
                    "note": n.note,
                    "velocity": n.velocity,
                    "beat": n.beat,
                    "duration": n.duration,
                    "line": n.line,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    let errors: Vec<String> = analysis.errors.iter().map(|e| e.to_string()).collect();

    serde_wasm_bindgen::to_value(&serde_json::json!({
        "instruments": instruments,
        "patterns": patterns,
        "errors": errors,
    }))
    .unwrap_or(JsValue::NULL)
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub fn instrument_regions(text: &str) -> JsValue {
    let analysis = crate::structure::analyze(text);
    serde_wasm_bindgen::to_value(&code_regions(text, &analysis)).unwrap_or(JsValue::NULL)
}

/// Binder for the browser editor
///
/// Tempo and slider changes reach the page through the change listener; the
/// page forwards them to its own audio engine.
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct WasmBinder {
    binder: LiveParameterBinder<crate::types::SourceBuffer>,
    change_listener: Option<js_sys::Function>,
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl WasmBinder {
    #[wasm_bindgen(constructor)]
    pub fn new(text: &str) -> Self {
        use crate::types::{shared_graph, BinderConfig, EngineContext, LiveGraph, SourceBuffer};

        let engine = EngineContext::new(shared_graph(LiveGraph::new()));
        WasmBinder {
            binder: LiveParameterBinder::new(
                SourceBuffer::new(text),
                engine,
                BinderConfig::default(),
            ),
            change_listener: None,
        }
    }

    /// Called with `{ id, name, kind, oldValue, newValue, text }` after every update
    pub fn set_change_listener(&mut self, callback: js_sys::Function) {
        self.change_listener = Some(callback);
    }

    /// Replace the document and rebind (the page debounces calls)
    pub fn set_text(&mut self, text: &str) {
        self.binder.buffer_mut().set_text(text);
        self.binder.refresh();
    }

    pub fn text(&self) -> String {
        self.binder.buffer().text().to_string()
    }

    pub fn bindings(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&binder_widgets(&self.binder)).unwrap_or(JsValue::NULL)
    }

    pub fn update_parameter(&mut self, id: usize, value: f64) -> JsValue {
        let change = self.binder.update_parameter(id, value);
        self.report(change)
    }

    /// `offset` is a UTF-16 position in the current text
    pub fn update_at_offset(&mut self, offset: usize, value: f64) -> JsValue {
        let offset = editor_offset(self.binder.buffer().text(), offset);
        let change = self.binder.update_parameter_at_offset(offset, value);
        self.report(change)
    }

    pub fn start(&mut self) {
        self.binder.start();
    }

    pub fn stop(&mut self) {
        self.binder.stop();
    }

    fn report(&self, change: Option<ParameterChange>) -> JsValue {
        let Some(change) = change else {
            return JsValue::NULL;
        };
        let payload = serde_json::json!({
            "id": change.binding_id,
            "name": change.name,
            "kind": change.parameter_type.to_string(),
            "oldValue": change.old_value,
            "newValue": change.new_value,
            "text": change.new_text,
        });
        let value = serde_wasm_bindgen::to_value(&payload).unwrap_or(JsValue::NULL);
        if let Some(callback) = &self.change_listener {
            if let Err(err) = callback.call1(&JsValue::NULL, &value) {
                log::warn!("change listener failed: {:?}", err);
            }
        }
        value
    }
}
