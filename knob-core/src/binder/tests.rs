//! Tests for the live parameter binder.

use super::*;
use crate::structure::attach_source_info;
use crate::types::{
    shared_graph, AnalyzerConfig, LiveGraph, LivePattern, SharedLiveGraph, SourceBuffer,
    TransportControl, Span,
};
use std::thread;

#[derive(Default)]
struct RecordingTransport {
    tempo: Mutex<Option<f64>>,
}

impl TransportControl for RecordingTransport {
    fn set_param(&self, param: TransportParam, value: f64) {
        match param {
            TransportParam::Tempo => *self.tempo.lock().unwrap() = Some(value),
        }
    }

    fn param(&self, param: TransportParam) -> Option<f64> {
        match param {
            TransportParam::Tempo => *self.tempo.lock().unwrap(),
        }
    }
}

const NOTES: &str = "lead = Synth();\nmelody = Pattern(lead);\nmelody.Add(new NoteEvent { Beat = 2.0, Note = 64, Velocity = 90 });\n";

fn binder_for(text: &str) -> LiveParameterBinder<SourceBuffer> {
    let engine = EngineContext::new(shared_graph(LiveGraph::new()));
    LiveParameterBinder::new(SourceBuffer::new(text), engine, BinderConfig::default())
}

/// Live graph for `NOTES` with source info attached, as a host would build it
fn attached_graph() -> SharedLiveGraph {
    let mut patterns = vec![LivePattern::new("melody", "lead")
        .with_event(LiveNoteEvent::new(64, 90, 2.0, 1.0))];
    attach_source_info(NOTES, &mut patterns, &AnalyzerConfig::default());
    shared_graph(LiveGraph {
        patterns,
        ..LiveGraph::default()
    })
}

fn find(binder: &LiveParameterBinder<SourceBuffer>, kind: ParameterType) -> BindingRecord {
    binder
        .bindings()
        .into_iter()
        .find(|b| b.parameter_type == kind)
        .unwrap()
}

#[test]
fn test_offset_invariant() {
    let text = "Tempo = 90;\nx = 5; // @slider(0, 1000)\ny = 7; // @slider(0, 10)";
    let mut binder = binder_for(text);
    let before = binder.bindings();
    assert_eq!(before.len(), 3);
    let (tempo, x, y) = (&before[0], &before[1], &before[2]);

    binder.update_parameter(x.id, 500.0).unwrap();

    let after = binder.bindings();
    assert_eq!(after[0].span, tempo.span);
    assert_eq!(after[1].span, Span::new(x.span.start, x.span.start + 3));
    assert_eq!(after[2].span, y.span.shifted(2));

    let buffer = binder.buffer().text();
    assert_eq!(after[1].span.slice(buffer), Some("500"));
    assert_eq!(after[2].span.slice(buffer), Some("7"));
}

#[test]
fn test_shrinking_edit_shifts_back() {
    let mut binder = binder_for("a = 100; // @slider(0, 1000)\nb = 3; // @slider(0, 10)");
    let before = binder.bindings();
    binder.update_parameter(before[0].id, 7.0).unwrap();
    let after = binder.bindings();
    assert_eq!(after[1].span, before[1].span.shifted(-2));
    assert_eq!(after[1].span.slice(binder.buffer().text()), Some("3"));
}

#[test]
fn test_note_field_resolves_through_source_info() {
    let graph = attached_graph();
    let engine = EngineContext::new(graph.clone());
    let mut binder =
        LiveParameterBinder::new(SourceBuffer::new(NOTES), engine, BinderConfig::default());

    let velocity = find(&binder, ParameterType::Velocity);
    binder.update_parameter(velocity.id, 110.0).unwrap();

    assert_eq!(graph.read().unwrap().patterns[0].events[0].velocity, 110);
    assert!(binder.buffer().text().contains("Velocity = 110 }"));
}

#[test]
fn test_integer_literal_truncates_in_text() {
    let graph = attached_graph();
    let mut binder = LiveParameterBinder::new(
        SourceBuffer::new(NOTES),
        EngineContext::new(graph.clone()),
        BinderConfig::default(),
    );

    let velocity = find(&binder, ParameterType::Velocity);
    let change = binder.update_parameter(velocity.id, 63.7).unwrap();
    assert_eq!(change.new_text, "63");
    // The closure gets the clamped value, not the rendered one
    assert_eq!(change.new_value, 63.7);
    assert_eq!(binder.binding(velocity.id).unwrap().value, 63.7);
    assert!(binder.buffer().text().contains("Velocity = 63 }"));
    assert_eq!(graph.read().unwrap().patterns[0].events[0].velocity, 63);
}

#[test]
fn test_non_finite_values_are_refused() {
    let mut binder = binder_for("p.Add(new NoteEvent { Beat = 1.5, Note = 60 });");
    let beat = find(&binder, ParameterType::Beat);

    for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        assert!(binder.update_parameter(beat.id, value).is_none());
    }
    assert_eq!(binder.buffer().text(), "p.Add(new NoteEvent { Beat = 1.5, Note = 60 });");
    assert_eq!(binder.binding(beat.id).unwrap().value, 1.5);
    assert_eq!(binder.errors().len(), 3);
    assert!(binder.errors().iter().all(|e| e.kind == ErrorKind::Binding));
}

#[test]
fn test_rejected_updates_keep_error_list_bounded() {
    let mut binder = binder_for("Tempo = 120;");
    let id = binder.bindings()[0].id;
    for _ in 0..100 {
        binder.update_parameter(id, f64::NAN);
    }
    assert_eq!(binder.errors().len(), MAX_ERRORS);
}

#[test]
fn test_values_are_clamped() {
    let mut binder = binder_for(NOTES);
    let velocity = find(&binder, ParameterType::Velocity);
    let change = binder.update_parameter(velocity.id, 300.0).unwrap();
    assert_eq!(change.new_value, 127.0);

    let beat = find(&binder, ParameterType::Beat);
    let change = binder.update_parameter(beat.id, -3.0).unwrap();
    assert_eq!(change.new_text, "0.0");
}

#[test]
fn test_missing_live_object_is_a_no_op() {
    // Nothing attached: the text still changes, the engine is untouched
    let mut binder = binder_for(NOTES);
    let velocity = find(&binder, ParameterType::Velocity);
    assert!(binder.update_parameter(velocity.id, 64.0).is_some());
    assert!(binder.buffer().text().contains("Velocity = 64"));
    assert!(binder.errors().is_empty());
}

#[test]
fn test_tempo_goes_through_transport() {
    let transport = Arc::new(RecordingTransport::default());
    let engine = EngineContext::new(shared_graph(LiveGraph::new())).with_transport(transport.clone());
    let mut binder = LiveParameterBinder::new(
        SourceBuffer::new("SetTempo(120);"),
        engine,
        BinderConfig::default(),
    );

    let tempo = find(&binder, ParameterType::Tempo);
    binder.update_parameter(tempo.id, 133.3).unwrap();
    assert_eq!(transport.param(TransportParam::Tempo), Some(133.0));
    assert_eq!(binder.buffer().text(), "SetTempo(133);");
}

#[test]
fn test_slider_writes_named_control() {
    let graph = shared_graph(LiveGraph::new());
    let mut binder = LiveParameterBinder::new(
        SourceBuffer::new("cutoff = 0.40; // @slider(0, 1, 0.01, \"Cutoff\")"),
        EngineContext::new(graph.clone()),
        BinderConfig::default(),
    );
    let slider = find(&binder, ParameterType::Slider);
    assert_eq!(slider.name, "Cutoff");

    binder.update_parameter(slider.id, 0.255).unwrap();
    assert!(binder.buffer().text().starts_with("cutoff = 0.2"));
    assert!(graph.read().unwrap().controls.contains_key("Cutoff"));
}

#[test]
fn test_update_at_offset() {
    let mut binder = binder_for("Tempo = 120;");
    let change = binder.update_parameter_at_offset(9, 140.0).unwrap();
    assert_eq!(change.old_value, 120.0);
    assert_eq!(binder.buffer().text(), "Tempo = 140;");
    assert!(binder.update_parameter_at_offset(2, 10.0).is_none());
}

#[test]
fn test_subscribers_see_old_span() {
    let mut binder = binder_for("Tempo = 120;");
    let changes = binder.subscribe();
    let tempo = find(&binder, ParameterType::Tempo);

    binder.update_parameter(tempo.id, 95.0);
    let change = changes.try_recv().unwrap();
    assert_eq!((change.old_value, change.new_value), (120.0, 95.0));
    assert_eq!(change.span, tempo.span);
    assert_eq!(change.new_text, "95");
}

#[test]
fn test_unchanged_text_short_circuits() {
    let mut binder = binder_for("Tempo = 120;");
    let ids: Vec<_> = binder.bindings().iter().map(|b| b.id).collect();

    binder.refresh();
    let again: Vec<_> = binder.bindings().iter().map(|b| b.id).collect();
    assert_eq!(ids, again);

    binder.analyze_and_bind("Tempo = 121;");
    assert_ne!(binder.bindings()[0].id, ids[0]);
}

#[test]
fn test_start_and_stop() {
    let config = BinderConfig::default().with_auto_start(false);
    let engine = EngineContext::new(shared_graph(LiveGraph::new()));
    let mut binder = LiveParameterBinder::new(SourceBuffer::new("Bpm = 100;"), engine, config);
    assert!(!binder.is_active());
    assert!(binder.bindings().is_empty());

    binder.analyze_and_bind("Bpm = 100;");
    assert!(binder.bindings().is_empty());

    binder.start();
    assert_eq!(binder.bindings().len(), 1);

    binder.stop();
    assert!(binder.bindings().is_empty());
}

#[test]
fn test_stale_binding_is_rejected() {
    let mut binder = binder_for("a = 1; // @slider(0, 10)");
    let id = binder.bindings()[0].id;
    binder.buffer_mut().replace(0, 0, "  ");

    assert!(binder.update_parameter(id, 4.0).is_none());
    assert_eq!(binder.errors().len(), 1);
    assert_eq!(binder.errors()[0].kind, ErrorKind::Binding);
    assert_eq!(binder.buffer().text(), "  a = 1; // @slider(0, 10)");
}

#[test]
fn test_requests_from_other_threads() {
    let mut binder = binder_for("Tempo = 120;");
    let id = binder.bindings()[0].id;
    let handle = binder.handle();

    thread::spawn(move || {
        handle.update_parameter(id, 128.0);
        handle.update_parameter_at_offset(8, 130.0);
    })
    .join()
    .unwrap();

    assert_eq!(binder.process_requests(), 2);
    assert_eq!(binder.buffer().text(), "Tempo = 130;");
}
