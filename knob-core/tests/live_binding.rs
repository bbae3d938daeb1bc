use knob_core::binder::{LiveParameterBinder, ParameterType};
use knob_core::structure::{analyze, attach_source_info};
use knob_core::types::{
    shared_graph, AnalyzerConfig, BinderConfig, EngineContext, LiveGraph, LiveNoteEvent,
    LivePattern, SourceBuffer, TextBuffer,
};
use knob_core::{detect_literals, scan_literals};

const SCRIPT: &str = r#"// live set
Tempo = 120;
var lead = new Synth();
lead.Name = "Lead";
var melody = new Pattern(lead);
melody.Add(new NoteEvent { Beat = 0.0, Note = 60, Velocity = 100 });
melody.Add(new NoteEvent { Beat = 1.0, Note = 64, Velocity = 90 });
Print("120 BPM"); // tempo 90
level = 0.5; // @slider(0, 1, 0.05, "Level")
"#;

/// What executing `SCRIPT` would leave in the engine
fn executed() -> Vec<LivePattern> {
    vec![LivePattern::new("melody", "Lead")
        .with_event(LiveNoteEvent::new(60, 100, 0.0, 1.0))
        .with_event(LiveNoteEvent::new(64, 90, 1.0, 1.0))]
}

#[test]
fn test_scan_skips_strings_and_comments() {
    let literals = detect_literals(SCRIPT);
    assert!(literals.iter().all(|l| l.line != 8));

    let tempo = &literals[0];
    assert_eq!(tempo.original_text, "120");
    assert_eq!(tempo.line, 2);
    let slider = tempo.slider.as_ref().unwrap();
    assert_eq!((slider.min_value, slider.max_value), (20.0, 300.0));

    let level = literals.iter().find(|l| l.line == 9).unwrap();
    assert_eq!(level.slider.as_ref().unwrap().label.as_deref(), Some("Level"));
    assert!(scan_literals(SCRIPT).errors.is_empty());
}

#[test]
fn test_attach_then_bind_then_edit() {
    let mut patterns = executed();
    let report = attach_source_info(SCRIPT, &mut patterns, &AnalyzerConfig::default());
    assert_eq!(report.patterns_attached, 1);
    assert_eq!(report.notes_attached, 2);

    let graph = shared_graph(LiveGraph {
        patterns,
        ..LiveGraph::default()
    });
    let mut binder = LiveParameterBinder::new(
        SourceBuffer::new(SCRIPT),
        EngineContext::new(graph.clone()),
        BinderConfig::default(),
    );

    // Second note's velocity
    let velocity = binder
        .bindings()
        .into_iter()
        .filter(|b| b.parameter_type == ParameterType::Velocity)
        .nth(1)
        .unwrap();
    assert_eq!(velocity.value, 90.0);

    let change = binder.update_parameter(velocity.id, 70.0).unwrap();
    assert_eq!(change.new_text, "70");
    assert!(binder
        .buffer()
        .text()
        .contains("Note = 64, Velocity = 70 }"));

    let graph = graph.read().unwrap();
    assert_eq!(graph.patterns[0].events[0].velocity, 100);
    assert_eq!(graph.patterns[0].events[1].velocity, 70);
}

#[test]
fn test_spans_stay_valid_across_edits() {
    let mut binder = LiveParameterBinder::new(
        SourceBuffer::new(SCRIPT),
        EngineContext::new(shared_graph(LiveGraph::new())),
        BinderConfig::default(),
    );

    let tempo = binder
        .bindings()
        .into_iter()
        .find(|b| b.parameter_type == ParameterType::Tempo)
        .unwrap();
    binder.update_parameter(tempo.id, 96.0).unwrap();

    let text = binder.buffer().text().to_string();
    for record in binder.bindings() {
        let slice = record.span.slice(&text).unwrap();
        assert_eq!(slice.parse::<f64>().ok(), Some(record.value), "{}", record.name);
    }
}

#[test]
fn test_rebind_after_external_edit() {
    let mut binder = LiveParameterBinder::new(
        SourceBuffer::new(SCRIPT),
        EngineContext::new(shared_graph(LiveGraph::new())),
        BinderConfig::default(),
    );
    let before = binder.bindings().len();

    let text = format!("{}Bpm = 140;\n", binder.buffer().text());
    binder.buffer_mut().replace(0, SCRIPT.len(), &text);
    binder.refresh();

    assert_eq!(binder.bindings().len(), before + 1);
    let structure = analyze(binder.buffer().text());
    assert_eq!(structure.note_count(), 2);
}
