//! Tests for the literal scanner.

use super::*;
use crate::error::ErrorKind;

fn texts(literals: &[DetectedLiteral]) -> Vec<&str> {
    literals.iter().map(|l| l.original_text.as_str()).collect()
}

#[test]
fn test_strings_and_comments_hide_literals() {
    assert!(detect_literals(r#"Print("120 BPM"); // set to 90"#).is_empty());
    assert_eq!(texts(&detect_literals("/* 5 */ x = 6;")), vec!["6"]);
}

#[test]
fn test_annotation_wins_over_context() {
    let literals = detect_literals(r#"x = 5; // @slider(0, 10, 1, "Gain")"#);
    assert_eq!(literals.len(), 1);
    assert_eq!(
        literals[0].slider,
        Some(SliderConfig::new(0.0, 10.0, 1.0).with_label("Gain"))
    );

    // Keyword context would say 20..300 without the annotation
    let pinned = detect_literals("Tempo = 128; // @slider(60, 180)");
    assert_eq!(pinned[0].slider, Some(SliderConfig::new(60.0, 180.0, 1.0)));
}

#[test]
fn test_note_on_arguments() {
    let literals = detect_literals("lead.NoteOn(60, 100);");
    assert_eq!(texts(&literals), vec!["60", "100"]);

    assert_eq!(literals[0].inferred_context.as_deref(), Some("note"));
    assert_eq!(literals[1].inferred_context.as_deref(), Some("velocity"));
    for literal in &literals {
        let slider = literal.slider.as_ref().unwrap();
        assert_eq!((slider.min_value, slider.max_value), (0.0, 127.0));
    }
}

#[test]
fn test_note_literal_fields() {
    let text = "p.Add(new NoteEvent { Beat = 2.0, Note = 64, Velocity = 90 });";
    let literals = detect_literals(text);
    let contexts: Vec<_> = literals
        .iter()
        .map(|l| l.inferred_context.as_deref().unwrap())
        .collect();
    assert_eq!(contexts, vec!["Beat", "Note", "Velocity"]);

    let beat = literals[0].slider.as_ref().unwrap();
    assert_eq!((beat.max_value, beat.step), (16.0, 0.25));
    assert!(literals[0].is_floating_point);
}

#[test]
fn test_tempo_assignment_range() {
    let literals = detect_literals("Tempo = 128;");
    let slider = literals[0].slider.as_ref().unwrap();
    assert_eq!((slider.min_value, slider.max_value), (20.0, 300.0));
    assert_eq!(slider.label.as_deref(), Some("BPM"));
}

#[test]
fn test_offsets_match_original_text() {
    let text = "a = 1;\n  b = 22; c = .5f;\nd = 1e3;";
    let literals = detect_literals(text);
    assert_eq!(texts(&literals), vec!["1", "22", ".5f", "1e3"]);

    for literal in &literals {
        assert_eq!(literal.end_offset - literal.start_offset, literal.original_text.len());
        assert_eq!(&text[literal.start_offset..literal.end_offset], literal.original_text);
    }
    assert_eq!((literals[1].line, literals[1].column), (2, 7));
    assert_eq!(literals[3].line, 3);
}

#[test]
fn test_identifier_lookalikes_and_hex() {
    assert!(detect_literals("x1 = 2x + 0x1F;").is_empty());
    assert_eq!(texts(&detect_literals("v2 = 3;")), vec!["3"]);
}

#[test]
fn test_range_operator_is_not_a_decimal_point() {
    let literals = detect_literals("var slice = arr[0..10];");
    assert_eq!(texts(&literals), vec!["0", "10"]);
    assert_eq!(literals[1].value, 10.0);
    assert!(!literals[1].is_floating_point);
    assert_eq!(texts(&detect_literals("x = 1. + .5;")), vec!["1.", ".5"]);
}

#[test]
fn test_unary_and_binary_signs() {
    let literals = detect_literals("x = -5; y = a - 7; z = f(+2);");
    assert_eq!(texts(&literals), vec!["-5", "7", "+2"]);
    assert_eq!(literals[0].value, -5.0);
    assert_eq!(literals[0].slider, Some(SliderConfig::new(-10.0, 10.0, 1.0)));
}

#[test]
fn test_suffixes_and_float_defaults() {
    let literals = detect_literals("gain = 0.5f; ratio = 2d; amount = 0.3;");
    assert!(literals[0].float_suffix);
    assert!(literals[1].double_suffix && literals[1].is_floating_point);
    assert_eq!(literals[1].value, 2.0);

    let gain = literals[0].slider.as_ref().unwrap();
    assert_eq!((gain.max_value, gain.label.as_deref()), (1.0, Some("Level")));
    assert_eq!(literals[2].slider, Some(SliderConfig::new(0.0, 1.0, 0.01)));
}

#[test]
fn test_multiline_arguments_get_default_range() {
    let literals = detect_literals("lead.NoteOn(60,\n    100);");
    assert_eq!(literals[1].inferred_context, None);
    assert_eq!(literals[1].slider, Some(SliderConfig::new(0.0, 1000.0, 1.0)));
}

#[test]
fn test_unparsable_literal_is_reported() {
    let scan = scan_literals("x = 1e999; y = 2;");
    assert_eq!(texts(&scan.literals), vec!["2"]);
    assert_eq!(scan.errors.len(), 1);
    assert_eq!(scan.errors[0].kind, ErrorKind::Number);
    assert_eq!(scan.errors[0].offset, Some(4));
}

#[test]
fn test_scan_is_idempotent() {
    let text = "bpm = 120;\nlead.PlayNote(64, 90, 0.5); // lead\nx = 3; // @slider(0, 8)";
    assert_eq!(scan_literals(text), scan_literals(text));
}

#[test]
fn test_literal_at() {
    let literals = detect_literals("a = 10; b = 20;");
    assert_eq!(literal_at(&literals, 13).map(|l| l.value), Some(20.0));
    assert!(literal_at(&literals, 2).is_none());
}
