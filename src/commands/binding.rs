//! Binding and analysis commands

use crate::commands::{CommandContext, CommandResult};
use colored::*;
use knob_core::binder::BindingId;
use knob_core::scanner::detect_literals;
use knob_core::types::{LineIndex, TextBuffer};
use std::time::Instant;

/// Handle `bindings`
pub fn cmd_bindings(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    let binder = ctx.session.binder();
    if !binder.is_active() {
        return CommandResult::Message("Live binding is off (use 'start')".to_string());
    }
    let bindings = binder.bindings();
    if bindings.is_empty() {
        return CommandResult::Message("No bindings".to_string());
    }

    let index = LineIndex::new(binder.buffer().text());
    let mut output = format!("Bindings ({}):", bindings.len());
    for b in &bindings {
        output.push_str(&format!(
            "\n  [{}] {} {} = {} ({}..{}, step {}) line {}",
            b.id.to_string().bright_yellow(),
            b.parameter_type.to_string().cyan(),
            b.name,
            b.value,
            b.min_value,
            b.max_value,
            b.step,
            index.line_of(b.span.start)
        ));
    }
    CommandResult::Message(output)
}

/// Handle `set <id> <value>`
pub fn cmd_set(args: &str, ctx: &mut CommandContext) -> CommandResult {
    let Some((id, value)) = parse_pair(args) else {
        return CommandResult::Error("Usage: set <id> <value>".to_string());
    };
    update(ctx, id, value)
}

/// Handle `nudge <id> <steps>`: move by whole slider steps (negative for down)
pub fn cmd_nudge(args: &str, ctx: &mut CommandContext) -> CommandResult {
    let Some((id, steps)) = parse_pair(args) else {
        return CommandResult::Error("Usage: nudge <id> <steps>".to_string());
    };
    let Some(binding) = ctx.session.binder().binding(id) else {
        return CommandResult::Error(format!("No binding {}", id));
    };
    update(ctx, id, binding.value + steps * binding.step)
}

fn update(ctx: &mut CommandContext, id: BindingId, value: f64) -> CommandResult {
    if ctx.session.binder().binding(id).is_none() {
        return CommandResult::Error(format!("No binding {}", id));
    }
    match ctx.session.set_parameter(id, value, Instant::now()) {
        Some(change) => CommandResult::Message(format!(
            "{} {} -> {}",
            change.name.cyan(),
            change.old_value,
            change.new_text.bright_green()
        )),
        None => {
            let reason = ctx
                .session
                .errors()
                .last()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "update rejected".to_string());
            CommandResult::Error(reason)
        }
    }
}

fn parse_pair(args: &str) -> Option<(BindingId, f64)> {
    let mut parts = args.split_whitespace();
    let id = parts.next()?.parse().ok()?;
    let value = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((id, value))
}

/// Handle `literals`
pub fn cmd_literals(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    let literals = detect_literals(ctx.session.text());
    if literals.is_empty() {
        return CommandResult::Message("No numeric literals".to_string());
    }

    let mut output = format!("Literals ({}):", literals.len());
    for literal in &literals {
        let range = literal
            .slider
            .as_ref()
            .map(|s| match &s.label {
                Some(label) => format!("{}..{} \"{}\"", s.min_value, s.max_value, label),
                None => format!("{}..{}", s.min_value, s.max_value),
            })
            .unwrap_or_default();
        output.push_str(&format!(
            "\n  {}:{} {} [{}] {}",
            literal.line,
            literal.column,
            literal.original_text.bright_yellow(),
            literal.inferred_context.as_deref().unwrap_or("-"),
            range
        ));
    }
    CommandResult::Message(output)
}

/// Handle `structure`
pub fn cmd_structure(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    let analysis = ctx.session.analysis();
    let mut output = format!("Instruments ({}):", analysis.instruments.len());
    for instrument in &analysis.instruments {
        output.push_str(&format!(
            "\n  {} ({} {}) line {}, {} references",
            instrument.name.cyan(),
            instrument.instrument_type,
            instrument.variable_name,
            instrument.line,
            instrument.reference_spans.len()
        ));
    }

    output.push_str(&format!("\nPatterns ({}):", analysis.patterns.len()));
    for pattern in &analysis.patterns {
        output.push_str(&format!(
            "\n  {} -> {} line {}",
            pattern.variable_name.cyan(),
            pattern.instrument_name,
            pattern.line
        ));
        for note in &pattern.notes {
            output.push_str(&format!(
                "\n    note {} vel {} beat {} dur {} (line {})",
                note.note, note.velocity, note.beat, note.duration, note.line
            ));
        }
    }

    for error in &analysis.errors {
        output.push_str(&format!("\n{} {}", "warning:".yellow(), error));
    }
    CommandResult::Message(output)
}

/// Handle `regions`
pub fn cmd_regions(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    let regions = ctx.session.analysis().instrument_regions();
    if regions.is_empty() {
        return CommandResult::Message("No instrument regions".to_string());
    }

    let index = LineIndex::new(ctx.session.text());
    let mut names: Vec<_> = regions.keys().collect();
    names.sort();

    let mut output = String::from("Regions:");
    for name in names {
        let mut lines: Vec<String> = regions[name]
            .iter()
            .map(|span| {
                let first = index.line_of(span.start);
                let last = index.line_of(span.end.saturating_sub(1).max(span.start));
                if first == last {
                    first.to_string()
                } else {
                    format!("{}-{}", first, last)
                }
            })
            .collect();
        lines.dedup();
        output.push_str(&format!("\n  {}: lines {}", name.cyan(), lines.join(", ")));
    }
    CommandResult::Message(output)
}

/// Handle `edit <line> <text>`: replace one line of the script
pub fn cmd_edit(args: &str, ctx: &mut CommandContext) -> CommandResult {
    let (line, text) = match args.split_once(' ') {
        Some((line, text)) => (line, text),
        None => (args, ""),
    };
    let Ok(line) = line.parse::<usize>() else {
        return CommandResult::Error("Usage: edit <line> <text>".to_string());
    };

    let current = ctx.session.text();
    let Some(span) = LineIndex::new(current).line_span(line, current) else {
        return CommandResult::Error(format!("No line {}", line));
    };
    if ctx
        .session
        .apply_edit(span.start, span.len(), text, Instant::now())
    {
        CommandResult::Success
    } else {
        CommandResult::Error(format!("Could not edit line {}", line))
    }
}
