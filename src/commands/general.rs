//! General REPL commands (help, quit, tempo, start/stop, watch)

use crate::commands::{CommandContext, CommandResult};
use crate::engine::clock::{MAX_BPM, MIN_BPM};
use colored::*;
use knob_core::types::TransportParam;

/// Handle `help`
pub fn cmd_help(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    print_help();
    CommandResult::Success
}

/// Handle `quit` or `exit`
pub fn cmd_quit(_args: &str, _ctx: &mut CommandContext) -> CommandResult {
    CommandResult::Exit
}

/// Handle `tempo [bpm]`
///
/// Sets the transport directly; the script text is not touched. Use `set` on
/// the tempo binding to change both.
pub fn cmd_tempo(args: &str, ctx: &mut CommandContext) -> CommandResult {
    let Some(transport) = ctx.session.transport() else {
        return CommandResult::Error("Playback is disabled".to_string());
    };

    if args.is_empty() {
        let bpm = transport.param(TransportParam::Tempo).unwrap_or_default();
        return CommandResult::Message(format!("Current tempo: {:.1} BPM", bpm));
    }

    match args.parse::<f64>() {
        Ok(bpm) if (MIN_BPM..=MAX_BPM).contains(&bpm) => {
            transport.set_param(TransportParam::Tempo, bpm);
            CommandResult::Message(format!("Tempo set to {:.1} BPM", bpm).bright_green().to_string())
        }
        _ => CommandResult::Error(format!(
            "Invalid tempo. Use a value between {}-{} BPM",
            MIN_BPM, MAX_BPM
        )),
    }
}

/// Handle `start`: bind the current text and start playback
pub fn cmd_start(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    ctx.session.binder_mut().start();
    if let Some(clock) = &ctx.clock {
        clock.start();
    }
    CommandResult::Message(format!(
        "Live binding on ({} bindings)",
        ctx.session.binder().bindings().len()
    ))
}

/// Handle `stop`: drop every binding and pause playback
pub fn cmd_stop(_args: &str, ctx: &mut CommandContext) -> CommandResult {
    ctx.session.binder_mut().stop();
    if let Some(clock) = &ctx.clock {
        clock.stop();
    }
    CommandResult::Message("Live binding off".to_string())
}

/// Handle `watch <file>`
pub fn cmd_watch(args: &str, _ctx: &mut CommandContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Error("Usage: watch <file>".to_string());
    }
    CommandResult::Watch(args.to_string())
}

fn print_help() {
    println!("{}", "Knob Help".bold());
    println!("{}", "=========".bold());
    println!();
    println!("{}", "Script:".green());
    println!("  {}     - Load a script and reload it on change", "watch <file>".cyan());
    println!(
        "  {} - Replace a line (re-analysed after a quiet period)",
        "edit <line> <text>".cyan()
    );
    println!();
    println!("{}", "Bindings:".green());
    println!("  {}         - List live bindings", "bindings".cyan());
    println!("  {}   - Move a binding to a value", "set <id> <value>".cyan());
    println!("  {} - Move a binding by whole steps", "nudge <id> <steps>".cyan());
    println!("  {}         - List numeric literals and slider ranges", "literals".cyan());
    println!();
    println!("{}", "Analysis:".green());
    println!("  {}        - Instruments, patterns and notes", "structure".cyan());
    println!("  {}          - Source regions per instrument", "regions".cyan());
    println!();
    println!("{}", "Playback:".green());
    println!("  {}            - Show current tempo", "tempo".cyan());
    println!("  {}      - Set tempo", "tempo <bpm>".cyan());
    println!("  {}    - Turn live binding and playback on/off", "start / stop".cyan());
    println!();
    println!("  {}             - Show this help", "help".bright_green());
    println!("  {}             - Exit", "quit".bright_red());
}
