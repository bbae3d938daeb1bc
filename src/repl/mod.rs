//! Interactive loop for a live session
//!
//! Terminal input, file-watch events and played notes all arrive on
//! crossbeam channels and are handled on this thread, which owns the
//! session. Between events the loop polls the session so debounced
//! re-analysis and cross-thread binder requests run here too.

pub mod watcher;

use crate::commands::{create_registry, CommandContext, CommandResult};
use crate::engine::NoteTriggered;
use crate::session::LoadReport;
use anyhow::{Context, Result};
use colored::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use watcher::{ScriptWatcher, WatchEvent};

/// Longest the loop sleeps without an event, so handle requests are served
const IDLE_POLL: Duration = Duration::from_millis(50);

enum ReplEvent {
    Input(Result<String, ReadlineError>),
}

pub struct Repl {
    editor: Option<DefaultEditor>,
    ctx: CommandContext,
    notes: Receiver<NoteTriggered>,
    tx_input: Sender<ReplEvent>,
    rx_input: Receiver<ReplEvent>,
    tx_watch: Sender<WatchEvent>,
    rx_watch: Receiver<WatchEvent>,
    watcher: Option<ScriptWatcher>,
}

impl Repl {
    /// `notes` carries played notes from the sequencer, if playback is on
    pub fn new(ctx: CommandContext, notes: Option<Receiver<NoteTriggered>>) -> Result<Self> {
        let editor = DefaultEditor::new().context("failed to initialise line editor")?;
        let (tx_input, rx_input) = unbounded();
        let (tx_watch, rx_watch) = unbounded();

        Ok(Repl {
            editor: Some(editor),
            ctx,
            // A never-ready receiver keeps the select arm inert without playback
            notes: notes.unwrap_or_else(crossbeam_channel::never),
            tx_input,
            rx_input,
            tx_watch,
            rx_watch,
            watcher: None,
        })
    }

    /// Load `path` into the session and watch it for changes
    pub fn open_script(&mut self, path: &Path) -> Result<LoadReport> {
        let report = self.load(path)?;
        let watcher = ScriptWatcher::new(path, self.tx_watch.clone())
            .with_context(|| format!("failed to watch {}", path.display()))?;
        self.watcher = Some(watcher);
        if let Some(clock) = &self.ctx.clock {
            clock.start();
        }
        Ok(report)
    }

    fn load(&mut self, path: &Path) -> Result<LoadReport> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(self.ctx.session.load_script(&text))
    }

    pub fn run(&mut self) -> Result<()> {
        println!(
            "{} {}",
            "knob".bright_yellow().bold(),
            "live parameter binding".bright_cyan()
        );
        println!(
            "Type '{}' for commands, '{}' or {} to exit.\n",
            "help".bright_green(),
            "quit".bright_red(),
            "Ctrl+C".bright_red()
        );

        let mut editor = self.editor.take().context("line editor already in use")?;
        let tx_input = self.tx_input.clone();
        thread::spawn(move || loop {
            let prompt = format!("{} ", "knob>".bright_magenta().bold());
            match editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if !line.is_empty() {
                        let _ = editor.add_history_entry(&line);
                    }
                    if tx_input.send(ReplEvent::Input(Ok(line))).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let _ = tx_input.send(ReplEvent::Input(Err(err)));
                    break;
                }
            }
        });

        let registry = create_registry();

        loop {
            let timeout = self
                .ctx
                .session
                .time_until_due(Instant::now())
                .map_or(IDLE_POLL, |due| due.min(IDLE_POLL));

            crossbeam_channel::select! {
                recv(self.rx_input) -> msg => match msg {
                    Ok(ReplEvent::Input(Ok(line))) => {
                        if line.is_empty() {
                            continue;
                        }
                        match registry.execute(&line, &mut self.ctx) {
                            CommandResult::Success => {}
                            CommandResult::Message(msg) => println!("{}", msg),
                            CommandResult::Exit => {
                                println!("{}", "Goodbye!".bright_cyan());
                                break;
                            }
                            CommandResult::Error(e) => {
                                println!("{} {}", "Error:".bright_red().bold(), e.red());
                            }
                            CommandResult::Watch(path) => self.watch(PathBuf::from(path)),
                            CommandResult::NotACommand => println!(
                                "{} unknown command '{}' (try 'help')",
                                "Error:".bright_red().bold(),
                                line
                            ),
                        }
                    }
                    Ok(ReplEvent::Input(Err(ReadlineError::Interrupted)))
                    | Ok(ReplEvent::Input(Err(ReadlineError::Eof))) => {
                        println!("{}", "Goodbye!".bright_cyan());
                        break;
                    }
                    Ok(ReplEvent::Input(Err(err))) => {
                        println!(
                            "{} {}",
                            "Error reading input:".bright_red().bold(),
                            err.to_string().red()
                        );
                        break;
                    }
                    Err(_) => break,
                },

                recv(self.rx_watch) -> msg => match msg {
                    Ok(WatchEvent::Changed(path)) => self.reload(&path),
                    Ok(WatchEvent::Error(e)) => println!("{} Watch error: {}", "Error:".red(), e),
                    Err(_) => break,
                },

                recv(self.notes) -> msg => {
                    if let Ok(note) = msg {
                        let line = note.source.as_ref().map_or(0, |s| s.start_line);
                        log::debug!(
                            "played {} {} vel {} (line {})",
                            note.pattern, note.note, note.velocity, line
                        );
                    }
                },

                default(timeout) => {}
            }

            if self.ctx.session.poll(Instant::now()) {
                log::debug!("re-analysed after edits");
            }
        }

        Ok(())
    }

    fn watch(&mut self, path: PathBuf) {
        match self.open_script(&path) {
            Ok(report) => println!(
                "{} Watching {} ({} patterns, {} notes, {} bindings)",
                "👀".bright_cyan(),
                path.display().to_string().bright_green(),
                report.patterns,
                report.notes,
                report.bindings
            ),
            Err(e) => println!("{} {:#}", "Error:".red(), e),
        }
    }

    /// Re-run the script after the watched file changed on disk
    fn reload(&mut self, path: &Path) {
        // Editors often report one save as several events
        match std::fs::read_to_string(path) {
            Ok(text) if text == self.ctx.session.text() => {}
            Ok(text) => {
                let report = self.ctx.session.load_script(&text);
                println!(
                    "{} Reloaded {} ({} bindings)",
                    "⚡".bright_yellow(),
                    path.display(),
                    report.bindings
                );
                for error in &report.attach.errors {
                    println!("{} {}", "warning:".yellow(), error);
                }
            }
            Err(e) => println!("{} Failed to read {}: {}", "Error:".red(), path.display(), e),
        }
    }
}
