//! Playback thread
//!
//! Reads the shared live graph on every clock tick and emits a
//! [`NoteTriggered`] for each note event that falls inside the tick. Reading
//! the graph per tick means binder edits to velocity, beat or note are heard
//! on the next pass without restarting anything.
//!
//! The sequencer only reads source info; it never writes to the graph.

use super::clock::ClockTick;
use crossbeam_channel::{unbounded, Receiver, Sender};
use knob_core::types::{LiveGraph, SharedLiveGraph, SourceLocationInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

/// A note the sequencer just played
#[derive(Debug, Clone, PartialEq)]
pub struct NoteTriggered {
    pub pattern: String,
    pub instrument: String,
    pub note: u8,
    pub velocity: u8,
    pub duration: f64,
    /// Absolute transport beat the note fired on
    pub beat: f64,
    /// Where the note is written, for highlighting
    pub source: Option<SourceLocationInfo>,
}

/// Every note event of `graph` whose next loop occurrence lies in `[from, to)`
///
/// Each pattern loops over [`LivePattern::length_beats`](knob_core::types::LivePattern::length_beats).
pub fn due_notes(graph: &LiveGraph, from: f64, to: f64) -> Vec<NoteTriggered> {
    let mut due = Vec::new();
    for pattern in &graph.patterns {
        let length = pattern.length_beats();
        for event in &pattern.events {
            let offset = event.beat.rem_euclid(length);
            let cycles = ((from - offset) / length).ceil();
            let beat = offset + cycles * length;
            if beat >= from && beat < to {
                due.push(NoteTriggered {
                    pattern: pattern.name.clone(),
                    instrument: pattern.instrument_name.clone(),
                    note: event.note,
                    velocity: event.velocity,
                    duration: event.duration,
                    beat,
                    source: event.source.clone(),
                });
            }
        }
    }
    due
}

type Subscribers = Arc<Mutex<Vec<Sender<NoteTriggered>>>>;

#[derive(Debug)]
enum SequencerCommand {
    /// Mute or unmute without stopping the clock
    SetMuted(bool),
    Shutdown,
}

/// Handle for talking to the sequencer thread
#[derive(Clone)]
pub struct SequencerHandle {
    command_tx: Sender<SequencerCommand>,
    subscribers: Subscribers,
    is_running: Arc<AtomicBool>,
}

impl SequencerHandle {
    /// Receive every triggered note from now on
    pub fn subscribe(&self) -> Receiver<NoteTriggered> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn set_muted(&self, muted: bool) {
        let _ = self.command_tx.send(SequencerCommand::SetMuted(muted));
    }

    pub fn shutdown(&self) {
        let _ = self.command_tx.send(SequencerCommand::Shutdown);
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }
}

pub struct Sequencer {
    graph: SharedLiveGraph,
    command_rx: Receiver<SequencerCommand>,
    tick_rx: Receiver<ClockTick>,
    subscribers: Subscribers,
    muted: bool,
    is_running: Arc<AtomicBool>,
}

impl Sequencer {
    /// Start the sequencer on its own thread
    pub fn spawn(graph: SharedLiveGraph, tick_rx: Receiver<ClockTick>) -> SequencerHandle {
        let (command_tx, command_rx) = unbounded();
        let is_running = Arc::new(AtomicBool::new(true));
        let subscribers = Subscribers::default();

        let sequencer = Sequencer {
            graph,
            command_rx,
            tick_rx,
            subscribers: subscribers.clone(),
            muted: false,
            is_running: is_running.clone(),
        };
        thread::spawn(move || sequencer.run_loop());

        SequencerHandle {
            command_tx,
            subscribers,
            is_running,
        }
    }

    fn run_loop(mut self) {
        loop {
            crossbeam_channel::select! {
                recv(self.command_rx) -> msg => match msg {
                    Ok(cmd) => {
                        if !self.handle_command(cmd) {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                recv(self.tick_rx) -> msg => match msg {
                    Ok(tick) => self.process_tick(&tick),
                    Err(_) => break,
                },
            }
        }
        self.is_running.store(false, Ordering::Relaxed);
        log::debug!("sequencer stopped");
    }

    /// Returns false on shutdown
    fn handle_command(&mut self, cmd: SequencerCommand) -> bool {
        match cmd {
            SequencerCommand::SetMuted(muted) => self.muted = muted,
            SequencerCommand::Shutdown => return false,
        }
        true
    }

    fn process_tick(&mut self, tick: &ClockTick) {
        if self.muted {
            return;
        }
        let due = match self.graph.read() {
            Ok(graph) => due_notes(&graph, tick.beat, tick.beat + tick.width()),
            Err(_) => {
                log::warn!("sequencer: live graph poisoned, skipping tick");
                return;
            }
        };
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for note in due {
            log::trace!("trigger {} {} @ {:.3}", note.pattern, note.note, note.beat);
            subscribers.retain(|tx| tx.send(note.clone()).is_ok());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knob_core::types::{shared_graph, LiveNoteEvent, LivePattern};
    use std::time::{Duration, Instant};

    fn graph() -> LiveGraph {
        LiveGraph {
            patterns: vec![LivePattern::new("melody", "Lead")
                .with_event(LiveNoteEvent::new(60, 100, 0.0, 1.0))
                .with_event(LiveNoteEvent::new(64, 90, 2.5, 0.5))],
            ..LiveGraph::default()
        }
    }

    #[test]
    fn test_due_notes_window() {
        let graph = graph();
        let first: Vec<_> = due_notes(&graph, 0.0, 0.5).iter().map(|n| n.note).collect();
        assert_eq!(first, vec![60]);

        let second = due_notes(&graph, 2.5, 2.6);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].velocity, 90);

        assert!(due_notes(&graph, 1.0, 2.0).is_empty());
    }

    #[test]
    fn test_due_notes_loop() {
        // One bar loop: beat 0 comes round again at 4, 8...
        let graph = graph();
        let looped = due_notes(&graph, 8.0, 8.1);
        assert_eq!(looped.len(), 1);
        assert_eq!(looped[0].beat, 8.0);
        assert_eq!(due_notes(&graph, 6.5, 6.6)[0].note, 64);
    }

    #[test]
    fn test_sequencer_emits_from_ticks() {
        let shared = shared_graph(graph());
        let (tick_tx, tick_rx) = unbounded();
        let handle = Sequencer::spawn(shared.clone(), tick_rx);
        let notes = handle.subscribe();

        // Edits land on the next pass
        shared.write().unwrap().patterns[0].events[0].velocity = 42;

        tick_tx
            .send(ClockTick {
                beat: 0.0,
                beat_number: 0,
                tick_in_beat: 0,
                timestamp: Instant::now(),
            })
            .unwrap();

        let note = notes.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!((note.note, note.velocity), (60, 42));

        handle.shutdown();
    }
}
