//! Master clock for the playback engine
//!
//! Runs in its own thread and broadcasts tick events to every subscriber.
//! Follows the MIDI clock standard of 24 PPQN (pulses per quarter note).
//!
//! The clock is also the engine's transport: tempo bindings reach it through
//! [`TransportControl`].

use crossbeam_channel::{unbounded, Receiver, Sender};
use knob_core::types::{TransportControl, TransportParam};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Ticks per quarter note (MIDI standard)
pub const TICKS_PER_BEAT: u8 = 24;

/// Tempo bounds accepted by the transport
pub const MIN_BPM: f64 = 1.0;
pub const MAX_BPM: f64 = 400.0;

/// A single clock tick
#[derive(Clone, Debug)]
pub struct ClockTick {
    /// Current beat position (fractional, e.g. 4.5 = halfway through beat 5)
    pub beat: f64,
    /// Integer beat count since the clock started (0-indexed)
    pub beat_number: u64,
    /// Tick within the current beat (0-23)
    pub tick_in_beat: u8,
    pub timestamp: Instant,
}

impl ClockTick {
    pub fn is_beat_boundary(&self) -> bool {
        self.tick_in_beat == 0
    }

    /// Beat 0, 4, 8... in 4/4
    pub fn is_bar_boundary(&self) -> bool {
        self.tick_in_beat == 0 && self.beat_number % 4 == 0
    }

    /// Length of one tick in beats
    pub fn width(&self) -> f64 {
        1.0 / TICKS_PER_BEAT as f64
    }
}

#[derive(Debug)]
enum ClockCommand {
    Start,
    Stop,
    Reset,
    AddSubscriber(Sender<ClockTick>),
    Shutdown,
}

/// Master clock that runs in its own thread and broadcasts tick events
pub struct MasterClock {
    /// BPM stored as f64 bits for atomic access
    bpm: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    command_tx: Sender<ClockCommand>,
    thread: Option<JoinHandle<()>>,
}

impl MasterClock {
    pub fn new(bpm: f64) -> Self {
        let bpm = Arc::new(AtomicU64::new(clamp_bpm(bpm).to_bits()));
        let running = Arc::new(AtomicBool::new(false));
        let (command_tx, command_rx) = crossbeam_channel::bounded(64);

        let thread_bpm = bpm.clone();
        let thread_running = running.clone();
        let thread = thread::spawn(move || {
            ClockThread::new(thread_bpm, thread_running, command_rx).run();
        });

        MasterClock {
            bpm,
            running,
            command_tx,
            thread: Some(thread),
        }
    }

    /// New receiver of tick events; every subscriber sees the same ticks
    pub fn subscribe(&self) -> Receiver<ClockTick> {
        let (tx, rx) = unbounded();
        let _ = self.command_tx.send(ClockCommand::AddSubscriber(tx));
        rx
    }

    pub fn start(&self) {
        let _ = self.command_tx.send(ClockCommand::Start);
    }

    pub fn stop(&self) {
        let _ = self.command_tx.send(ClockCommand::Stop);
    }

    /// Reset the beat counter to 0
    pub fn reset(&self) {
        let _ = self.command_tx.send(ClockCommand::Reset);
    }

    /// Set the tempo, clamped to [`MIN_BPM`]..=[`MAX_BPM`]
    ///
    /// The clock thread reads the tempo before every tick, so no command is
    /// needed.
    pub fn set_bpm(&self, bpm: f64) {
        self.bpm.store(clamp_bpm(bpm).to_bits(), Ordering::Relaxed);
    }

    pub fn bpm(&self) -> f64 {
        f64::from_bits(self.bpm.load(Ordering::Relaxed))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Duration of a single beat in milliseconds at the current tempo
    pub fn beat_duration_ms(&self) -> u64 {
        (60000.0 / self.bpm()) as u64
    }
}

impl TransportControl for MasterClock {
    fn set_param(&self, param: TransportParam, value: f64) {
        match param {
            TransportParam::Tempo => {
                log::debug!("transport: tempo {:.2}", value);
                self.set_bpm(value);
            }
        }
    }

    fn param(&self, param: TransportParam) -> Option<f64> {
        match param {
            TransportParam::Tempo => Some(self.bpm()),
        }
    }
}

impl Drop for MasterClock {
    fn drop(&mut self) {
        let _ = self.command_tx.send(ClockCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() {
        bpm.clamp(MIN_BPM, MAX_BPM)
    } else {
        MIN_BPM
    }
}

struct ClockThread {
    bpm: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    command_rx: Receiver<ClockCommand>,
    subscribers: Vec<Sender<ClockTick>>,
    beat_number: u64,
    tick_in_beat: u8,
}

impl ClockThread {
    fn new(bpm: Arc<AtomicU64>, running: Arc<AtomicBool>, command_rx: Receiver<ClockCommand>) -> Self {
        Self {
            bpm,
            running,
            command_rx,
            subscribers: Vec::new(),
            beat_number: 0,
            tick_in_beat: 0,
        }
    }

    fn tick_duration(&self) -> Duration {
        let bpm = f64::from_bits(self.bpm.load(Ordering::Relaxed));
        Duration::from_secs_f64(60.0 / bpm / TICKS_PER_BEAT as f64)
    }

    fn run(&mut self) {
        let mut next_tick: Option<Instant> = None;

        loop {
            if !self.running.load(Ordering::Relaxed) {
                // Block while stopped
                match self.command_rx.recv() {
                    Ok(cmd) => {
                        if self.handle_command(cmd) {
                            break;
                        }
                        if self.running.load(Ordering::Relaxed) {
                            next_tick = Some(Instant::now());
                        }
                    }
                    Err(_) => break,
                }
                continue;
            }

            if let Ok(cmd) = self.command_rx.try_recv() {
                if self.handle_command(cmd) {
                    break;
                }
                continue;
            }

            let now = Instant::now();
            let target = *next_tick.get_or_insert(now);
            if now >= target {
                self.emit_tick();
                self.advance_tick();
                next_tick = Some(target + self.tick_duration());
            } else if target - now > Duration::from_micros(500) {
                thread::sleep(Duration::from_micros(100));
            } else {
                std::hint::spin_loop();
            }
        }
    }

    /// Returns true on shutdown
    fn handle_command(&mut self, cmd: ClockCommand) -> bool {
        match cmd {
            ClockCommand::Start => self.running.store(true, Ordering::Relaxed),
            ClockCommand::Stop => self.running.store(false, Ordering::Relaxed),
            ClockCommand::Reset => {
                self.beat_number = 0;
                self.tick_in_beat = 0;
            }
            ClockCommand::AddSubscriber(tx) => self.subscribers.push(tx),
            ClockCommand::Shutdown => {
                self.running.store(false, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    fn emit_tick(&mut self) {
        let tick = ClockTick {
            beat: self.beat_number as f64 + self.tick_in_beat as f64 / TICKS_PER_BEAT as f64,
            beat_number: self.beat_number,
            tick_in_beat: self.tick_in_beat,
            timestamp: Instant::now(),
        };
        self.subscribers.retain(|tx| tx.send(tick.clone()).is_ok());
    }

    fn advance_tick(&mut self) {
        self.tick_in_beat += 1;
        if self.tick_in_beat >= TICKS_PER_BEAT {
            self.tick_in_beat = 0;
            self.beat_number += 1;
        }
    }
}
