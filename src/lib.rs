//! # Knob
//!
//! Terminal host for live parameter binding. Loads a music script, keeps its
//! numeric literals bound to a running clock and sequencer, and rewrites the
//! script text whenever a parameter is moved from the command line.
//!
//! ## Modules
//!
//! - `engine`: master clock (the tempo transport), the sequencer that plays
//!   the live graph, and script instantiation
//! - `session`: the live session that owns the text, binder and debouncer
//! - `commands`: prefix-matched REPL commands
//! - `repl`: the interactive loop and the script file watcher
//!
//! Analysis and binding live in `knob-core`.

pub mod commands;
pub mod engine;
pub mod repl;
pub mod session;

pub use crate::engine::{MasterClock, NoteTriggered, Sequencer};
pub use crate::session::{LiveSession, SessionConfig};
