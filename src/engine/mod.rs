//! Engine stand-in: clock, sequencer and script instantiation

pub mod clock;
pub mod script;
pub mod sequencer;

pub use clock::{ClockTick, MasterClock, TICKS_PER_BEAT};
pub use script::{instantiate, ScriptInstance};
pub use sequencer::{due_notes, NoteTriggered, Sequencer, SequencerHandle};
