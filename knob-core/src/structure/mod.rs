//! Structure Analyzer
//!
//! Finds instrument, pattern and note-event definitions in script text and,
//! once the script has produced live objects, stamps each of them with the
//! source location it came from.

mod analyzer;
mod attach;
mod definitions;

pub use analyzer::{analyze, StructureAnalyzer};
pub use attach::{attach_source_info, attach_with, AttachReport};
pub use definitions::{
    InstrumentDefinition, InstrumentType, NoteDefinition, PatternDefinition, StructureAnalysis,
};
