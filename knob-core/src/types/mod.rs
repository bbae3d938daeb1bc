// knob-core/src/types/mod.rs

pub mod buffer;
pub mod config;
pub mod debounce;
pub mod live;
pub mod span;

pub use buffer::{SourceBuffer, TextBuffer};
pub use config::{AnalyzerConfig, BinderConfig};
pub use debounce::Debouncer;
pub use live::{
    shared_graph, EngineContext, LiveGraph, LiveNoteEvent, LivePattern, SharedLiveGraph,
    SourceLocationInfo, TransportControl, TransportParam,
};
pub use span::{byte_offset, utf16_offset, LineIndex, Span};
