//! # Knob Core
//!
//! Turns the numbers in a live music script into controls. WASM-compatible:
//! no audio, terminal or filesystem dependencies.
//!
//! - [`scanner`]: finds numeric literals and picks a slider range for each
//! - [`structure`]: finds instruments, patterns and notes, and stamps source
//!   locations onto the live objects a script produced
//! - [`binder`]: binds literals to engine mutations and rewrites the text
//!   when a control moves
//!
//! ## Features
//!
//! - **serde**: Serialize/Deserialize on the plain data types
//! - **wasm**: JavaScript bindings via wasm-bindgen
//!
//! ## Example
//!
//! ```ignore
//! use knob_core::binder::LiveParameterBinder;
//! use knob_core::types::{shared_graph, BinderConfig, EngineContext, LiveGraph, SourceBuffer};
//!
//! let engine = EngineContext::new(shared_graph(LiveGraph::new()));
//! let mut binder = LiveParameterBinder::new(
//!     SourceBuffer::new("Tempo = 120;"),
//!     engine,
//!     BinderConfig::default(),
//! );
//! let tempo = binder.bindings()[0].id;
//! binder.update_parameter(tempo, 128.0);
//! ```

pub mod binder;
pub mod error;
pub mod scanner;
pub mod structure;
pub mod types;
pub mod wasm;

// Re-export commonly used types
pub use binder::{BinderHandle, LiveParameterBinder, ParameterChange, ParameterType};
pub use error::{AnalysisError, ErrorKind};
pub use scanner::{detect_literals, scan_literals, DetectedLiteral, SliderConfig};
pub use structure::{analyze, attach_source_info, StructureAnalysis};
pub use types::{EngineContext, LiveGraph, SourceBuffer, SourceLocationInfo, Span, TextBuffer};
