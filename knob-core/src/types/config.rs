//! Configuration for the analyzer and binder
//!
//! Pure data with builder-style setters, so the same values can be assembled
//! from command line flags on native hosts or passed in from JavaScript.

use std::time::Duration;

/// Default quiet period before a burst of edits triggers re-analysis
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Default distance (in bytes) a free-standing note literal may sit after a
/// pattern definition and still be attributed to it
pub const DEFAULT_NOTE_PROXIMITY_WINDOW: usize = 2000;

/// Default tolerance when matching live note beats against source beats
pub const DEFAULT_BEAT_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinderConfig {
    pub debounce: Duration,
    /// Start tracking immediately on construction
    pub auto_start: bool,
}

impl BinderConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }
}

impl Default for BinderConfig {
    fn default() -> Self {
        BinderConfig {
            debounce: DEFAULT_DEBOUNCE,
            auto_start: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalyzerConfig {
    pub note_proximity_window: usize,
    pub beat_tolerance: f64,
}

impl AnalyzerConfig {
    pub fn with_note_proximity_window(mut self, window: usize) -> Self {
        self.note_proximity_window = window;
        self
    }

    pub fn with_beat_tolerance(mut self, tolerance: f64) -> Self {
        self.beat_tolerance = tolerance.abs();
        self
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            note_proximity_window: DEFAULT_NOTE_PROXIMITY_WINDOW,
            beat_tolerance: DEFAULT_BEAT_TOLERANCE,
        }
    }
}
