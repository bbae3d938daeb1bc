//! Edit-burst coalescing
//!
//! The host calls [`Debouncer::touch`] on every text change and polls
//! [`Debouncer::fire_if_due`] from its event loop. Time is passed in so the
//! debouncer works the same under a real clock and in tests.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            deadline: None,
        }
    }

    /// Record a change; pushes the deadline out to `now + window`
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once per burst, after the window has elapsed
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// How long the event loop may sleep before the next check
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_fires_once() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        debouncer.touch(start);
        debouncer.touch(start + Duration::from_millis(50));
        debouncer.touch(start + Duration::from_millis(90));

        // Deadline moved to 190ms by the last touch
        assert!(!debouncer.fire_if_due(start + Duration::from_millis(150)));
        assert!(debouncer.fire_if_due(start + Duration::from_millis(190)));
        assert!(!debouncer.fire_if_due(start + Duration::from_millis(400)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_time_until_due() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        assert_eq!(debouncer.time_until_due(start), None);

        debouncer.touch(start);
        assert_eq!(
            debouncer.time_until_due(start + Duration::from_millis(40)),
            Some(Duration::from_millis(60))
        );
        assert_eq!(
            debouncer.time_until_due(start + Duration::from_millis(500)),
            Some(Duration::ZERO)
        );
    }
}
