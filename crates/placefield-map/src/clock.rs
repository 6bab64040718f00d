//! Time source seam.
//!
//! The map never reads a wall clock; whoever drives it supplies timestamps,
//! either directly or through a [`Clock`].

use std::sync::atomic::{AtomicI64, Ordering};

use placefield_types::Timestamp;

/// A monotonically non-decreasing source of [`Timestamp`]s.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

impl<F> Clock for F
where
    F: Fn() -> Timestamp,
{
    fn now(&self) -> Timestamp {
        self()
    }
}

/// Counts agent steps: returns `0, 1, 2, …` on successive calls.
#[derive(Debug, Default)]
pub struct StepClock {
    next: AtomicI64,
}

impl StepClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting at `start`.
    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }

    /// The value the next call to [`Clock::now`] will return.
    pub fn peek(&self) -> Timestamp {
        self.next.load(Ordering::SeqCst)
    }
}

impl Clock for StepClock {
    fn now(&self) -> Timestamp {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_clock_counts_up() {
        let clock = StepClock::new();
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.now(), 1);
        assert_eq!(clock.peek(), 2);
    }

    #[test]
    fn step_clock_custom_start() {
        let clock = StepClock::starting_at(100);
        assert_eq!(clock.now(), 100);
    }

    #[test]
    fn closures_are_clocks() {
        let fixed = || 42;
        assert_eq!(fixed.now(), 42);
    }
}
