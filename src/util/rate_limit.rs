//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::util::time::INPUT_THROTTLE;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Per-connection gate for directional input commands.
///
/// Accepts at most one command per [`INPUT_THROTTLE`] of wall-clock time;
/// commands arriving faster are dropped without an error to the sender.
#[derive(Clone)]
pub struct InputGate {
    limiter: Arc<Limiter>,
}

impl InputGate {
    pub fn new() -> Self {
        let quota = Quota::with_period(INPUT_THROTTLE)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Check whether an input command is allowed right now
    pub fn check_input(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for InputGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn second_command_within_window_is_dropped() {
        let gate = InputGate::new();
        assert!(gate.check_input());
        assert!(!gate.check_input());
    }

    #[test]
    fn command_after_window_is_accepted() {
        let gate = InputGate::new();
        assert!(gate.check_input());
        std::thread::sleep(INPUT_THROTTLE + Duration::from_millis(2));
        assert!(gate.check_input());
    }

    #[test]
    fn gates_are_independent_per_connection() {
        let a = InputGate::new();
        let b = InputGate::new();
        assert!(a.check_input());
        assert!(b.check_input());
    }
}
