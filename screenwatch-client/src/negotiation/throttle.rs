use std::time::Duration;
use tokio::time::Instant;

/// Gate in front of the broadcast start sequence.
///
/// A start is dropped while another is in flight, while the last attempt is
/// younger than `window`, or once `max_attempts` is spent. The count resets when
/// a broadcast is confirmed and when the window has elapsed.
#[derive(Debug, Clone)]
pub struct NegotiationThrottle {
    window: Duration,
    max_attempts: u32,
    attempt_count: u32,
    last_attempt: Option<Instant>,
    in_flight: bool,
}

impl NegotiationThrottle {
    pub fn new(window: Duration, max_attempts: u32) -> Self {
        Self {
            window,
            max_attempts,
            attempt_count: 0,
            last_attempt: None,
            in_flight: false,
        }
    }

    pub fn should_allow(&self, now: Instant) -> bool {
        if self.in_flight || !self.window_elapsed(now) {
            return false;
        }
        // An elapsed window resets the count on the next attempt.
        self.max_attempts > 0
    }

    pub fn record_attempt(&mut self, now: Instant) {
        if self.window_elapsed(now) {
            self.attempt_count = 0;
        }
        self.attempt_count += 1;
        self.last_attempt = Some(now);
        self.in_flight = true;
    }

    /// The start reached `Broadcasting`.
    pub fn succeed(&mut self) {
        self.in_flight = false;
        self.attempt_count = 0;
    }

    /// The start failed or was cancelled; the attempt still counts.
    pub fn release(&mut self) {
        self.in_flight = false;
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    fn window_elapsed(&self, now: Instant) -> bool {
        match self.last_attempt {
            Some(last) => now.saturating_duration_since(last) >= self.window,
            None => true,
        }
    }
}
