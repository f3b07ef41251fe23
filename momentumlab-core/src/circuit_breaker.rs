//! Loss-streak circuit breaker.
//!
//! Counts consecutive stop-loss exits. Once the streak reaches the threshold
//! the cooldown between signals is extended until a non-stop exit resets it.

use serde::{Deserialize, Serialize};

use crate::domain::{ExitReason, Trade};

pub const DEFAULT_LOSS_THRESHOLD: u32 = 5;
pub const DEFAULT_EXTRA_COOLDOWN: usize = 15;

/// Consecutive-loss counter. Plain value type; each simulation owns its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreaker {
    consecutive_losses: u32,
    threshold: u32,
    extra_cooldown: usize,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_LOSS_THRESHOLD, DEFAULT_EXTRA_COOLDOWN)
    }
}

impl CircuitBreaker {
    pub fn new(threshold: u32, extra_cooldown: usize) -> Self {
        Self {
            consecutive_losses: 0,
            threshold,
            extra_cooldown,
        }
    }

    /// Rebuild the streak from a trade history: trailing STOP exits.
    pub fn from_trades(trades: &[Trade]) -> Self {
        let mut breaker = Self::default();
        breaker.consecutive_losses = trades
            .iter()
            .rev()
            .take_while(|t| t.exit_reason == ExitReason::Stop)
            .count() as u32;
        breaker
    }

    /// Record one closed trade. `stopped_out` is true for a STOP exit.
    pub fn record_exit(&mut self, stopped_out: bool) {
        if stopped_out {
            self.consecutive_losses += 1;
        } else {
            self.consecutive_losses = 0;
        }
    }

    /// Record a result by win/loss rather than by exit reason.
    pub fn record_result(&mut self, is_win: bool) {
        self.record_exit(!is_win);
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    pub fn is_triggered(&self) -> bool {
        self.consecutive_losses >= self.threshold
    }

    pub fn effective_cooldown(&self, base: usize) -> usize {
        if self.is_triggered() {
            base + self.extra_cooldown
        } else {
            base
        }
    }

    pub fn reset(&mut self) {
        self.consecutive_losses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_untriggered() {
        let cb = CircuitBreaker::default();
        assert!(!cb.is_triggered());
        assert_eq!(cb.effective_cooldown(3), 3);
    }

    #[test]
    fn triggers_after_five_losses() {
        let mut cb = CircuitBreaker::default();
        for _ in 0..4 {
            cb.record_exit(true);
        }
        assert_eq!(cb.effective_cooldown(3), 3);
        cb.record_exit(true);
        assert!(cb.is_triggered());
        assert_eq!(cb.effective_cooldown(3), 18);
    }

    #[test]
    fn non_stop_exit_resets() {
        let mut cb = CircuitBreaker::default();
        for _ in 0..6 {
            cb.record_result(false);
        }
        assert!(cb.is_triggered());
        cb.record_result(true);
        assert_eq!(cb.consecutive_losses(), 0);
        assert_eq!(cb.effective_cooldown(3), 3);
    }
}
