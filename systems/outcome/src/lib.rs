#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Win and loss evaluation driven by the world's mean deterioration.

use serde::Deserialize;
use verdure_core::{Event, SessionOutcome, Tick};

/// Thresholds that decide a session.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutcomeConfig {
    /// Mean deterioration at or above which the session is lost immediately.
    pub loss_threshold: f32,
    /// Tick at which the session timer expires.
    pub session_ticks: u64,
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            loss_threshold: 0.8,
            session_ticks: 3_600,
        }
    }
}

/// Pure system that latches the first decided outcome.
#[derive(Debug)]
pub struct Outcome {
    config: OutcomeConfig,
    now: Tick,
    decided: Option<SessionOutcome>,
}

impl Outcome {
    /// Creates an undecided evaluator.
    #[must_use]
    pub fn new(config: OutcomeConfig) -> Self {
        Self {
            config,
            now: Tick::ZERO,
            decided: None,
        }
    }

    /// Outcome decided so far, if any.
    #[must_use]
    pub fn decided(&self) -> Option<SessionOutcome> {
        self.decided
    }

    /// Ticks left on the session timer.
    #[must_use]
    pub fn remaining_ticks(&self) -> u64 {
        Tick::new(self.config.session_ticks).since(self.now)
    }

    /// Consumes world events and the current mean deterioration.
    ///
    /// Returns the outcome on the call that decides it and `None` on every
    /// other call, including all calls after a decision.
    pub fn handle(&mut self, events: &[Event], mean_deterioration: f32) -> Option<SessionOutcome> {
        for event in events {
            if let Event::TimeAdvanced { tick, .. } = event {
                self.now = self.now.max(*tick);
            }
        }

        if self.decided.is_some() {
            return None;
        }

        let outcome = if mean_deterioration >= self.config.loss_threshold {
            SessionOutcome::Lost
        } else if self.now.get() >= self.config.session_ticks {
            SessionOutcome::Won
        } else {
            return None;
        };

        tracing::info!(
            ?outcome,
            tick = self.now.get(),
            mean_deterioration,
            "session decided"
        );
        self.decided = Some(outcome);
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advanced(tick: u64) -> Event {
        Event::TimeAdvanced {
            tick: Tick::new(tick),
            advanced: 0,
        }
    }

    fn outcome() -> Outcome {
        Outcome::new(OutcomeConfig {
            loss_threshold: 0.8,
            session_ticks: 100,
        })
    }

    #[test]
    fn reaching_threshold_loses_immediately() {
        let mut outcome = outcome();
        assert_eq!(outcome.handle(&[advanced(1)], 0.79), None);
        assert_eq!(outcome.handle(&[advanced(2)], 0.8), Some(SessionOutcome::Lost));
    }

    #[test]
    fn timer_expiry_below_threshold_wins() {
        let mut outcome = outcome();
        assert_eq!(outcome.handle(&[advanced(99)], 0.5), None);
        assert_eq!(outcome.remaining_ticks(), 1);
        assert_eq!(outcome.handle(&[advanced(100)], 0.5), Some(SessionOutcome::Won));
    }

    #[test]
    fn loss_takes_precedence_at_expiry() {
        let mut outcome = outcome();
        assert_eq!(outcome.handle(&[advanced(100)], 0.9), Some(SessionOutcome::Lost));
    }

    #[test]
    fn decision_is_reported_once() {
        let mut outcome = outcome();
        assert_eq!(outcome.handle(&[advanced(100)], 0.1), Some(SessionOutcome::Won));
        assert_eq!(outcome.handle(&[advanced(101)], 0.95), None);
        assert_eq!(outcome.decided(), Some(SessionOutcome::Won));
    }
}
