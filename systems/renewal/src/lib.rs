#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Timed special ability that heals every active cell at once.

use serde::Deserialize;
use verdure_core::{Command, Event, Tick};

/// Configuration parameters required to construct the renewal ability.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenewalConfig {
    /// Amount removed from every cell's health ratio per use.
    pub amount: f32,
    /// Ticks that must pass after a successful use before the next one.
    pub cooldown_ticks: u64,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            amount: 0.2,
            cooldown_ticks: 600,
        }
    }
}

/// Pure system that turns ability requests into global heal commands.
///
/// The cooldown only starts once the world confirms that the heal changed
/// at least one cell, so a wasted activation leaves the ability ready.
#[derive(Debug)]
pub struct Renewal {
    config: RenewalConfig,
    now: Tick,
    ready_at: Tick,
    pending: bool,
}

impl Renewal {
    /// Creates a ready ability using the supplied configuration.
    #[must_use]
    pub fn new(config: RenewalConfig) -> Self {
        Self {
            config,
            now: Tick::ZERO,
            ready_at: Tick::ZERO,
            pending: false,
        }
    }

    /// Reports whether a request would currently be honoured.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.pending && self.now >= self.ready_at
    }

    /// Ticks left until the ability is ready again.
    #[must_use]
    pub fn remaining_cooldown(&self) -> u64 {
        self.ready_at.since(self.now)
    }

    /// Consumes world events and an optional player request.
    ///
    /// Emits `Command::ApplyGlobalHeal` when `requested` is set and the
    /// ability is ready.
    pub fn handle(&mut self, events: &[Event], requested: bool, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::TimeAdvanced { tick, .. } => self.now = self.now.max(*tick),
                Event::GlobalHealApplied { changed } if self.pending => {
                    self.pending = false;
                    if *changed {
                        self.ready_at = Tick::new(
                            self.now.get().saturating_add(self.config.cooldown_ticks),
                        );
                    } else {
                        tracing::debug!("renewal healed nothing; cooldown not started");
                    }
                }
                _ => {}
            }
        }

        if requested && self.is_ready() {
            self.pending = true;
            out.push(Command::ApplyGlobalHeal {
                amount: self.config.amount,
            });
        }
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

    fn renewal() -> Renewal {
        Renewal::new(RenewalConfig {
            amount: 0.1,
            cooldown_ticks: 10,
        })
    }

    #[test]
    fn request_without_readiness_is_ignored() {
        let mut renewal = renewal();
        let mut out = Vec::new();

        renewal.handle(&[], true, &mut out);
        assert_eq!(out, vec![Command::ApplyGlobalHeal { amount: 0.1 }]);

        renewal.handle(&[], true, &mut out);
        assert_eq!(out.len(), 1, "awaiting confirmation blocks a second use");
    }

    #[test]
    fn successful_heal_starts_cooldown() {
        let mut renewal = renewal();
        let mut out = Vec::new();
        renewal.handle(&[advanced(5)], true, &mut out);

        renewal.handle(&[Event::GlobalHealApplied { changed: true }], true, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(renewal.remaining_cooldown(), 10);

        renewal.handle(&[advanced(14)], true, &mut out);
        assert_eq!(out.len(), 1);

        renewal.handle(&[advanced(15)], true, &mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn wasted_heal_keeps_ability_ready() {
        let mut renewal = renewal();
        let mut out = Vec::new();
        renewal.handle(&[], true, &mut out);

        renewal.handle(&[Event::GlobalHealApplied { changed: false }], false, &mut out);
        assert!(renewal.is_ready());
        assert_eq!(renewal.remaining_cooldown(), 0);
    }

    #[test]
    fn unrelated_heal_events_are_ignored_when_idle() {
        let mut renewal = renewal();
        let mut out = Vec::new();
        renewal.handle(&[Event::GlobalHealApplied { changed: true }], false, &mut out);
        assert!(renewal.is_ready());
        assert!(out.is_empty());
    }
}
