//! Time-integrated deterioration and the discrete healing operations.

use glam::Vec2;
use verdure_core::{AdvanceScope, CellGeometry, DecayRates, HealingSource, Tick};

use crate::store::CellStore;

/// Integrates decay and proximity healing for every in-scope, non-exempt cell.
///
/// Each cell is advanced by the ticks elapsed since its own last update, so
/// cells left out of earlier scopes catch up exactly. Returns the number of
/// cells whose ratio was integrated.
pub(crate) fn advance_cells<S: HealingSource>(
    store: &mut CellStore,
    geometry: &CellGeometry,
    rates: DecayRates,
    tick: Tick,
    scope: AdvanceScope,
    sources: &[S],
) -> u32 {
    let mut advanced = 0;

    for (cell, state) in store.iter_mut() {
        if state.terrain.is_exempt() {
            continue;
        }
        if let AdvanceScope::Window(window) = scope {
            if !window.contains(cell) {
                continue;
            }
        }

        let elapsed = tick.since(state.last_update);
        if elapsed == 0 {
            continue;
        }
        let elapsed = elapsed as f32;

        let decay = rates.decay_per_tick * elapsed;
        let healing =
            rates.heal_per_tick * healing_factor(sources, geometry.center_of(cell)) * elapsed;

        state.health = clamp_ratio(state.health + decay - healing);
        state.last_update = tick;
        advanced += 1;
    }

    advanced
}

/// Sum of distance-weighted strengths of every source covering `point`.
///
/// Overlapping sources add linearly. Sources with a non-positive or
/// non-finite radius contribute nothing.
pub(crate) fn healing_factor<S: HealingSource>(sources: &[S], point: Vec2) -> f32 {
    sources
        .iter()
        .map(|source| {
            let radius = source.radius();
            let strength = source.strength();
            if !(radius.is_finite() && radius > 0.0) || !strength.is_finite() {
                return 0.0;
            }
            let distance = source.position().distance(point);
            if distance <= radius {
                (1.0 - distance / radius) * strength
            } else {
                0.0
            }
        })
        .sum()
}

/// Subtracts `amount` from every non-exempt cell within `radius_cells` of the
/// cell containing `center`. Returns the number of cells inside the burst.
pub(crate) fn apply_radius_heal(
    store: &mut CellStore,
    geometry: &CellGeometry,
    center: Vec2,
    radius_cells: u32,
    amount: f32,
) -> u32 {
    if !is_heal_amount(amount) {
        return 0;
    }

    let (center_column, center_row) = geometry.locate(center);
    let radius = i64::from(radius_cells);
    let radius_squared = radius * radius;
    let mut affected = 0;

    for (cell, state) in store.iter_mut() {
        if state.terrain.is_exempt() {
            continue;
        }
        if cell.squared_distance_to(center_column, center_row) > radius_squared {
            continue;
        }
        state.health = clamp_ratio(state.health - amount);
        affected += 1;
    }

    affected
}

/// Subtracts `amount` from every non-exempt cell and reports whether any
/// ratio actually decreased.
pub(crate) fn apply_global_heal(store: &mut CellStore, amount: f32) -> bool {
    if !is_heal_amount(amount) {
        return false;
    }

    let mut changed = false;
    for (_, state) in store.iter_mut() {
        if state.terrain.is_exempt() {
            continue;
        }
        let healed = clamp_ratio(state.health - amount);
        if healed < state.health {
            changed = true;
        }
        state.health = healed;
    }
    changed
}

fn is_heal_amount(amount: f32) -> bool {
    amount.is_finite() && amount > 0.0
}

fn clamp_ratio(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
