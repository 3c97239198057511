#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative deterioration state for Verdure.
//!
//! The world owns the cell store exclusively. Adapters and systems mutate it
//! only through [`apply`] and [`advance`], and observe it only through the
//! read-only functions in [`query`].

mod process;
mod store;

use verdure_core::{
    ActivationError, AdvanceScope, CellGeometry, Command, DecayRates, Event, HealingSource, Tick,
    WELCOME_BANNER,
};

use crate::store::{Activation, CellStore};

const DEFAULT_GRID_COLUMNS: u32 = 200;
const DEFAULT_GRID_ROWS: u32 = 150;

/// Represents the authoritative Verdure world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    geometry: CellGeometry,
    rates: DecayRates,
    store: CellStore,
    tick: Tick,
}

impl World {
    /// Creates a new world using the default grid, geometry, and rates.
    #[must_use]
    pub fn new() -> Self {
        Self {
            banner: WELCOME_BANNER,
            geometry: CellGeometry::default(),
            rates: DecayRates::default(),
            store: CellStore::new(DEFAULT_GRID_COLUMNS, DEFAULT_GRID_ROWS),
            tick: Tick::ZERO,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid {
            columns,
            rows,
            geometry,
        } => {
            world.store = CellStore::new(columns, rows);
            world.geometry = geometry;
            world.tick = Tick::ZERO;
            out_events.push(Event::GridConfigured { columns, rows });
        }
        Command::ConfigureRates { rates } => {
            world.rates = rates;
        }
        Command::ActivateCell { cell, terrain } => {
            match world.store.activate(cell, terrain, world.tick) {
                Activation::Inserted => out_events.push(Event::CellActivated { cell, terrain }),
                Activation::Existing => {}
                Activation::Conflict { stored } => {
                    tracing::debug!(
                        column = cell.column(),
                        row = cell.row(),
                        stored = stored.name(),
                        requested = terrain.name(),
                        "ignoring re-activation with different terrain"
                    );
                    out_events.push(Event::TerrainConflictIgnored {
                        cell,
                        stored,
                        requested: terrain,
                    });
                }
                Activation::OutOfBounds => out_events.push(Event::ActivationRejected {
                    cell,
                    reason: ActivationError::OutOfBounds,
                }),
            }
        }
        Command::Advance {
            tick,
            scope,
            sources,
        } => advance(world, tick, scope, &sources, out_events),
        Command::ApplyRadiusHeal {
            center,
            radius_cells,
            amount,
        } => {
            let affected = process::apply_radius_heal(
                &mut world.store,
                &world.geometry,
                center,
                radius_cells,
                amount,
            );
            out_events.push(Event::RadiusHealApplied { affected });
        }
        Command::ApplyGlobalHeal { amount } => {
            let changed = process::apply_global_heal(&mut world.store, amount);
            out_events.push(Event::GlobalHealApplied { changed });
        }
    }
}

/// Advances in-scope cells to `tick`, querying the provided healing sources live.
///
/// The world clock never moves backwards; a stale tick integrates nothing.
pub fn advance<S: HealingSource>(
    world: &mut World,
    tick: Tick,
    scope: AdvanceScope,
    sources: &[S],
    out_events: &mut Vec<Event>,
) {
    let advanced = process::advance_cells(
        &mut world.store,
        &world.geometry,
        world.rates,
        tick,
        scope,
        sources,
    );
    world.tick = world.tick.max(tick);
    tracing::trace!(tick = world.tick.get(), advanced, "advanced cells");
    out_events.push(Event::TimeAdvanced {
        tick: world.tick,
        advanced,
    });
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use verdure_core::{
        ActivityView, CellCoord, CellGeometry, CellSnapshot, CellView, DecayRates, TerrainKind,
        Tick,
    };

    use super::World;

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Latest tick the world has been advanced to.
    #[must_use]
    pub fn current_tick(world: &World) -> Tick {
        world.tick
    }

    /// World-space footprint of a single cell.
    #[must_use]
    pub fn geometry(world: &World) -> CellGeometry {
        world.geometry
    }

    /// Rates applied by subsequent advances.
    #[must_use]
    pub fn rates(world: &World) -> DecayRates {
        world.rates
    }

    /// Columns and rows of the configured grid.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        world.store.dimensions()
    }

    /// Reported health ratio of a cell, or `None` when it was never activated.
    #[must_use]
    pub fn health_of(world: &World, cell: CellCoord) -> Option<f32> {
        world.store.get(cell).map(|state| state.reported_health())
    }

    /// Terrain recorded for a cell at activation.
    #[must_use]
    pub fn terrain_of(world: &World, cell: CellCoord) -> Option<TerrainKind> {
        world.store.get(cell).map(|state| state.terrain)
    }

    /// Number of cells activated since the grid was configured.
    #[must_use]
    pub fn active_cell_count(world: &World) -> usize {
        world.store.active_count()
    }

    /// Captures a read-only snapshot of every active cell.
    #[must_use]
    pub fn cell_view(world: &World) -> CellView {
        let snapshots = world
            .store
            .iter()
            .map(|(cell, state)| CellSnapshot {
                cell,
                terrain: state.terrain,
                health: state.reported_health(),
                last_update: state.last_update,
            })
            .collect();
        CellView::from_snapshots(snapshots)
    }

    /// Exposes a read-only view of which cells have been activated.
    #[must_use]
    pub fn activity_view(world: &World) -> ActivityView<'_> {
        let (columns, rows) = world.store.dimensions();
        ActivityView::new(world.store.activity(), columns, rows)
    }

    /// Mean health ratio over every active, non-exempt cell.
    ///
    /// Returns `0.0` when no such cell exists. This is the single number
    /// gameplay compares against its win and loss thresholds.
    #[must_use]
    pub fn mean_deterioration(world: &World) -> f32 {
        let (sum, count) = world
            .store
            .iter()
            .filter(|(_, state)| !state.terrain.is_exempt())
            .fold((0.0_f64, 0_u64), |(sum, count), (_, state)| {
                (sum + f64::from(state.health), count + 1)
            });

        if count == 0 {
            return 0.0;
        }
        ((sum / count as f64) as f32).clamp(0.0, 1.0)
    }
}
