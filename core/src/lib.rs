#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Verdure engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! views, and respond exclusively with new command batches.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Verdure.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Configures the bounded cell grid, discarding every activated cell.
    ConfigureGrid {
        /// Number of cell columns laid out in the grid.
        columns: u32,
        /// Number of cell rows laid out in the grid.
        rows: u32,
        /// World-space size of a single cell.
        geometry: CellGeometry,
    },
    /// Replaces the decay and healing rates used by subsequent advances.
    ConfigureRates {
        /// Rates applied per elapsed tick.
        rates: DecayRates,
    },
    /// Materialises simulation state for a cell the first time it is seen.
    ActivateCell {
        /// Cell entering the processing window.
        cell: CellCoord,
        /// Terrain reported by the terrain source for the cell.
        terrain: TerrainKind,
    },
    /// Integrates decay and proximity healing up to the provided tick.
    Advance {
        /// Tick the affected cells are brought up to.
        tick: Tick,
        /// Subset of active cells that should be integrated.
        scope: AdvanceScope,
        /// Healing sources captured for this step.
        sources: Vec<HealingEmitter>,
    },
    /// Instantly reduces deterioration around a world-space point.
    ApplyRadiusHeal {
        /// World-space point whose containing cell anchors the burst.
        center: Vec2,
        /// Radius of the burst measured in whole cells.
        radius_cells: u32,
        /// Amount subtracted from each affected cell's health ratio.
        amount: f32,
    },
    /// Instantly reduces deterioration on every active cell.
    ApplyGlobalHeal {
        /// Amount subtracted from each cell's health ratio.
        amount: f32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that the grid was (re)configured and all cell state was reset.
    GridConfigured {
        /// Number of cell columns in the new grid.
        columns: u32,
        /// Number of cell rows in the new grid.
        rows: u32,
    },
    /// Confirms that a cell was activated for the first time.
    CellActivated {
        /// Cell that entered the store.
        cell: CellCoord,
        /// Terrain recorded for the cell.
        terrain: TerrainKind,
    },
    /// Reports that a re-activation named a different terrain and was ignored.
    TerrainConflictIgnored {
        /// Cell that was re-activated.
        cell: CellCoord,
        /// Terrain recorded by the first activation.
        stored: TerrainKind,
        /// Terrain named by the ignored request.
        requested: TerrainKind,
    },
    /// Reports that an activation request was rejected.
    ActivationRejected {
        /// Cell named by the request.
        cell: CellCoord,
        /// Specific reason the activation failed.
        reason: ActivationError,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Tick the world clock now reports.
        tick: Tick,
        /// Number of cells whose health ratio was integrated.
        advanced: u32,
    },
    /// Confirms that a radius burst was applied.
    RadiusHealApplied {
        /// Number of non-exempt cells that fell inside the burst.
        affected: u32,
    },
    /// Confirms that a global heal was applied.
    GlobalHealApplied {
        /// Whether any cell's health ratio actually decreased.
        changed: bool,
    },
}

/// Reasons an activation request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivationError {
    /// The requested cell lies outside the configured grid.
    OutOfBounds,
}

/// Discrete simulation step counter, distinct from wall-clock time.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Tick(u64);

impl Tick {
    /// Tick at which every session starts.
    pub const ZERO: Self = Self(0);

    /// Creates a tick from its numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tick.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Returns the tick that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Number of ticks elapsed since `earlier`, or zero when `earlier` is not in the past.
    #[must_use]
    pub const fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Squared Euclidean distance to a signed cell position, in cell units.
    #[must_use]
    pub fn squared_distance_to(self, column: i64, row: i64) -> i64 {
        let dc = i64::from(self.column) - column;
        let dr = i64::from(self.row) - row;
        dc * dc + dr * dr
    }
}

/// Axis-aligned rectangle expressed in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    origin: CellCoord,
    size: CellRectSize,
}

impl CellRect {
    /// Constructs a rectangle from an origin cell and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: CellCoord, size: CellRectSize) -> Self {
        Self { origin, size }
    }

    /// Upper-left cell that anchors the rectangle.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole cells.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        self.size
    }

    /// Reports whether the rectangle covers the provided cell.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        let column_end = u64::from(self.origin.column()) + u64::from(self.size.width());
        let row_end = u64::from(self.origin.row()) + u64::from(self.size.height());
        cell.column() >= self.origin.column()
            && cell.row() >= self.origin.row()
            && u64::from(cell.column()) < column_end
            && u64::from(cell.row()) < row_end
    }

    /// Iterates over every cell covered by the rectangle in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let origin = self.origin;
        let size = self.size;
        (0..size.height()).flat_map(move |dy| {
            (0..size.width()).map(move |dx| {
                CellCoord::new(
                    origin.column().saturating_add(dx),
                    origin.row().saturating_add(dy),
                )
            })
        })
    }
}

/// Size of a [`CellRect`] measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRectSize {
    width: u32,
    height: u32,
}

impl CellRectSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of the rectangle in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the rectangle in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// World-space footprint of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellGeometry {
    cell_width: f32,
    cell_height: f32,
}

impl CellGeometry {
    /// Creates a geometry from the world-space width and height of a cell.
    #[must_use]
    pub const fn new(cell_width: f32, cell_height: f32) -> Self {
        Self {
            cell_width,
            cell_height,
        }
    }

    /// Width of a cell in world units.
    #[must_use]
    pub const fn cell_width(&self) -> f32 {
        self.cell_width
    }

    /// Height of a cell in world units.
    #[must_use]
    pub const fn cell_height(&self) -> f32 {
        self.cell_height
    }

    /// World-space centre of the provided cell.
    #[must_use]
    pub fn center_of(&self, cell: CellCoord) -> Vec2 {
        Vec2::new(
            (cell.column() as f32 + 0.5) * self.cell_width,
            (cell.row() as f32 + 0.5) * self.cell_height,
        )
    }

    /// Signed cell position containing the provided world-space point.
    ///
    /// Points left of or above the grid produce negative indices so that
    /// distance tests against real cells stay meaningful.
    #[must_use]
    pub fn locate(&self, point: Vec2) -> (i64, i64) {
        if self.cell_width <= 0.0 || self.cell_height <= 0.0 {
            return (0, 0);
        }
        let column = (point.x / self.cell_width).floor();
        let row = (point.y / self.cell_height).floor();
        (column as i64, row as i64)
    }
}

impl Default for CellGeometry {
    fn default() -> Self {
        Self::new(10.0, 8.0)
    }
}

/// Closed set of terrain kinds a cell may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainKind {
    /// Liquid terrain; exempt from decay and healing.
    Water,
    /// Bare soil.
    Dirt,
    /// Dense vegetation.
    TallGrass,
    /// Gravel walkway.
    PathRocks,
    /// Loose sand.
    Sand,
    /// Snow cover.
    Snow,
    /// Paved brick.
    Brick,
}

impl TerrainKind {
    /// Every terrain kind in declaration order.
    pub const ALL: [TerrainKind; 7] = [
        TerrainKind::Water,
        TerrainKind::Dirt,
        TerrainKind::TallGrass,
        TerrainKind::PathRocks,
        TerrainKind::Sand,
        TerrainKind::Snow,
        TerrainKind::Brick,
    ];

    /// Reports whether the terrain is excluded from decay and healing.
    #[must_use]
    pub const fn is_exempt(self) -> bool {
        matches!(self, Self::Water)
    }

    /// Stable lowercase name used by manifests and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Dirt => "dirt",
            Self::TallGrass => "tall_grass",
            Self::PathRocks => "path_rocks",
            Self::Sand => "sand",
            Self::Snow => "snow",
            Self::Brick => "brick",
        }
    }
}

/// Per-tick rates driving the continuous deterioration process.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayRates {
    /// Health ratio added to every non-exempt cell per elapsed tick.
    pub decay_per_tick: f32,
    /// Health ratio removed per elapsed tick by a full-strength source at zero distance.
    pub heal_per_tick: f32,
}

impl Default for DecayRates {
    fn default() -> Self {
        Self {
            decay_per_tick: 0.003,
            heal_per_tick: 0.015,
        }
    }
}

/// Selects which active cells an advance integrates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvanceScope {
    /// Every active cell.
    All,
    /// Only active cells inside the rectangle; the rest stay dormant.
    Window(CellRect),
}

/// Capability set required from anything that heals nearby cells.
pub trait HealingSource {
    /// World-space position of the source.
    fn position(&self) -> Vec2;

    /// Effective radius in world units.
    fn radius(&self) -> f32;

    /// Strength multiplier applied to the base heal rate.
    fn strength(&self) -> f32;
}

impl<T: HealingSource + ?Sized> HealingSource for &T {
    fn position(&self) -> Vec2 {
        (**self).position()
    }

    fn radius(&self) -> f32 {
        (**self).radius()
    }

    fn strength(&self) -> f32 {
        (**self).strength()
    }
}

/// Value snapshot of a [`HealingSource`] that can travel inside a [`Command`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealingEmitter {
    /// World-space position of the source.
    pub position: Vec2,
    /// Effective radius in world units.
    pub radius: f32,
    /// Strength multiplier applied to the base heal rate.
    pub strength: f32,
}

impl HealingEmitter {
    /// Creates an emitter from explicit parameters.
    #[must_use]
    pub const fn new(position: Vec2, radius: f32, strength: f32) -> Self {
        Self {
            position,
            radius,
            strength,
        }
    }

    /// Captures the current state of any healing source.
    #[must_use]
    pub fn capture(source: &impl HealingSource) -> Self {
        Self::new(source.position(), source.radius(), source.strength())
    }
}

impl HealingSource for HealingEmitter {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn strength(&self) -> f32 {
        self.strength
    }
}

/// Immutable representation of a single cell's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellSnapshot {
    /// Coordinate of the cell.
    pub cell: CellCoord,
    /// Terrain recorded at activation.
    pub terrain: TerrainKind,
    /// Reported health ratio; always `0.0` for exempt terrain.
    pub health: f32,
    /// Tick at which the ratio was last integrated.
    pub last_update: Tick,
}

/// Read-only snapshot describing every active cell.
#[derive(Clone, Debug, Default)]
pub struct CellView {
    snapshots: Vec<CellSnapshot>,
}

impl CellView {
    /// Creates a new cell view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<CellSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| (snapshot.cell.row(), snapshot.cell.column()));
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &CellSnapshot> {
        self.snapshots.iter()
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Read-only view into the dense activation grid.
#[derive(Clone, Copy, Debug)]
pub struct ActivityView<'a> {
    cells: &'a [bool],
    columns: u32,
    rows: u32,
}

impl<'a> ActivityView<'a> {
    /// Captures a new activity view backed by the provided row-major slice.
    #[must_use]
    pub fn new(cells: &'a [bool], columns: u32, rows: u32) -> Self {
        Self {
            cells,
            columns,
            rows,
        }
    }

    /// Reports whether the cell has been activated. Out-of-bounds cells never are.
    #[must_use]
    pub fn is_active(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or(false)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.in_bounds(cell) {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Final result of a play session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionOutcome {
    /// The timer expired with mean deterioration below the loss threshold.
    Won,
    /// Mean deterioration reached the loss threshold.
    Lost,
}

#[cfg(test)]
mod tests {
    use super::{
        ActivityView, CellCoord, CellGeometry, CellRect, CellRectSize, HealingEmitter,
        HealingSource, TerrainKind, Tick,
    };
    use glam::Vec2;

    #[test]
    fn tick_since_saturates_for_future_ticks() {
        assert_eq!(Tick::new(10).since(Tick::new(4)), 6);
        assert_eq!(Tick::new(4).since(Tick::new(10)), 0);
        assert_eq!(Tick::new(u64::MAX).next(), Tick::new(u64::MAX));
    }

    #[test]
    fn geometry_maps_points_to_containing_cells() {
        let geometry = CellGeometry::new(10.0, 8.0);
        let center = geometry.center_of(CellCoord::new(3, 2));
        assert_eq!(center, Vec2::new(35.0, 20.0));
        assert_eq!(geometry.locate(center), (3, 2));
        assert_eq!(geometry.locate(Vec2::new(-0.5, -0.5)), (-1, -1));
    }

    #[test]
    fn rect_contains_matches_iteration() {
        let rect =
            CellRect::from_origin_and_size(CellCoord::new(2, 1), CellRectSize::new(3, 2));
        let cells: Vec<_> = rect.cells().collect();
        assert_eq!(cells.len(), 6);
        assert!(cells.iter().all(|cell| rect.contains(*cell)));
        assert!(!rect.contains(CellCoord::new(5, 1)));
        assert!(!rect.contains(CellCoord::new(2, 3)));
    }

    #[test]
    fn only_water_is_exempt() {
        let exempt: Vec<_> = TerrainKind::ALL
            .into_iter()
            .filter(|terrain| terrain.is_exempt())
            .collect();
        assert_eq!(exempt, vec![TerrainKind::Water]);
    }

    #[test]
    fn emitter_captures_borrowed_sources() {
        let source = HealingEmitter::new(Vec2::new(1.0, 2.0), 5.0, 0.5);
        let borrowed: &dyn HealingSource = &source;
        assert_eq!(HealingEmitter::capture(&borrowed), source);
    }

    #[test]
    fn activity_view_treats_out_of_bounds_as_inactive() {
        let cells = [true, false, false, true];
        let view = ActivityView::new(&cells, 2, 2);
        assert!(view.is_active(CellCoord::new(0, 0)));
        assert!(view.is_active(CellCoord::new(1, 1)));
        assert!(!view.is_active(CellCoord::new(1, 0)));
        assert!(!view.is_active(CellCoord::new(2, 0)));
    }

    #[test]
    fn terrain_names_round_trip_through_toml() {
        #[derive(serde::Deserialize)]
        struct Entry {
            terrain: TerrainKind,
        }
        let entry: Entry = toml::from_str("terrain = \"tall_grass\"").expect("parse");
        assert_eq!(entry.terrain, TerrainKind::TallGrass);
        assert_eq!(entry.terrain.name(), "tall_grass");
    }
}
