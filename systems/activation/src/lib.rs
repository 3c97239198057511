#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that activates cells as they enter the processing window.

use glam::Vec2;
use verdure_core::{
    ActivityView, CellCoord, CellGeometry, CellRect, CellRectSize, Command, TerrainKind,
};

const WINDOW_PADDING: u32 = 1;

/// Heightmap thresholds separating water, dirt, tall grass, and path rocks.
const WATER_BELOW: f32 = 0.3;
const DIRT_BELOW: f32 = 0.5;
const GRASS_BELOW: f32 = 0.8;

/// Supplies the terrain recorded for each cell of the externally owned grid.
pub trait TerrainSource {
    /// Terrain at the provided cell, or `None` when the cell lies outside the grid.
    fn terrain_at(&self, cell: CellCoord) -> Option<TerrainKind>;
}

/// Dense terrain layout stored in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerrainGrid {
    columns: u32,
    rows: u32,
    cells: Vec<TerrainKind>,
}

impl TerrainGrid {
    /// Creates a grid filled with a single terrain.
    #[must_use]
    pub fn filled(columns: u32, rows: u32, terrain: TerrainKind) -> Self {
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![terrain; capacity],
        }
    }

    /// Classifies a row-major heightmap of values in `0.0..=1.0` into terrain.
    ///
    /// Missing trailing samples are treated as water.
    #[must_use]
    pub fn from_heightmap(heights: &[f32], columns: u32, rows: u32) -> Self {
        let mut grid = Self::filled(columns, rows, TerrainKind::Water);
        for (slot, height) in grid.cells.iter_mut().zip(heights) {
            *slot = classify_height(*height);
        }
        grid
    }

    /// Overrides the terrain of a single cell, ignoring out-of-bounds cells.
    pub fn set(&mut self, cell: CellCoord, terrain: TerrainKind) {
        if let Some(index) = self.index(cell) {
            self.cells[index] = terrain;
        }
    }

    /// Provides the dimensions of the grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

impl TerrainSource for TerrainGrid {
    fn terrain_at(&self, cell: CellCoord) -> Option<TerrainKind> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }
}

fn classify_height(height: f32) -> TerrainKind {
    if height < WATER_BELOW {
        TerrainKind::Water
    } else if height < DIRT_BELOW {
        TerrainKind::Dirt
    } else if height < GRASS_BELOW {
        TerrainKind::TallGrass
    } else {
        TerrainKind::PathRocks
    }
}

/// Camera state used to derive the processing window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// World-space position of the top-left corner of the view.
    pub camera: Vec2,
    /// Size of the window in screen pixels.
    pub window: Vec2,
    /// Screen pixels per world unit.
    pub zoom: f32,
}

impl Viewport {
    /// Creates a viewport whose centre sits on `focus`.
    #[must_use]
    pub fn centered_on(focus: Vec2, window: Vec2, zoom: f32) -> Self {
        let zoom = if zoom > 0.0 { zoom } else { 1.0 };
        Self {
            camera: focus - window / (2.0 * zoom),
            window,
            zoom,
        }
    }

    /// Cells visible through the viewport, padded by one cell on each side
    /// and clipped to the grid.
    #[must_use]
    pub fn visible_cells(&self, geometry: &CellGeometry, columns: u32, rows: u32) -> CellRect {
        let (column_start, column_span) = visible_span(
            self.camera.x,
            self.window.x,
            geometry.cell_width(),
            self.zoom,
            columns,
        );
        let (row_start, row_span) = visible_span(
            self.camera.y,
            self.window.y,
            geometry.cell_height(),
            self.zoom,
            rows,
        );
        CellRect::from_origin_and_size(
            CellCoord::new(column_start, row_start),
            CellRectSize::new(column_span, row_span),
        )
    }
}

fn visible_span(camera: f32, window: f32, cell: f32, zoom: f32, limit: u32) -> (u32, u32) {
    if cell <= 0.0 || zoom <= 0.0 || limit == 0 {
        return (0, 0);
    }

    let first = (camera / cell).floor().max(0.0) as u32;
    let start = first.saturating_sub(WINDOW_PADDING).min(limit);
    let visible = (window / (cell * zoom)).max(0.0) as u32;
    let span = visible.saturating_add(WINDOW_PADDING * 2);
    let end = start.saturating_add(span).min(limit);
    (start, end - start)
}

/// Activation system that emits commands for newly visible cells.
#[derive(Debug, Default)]
pub struct Activation {
    scratch: Vec<Command>,
}

impl Activation {
    /// Creates a new activation system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::ActivateCell` for every inactive cell inside `window`.
    ///
    /// Terrain is looked up once per cell, at activation time. Cells the
    /// terrain source does not know are skipped.
    pub fn handle(
        &mut self,
        window: CellRect,
        activity: ActivityView<'_>,
        terrain: &impl TerrainSource,
        out: &mut Vec<Command>,
    ) {
        self.scratch.clear();

        for cell in window.cells() {
            if !activity.in_bounds(cell) || activity.is_active(cell) {
                continue;
            }
            if let Some(terrain) = terrain.terrain_at(cell) {
                self.scratch.push(Command::ActivateCell { cell, terrain });
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heightmap_thresholds_classify_terrain() {
        assert_eq!(classify_height(0.1), TerrainKind::Water);
        assert_eq!(classify_height(0.3), TerrainKind::Dirt);
        assert_eq!(classify_height(0.6), TerrainKind::TallGrass);
        assert_eq!(classify_height(0.95), TerrainKind::PathRocks);
    }

    #[test]
    fn short_heightmaps_leave_water() {
        let grid = TerrainGrid::from_heightmap(&[0.9], 2, 1);
        assert_eq!(grid.terrain_at(CellCoord::new(0, 0)), Some(TerrainKind::PathRocks));
        assert_eq!(grid.terrain_at(CellCoord::new(1, 0)), Some(TerrainKind::Water));
        assert_eq!(grid.terrain_at(CellCoord::new(2, 0)), None);
    }

    #[test]
    fn visible_window_is_padded_and_clipped() {
        let geometry = CellGeometry::new(10.0, 8.0);
        let viewport = Viewport {
            camera: Vec2::new(50.0, 40.0),
            window: Vec2::new(100.0, 80.0),
            zoom: 2.0,
        };

        let rect = viewport.visible_cells(&geometry, 200, 150);
        assert_eq!(rect.origin(), CellCoord::new(4, 4));
        assert_eq!(rect.size(), CellRectSize::new(7, 7));

        let clipped = viewport.visible_cells(&geometry, 6, 5);
        assert_eq!(clipped.origin(), CellCoord::new(4, 4));
        assert_eq!(clipped.size(), CellRectSize::new(2, 1));
    }

    #[test]
    fn degenerate_viewport_sees_nothing() {
        let geometry = CellGeometry::new(10.0, 8.0);
        let viewport = Viewport {
            camera: Vec2::ZERO,
            window: Vec2::new(100.0, 80.0),
            zoom: 0.0,
        };
        let rect = viewport.visible_cells(&geometry, 10, 10);
        assert_eq!(rect.cells().count(), 0);
    }
}
