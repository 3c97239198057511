use verdure_core::{CellCoord, TerrainKind, Tick};

/// Simulation state materialised for a single activated cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct CellState {
    pub(crate) terrain: TerrainKind,
    pub(crate) health: f32,
    pub(crate) last_update: Tick,
}

impl CellState {
    fn fresh(terrain: TerrainKind, tick: Tick) -> Self {
        Self {
            terrain,
            health: 0.0,
            last_update: tick,
        }
    }

    /// Health ratio exposed to readers; exempt terrain is always pristine.
    pub(crate) fn reported_health(&self) -> f32 {
        if self.terrain.is_exempt() {
            0.0
        } else {
            self.health
        }
    }
}

/// Result of an activation attempt against the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Activation {
    Inserted,
    Existing,
    Conflict { stored: TerrainKind },
    OutOfBounds,
}

/// Dense arena of cell states indexed by `row * columns + column`.
///
/// Entries are created on first activation and live until the grid is
/// reconfigured.
#[derive(Clone, Debug)]
pub(crate) struct CellStore {
    columns: u32,
    rows: u32,
    slots: Vec<Option<CellState>>,
    activity: Vec<bool>,
    active: usize,
}

impl CellStore {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            slots: vec![None; capacity],
            activity: vec![false; capacity],
            active: 0,
        }
    }

    pub(crate) fn activate(
        &mut self,
        cell: CellCoord,
        terrain: TerrainKind,
        tick: Tick,
    ) -> Activation {
        let Some(index) = self.index(cell) else {
            return Activation::OutOfBounds;
        };

        match self.slots[index] {
            Some(state) if state.terrain == terrain => Activation::Existing,
            Some(state) => Activation::Conflict {
                stored: state.terrain,
            },
            None => {
                self.slots[index] = Some(CellState::fresh(terrain, tick));
                self.activity[index] = true;
                self.active += 1;
                Activation::Inserted
            }
        }
    }

    pub(crate) fn get(&self, cell: CellCoord) -> Option<&CellState> {
        self.index(cell)
            .and_then(|index| self.slots.get(index))
            .and_then(Option::as_ref)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (CellCoord, &CellState)> + '_ {
        let columns = self.columns;
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(index, slot)| {
                slot.as_ref().map(|state| (coord_of(index, columns), state))
            })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (CellCoord, &mut CellState)> + '_ {
        let columns = self.columns;
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(move |(index, slot)| {
                slot.as_mut().map(|state| (coord_of(index, columns), state))
            })
    }

    pub(crate) fn activity(&self) -> &[bool] {
        &self.activity
    }

    pub(crate) fn active_count(&self) -> usize {
        self.active
    }

    pub(crate) fn dimensions(&self) -> (u32, u32) {
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

fn coord_of(index: usize, columns: u32) -> CellCoord {
    let width = columns.max(1) as usize;
    let column = (index % width) as u32;
    let row = (index / width) as u32;
    CellCoord::new(column, row)
}
