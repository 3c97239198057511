use anyhow::Result;
use glam::Vec2;
use image::{imageops, Rgba, RgbaImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use verdure_core::{
    AdvanceScope, CellCoord, CellRect, CellRectSize, Command, Event, HealingSource,
    SessionOutcome, Tick,
};
use verdure_rendering::{
    cell_pixel_size, fallback_color, water_animation, RenderCache, TextureLibrary,
};
use verdure_system_activation::{Activation, TerrainGrid, Viewport};
use verdure_system_caretaker::{Caretaker, Equipment, Pickup, PickupKind, Pickups};
use verdure_system_outcome::Outcome;
use verdure_system_renewal::Renewal;
use verdure_world::{self as world, query, World};

use crate::config::SessionConfig;

/// Totals reported once a session stops.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Summary {
    pub(crate) steps: u64,
    pub(crate) active_cells: usize,
    pub(crate) mean_deterioration: f32,
    pub(crate) outcome: Option<SessionOutcome>,
    pub(crate) pickups_collected: usize,
    pub(crate) renewals: u32,
    pub(crate) textured_cells: u64,
    pub(crate) fallback_cells: u64,
}

/// Headless session wiring the world, its systems, and the render cache.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    terrain: TerrainGrid,
    caretaker: Caretaker,
    pickups: Pickups,
    activation: Activation,
    renewal: Renewal,
    outcome: Outcome,
    cache: RenderCache,
    config: SessionConfig,
    rng: ChaCha8Rng,
    heading: Vec2,
    window: CellRect,
    commands: Vec<Command>,
    heals: Vec<Command>,
    events: Vec<Event>,
    summary: Summary,
}

impl Session {
    /// Builds a session whose terrain and pickups are derived from `seed`.
    pub(crate) fn new(config: SessionConfig, seed: u64) -> Result<Self> {
        let library = match &config.render.manifest {
            Some(path) => TextureLibrary::from_manifest_path(path)?,
            None => TextureLibrary::empty(),
        };
        Ok(Self::with_library(config, seed, library))
    }

    fn with_library(config: SessionConfig, seed: u64, library: TextureLibrary) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = config.grid;
        let geometry = grid.geometry();

        let mut world = World::new();
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::ConfigureGrid {
                columns: grid.columns,
                rows: grid.rows,
                geometry,
            },
            &mut events,
        );
        world::apply(
            &mut world,
            Command::ConfigureRates {
                rates: config.rates,
            },
            &mut events,
        );

        let heights = generate_heightmap(&mut rng, grid.columns, grid.rows);
        let terrain = TerrainGrid::from_heightmap(&heights, grid.columns, grid.rows);
        let caretaker = Caretaker::new(config.caretaker, &geometry, grid.columns, grid.rows);
        let pickups = Pickups::new(scatter_pickups(&mut rng, &config), config.pickups.reach);

        Self {
            world,
            terrain,
            caretaker,
            pickups,
            activation: Activation::new(),
            renewal: Renewal::new(config.renewal),
            outcome: Outcome::new(config.outcome),
            cache: RenderCache::new(library, config.render.clear_interval),
            config,
            rng,
            heading: Vec2::X,
            window: CellRect::from_origin_and_size(
                CellCoord::new(0, 0),
                CellRectSize::new(0, 0),
            ),
            commands: Vec::new(),
            heals: Vec::new(),
            events,
            summary: Summary {
                steps: 0,
                active_cells: 0,
                mean_deterioration: 0.0,
                outcome: None,
                pickups_collected: 0,
                renewals: 0,
                textured_cells: 0,
                fallback_cells: 0,
            },
        }
    }

    /// Runs up to `steps` simulation steps, stopping early once decided.
    pub(crate) fn run(&mut self, steps: u64) -> Summary {
        for _ in 0..steps {
            if self.step().is_some() {
                break;
            }
        }
        self.summary.clone()
    }

    /// One simulation step: activate newly visible cells, advance, then
    /// apply the step's discrete heals before measuring and drawing.
    fn step(&mut self) -> Option<SessionOutcome> {
        let tick = query::current_tick(&self.world).next();
        let (columns, rows) = query::dimensions(&self.world);
        let geometry = query::geometry(&self.world);

        self.wander();

        // Renewal reacts to the previous step's events.
        self.heals.clear();
        let requested = query::mean_deterioration(&self.world) >= self.config.renewal_trigger;
        self.renewal.handle(&self.events, requested, &mut self.heals);
        if !self.heals.is_empty() {
            self.summary.renewals += 1;
        }

        let view = self.config.view;
        let viewport = Viewport::centered_on(
            self.caretaker.position(),
            Vec2::new(view.window_width, view.window_height),
            view.zoom,
        );
        self.window = viewport.visible_cells(&geometry, columns, rows);

        self.events.clear();
        self.commands.clear();
        self.activation.handle(
            self.window,
            query::activity_view(&self.world),
            &self.terrain,
            &mut self.commands,
        );
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events);
        }

        let scope = if view.windowed {
            AdvanceScope::Window(self.window)
        } else {
            AdvanceScope::All
        };
        world::advance(
            &mut self.world,
            tick,
            scope,
            &[&self.caretaker],
            &mut self.events,
        );

        self.summary.pickups_collected += self
            .pickups
            .handle(&mut self.caretaker, &mut self.heals);
        for command in self.heals.drain(..) {
            world::apply(&mut self.world, command, &mut self.events);
        }

        self.render(tick, view.zoom);

        let mean = query::mean_deterioration(&self.world);
        self.summary.steps = tick.get();
        self.summary.active_cells = query::active_cell_count(&self.world);
        self.summary.mean_deterioration = mean;

        let decided = self.outcome.handle(&self.events, mean);
        if decided.is_some() {
            self.summary.outcome = decided;
        }
        decided
    }

    /// Composes the cells visible on the last step into one bitmap.
    ///
    /// Cells without a texture are painted with their flat fallback colour.
    pub(crate) fn snapshot(&mut self) -> RgbaImage {
        let geometry = query::geometry(&self.world);
        let (width, height) = cell_pixel_size(&geometry, self.config.view.zoom);
        let animation = water_animation(query::current_tick(&self.world));
        let origin = self.window.origin();
        let size = self.window.size();
        let mut frame = RgbaImage::new(
            size.width().saturating_mul(width),
            size.height().saturating_mul(height),
        );

        for cell in self.window.cells() {
            let Some(terrain) = query::terrain_of(&self.world, cell) else {
                continue;
            };
            let health = query::health_of(&self.world, cell).unwrap_or(0.0);
            let x = (cell.column() - origin.column()) * width;
            let y = (cell.row() - origin.row()) * height;

            match self
                .cache
                .get_or_build(terrain, width, height, health, animation)
            {
                Some(handle) => {
                    imageops::replace(&mut frame, handle.image(), i64::from(x), i64::from(y));
                }
                None => {
                    let pixel = Rgba(fallback_color(terrain).to_rgba8());
                    for dy in 0..height {
                        for dx in 0..width {
                            frame.put_pixel(x + dx, y + dy, pixel);
                        }
                    }
                }
            }
        }
        frame
    }

    fn wander(&mut self) {
        let turn = self.rng.gen_range(-0.6_f32..0.6);
        self.heading = Vec2::from_angle(turn).rotate(self.heading);
        self.caretaker.move_by(self.heading);
    }

    fn render(&mut self, tick: Tick, zoom: f32) {
        let _ = self.cache.on_step();
        let geometry = query::geometry(&self.world);
        let (width, height) = cell_pixel_size(&geometry, zoom);
        let animation = water_animation(tick);

        for cell in self.window.cells() {
            let (Some(terrain), Some(health)) = (
                query::terrain_of(&self.world, cell),
                query::health_of(&self.world, cell),
            ) else {
                continue;
            };
            match self
                .cache
                .get_or_build(terrain, width, height, health, animation)
            {
                Some(_) => self.summary.textured_cells += 1,
                None => self.summary.fallback_cells += 1,
            }
        }
    }
}

/// Smoothed value noise in `0.0..=1.0`, row-major.
fn generate_heightmap(rng: &mut ChaCha8Rng, columns: u32, rows: u32) -> Vec<f32> {
    let width = columns as usize;
    let height = rows as usize;
    let raw: Vec<f32> = (0..width * height).map(|_| rng.gen::<f32>()).collect();

    let mut smoothed = Vec::with_capacity(raw.len());
    for row in 0..height {
        for column in 0..width {
            let mut sum = 0.0;
            let mut count = 0.0;
            for neighbour_row in row.saturating_sub(2)..(row + 3).min(height) {
                for neighbour_column in column.saturating_sub(2)..(column + 3).min(width) {
                    sum += raw[neighbour_row * width + neighbour_column];
                    count += 1.0;
                }
            }
            smoothed.push(stretch(sum / count));
        }
    }
    smoothed
}

/// Spreads averaged noise, which clusters around 0.5, back over the unit range.
fn stretch(value: f32) -> f32 {
    ((value - 0.5) * 3.0 + 0.5).clamp(0.0, 1.0)
}

fn scatter_pickups(rng: &mut ChaCha8Rng, config: &SessionConfig) -> Vec<Pickup> {
    let geometry = config.grid.geometry();
    let extent = Vec2::new(
        config.grid.columns as f32 * geometry.cell_width(),
        config.grid.rows as f32 * geometry.cell_height(),
    );
    let mut place = |rng: &mut ChaCha8Rng| {
        Vec2::new(rng.gen::<f32>() * extent.x, rng.gen::<f32>() * extent.y)
    };

    let pickups = config.pickups;
    let mut items = Vec::with_capacity((pickups.equipment + pickups.restorative) as usize);
    for _ in 0..pickups.equipment {
        items.push(Pickup {
            position: place(rng),
            kind: PickupKind::Equipment(Equipment::default()),
        });
    }
    for _ in 0..pickups.restorative {
        items.push(Pickup {
            position: place(rng),
            kind: PickupKind::Restorative {
                radius_cells: pickups.restorative_radius_cells,
                amount: pickups.restorative_amount,
            },
        });
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use verdure_core::TerrainKind;
    use verdure_rendering::TerrainTextures;

    fn small_config() -> SessionConfig {
        let mut config = SessionConfig::default();
        config.grid = GridConfig {
            columns: 24,
            rows: 18,
            ..GridConfig::default()
        };
        config.view.window_width = 120.0;
        config.view.window_height = 80.0;
        config
    }

    #[test]
    fn sessions_are_deterministic_for_a_seed() {
        let first = Session::with_library(small_config(), 11, TextureLibrary::empty()).run(40);
        let second = Session::with_library(small_config(), 11, TextureLibrary::empty()).run(40);
        assert_eq!(first, second);
        assert_eq!(first.steps, 40);
        assert!(first.active_cells > 0);
    }

    #[test]
    fn missing_textures_fall_back_to_flat_colour() {
        let summary = Session::with_library(small_config(), 3, TextureLibrary::empty()).run(5);
        assert_eq!(summary.textured_cells, 0);
        assert!(summary.fallback_cells > 0);
    }

    #[test]
    fn loaded_textures_are_rendered() {
        let mut library = TextureLibrary::empty();
        for terrain in TerrainKind::ALL {
            library.insert(
                terrain,
                TerrainTextures::new(RgbaImage::from_pixel(4, 4, Rgba([90, 120, 60, 255])), None),
            );
        }
        let summary = Session::with_library(small_config(), 3, library).run(5);
        assert_eq!(summary.fallback_cells, 0);
        assert!(summary.textured_cells > 0);
    }

    #[test]
    fn fast_decay_loses_the_session() {
        let mut config = small_config();
        config.rates.decay_per_tick = 0.25;
        config.rates.heal_per_tick = 0.0;
        config.pickups.restorative = 0;
        config.renewal_trigger = 2.0;

        let summary = Session::with_library(config, 5, TextureLibrary::empty()).run(100);
        assert_eq!(summary.outcome, Some(SessionOutcome::Lost));
        assert!(summary.steps < 100);
    }

    #[test]
    fn heightmap_stays_in_unit_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let heights = generate_heightmap(&mut rng, 10, 7);
        assert_eq!(heights.len(), 70);
        assert!(heights.iter().all(|height| (0.0..=1.0).contains(height)));
    }

    #[test]
    fn pickup_collected_on_first_step_heals_advanced_cells() {
        let mut config = small_config();
        config.pickups.equipment = 0;
        config.pickups.restorative = 0;
        config.caretaker.strength = 0.0;
        let mut session = Session::with_library(config, 9, TextureLibrary::empty());
        session.terrain = TerrainGrid::filled(24, 18, TerrainKind::Dirt);
        let start = session.caretaker.position();
        session.pickups = Pickups::new(
            vec![Pickup {
                position: start,
                kind: PickupKind::Restorative {
                    radius_cells: 3,
                    amount: 0.5,
                },
            }],
            1_000.0,
        );

        let _ = session.step();

        assert!(session.pickups.remaining().is_empty());
        assert!(session.events.iter().any(|event| matches!(
            event,
            Event::RadiusHealApplied { affected } if *affected > 0
        )));
        let (column, row) = query::geometry(&session.world).locate(start);
        let cell = CellCoord::new(column as u32, row as u32);
        assert_eq!(query::health_of(&session.world, cell), Some(0.0));
    }

    #[test]
    fn renewal_heal_lands_after_the_advance() {
        let mut config = small_config();
        config.pickups.equipment = 0;
        config.pickups.restorative = 0;
        config.caretaker.strength = 0.0;
        config.rates.decay_per_tick = 0.015_625;
        config.renewal.amount = 1.0;
        config.renewal_trigger = 0.0;
        let mut session = Session::with_library(config, 2, TextureLibrary::empty());
        session.terrain = TerrainGrid::filled(24, 18, TerrainKind::Dirt);

        let _ = session.step();

        assert!(session
            .events
            .iter()
            .any(|event| matches!(event, Event::GlobalHealApplied { changed: true })));
        assert_eq!(query::mean_deterioration(&session.world), 0.0);
    }

    #[test]
    fn snapshot_paints_flat_colours_without_textures() {
        let mut session = Session::with_library(small_config(), 4, TextureLibrary::empty());
        session.terrain = TerrainGrid::filled(24, 18, TerrainKind::Dirt);
        let _ = session.step();

        let frame = session.snapshot();
        let size = session.window.size();
        let (width, height) = cell_pixel_size(&query::geometry(&session.world), 1.0);
        assert_eq!(
            frame.dimensions(),
            (size.width() * width, size.height() * height)
        );
        assert_eq!(
            frame.get_pixel(0, 0),
            &Rgba(fallback_color(TerrainKind::Dirt).to_rgba8())
        );
    }
}
