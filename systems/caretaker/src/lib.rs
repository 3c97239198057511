#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! The player-controlled healing source and the pickups it can collect.

use glam::Vec2;
use serde::Deserialize;
use verdure_core::{CellGeometry, Command, HealingSource};

/// Tuning for a caretaker's movement and healing aura.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CaretakerConfig {
    /// Base movement speed; scaled by the cell width on every step.
    pub speed: f32,
    /// Healing radius in world units before equipment bonuses.
    pub radius: f32,
    /// Healing strength before equipment bonuses.
    pub strength: f32,
    /// Body size as a fraction of the smaller cell side; keeps the body inside the world.
    pub body_fraction: f32,
}

impl Default for CaretakerConfig {
    fn default() -> Self {
        Self {
            speed: 2.5,
            radius: 40.0,
            strength: 1.0,
            body_fraction: 0.4,
        }
    }
}

/// Permanent bonus granted by an equipment pickup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Equipment {
    /// Added to the caretaker's healing strength.
    pub strength_bonus: f32,
    /// Added to the caretaker's healing radius, in world units.
    pub radius_bonus: f32,
}

impl Default for Equipment {
    fn default() -> Self {
        Self {
            strength_bonus: 0.08,
            radius_bonus: 6.0,
        }
    }
}

/// Moving healing source steered by the player.
#[derive(Clone, Debug, PartialEq)]
pub struct Caretaker {
    position: Vec2,
    config: CaretakerConfig,
    step_scale: f32,
    padding: f32,
    bounds: Vec2,
    strength_bonus: f32,
    radius_bonus: f32,
}

impl Caretaker {
    /// Places a caretaker at the centre of a `columns` x `rows` world.
    #[must_use]
    pub fn new(config: CaretakerConfig, geometry: &CellGeometry, columns: u32, rows: u32) -> Self {
        let bounds = Vec2::new(
            columns as f32 * geometry.cell_width(),
            rows as f32 * geometry.cell_height(),
        );
        let padding = geometry.cell_width().min(geometry.cell_height()) * config.body_fraction;
        Self {
            position: bounds / 2.0,
            config,
            step_scale: config.speed * geometry.cell_width() / 20.0,
            padding,
            bounds,
            strength_bonus: 0.0,
            radius_bonus: 0.0,
        }
    }

    /// Moves by `direction` scaled by the caretaker's speed, staying inside the world.
    pub fn move_by(&mut self, direction: Vec2) {
        let target = self.position + direction * self.step_scale;
        self.position = self.clamp_to_world(target);
    }

    /// Places the caretaker at `position`, clamped to the world.
    pub fn teleport(&mut self, position: Vec2) {
        self.position = self.clamp_to_world(position);
    }

    /// Applies an equipment bonus; bonuses stack.
    pub fn equip(&mut self, equipment: Equipment) {
        self.strength_bonus += equipment.strength_bonus;
        self.radius_bonus += equipment.radius_bonus;
    }

    fn clamp_to_world(&self, point: Vec2) -> Vec2 {
        let min = Vec2::splat(self.padding);
        let max = (self.bounds - Vec2::splat(self.padding)).max(min);
        point.clamp(min, max)
    }
}

impl HealingSource for Caretaker {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        self.config.radius + self.radius_bonus
    }

    fn strength(&self) -> f32 {
        self.config.strength + self.strength_bonus
    }
}

/// Effect applied when a pickup is collected.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PickupKind {
    /// Permanently improves the caretaker's healing aura.
    Equipment(Equipment),
    /// Instantly heals cells around the pickup's location.
    Restorative {
        /// Radius of the burst in whole cells.
        radius_cells: u32,
        /// Amount removed from each affected cell's health ratio.
        amount: f32,
    },
}

/// Collectible item placed in the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pickup {
    /// World-space position of the item.
    pub position: Vec2,
    /// Effect applied on collection.
    pub kind: PickupKind,
}

/// System that resolves pickup collection by the caretaker.
#[derive(Debug)]
pub struct Pickups {
    items: Vec<Pickup>,
    reach: f32,
}

impl Pickups {
    /// Creates the system with the items placed in the world and the
    /// distance at which the caretaker collects them.
    #[must_use]
    pub fn new(items: Vec<Pickup>, reach: f32) -> Self {
        Self { items, reach }
    }

    /// Items still waiting to be collected.
    #[must_use]
    pub fn remaining(&self) -> &[Pickup] {
        &self.items
    }

    /// Collects every item within reach of the caretaker.
    ///
    /// Equipment is applied to the caretaker directly; restorative items
    /// emit `Command::ApplyRadiusHeal` at their own location. Returns the
    /// number of items collected.
    pub fn handle(&mut self, caretaker: &mut Caretaker, out: &mut Vec<Command>) -> usize {
        let position = caretaker.position();
        let reach = self.reach;
        let before = self.items.len();

        self.items.retain(|item| {
            if item.position.distance(position) > reach {
                return true;
            }
            match item.kind {
                PickupKind::Equipment(equipment) => caretaker.equip(equipment),
                PickupKind::Restorative {
                    radius_cells,
                    amount,
                } => out.push(Command::ApplyRadiusHeal {
                    center: item.position,
                    radius_cells,
                    amount,
                }),
            }
            false
        });

        before - self.items.len()
    }
}
