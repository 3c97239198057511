use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use verdure_core::{CellGeometry, DecayRates};
use verdure_system_caretaker::CaretakerConfig;
use verdure_system_outcome::OutcomeConfig;
use verdure_system_renewal::RenewalConfig;

/// Every tunable of a headless session, loaded from TOML.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct SessionConfig {
    pub(crate) grid: GridConfig,
    pub(crate) rates: DecayRates,
    pub(crate) view: ViewConfig,
    pub(crate) caretaker: CaretakerConfig,
    pub(crate) pickups: PickupConfig,
    pub(crate) renewal: RenewalConfig,
    /// Mean deterioration at which the session triggers the renewal ability.
    pub(crate) renewal_trigger: f32,
    pub(crate) outcome: OutcomeConfig,
    pub(crate) render: RenderConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            rates: DecayRates::default(),
            view: ViewConfig::default(),
            caretaker: CaretakerConfig::default(),
            pickups: PickupConfig::default(),
            renewal: RenewalConfig::default(),
            renewal_trigger: 0.5,
            outcome: OutcomeConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Reads the configuration file, falling back to defaults for absent keys.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read session config at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse session config at {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid session config toml")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct GridConfig {
    pub(crate) columns: u32,
    pub(crate) rows: u32,
    pub(crate) cell_width: f32,
    pub(crate) cell_height: f32,
}

impl GridConfig {
    pub(crate) fn geometry(&self) -> CellGeometry {
        CellGeometry::new(self.cell_width, self.cell_height)
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 200,
            rows: 150,
            cell_width: 10.0,
            cell_height: 8.0,
        }
    }
}

/// Camera settings deciding which cells are processed each step.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct ViewConfig {
    pub(crate) window_width: f32,
    pub(crate) window_height: f32,
    pub(crate) zoom: f32,
    /// When unset every active cell is advanced, not just the visible ones.
    pub(crate) windowed: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            window_width: 800.0,
            window_height: 600.0,
            zoom: 1.0,
            windowed: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct PickupConfig {
    pub(crate) equipment: u32,
    pub(crate) restorative: u32,
    pub(crate) reach: f32,
    pub(crate) restorative_radius_cells: u32,
    pub(crate) restorative_amount: f32,
}

impl Default for PickupConfig {
    fn default() -> Self {
        Self {
            equipment: 3,
            restorative: 4,
            reach: 12.0,
            restorative_radius_cells: 3,
            restorative_amount: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct RenderConfig {
    pub(crate) clear_interval: u32,
    pub(crate) manifest: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_interval: verdure_rendering::DEFAULT_CLEAR_INTERVAL,
            manifest: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = SessionConfig::parse("").expect("empty config parses");
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.outcome.loss_threshold, 0.8);
        assert_eq!(config.render.clear_interval, 30);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = SessionConfig::parse(
            r#"
            renewal_trigger = 0.4

            [grid]
            columns = 32

            [rates]
            decay_per_tick = 0.01

            [render]
            manifest = "assets/textures.toml"
            "#,
        )
        .expect("config parses");

        assert_eq!(config.grid.columns, 32);
        assert_eq!(config.grid.rows, 150);
        assert_eq!(config.rates.decay_per_tick, 0.01);
        assert_eq!(config.rates.heal_per_tick, 0.015);
        assert_eq!(config.renewal_trigger, 0.4);
        assert_eq!(
            config.render.manifest,
            Some(PathBuf::from("assets/textures.toml"))
        );
    }

    #[test]
    fn malformed_config_is_rejected() {
        assert!(SessionConfig::parse("[grid]\ncolumns = \"many\"").is_err());
    }
}
