#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Verdure adapters.
//!
//! Terrain textures are produced on demand by [`RenderCache`] from a
//! [`TextureLibrary`] of pristine and deteriorated source images. Whenever no
//! bitmap can be produced, presentation falls back to [`fallback_color`].

mod cache;
mod effects;
mod manifest;

use std::rc::Rc;

use image::RgbaImage;
use thiserror::Error;
use verdure_core::{CellGeometry, TerrainKind};

pub use cache::{quantize, CacheKey, RenderCache, DEFAULT_CLEAR_INTERVAL};
pub use effects::{
    deteriorate, effect_for, ripple, synthesize_reference, water_animation, EffectDescriptor,
    MAX_WATER_BLUR,
};
pub use manifest::{TerrainTextures, TextureLibrary};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Converts the color into byte channels, clamping out-of-range values.
    #[must_use]
    pub fn to_rgba8(self) -> [u8; 4] {
        [
            channel_to_u8(self.red),
            channel_to_u8(self.green),
            channel_to_u8(self.blue),
            channel_to_u8(self.alpha),
        ]
    }
}

fn channel_to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Flat colour drawn for a cell whenever no texture could be produced.
#[must_use]
pub const fn fallback_color(terrain: TerrainKind) -> Color {
    match terrain {
        TerrainKind::Water => Color::from_rgb_u8(0, 0, 255),
        TerrainKind::Dirt => Color::from_rgb_u8(139, 69, 19),
        TerrainKind::TallGrass => Color::from_rgb_u8(0, 128, 0),
        TerrainKind::PathRocks => Color::from_rgb_u8(128, 128, 128),
        TerrainKind::Sand => Color::from_rgb_u8(238, 214, 175),
        TerrainKind::Snow => Color::from_rgb_u8(250, 250, 250),
        TerrainKind::Brick => Color::from_rgb_u8(178, 34, 34),
    }
}

/// Presentation range of a cell's health ratio.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HealthBand {
    /// Ratio below `0.5`; drawn with the regular texture.
    Pristine,
    /// Ratio in `0.5..0.7`; drawn with a colour-shifted texture.
    Transitional,
    /// Ratio at or above `0.7`; decorations are thinned out.
    Sparse,
}

impl HealthBand {
    /// Band the provided health ratio falls into. `NaN` counts as pristine.
    #[must_use]
    pub fn of(health: f32) -> Self {
        if health >= 0.7 {
            Self::Sparse
        } else if health >= 0.5 {
            Self::Transitional
        } else {
            Self::Pristine
        }
    }
}

/// Pixel size of one cell on screen at the provided zoom.
///
/// One extra pixel is added on each axis so neighbouring cells overlap and
/// never leave seams.
#[must_use]
pub fn cell_pixel_size(geometry: &CellGeometry, zoom: f32) -> (u32, u32) {
    let scale = |extent: f32| {
        let scaled = extent * zoom;
        if scaled.is_finite() && scaled > 0.0 {
            (scaled as u32).saturating_add(1)
        } else {
            0
        }
    };
    (scale(geometry.cell_width()), scale(geometry.cell_height()))
}

/// Opaque, cheaply cloneable handle to a built cell bitmap.
#[derive(Clone, Debug)]
pub struct TextureHandle(Rc<RgbaImage>);

impl TextureHandle {
    pub(crate) fn new(image: RgbaImage) -> Self {
        Self(Rc::new(image))
    }

    /// Read-only access to the pixels.
    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.0
    }

    /// Width and height of the bitmap in pixels.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    /// Reports whether both handles refer to the same cached bitmap.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Reasons a cell bitmap could not be produced.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
pub enum RenderError {
    /// No pristine texture was loaded for the terrain.
    #[error("no base texture loaded for {0:?}")]
    MissingBase(TerrainKind),
    /// The loaded base texture has no pixels.
    #[error("base texture is empty")]
    EmptySource,
    /// The requested output size has a zero dimension.
    #[error("cannot build a {width}x{height} bitmap")]
    EmptyTarget {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgb_u8_round_trips_through_bytes() {
        let color = Color::from_rgb_u8(139, 69, 19);
        assert_eq!(color.to_rgba8(), [139, 69, 19, 255]);
        assert_eq!(Color::new(2.0, -1.0, 0.5, 1.0).to_rgba8(), [255, 0, 128, 255]);
    }

    #[test]
    fn fallback_colours_follow_terrain_palette() {
        assert_eq!(fallback_color(TerrainKind::Water).to_rgba8(), [0, 0, 255, 255]);
        assert_eq!(
            fallback_color(TerrainKind::PathRocks).to_rgba8(),
            [128, 128, 128, 255]
        );
    }

    #[test]
    fn health_bands_split_at_presentation_boundaries() {
        assert_eq!(HealthBand::of(0.0), HealthBand::Pristine);
        assert_eq!(HealthBand::of(0.49), HealthBand::Pristine);
        assert_eq!(HealthBand::of(0.5), HealthBand::Transitional);
        assert_eq!(HealthBand::of(0.69), HealthBand::Transitional);
        assert_eq!(HealthBand::of(0.7), HealthBand::Sparse);
        assert_eq!(HealthBand::of(f32::NAN), HealthBand::Pristine);
    }

    #[test]
    fn cell_pixel_size_adds_overlap_pixel() {
        let geometry = CellGeometry::new(10.0, 8.0);
        assert_eq!(cell_pixel_size(&geometry, 1.0), (11, 9));
        assert_eq!(cell_pixel_size(&geometry, 1.55), (16, 13));
        assert_eq!(cell_pixel_size(&geometry, 0.0), (0, 0));
    }

    #[test]
    fn render_errors_describe_the_failure() {
        assert_eq!(
            RenderError::EmptyTarget {
                width: 0,
                height: 9
            }
            .to_string(),
            "cannot build a 0x9 bitmap"
        );
    }
}
