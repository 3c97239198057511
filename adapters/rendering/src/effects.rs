//! Terrain deterioration looks expressed as data and one generic blend.

use image::{imageops, Rgba, RgbaImage};
use verdure_core::TerrainKind;

use crate::RenderError;

/// Strongest blur applied to animated water, as a Gaussian sigma.
pub const MAX_WATER_BLUR: f32 = 1.5;

const WATER_PERIOD_TICKS: u64 = 120;
const MIN_BLUR_SIGMA: f32 = 0.05;

/// Adjustments that turn a pristine texture into its fully deteriorated look.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectDescriptor {
    /// Contrast change in percent, as accepted by [`imageops::contrast`].
    pub contrast_delta: f32,
    /// Brightness change added to every channel.
    pub brightness_delta: i32,
    /// Gaussian sigma softening the deteriorated look; zero disables it.
    pub blur_on_high: f32,
    /// Fraction of colour removed, from `0.0` (none) to `1.0` (grayscale).
    pub desaturation_delta: f32,
}

impl EffectDescriptor {
    const NONE: Self = Self {
        contrast_delta: 0.0,
        brightness_delta: 0,
        blur_on_high: 0.0,
        desaturation_delta: 0.0,
    };
}

/// Deterioration look for each terrain kind.
#[must_use]
pub const fn effect_for(terrain: TerrainKind) -> EffectDescriptor {
    match terrain {
        TerrainKind::Water => EffectDescriptor::NONE,
        TerrainKind::Dirt => EffectDescriptor {
            contrast_delta: -10.0,
            brightness_delta: -20,
            blur_on_high: 0.0,
            desaturation_delta: 0.5,
        },
        TerrainKind::TallGrass => EffectDescriptor {
            contrast_delta: -15.0,
            brightness_delta: -10,
            blur_on_high: 0.8,
            desaturation_delta: 0.8,
        },
        TerrainKind::PathRocks => EffectDescriptor {
            contrast_delta: 10.0,
            brightness_delta: -15,
            blur_on_high: 0.0,
            desaturation_delta: 0.4,
        },
        TerrainKind::Sand => EffectDescriptor {
            contrast_delta: -5.0,
            brightness_delta: 10,
            blur_on_high: 0.0,
            desaturation_delta: 0.6,
        },
        TerrainKind::Snow => EffectDescriptor {
            contrast_delta: -20.0,
            brightness_delta: -35,
            blur_on_high: 0.6,
            desaturation_delta: 0.3,
        },
        TerrainKind::Brick => EffectDescriptor {
            contrast_delta: 15.0,
            brightness_delta: -25,
            blur_on_high: 0.0,
            desaturation_delta: 0.5,
        },
    }
}

/// Periodic animation parameter in `0.0..=1.0` used to key animated water.
#[must_use]
pub fn water_animation(tick: verdure_core::Tick) -> f32 {
    let phase = (tick.get() % WATER_PERIOD_TICKS) as f32 / WATER_PERIOD_TICKS as f32;
    0.5 + 0.5 * (phase * std::f32::consts::TAU).sin()
}

/// Builds the fully deteriorated reference when none was authored.
#[must_use]
pub fn synthesize_reference(base: &RgbaImage, effect: EffectDescriptor) -> RgbaImage {
    let mut reference = desaturate(base, effect.desaturation_delta);
    if effect.contrast_delta != 0.0 {
        reference = imageops::contrast(&reference, effect.contrast_delta);
    }
    if effect.brightness_delta != 0 {
        reference = imageops::brighten(&reference, effect.brightness_delta);
    }
    if effect.blur_on_high > MIN_BLUR_SIGMA {
        reference = imageops::blur(&reference, effect.blur_on_high);
    }
    reference
}

/// Blends `base` toward `reference` by `ratio` and resizes to the target.
///
/// A `None` reference is synthesised from the base using `effect`.
pub fn deteriorate(
    base: &RgbaImage,
    reference: Option<&RgbaImage>,
    effect: EffectDescriptor,
    ratio: f32,
    width: u32,
    height: u32,
) -> Result<RgbaImage, RenderError> {
    ensure_target(base, width, height)?;
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };

    let blended = if ratio == 0.0 {
        base.clone()
    } else {
        let reference = match reference {
            Some(reference) if reference.dimensions() == base.dimensions() => reference.clone(),
            Some(reference) => imageops::resize(
                reference,
                base.width(),
                base.height(),
                imageops::FilterType::Triangle,
            ),
            None => synthesize_reference(base, effect),
        };
        blend(base, &reference, ratio)
    };

    Ok(resize_to(&blended, width, height))
}

/// Softens `base` by the animation amount and resizes to the target.
pub fn ripple(
    base: &RgbaImage,
    animation: f32,
    width: u32,
    height: u32,
) -> Result<RgbaImage, RenderError> {
    ensure_target(base, width, height)?;
    let amount = if animation.is_nan() { 0.0 } else { animation.clamp(0.0, 1.0) };
    let sigma = amount * MAX_WATER_BLUR;
    let softened = if sigma > MIN_BLUR_SIGMA {
        imageops::blur(base, sigma)
    } else {
        base.clone()
    };
    Ok(resize_to(&softened, width, height))
}

fn ensure_target(base: &RgbaImage, width: u32, height: u32) -> Result<(), RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyTarget { width, height });
    }
    if base.width() == 0 || base.height() == 0 {
        return Err(RenderError::EmptySource);
    }
    Ok(())
}

fn resize_to(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, imageops::FilterType::Triangle)
}

fn blend(base: &RgbaImage, reference: &RgbaImage, ratio: f32) -> RgbaImage {
    let mut out = base.clone();
    for (pixel, target) in out.pixels_mut().zip(reference.pixels()) {
        for (channel, goal) in pixel.0.iter_mut().zip(target.0) {
            let value = f32::from(*channel) + (f32::from(goal) - f32::from(*channel)) * ratio;
            *channel = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

fn desaturate(image: &RgbaImage, amount: f32) -> RgbaImage {
    let amount = amount.clamp(0.0, 1.0);
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let Rgba([red, green, blue, alpha]) = *pixel;
        let luma = 0.299 * f32::from(red) + 0.587 * f32::from(green) + 0.114 * f32::from(blue);
        let mix = |channel: u8| {
            let value = f32::from(channel) + (luma - f32::from(channel)) * amount;
            value.round().clamp(0.0, 255.0) as u8
        };
        *pixel = Rgba([mix(red), mix(green), mix(blue), alpha]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdure_core::Tick;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(rgba))
    }

    #[test]
    fn pristine_ratio_keeps_base_colours() {
        let base = solid(4, 4, [40, 160, 60, 255]);
        let built =
            deteriorate(&base, None, effect_for(TerrainKind::TallGrass), 0.0, 8, 8).expect("build");
        assert_eq!(built.dimensions(), (8, 8));
        assert_eq!(built.get_pixel(3, 3), &Rgba([40, 160, 60, 255]));
    }

    #[test]
    fn full_ratio_reaches_authored_reference() {
        let base = solid(2, 2, [200, 100, 0, 255]);
        let reference = solid(2, 2, [0, 0, 100, 255]);
        let built = deteriorate(&base, Some(&reference), EffectDescriptor::NONE, 1.0, 2, 2)
            .expect("build");
        assert_eq!(built.get_pixel(0, 0), &Rgba([0, 0, 100, 255]));

        let half = deteriorate(&base, Some(&reference), EffectDescriptor::NONE, 0.5, 2, 2)
            .expect("build");
        assert_eq!(half.get_pixel(1, 1), &Rgba([100, 50, 50, 255]));
    }

    #[test]
    fn synthesized_reference_is_desaturated() {
        let base = solid(2, 2, [255, 0, 0, 255]);
        let effect = EffectDescriptor {
            desaturation_delta: 1.0,
            ..EffectDescriptor::NONE
        };
        let reference = synthesize_reference(&base, effect);
        let Rgba([red, green, blue, _]) = *reference.get_pixel(0, 0);
        assert_eq!(red, green);
        assert_eq!(green, blue);
    }

    #[test]
    fn zero_sized_targets_fail_without_panicking() {
        let base = solid(2, 2, [0, 0, 0, 255]);
        assert_eq!(
            deteriorate(&base, None, EffectDescriptor::NONE, 0.5, 0, 4),
            Err(RenderError::EmptyTarget {
                width: 0,
                height: 4
            })
        );
        assert_eq!(ripple(&RgbaImage::new(0, 0), 0.5, 4, 4), Err(RenderError::EmptySource));
    }

    #[test]
    fn water_animation_is_periodic_and_bounded() {
        for tick in 0..WATER_PERIOD_TICKS {
            let value = water_animation(Tick::new(tick));
            assert!((0.0..=1.0).contains(&value));
            assert_eq!(value, water_animation(Tick::new(tick + WATER_PERIOD_TICKS)));
        }
    }
}
