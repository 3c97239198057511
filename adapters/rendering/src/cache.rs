use std::collections::{HashMap, HashSet};

use verdure_core::TerrainKind;

use crate::{
    effects::{deteriorate, effect_for, ripple},
    manifest::TextureLibrary,
    RenderError, TextureHandle,
};

/// Number of simulation steps between unconditional cache clears.
pub const DEFAULT_CLEAR_INTERVAL: u32 = 30;

const BUCKETS: f32 = 100.0;

/// Maps a ratio onto one of the 101 cache buckets, two decimals wide.
///
/// Values outside `0.0..=1.0` are clamped; `NaN` maps to bucket zero.
#[must_use]
pub fn quantize(value: f32) -> u16 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * BUCKETS).round() as u16
}

/// Identity of one cached bitmap.
///
/// `bucket` carries the quantised health ratio for deteriorating terrain and
/// the quantised animation parameter for exempt terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Terrain the bitmap depicts.
    pub terrain: TerrainKind,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Quantised appearance parameter.
    pub bucket: u16,
}

/// Memoises cell bitmaps keyed by terrain, size, and quantised appearance.
///
/// Entries are never refreshed: a hit returns whatever was built for the key.
/// The whole cache is dropped every `clear_interval` steps.
#[derive(Debug)]
pub struct RenderCache {
    library: TextureLibrary,
    entries: HashMap<CacheKey, TextureHandle>,
    clear_interval: u32,
    steps: u32,
    reported: HashSet<(TerrainKind, RenderError)>,
}

impl RenderCache {
    /// Creates an empty cache over the provided textures.
    ///
    /// A `clear_interval` of zero is treated as one.
    #[must_use]
    pub fn new(library: TextureLibrary, clear_interval: u32) -> Self {
        Self {
            library,
            entries: HashMap::new(),
            clear_interval: clear_interval.max(1),
            steps: 0,
            reported: HashSet::new(),
        }
    }

    /// Number of bitmaps currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the cache holds no bitmaps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records one simulation step, clearing the cache when the interval elapses.
    ///
    /// Returns `true` on the steps that cleared the cache.
    pub fn on_step(&mut self) -> bool {
        self.steps += 1;
        if self.steps < self.clear_interval {
            return false;
        }
        self.steps = 0;
        if !self.entries.is_empty() {
            tracing::trace!(entries = self.entries.len(), "clearing render cache");
        }
        self.entries.clear();
        true
    }

    /// Returns the bitmap for a cell, building and caching it on a miss.
    ///
    /// `health` selects the look of deteriorating terrain and `animation`
    /// the look of exempt terrain; the other argument is ignored. Returns
    /// `None` when the bitmap cannot be built, in which case the caller
    /// draws [`crate::fallback_color`].
    pub fn get_or_build(
        &mut self,
        terrain: TerrainKind,
        width: u32,
        height: u32,
        health: f32,
        animation: f32,
    ) -> Option<TextureHandle> {
        let appearance = if terrain.is_exempt() { animation } else { health };
        let key = CacheKey {
            terrain,
            width,
            height,
            bucket: quantize(appearance),
        };

        if let Some(handle) = self.entries.get(&key) {
            return Some(handle.clone());
        }

        match self.build(key) {
            Ok(handle) => {
                let _ = self.entries.insert(key, handle.clone());
                Some(handle)
            }
            Err(error) => {
                if self.reported.insert((terrain, error)) {
                    tracing::warn!(%error, ?terrain, "falling back to flat colour");
                }
                None
            }
        }
    }

    fn build(&self, key: CacheKey) -> Result<TextureHandle, RenderError> {
        let textures = self
            .library
            .get(key.terrain)
            .ok_or(RenderError::MissingBase(key.terrain))?;
        let value = f32::from(key.bucket) / BUCKETS;

        let image = if key.terrain.is_exempt() {
            ripple(textures.base(), value, key.width, key.height)?
        } else {
            deteriorate(
                textures.base(),
                textures.deteriorated(),
                effect_for(key.terrain),
                value,
                key.width,
                key.height,
            )?
        };
        Ok(TextureHandle::new(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TerrainTextures;
    use image::{Rgba, RgbaImage};

    fn library() -> TextureLibrary {
        let mut library = TextureLibrary::empty();
        library.insert(
            TerrainKind::Dirt,
            TerrainTextures::new(RgbaImage::from_pixel(4, 4, Rgba([139, 69, 19, 255])), None),
        );
        library.insert(
            TerrainKind::Water,
            TerrainTextures::new(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255])), None),
        );
        library
    }

    #[test]
    fn quantize_rounds_to_two_decimals() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(0.004), 0);
        assert_eq!(quantize(0.006), 1);
        assert_eq!(quantize(0.5), 50);
        assert_eq!(quantize(1.7), 100);
        assert_eq!(quantize(-0.3), 0);
        assert_eq!(quantize(f32::NAN), 0);
    }

    #[test]
    fn same_bucket_returns_the_cached_handle() {
        let mut cache = RenderCache::new(library(), DEFAULT_CLEAR_INTERVAL);
        let first = cache
            .get_or_build(TerrainKind::Dirt, 8, 8, 0.41, 0.0)
            .expect("dirt builds");
        let second = cache
            .get_or_build(TerrainKind::Dirt, 8, 8, 0.414, 0.9)
            .expect("dirt builds");
        assert!(first.ptr_eq(&second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn crossing_a_bucket_builds_a_new_bitmap() {
        let mut cache = RenderCache::new(library(), DEFAULT_CLEAR_INTERVAL);
        let low = cache
            .get_or_build(TerrainKind::Dirt, 8, 8, 0.004, 0.0)
            .expect("dirt builds");
        let high = cache
            .get_or_build(TerrainKind::Dirt, 8, 8, 0.006, 0.0)
            .expect("dirt builds");
        assert!(!low.ptr_eq(&high));
        assert_eq!(cache.len(), 2);

        let resized = cache
            .get_or_build(TerrainKind::Dirt, 9, 8, 0.006, 0.0)
            .expect("dirt builds");
        assert_eq!(resized.dimensions(), (9, 8));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn exempt_terrain_is_keyed_by_animation() {
        let mut cache = RenderCache::new(library(), DEFAULT_CLEAR_INTERVAL);
        let calm = cache
            .get_or_build(TerrainKind::Water, 4, 4, 0.0, 0.2)
            .expect("water builds");
        let same = cache
            .get_or_build(TerrainKind::Water, 4, 4, 0.9, 0.2)
            .expect("water builds");
        assert!(calm.ptr_eq(&same));

        let rough = cache
            .get_or_build(TerrainKind::Water, 4, 4, 0.0, 0.8)
            .expect("water builds");
        assert!(!calm.ptr_eq(&rough));
    }

    #[test]
    fn cache_clears_every_interval() {
        let mut cache = RenderCache::new(library(), 3);
        let _ = cache.get_or_build(TerrainKind::Dirt, 8, 8, 0.2, 0.0);
        assert!(!cache.on_step());
        assert!(!cache.on_step());
        assert_eq!(cache.len(), 1);
        assert!(cache.on_step());
        assert!(cache.is_empty());
    }

    #[test]
    fn failures_return_none_and_are_not_cached() {
        let mut cache = RenderCache::new(library(), DEFAULT_CLEAR_INTERVAL);
        assert!(cache
            .get_or_build(TerrainKind::Snow, 8, 8, 0.5, 0.0)
            .is_none());
        assert!(cache
            .get_or_build(TerrainKind::Snow, 8, 8, 0.5, 0.0)
            .is_none());
        assert!(cache
            .get_or_build(TerrainKind::Dirt, 0, 8, 0.5, 0.0)
            .is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn each_distinct_failure_is_reported_once() {
        let mut cache = RenderCache::new(TextureLibrary::empty(), DEFAULT_CLEAR_INTERVAL);
        let _ = cache.get_or_build(TerrainKind::Snow, 8, 8, 0.5, 0.0);
        let _ = cache.get_or_build(TerrainKind::Snow, 8, 8, 0.9, 0.0);
        assert_eq!(cache.reported.len(), 1);

        let mut cache = RenderCache::new(library(), DEFAULT_CLEAR_INTERVAL);
        let _ = cache.get_or_build(TerrainKind::Dirt, 0, 8, 0.5, 0.0);
        let _ = cache.get_or_build(TerrainKind::Dirt, 8, 0, 0.5, 0.0);
        let _ = cache.get_or_build(TerrainKind::Dirt, 0, 8, 0.7, 0.0);
        assert_eq!(cache.reported.len(), 2);
        assert!(cache.reported.contains(&(
            TerrainKind::Dirt,
            RenderError::EmptyTarget {
                width: 8,
                height: 0
            }
        )));
    }
}
