use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use image::RgbaImage;
use serde::Deserialize;
use verdure_core::TerrainKind;

const SUPPORTED_MANIFEST_VERSION: u32 = 1;

/// Source images for one terrain kind.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainTextures {
    base: RgbaImage,
    deteriorated: Option<RgbaImage>,
}

impl TerrainTextures {
    /// Pairs a pristine image with an optional fully deteriorated reference.
    #[must_use]
    pub fn new(base: RgbaImage, deteriorated: Option<RgbaImage>) -> Self {
        Self { base, deteriorated }
    }

    /// Pristine look of the terrain.
    #[must_use]
    pub fn base(&self) -> &RgbaImage {
        &self.base
    }

    /// Authored fully deteriorated look, if one was supplied.
    #[must_use]
    pub fn deteriorated(&self) -> Option<&RgbaImage> {
        self.deteriorated.as_ref()
    }
}

/// Source textures loaded once at startup.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextureLibrary {
    textures: HashMap<TerrainKind, TerrainTextures>,
}

impl TextureLibrary {
    /// Library without any textures; every cell renders as a flat colour.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registers the textures for a terrain, replacing any previous entry.
    pub fn insert(&mut self, terrain: TerrainKind, textures: TerrainTextures) {
        let _ = self.textures.insert(terrain, textures);
    }

    /// Textures registered for the terrain.
    #[must_use]
    pub fn get(&self, terrain: TerrainKind) -> Option<&TerrainTextures> {
        self.textures.get(&terrain)
    }

    /// Number of terrains with a loaded base texture.
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Reports whether no textures were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Loads textures listed in the manifest located at the provided path.
    ///
    /// A missing manifest yields an empty library. Image files that cannot
    /// be loaded are logged and skipped.
    pub fn from_manifest_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_manifest_with_loader(path, default_loader)
    }

    fn from_manifest_with_loader(
        path: impl AsRef<Path>,
        mut loader: impl FnMut(&Path) -> Result<RgbaImage>,
    ) -> Result<Self> {
        let manifest_path = path.as_ref();
        if !manifest_path.exists() {
            tracing::warn!(
                path = %manifest_path.display(),
                "texture manifest not found; using flat colours"
            );
            return Ok(Self::empty());
        }

        let contents = fs::read_to_string(manifest_path).with_context(|| {
            format!(
                "failed to read texture manifest at {}",
                manifest_path.display()
            )
        })?;
        let base = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let entries = parse_manifest(&contents, &base)?;
        Ok(Self::from_entries(entries, &mut loader))
    }

    fn from_entries(
        entries: Vec<ManifestEntry>,
        loader: &mut impl FnMut(&Path) -> Result<RgbaImage>,
    ) -> Self {
        let mut library = Self::empty();
        for entry in entries {
            let base = match loader(&entry.base) {
                Ok(image) => image,
                Err(error) => {
                    tracing::warn!(
                        terrain = ?entry.terrain,
                        path = %entry.base.display(),
                        error = %error,
                        "skipping terrain texture"
                    );
                    continue;
                }
            };

            let deteriorated = entry.deteriorated.and_then(|path| match loader(&path) {
                Ok(image) => Some(image),
                Err(error) => {
                    tracing::warn!(
                        terrain = ?entry.terrain,
                        path = %path.display(),
                        error = %error,
                        "synthesising deteriorated texture instead"
                    );
                    None
                }
            });

            library.insert(entry.terrain, TerrainTextures::new(base, deteriorated));
        }
        library
    }
}

fn default_loader(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to load texture at {}", path.display()))?;
    Ok(image.to_rgba8())
}

#[derive(Debug, Deserialize)]
struct Manifest {
    version: u32,
    #[serde(default)]
    textures: HashMap<TerrainKind, TextureFiles>,
}

#[derive(Debug, Deserialize)]
struct TextureFiles {
    base: String,
    deteriorated: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ManifestEntry {
    terrain: TerrainKind,
    base: PathBuf,
    deteriorated: Option<PathBuf>,
}

fn parse_manifest(contents: &str, base_path: &Path) -> Result<Vec<ManifestEntry>> {
    let manifest: Manifest =
        toml::from_str(contents).context("failed to parse texture manifest toml contents")?;
    if manifest.version != SUPPORTED_MANIFEST_VERSION {
        bail!(
            "unsupported texture manifest version {}; expected {}",
            manifest.version,
            SUPPORTED_MANIFEST_VERSION
        );
    }

    let mut resolved = manifest.textures;
    Ok(TerrainKind::ALL
        .into_iter()
        .filter_map(|terrain| {
            resolved.remove(&terrain).map(|files| ManifestEntry {
                terrain,
                base: base_path.join(files.base),
                deteriorated: files.deteriorated.map(|path| base_path.join(path)),
            })
        })
        .collect())
}
