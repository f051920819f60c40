use std::path::Path;

use image::imageops::FilterType;
use image::{ImageReader, RgbImage};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

/// Decal images loaded once at startup. Never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct OverlaySet {
    images: Vec<RgbImage>,
}

impl OverlaySet {
    /// Load `1.jpg ..= count.jpg` from `dir`, each resized to `edge x edge`.
    ///
    /// Files that are missing or fail to decode are skipped with a warning;
    /// an empty set is valid and simply disables decals.
    pub fn load(dir: &Path, count: u32, edge: u32) -> Self {
        let mut images = Vec::new();
        for n in 1..=count {
            let path = dir.join(format!("{n}.jpg"));
            match load_one(&path, edge) {
                Ok(img) => {
                    debug!(path = %path.display(), "loaded overlay image");
                    images.push(img);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping overlay image"),
            }
        }
        let set = Self { images };
        if set.is_empty() {
            warn!(dir = %dir.display(), "no overlay images loaded, decals disabled");
        } else {
            info!(dir = %dir.display(), loaded = set.len(), requested = count, edge, "overlay set ready");
        }
        set
    }

    #[cfg(test)]
    pub fn from_images(images: Vec<RgbImage>) -> Self {
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Uniform pick; `None` when the set is empty.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&RgbImage> {
        self.images.choose(rng)
    }
}

fn load_one(path: &Path, edge: u32) -> Result<RgbImage, image::ImageError> {
    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(img.resize_exact(edge, edge, FilterType::Triangle).to_rgb8())
}
