use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use blobfx_common::frame::Frame;
use image::Rgb;
use imageproc::drawing::draw_text_mut;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum LabelFontError {
    #[error("failed to read font {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse font {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// TrueType face used for the box labels, at a fixed pixel height.
pub struct LabelFont {
    font: FontVec,
    scale: PxScale,
}

impl LabelFont {
    /// Load the face at `path`. A missing or unreadable font is not fatal:
    /// it is logged and labels are left out.
    pub fn load(path: &Path, px: f32) -> Option<Self> {
        match Self::open(path, px) {
            Ok(font) => {
                info!(path = %path.display(), px, "label font loaded");
                Some(font)
            }
            Err(e) => {
                warn!(error = %e, "label font unavailable, boxes will be drawn without labels");
                None
            }
        }
    }

    pub fn open(path: &Path, px: f32) -> Result<Self, LabelFontError> {
        let bytes = std::fs::read(path).map_err(|source| LabelFontError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| LabelFontError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            font,
            scale: PxScale::from(px),
        })
    }

    /// Draw `text` with its baseline at `baseline` and its left edge at `x`.
    pub fn draw(&self, frame: &mut Frame, x: i32, baseline: i32, text: &str, color: Rgb<u8>) {
        let ascent = self.font.as_scaled(self.scale).ascent();
        let top = baseline - ascent.round() as i32;
        draw_text_mut(frame, color, x, top, self.scale, &self.font, text);
    }
}

/// Fonts commonly present on Linux hosts; tests that need real glyphs use the
/// first one found and skip otherwise.
#[cfg(test)]
pub(crate) fn system_test_font() -> Option<LabelFont> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    ]
    .iter()
    .find_map(|p| LabelFont::open(Path::new(p), 16.0).ok())
}
