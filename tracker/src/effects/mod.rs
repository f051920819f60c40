pub mod decal;
pub mod draw;
pub mod font;
pub mod glitch;

use blobfx_common::config::EffectsConfig;
use blobfx_common::frame::{BlobPosition, Frame};
use rand::Rng;
use tracing::trace;

use crate::overlay::OverlaySet;
use decal::DecalPlacement;
use draw::WHITE;
use font::LabelFont;
use glitch::GlitchParams;

/// What the compositor did to one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeReport {
    pub glitched_bands: usize,
    pub lines_drawn: usize,
    pub boxes_drawn: usize,
    pub decal: Option<DecalPlacement>,
}

/// Draws the per-frame overlays keyed to blob positions.
///
/// Order is fixed: glitch bands first (so geometry drawn afterwards stays
/// crisp), then connective lines, then labeled boxes, then the decal.
pub struct Compositor<'a> {
    glitch: GlitchParams,
    box_half_size: i32,
    decal_opacity: f32,
    overlays: &'a OverlaySet,
    label_font: Option<&'a LabelFont>,
}

impl<'a> Compositor<'a> {
    pub fn new(config: &EffectsConfig, overlays: &'a OverlaySet, label_font: Option<&'a LabelFont>) -> Self {
        Self {
            glitch: GlitchParams::from(config),
            box_half_size: config.box_half_size,
            decal_opacity: config.decal_opacity,
            overlays,
            label_font,
        }
    }

    pub fn composite<R: Rng + ?Sized>(&self, frame: &mut Frame, positions: &[BlobPosition], rng: &mut R) -> CompositeReport {
        let bands = glitch::apply_glitch(frame, &self.glitch, rng);

        let segments = draw::connective_segments(positions);
        for (a, b) in &segments {
            draw::draw_line_aa(frame, *a, *b, WHITE);
        }

        for (idx, p) in positions.iter().enumerate() {
            self.draw_labeled_box(frame, *p, idx);
        }

        let decal = self.place_decal(frame, positions, rng);

        let report = CompositeReport {
            glitched_bands: bands.len(),
            lines_drawn: segments.len(),
            boxes_drawn: positions.len(),
            decal,
        };
        trace!(?report, "frame composited");
        report
    }

    /// Square outline centered on `p`, with `ID:<idx>` above and to the right.
    /// `idx` is the position's index in this frame only.
    fn draw_labeled_box(&self, frame: &mut Frame, p: BlobPosition, idx: usize) {
        let s = self.box_half_size;
        draw::draw_rect(frame, p.x - s, p.y - s, p.x + s, p.y + s, WHITE);
        if let Some(font) = self.label_font {
            font.draw(frame, p.x + s + 2, p.y - s - 2, &format!("ID:{idx}"), WHITE);
        }
    }

    fn place_decal<R: Rng + ?Sized>(&self, frame: &mut Frame, positions: &[BlobPosition], rng: &mut R) -> Option<DecalPlacement> {
        let anchor = *positions.first()?;
        let image = self.overlays.choose(rng)?;
        decal::place_decal(frame, anchor, image, self.decal_opacity)
    }
}
