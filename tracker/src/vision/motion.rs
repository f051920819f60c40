use blobfx_common::frame::{MotionMask, PreprocessedFrame, MASK_OFF, MASK_ON};
use image::{GrayImage, Luma};
use imageproc::map::map_colors2;
use tracing::debug;

use super::morphology::{self, StructuringElement};

/// Builds a cleaned binary motion mask from consecutive preprocessed frames.
///
/// Holds exactly one frame of history. The first frame only seeds that
/// history and yields no mask; every later frame is differenced against the
/// stored one, thresholded, opened then closed with an elliptical element,
/// and becomes the new history. Frames are always at the working
/// resolution, so consecutive frames share dimensions.
pub struct MotionMaskBuilder {
    previous: Option<PreprocessedFrame>,
    threshold: u8,
    element: StructuringElement,
}

impl MotionMaskBuilder {
    pub fn new(threshold: u8, morph_kernel: u32) -> Self {
        let element = StructuringElement::ellipse(morph_kernel);
        debug!(threshold, kernel = element.size(), "motion mask builder ready");
        Self {
            previous: None,
            threshold,
            element,
        }
    }

    /// Returns `None` while seeding; the caller skips downstream stages.
    pub fn push(&mut self, current: PreprocessedFrame) -> Option<MotionMask> {
        let Some(previous) = self.previous.take() else {
            debug!(
                width = current.gray.width(),
                height = current.gray.height(),
                "first preprocessed frame, seeding history"
            );
            self.previous = Some(current);
            return None;
        };

        let raw = threshold_diff(&previous.gray, &current.gray, self.threshold);
        let opened = morphology::open(&raw, &self.element);
        let cleaned = morphology::close(&opened, &self.element);
        self.previous = Some(current);

        let mask = MotionMask::new(cleaned);
        debug!(
            motion_pixels = mask.count_set(),
            threshold = self.threshold,
            kernel = self.element.size(),
            "motion mask built"
        );
        Some(mask)
    }
}

/// `|a - b| >= threshold` -> 255, else 0.
pub fn threshold_diff(a: &GrayImage, b: &GrayImage, threshold: u8) -> GrayImage {
    map_colors2(a, b, |pa, pb| {
        let moved = pa.0[0].abs_diff(pb.0[0]) >= threshold;
        Luma([if moved { MASK_ON } else { MASK_OFF }])
    })
}
