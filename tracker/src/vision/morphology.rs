use blobfx_common::frame::MASK_ON;
use image::{GrayImage, Luma};
use imageproc::morphology::{grayscale_close, grayscale_open, Mask};

/// Elliptical structuring element inscribed in a `size x size` box, anchored
/// at its center.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    size: u32,
    mask: Mask,
}

impl StructuringElement {
    /// Each row `dy` of the ellipse spans `-dx..=dx` with
    /// `dx = round(r * sqrt(1 - dy^2 / r^2))`.
    ///
    /// `size` is odd and at most 255 (checked in config).
    pub fn ellipse(size: u32) -> Self {
        let size = size.clamp(1, 255);
        let shape = ellipse_image(size);
        let center = (size / 2) as u8;
        Self {
            size,
            mask: Mask::from_image(&shape, center, center),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

fn ellipse_image(size: u32) -> GrayImage {
    let r = (size / 2) as i64;
    let mut shape = GrayImage::new(size, size);
    for (row, dy) in (-r..=r).enumerate() {
        let dx = if r > 0 {
            (r as f64 * (1.0 - (dy * dy) as f64 / (r * r) as f64).sqrt()).round() as i64
        } else {
            0
        };
        for col in (r - dx).max(0)..=(r + dx).min(size as i64 - 1) {
            shape.put_pixel(col as u32, row as u32, Luma([MASK_ON]));
        }
    }
    shape
}

/// Erode then dilate: removes specks smaller than the element. Pixels outside
/// the image never constrain the result.
pub fn open(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_open(mask, &element.mask)
}

/// Dilate then erode: fills gaps smaller than the element.
pub fn close(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_close(mask, &element.mask)
}
