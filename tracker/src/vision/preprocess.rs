use blobfx_common::frame::{Frame, PreprocessedFrame};
use image::imageops::FilterType;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::filter::{filter3x3, separable_filter_equal};
use imageproc::map::map_subpixels;

/// 3x3 sharpening kernel applied to the color frame before grayscale conversion.
const SHARPEN_KERNEL: [i32; 9] = [0, -1, 0, -1, 5, -1, 0, -1, 0];

/// Normalizes decoded frames to the working resolution and derives the
/// grayscale, blurred representation used for differencing.
///
/// Pipeline: resize -> 3x3 sharpen -> grayscale -> NxN gaussian blur.
/// The returned color frame is the resized one, not the sharpened one: the
/// sharpened image only feeds the grayscale path. Filters replicate the
/// edge pixels at the borders.
pub struct Preprocessor {
    width: u32,
    height: u32,
    blur_taps: Vec<f32>,
}

impl Preprocessor {
    pub fn new(width: u32, height: u32, blur_kernel: u32) -> Self {
        Self {
            width,
            height,
            blur_taps: gaussian_taps(blur_kernel),
        }
    }

    pub fn process(&self, raw: &RgbImage) -> (Frame, PreprocessedFrame) {
        let frame = resize_to_window(raw, self.width, self.height);
        let sharpened = sharpen(&frame);
        let gray = image::imageops::grayscale(&sharpened);
        let blurred = gaussian_blur(&gray, &self.blur_taps);
        (frame, PreprocessedFrame { gray: blurred })
    }
}

pub fn resize_to_window(raw: &RgbImage, width: u32, height: u32) -> RgbImage {
    if raw.dimensions() == (width, height) {
        return raw.clone();
    }
    image::imageops::resize(raw, width, height, FilterType::Triangle)
}

pub fn sharpen(img: &RgbImage) -> RgbImage {
    filter3x3::<Rgb<u8>, i32, u8>(img, &SHARPEN_KERNEL)
}

/// Normalized 1-D gaussian taps for an odd kernel size. Sigma is derived from
/// the size: `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_taps(size: u32) -> Vec<f32> {
    let size = size.max(1) as i32;
    let sigma = 0.3 * ((size - 1) as f64 * 0.5 - 1.0) + 0.8;
    let radius = size / 2;
    let scale = -0.5 / (sigma * sigma);
    let raw: Vec<f64> = (-radius..=radius)
        .map(|i| ((i * i) as f64 * scale).exp())
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|v| (v / sum) as f32).collect()
}

/// Separable blur with `taps` in both directions. Accumulates in `f32` and
/// rounds once at the end.
pub fn gaussian_blur(gray: &GrayImage, taps: &[f32]) -> GrayImage {
    let wide = map_subpixels(gray, f32::from);
    let blurred = separable_filter_equal(&wide, taps);
    map_subpixels(&blurred, |v: f32| v.round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn output_matches_window_size() {
        let pre = Preprocessor::new(80, 60, 9);
        let raw = RgbImage::from_pixel(123, 45, Rgb([10, 200, 30]));
        let (frame, gray) = pre.process(&raw);
        assert_eq!(frame.dimensions(), (80, 60));
        assert_eq!(gray.dimensions(), (80, 60));
    }

    #[test]
    fn uniform_frame_stays_uniform() {
        let pre = Preprocessor::new(32, 24, 9);
        let raw = RgbImage::from_pixel(32, 24, Rgb([100, 100, 100]));
        let (frame, gray) = pre.process(&raw);
        assert_eq!(frame, raw);
        assert!(gray.gray.pixels().all(|p| p.0[0] == 100));
    }

    #[test]
    fn sharpen_boosts_local_contrast() {
        let mut img = RgbImage::from_pixel(5, 5, Rgb([100, 100, 100]));
        img.put_pixel(2, 2, Rgb([120, 120, 120]));
        let out = sharpen(&img);
        // 5*120 - 4*100
        assert_eq!(out.get_pixel(2, 2).0, [200, 200, 200]);
        // 5*100 - 120 - 3*100
        assert_eq!(out.get_pixel(2, 1).0, [80, 80, 80]);
        assert_eq!(out.get_pixel(0, 0).0, [100, 100, 100]);
    }

    #[test]
    fn sharpen_saturates() {
        let mut img = RgbImage::from_pixel(3, 3, Rgb([0, 0, 0]));
        img.put_pixel(1, 1, Rgb([255, 60, 0]));
        let out = sharpen(&img);
        assert_eq!(out.get_pixel(1, 1).0, [255, 255, 0]);
        assert_eq!(out.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn gaussian_taps_are_normalized_and_symmetric() {
        let taps = gaussian_taps(9);
        assert_eq!(taps.len(), 9);
        let sum: f32 = taps.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..4 {
            assert!((taps[i] - taps[8 - i]).abs() < 1e-7);
        }
        assert!(taps[4] > taps[3]);
    }

    #[test]
    fn blur_spreads_a_single_bright_pixel() {
        let mut gray = GrayImage::new(21, 21);
        gray.put_pixel(10, 10, Luma([255]));
        let out = gaussian_blur(&gray, &gaussian_taps(9));
        let center = out.get_pixel(10, 10).0[0];
        assert!(center > 0 && center < 255);
        assert!(out.get_pixel(12, 10).0[0] > 0);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn blur_keeps_flat_regions_exact() {
        let gray = GrayImage::from_pixel(12, 12, Luma([37]));
        let out = gaussian_blur(&gray, &gaussian_taps(9));
        assert!(out.pixels().all(|p| p.0[0] == 37));
    }
}
