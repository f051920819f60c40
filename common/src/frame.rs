use image::{GrayImage, RgbImage};

/// Working-resolution color frame (3 channels, 8-bit). Effects draw into it in place.
pub type Frame = RgbImage;

/// A frame as it comes out of the decoder, at source resolution.
///
/// Raw wire format (ffmpeg `rawvideo`, `rgb24`):
///   width * height * 3 bytes, rows top to bottom, pixels left to right,
///   channels in R, G, B order.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub image: RgbImage,
    /// Zero-based decode index within the source stream.
    pub seq: u64,
}

impl SourceFrame {
    pub fn new(image: RgbImage, seq: u64) -> Self {
        Self { image, seq }
    }

    /// Wrap one raw `rgb24` frame.
    pub fn from_rgb24(width: u32, height: u32, data: Vec<u8>, seq: u64) -> Result<Self, FrameError> {
        let expected = rgb24_frame_len(width, height);
        if data.len() != expected {
            return Err(FrameError::SizeMismatch {
                got: data.len(),
                expected,
                width,
                height,
            });
        }
        let image = RgbImage::from_raw(width, height, data).ok_or(FrameError::SizeMismatch {
            got: 0,
            expected,
            width,
            height,
        })?;
        Ok(Self { image, seq })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Byte length of one `rgb24` frame.
pub fn rgb24_frame_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

/// Single-channel, sharpened and blurred frame used for differencing.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedFrame {
    pub gray: GrayImage,
}

impl PreprocessedFrame {
    pub fn dimensions(&self) -> (u32, u32) {
        self.gray.dimensions()
    }
}

/// Binary image: every pixel is either 0 or 255.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionMask {
    pub pixels: GrayImage,
}

pub const MASK_ON: u8 = 255;
pub const MASK_OFF: u8 = 0;

impl MotionMask {
    pub fn new(pixels: GrayImage) -> Self {
        Self { pixels }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y).0[0] == MASK_ON
    }

    /// Number of pixels marked as motion.
    pub fn count_set(&self) -> usize {
        self.pixels.pixels().filter(|p| p.0[0] == MASK_ON).count()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.pixels().all(|p| p.0[0] == MASK_OFF)
    }
}

/// Centroid of one detected blob, rounded to the nearest pixel.
///
/// Positions carry no identity across frames: index `i` in one frame's list
/// has no relation to index `i` in the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobPosition {
    pub x: i32,
    pub y: i32,
}

impl BlobPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for BlobPosition {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("raw frame is {got} bytes, expected {expected} for {width}x{height} rgb24")]
    SizeMismatch {
        got: usize,
        expected: usize,
        width: u32,
        height: u32,
    },
}
