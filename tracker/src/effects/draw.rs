use blobfx_common::frame::{BlobPosition, Frame};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_antialiased_line_segment_mut, draw_hollow_rect_mut};
use imageproc::map::map_colors2;
use imageproc::pixelops::interpolate;
use imageproc::rect::Rect;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Anti-aliased one-pixel line; pixels off the frame are dropped.
pub fn draw_line_aa(frame: &mut Frame, from: BlobPosition, to: BlobPosition, color: Rgb<u8>) {
    draw_antialiased_line_segment_mut(frame, (from.x, from.y), (to.x, to.y), color, interpolate);
}

/// One-pixel outline of the rectangle with inclusive corners.
pub fn draw_rect(frame: &mut Frame, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb<u8>) {
    let (left, right) = (x0.min(x1), x0.max(x1));
    let (top, bottom) = (y0.min(y1), y0.max(y1));
    let rect = Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32);
    draw_hollow_rect_mut(frame, rect, color);
}

/// `alpha * a + beta * b` per channel, rounded and saturated. Both images
/// must have the same size.
pub fn add_weighted(a: &RgbImage, alpha: f32, b: &RgbImage, beta: f32) -> RgbImage {
    map_colors2(a, b, |pa, pb| {
        let mut out = [0u8; 3];
        for (c, v) in out.iter_mut().enumerate() {
            let mixed = pa.0[c] as f32 * alpha + pb.0[c] as f32 * beta;
            *v = mixed.round().clamp(0.0, 255.0) as u8;
        }
        Rgb(out)
    })
}

/// Every unordered pair of positions, `i < j`, in index order.
pub fn connective_segments(positions: &[BlobPosition]) -> Vec<(BlobPosition, BlobPosition)> {
    let mut segments = Vec::with_capacity(positions.len() * positions.len().saturating_sub(1) / 2);
    for (i, &a) in positions.iter().enumerate() {
        for &b in &positions[i + 1..] {
            segments.push((a, b));
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn black(w: u32, h: u32) -> Frame {
        Frame::new(w, h)
    }

    fn lit(frame: &Frame) -> usize {
        frame.pixels().filter(|p| p.0 != [0, 0, 0]).count()
    }

    #[test]
    fn segment_count_is_n_choose_2() {
        let pts: Vec<BlobPosition> = (0..6).map(|i| BlobPosition::new(i * 10, i)).collect();
        assert_eq!(connective_segments(&pts[..0]).len(), 0);
        assert_eq!(connective_segments(&pts[..1]).len(), 0);
        assert_eq!(connective_segments(&pts[..2]).len(), 1);
        assert_eq!(connective_segments(&pts[..3]).len(), 3);
        assert_eq!(connective_segments(&pts).len(), 15);
    }

    #[test]
    fn horizontal_line_is_solid() {
        let mut frame = black(20, 10);
        draw_line_aa(&mut frame, BlobPosition::new(2, 5), BlobPosition::new(12, 5), WHITE);
        for x in 2..=12 {
            assert_eq!(frame.get_pixel(x, 5).0, [255, 255, 255]);
        }
        assert_eq!(lit(&frame), 11);
    }

    #[test]
    fn diagonal_line_reaches_both_ends() {
        let mut frame = black(20, 20);
        draw_line_aa(&mut frame, BlobPosition::new(15, 3), BlobPosition::new(4, 17), WHITE);
        assert_eq!(frame.get_pixel(15, 3).0, [255, 255, 255]);
        assert!(frame.get_pixel(4, 17).0[0] > 200);
        // partial coverage somewhere along the way
        assert!(frame.pixels().any(|p| p.0[0] > 0 && p.0[0] < 255));
    }

    #[test]
    fn line_off_frame_is_clipped() {
        let mut frame = black(10, 10);
        draw_line_aa(&mut frame, BlobPosition::new(-5, 2), BlobPosition::new(25, 2), WHITE);
        assert_eq!(lit(&frame), 10);
    }

    #[test]
    fn rect_outline_21x21() {
        let mut frame = black(40, 40);
        draw_rect(&mut frame, 10, 10, 30, 30, WHITE);
        assert_eq!(lit(&frame), 80);
        assert_eq!(frame.get_pixel(20, 20).0, [0, 0, 0]);
        assert_eq!(frame.get_pixel(30, 20).0, [255, 255, 255]);
    }

    #[test]
    fn rect_partly_off_frame_is_clipped() {
        let mut frame = black(20, 20);
        draw_rect(&mut frame, -5, -5, 5, 5, WHITE);
        assert_eq!(frame.get_pixel(5, 0).0, [255, 255, 255]);
        assert_eq!(frame.get_pixel(0, 5).0, [255, 255, 255]);
        assert_eq!(lit(&frame), 11);
    }

    #[test]
    fn weighted_sum_rounds() {
        let a = RgbImage::from_pixel(1, 1, Rgb([255, 255, 255]));
        let b = RgbImage::from_pixel(1, 1, Rgb([100, 0, 200]));
        let out = add_weighted(&a, 0.5, &b, 0.5);
        assert_eq!(out.get_pixel(0, 0).0, [178, 128, 228]);
    }
}
