use blobfx_common::frame::{BlobPosition, Frame};
use image::RgbImage;

use super::draw::{self, add_weighted, WHITE};

/// Where a decal landed, in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecalPlacement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Top-left corner of a decal of the given size centered on `anchor`.
pub fn decal_top_left(anchor: BlobPosition, width: u32, height: u32) -> (i32, i32) {
    (
        anchor.x - (width as i32).div_euclid(2),
        anchor.y - (height as i32).div_euclid(2),
    )
}

/// Whether a `width x height` footprint at `(x, y)` fits strictly inside the frame.
pub fn fits(frame_dims: (u32, u32), x: i32, y: i32, width: u32, height: u32) -> bool {
    let (fw, fh) = (frame_dims.0 as i64, frame_dims.1 as i64);
    x >= 0 && y >= 0 && x as i64 + (width as i64) < fw && y as i64 + (height as i64) < fh
}

/// Center `decal` on `anchor` and blend it in, outlining the footprint.
/// Returns `None` and leaves the frame alone when the footprint does not fit.
pub fn place_decal(frame: &mut Frame, anchor: BlobPosition, decal: &RgbImage, opacity: f32) -> Option<DecalPlacement> {
    let (w, h) = decal.dimensions();
    let (x, y) = decal_top_left(anchor, w, h);
    if !fits(frame.dimensions(), x, y, w, h) {
        return None;
    }
    let placement = DecalPlacement {
        x: x as u32,
        y: y as u32,
        width: w,
        height: h,
    };
    blend_decal(frame, decal, placement, opacity);
    draw::draw_rect(frame, x, y, x + w as i32, y + h as i32, WHITE);
    Some(placement)
}

/// `opacity * decal + (1 - opacity) * frame` over the placement region.
pub fn blend_decal(frame: &mut Frame, decal: &RgbImage, placement: DecalPlacement, opacity: f32) {
    let under = image::imageops::crop_imm(&*frame, placement.x, placement.y, placement.width, placement.height)
        .to_image();
    let blended = add_weighted(decal, opacity, &under, 1.0 - opacity);
    image::imageops::replace(frame, &blended, placement.x as i64, placement.y as i64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn frame() -> Frame {
        Frame::from_pixel(800, 600, Rgb([100, 100, 100]))
    }

    fn decal() -> RgbImage {
        RgbImage::from_pixel(70, 70, Rgb([200, 0, 50]))
    }

    #[test]
    fn near_corner_anchor_is_skipped() {
        let mut f = frame();
        let before = f.clone();
        assert_eq!(decal_top_left(BlobPosition::new(10, 10), 70, 70), (-25, -25));
        assert!(place_decal(&mut f, BlobPosition::new(10, 10), &decal(), 0.7).is_none());
        assert_eq!(f, before);
    }

    #[test]
    fn centered_anchor_is_blended() {
        let mut f = frame();
        let placed = place_decal(&mut f, BlobPosition::new(400, 300), &decal(), 0.7).unwrap();
        assert_eq!(
            placed,
            DecalPlacement {
                x: 365,
                y: 265,
                width: 70,
                height: 70
            }
        );
        // 0.7 * decal + 0.3 * frame
        assert_eq!(f.get_pixel(400, 300).0, [170, 30, 65]);
        assert_eq!(f.get_pixel(366, 266).0, [170, 30, 65]);
        // outline sits on the footprint edges, inclusive of x + w
        assert_eq!(f.get_pixel(365, 300).0, [255, 255, 255]);
        assert_eq!(f.get_pixel(435, 300).0, [255, 255, 255]);
        // untouched outside
        assert_eq!(f.get_pixel(437, 300).0, [100, 100, 100]);
        assert_eq!(f.get_pixel(10, 10).0, [100, 100, 100]);
    }

    #[test]
    fn right_and_bottom_edges_are_exclusive() {
        // footprint ending exactly at the frame edge is rejected
        assert!(!fits((100, 100), 30, 10, 70, 70));
        assert!(fits((100, 100), 29, 10, 70, 70));
        assert!(!fits((100, 100), 10, 30, 70, 70));
        assert!(fits((100, 100), 0, 0, 70, 70));
    }

    #[test]
    fn odd_sized_decal_floors_half() {
        assert_eq!(decal_top_left(BlobPosition::new(50, 50), 7, 5), (47, 48));
    }
}
