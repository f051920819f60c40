use blobfx_common::config::EffectsConfig;
use blobfx_common::frame::Frame;
use image::{Rgb, RgbImage};
use rand::Rng;

use super::draw::add_weighted;

#[derive(Debug, Clone, PartialEq)]
pub struct GlitchParams {
    /// Independent chance that a band is glitched.
    pub probability: f64,
    pub band_height: u32,
    /// Rows between the starts of consecutive bands.
    pub band_stride: u32,
    /// Shifts are drawn uniformly from `-max_shift..=max_shift`.
    pub max_shift: i32,
    /// Weight of the shifted band in the final blend.
    pub opacity: f32,
}

impl From<&EffectsConfig> for GlitchParams {
    fn from(config: &EffectsConfig) -> Self {
        Self {
            probability: config.glitch_probability,
            band_height: config.glitch_band_height,
            band_stride: config.glitch_band_stride,
            max_shift: config.glitch_max_shift,
            opacity: config.glitch_opacity,
        }
    }
}

/// A band selected for glitching: rows `y..y + height`, clipped to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlitchBand {
    pub y: u32,
    pub shift: i32,
}

/// Roll the dice for every band start `0, stride, 2*stride, ..` below `height`.
pub fn plan_bands<R: Rng + ?Sized>(height: u32, params: &GlitchParams, rng: &mut R) -> Vec<GlitchBand> {
    let mut bands = Vec::new();
    let stride = params.band_stride.max(1) as usize;
    for y in (0..height).step_by(stride) {
        if rng.gen::<f64>() < params.probability {
            let shift = rng.gen_range(-params.max_shift..=params.max_shift);
            bands.push(GlitchBand { y, shift });
        }
    }
    bands
}

/// Horizontal roll per channel, in R, G, B order. Blue takes the full
/// shift, green the opposite, red half of it rounded towards negative infinity.
pub fn channel_shifts(shift: i32) -> [i32; 3] {
    [shift.div_euclid(2), -shift, shift]
}

/// Roll each channel of the band horizontally (wrapping around) and blend
/// the result over the unshifted rows.
pub fn apply_band(frame: &mut Frame, band: GlitchBand, params: &GlitchParams) {
    let (w, h) = frame.dimensions();
    if w == 0 || band.y >= h {
        return;
    }
    let rows = params.band_height.min(h - band.y);
    if rows == 0 {
        return;
    }
    let base = image::imageops::crop_imm(&*frame, 0, band.y, w, rows).to_image();
    let rolled = roll_channels(&base, channel_shifts(band.shift));
    let blended = add_weighted(&base, 1.0 - params.opacity, &rolled, params.opacity);
    image::imageops::replace(frame, &blended, 0, band.y as i64);
}

/// `out[x] = in[(x - shift) mod width]`, independently for each channel.
fn roll_channels(band: &RgbImage, shifts: [i32; 3]) -> RgbImage {
    let w = band.width() as i64;
    RgbImage::from_fn(band.width(), band.height(), |x, y| {
        let mut px = [0u8; 3];
        for (c, v) in px.iter_mut().enumerate() {
            let src = (x as i64 - shifts[c] as i64).rem_euclid(w) as u32;
            *v = band.get_pixel(src, y).0[c];
        }
        Rgb(px)
    })
}

/// Glitch the frame in place; returns the bands that were hit.
pub fn apply_glitch<R: Rng + ?Sized>(frame: &mut Frame, params: &GlitchParams, rng: &mut R) -> Vec<GlitchBand> {
    let bands = plan_bands(frame.height(), params, rng);
    for band in &bands {
        apply_band(frame, *band, params);
    }
    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> GlitchParams {
        GlitchParams::from(&EffectsConfig::default())
    }

    #[test]
    fn glitch_rate_converges_to_probability() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let p = params();
        let bands = 10_000u32;
        let planned = plan_bands(bands * p.band_stride, &p, &mut rng);
        let fraction = planned.len() as f64 / bands as f64;
        // four standard deviations of a binomial(10000, 0.07) proportion
        let sigma = (0.07f64 * 0.93 / bands as f64).sqrt();
        assert!((fraction - 0.07).abs() < 4.0 * sigma, "fraction {fraction}");
    }

    #[test]
    fn planned_bands_respect_stride_and_shift_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let p = GlitchParams {
            probability: 1.0,
            ..params()
        };
        let planned = plan_bands(600, &p, &mut rng);
        assert_eq!(planned.len(), 30);
        for (i, band) in planned.iter().enumerate() {
            assert_eq!(band.y, i as u32 * 20);
            assert!((-15..=15).contains(&band.shift));
        }
    }

    #[test]
    fn zero_probability_never_glitches() {
        let mut rng = StdRng::seed_from_u64(1);
        let p = GlitchParams {
            probability: 0.0,
            ..params()
        };
        let mut frame = Frame::from_pixel(50, 100, Rgb([1, 2, 3]));
        assert!(apply_glitch(&mut frame, &p, &mut rng).is_empty());
        assert!(frame.pixels().all(|px| px.0 == [1, 2, 3]));
    }

    #[test]
    fn channel_shift_formula() {
        assert_eq!(channel_shifts(6), [3, -6, 6]);
        assert_eq!(channel_shifts(7), [3, -7, 7]);
        assert_eq!(channel_shifts(-7), [-4, 7, -7]);
        assert_eq!(channel_shifts(0), [0, 0, 0]);
    }

    #[test]
    fn band_rolls_channels_and_blends() {
        let p = params();
        let mut frame = Frame::new(10, 30);
        // single white column at x = 4 across the whole frame
        for y in 0..30 {
            frame.put_pixel(4, y, Rgb([200, 200, 200]));
        }
        apply_band(&mut frame, GlitchBand { y: 0, shift: 2 }, &p);

        // inside the band, the unshifted column keeps 70%
        assert_eq!(frame.get_pixel(4, 0).0, [140, 140, 140]);
        // blue moved +2, green -2, red +1, each at 30%
        assert_eq!(frame.get_pixel(6, 0).0, [0, 0, 60]);
        assert_eq!(frame.get_pixel(2, 0).0, [0, 60, 0]);
        assert_eq!(frame.get_pixel(5, 0).0, [60, 0, 0]);
        // band is 10 rows tall
        assert_eq!(frame.get_pixel(4, 9).0, [140, 140, 140]);
        assert_eq!(frame.get_pixel(4, 10).0, [200, 200, 200]);
    }

    #[test]
    fn roll_wraps_around() {
        let p = GlitchParams {
            opacity: 1.0,
            ..params()
        };
        let mut frame = Frame::new(8, 1);
        frame.put_pixel(7, 0, Rgb([0, 0, 255]));
        apply_band(&mut frame, GlitchBand { y: 0, shift: 3 }, &p);
        assert_eq!(frame.get_pixel(2, 0).0, [0, 0, 255]);
    }

    #[test]
    fn last_band_is_clipped() {
        let p = GlitchParams {
            opacity: 1.0,
            ..params()
        };
        let mut frame = Frame::from_pixel(4, 25, Rgb([9, 9, 9]));
        apply_band(&mut frame, GlitchBand { y: 20, shift: 1 }, &p);
        assert_eq!(frame.dimensions(), (4, 25));
    }
}
