use blobfx_common::config::DetectionConfig;
use blobfx_common::frame::{BlobPosition, MotionMask};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{arc_length, oriented_contour_area};
use imageproc::point::Point;
use std::f64::consts::PI;
use tracing::{debug, trace};

/// Region filters. Color, convexity and inertia filtering are never applied:
/// the input is a binary mask, so only topology and shape matter.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobParams {
    pub filter_by_area: bool,
    pub min_area: f64,
    pub max_area: f64,
    pub filter_by_circularity: bool,
    pub min_circularity: f64,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            filter_by_area: true,
            min_area: 70.0,
            max_area: 3000.0,
            filter_by_circularity: true,
            min_circularity: 0.4,
        }
    }
}

impl From<&DetectionConfig> for BlobParams {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            filter_by_area: true,
            min_area: config.min_area,
            max_area: config.max_area,
            filter_by_circularity: true,
            min_circularity: config.min_circularity,
        }
    }
}

/// Shape measurements of one connected region, taken from its outer contour.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub centroid: (f64, f64),
    pub area: f64,
    pub perimeter: f64,
    pub circularity: f64,
}

impl Blob {
    /// Centroid rounded half-to-even, the way array rounding does it.
    pub fn position(&self) -> BlobPosition {
        BlobPosition::new(
            self.centroid.0.round_ties_even() as i32,
            self.centroid.1.round_ties_even() as i32,
        )
    }
}

/// Finds connected foreground regions in a motion mask and reports the
/// centroids of those passing the area and circularity filters.
///
/// Regions are 8-connected. Each is measured from its outer boundary only,
/// so holes do not reduce its area or add to its perimeter. Output order is
/// the raster order of each region's top-left-most pixel; that order is a
/// per-call index, not an identity.
pub struct BlobDetector {
    params: BlobParams,
}

impl BlobDetector {
    pub fn new(params: BlobParams) -> Self {
        Self { params }
    }

    pub fn detect(&self, mask: &MotionMask) -> Vec<BlobPosition> {
        self.detect_blobs(mask).iter().map(Blob::position).collect()
    }

    pub fn detect_blobs(&self, mask: &MotionMask) -> Vec<Blob> {
        let (w, h) = mask.dimensions();
        if w == 0 || h == 0 {
            return Vec::new();
        }
        let outlines = outer_contours(mask);
        let mut blobs = Vec::new();
        let mut rejected = 0usize;

        for outline in &outlines {
            let Some(blob) = measure(outline) else {
                rejected += 1;
                continue;
            };
            if self.accepts(&blob) {
                blobs.push(blob);
            } else {
                trace!(
                    area = blob.area,
                    perimeter = blob.perimeter,
                    circularity = blob.circularity,
                    "region filtered out"
                );
                rejected += 1;
            }
        }

        debug!(
            regions = outlines.len(),
            accepted = blobs.len(),
            rejected,
            "blob extraction"
        );
        blobs
    }

    fn accepts(&self, blob: &Blob) -> bool {
        let p = &self.params;
        if p.filter_by_area && (blob.area < p.min_area || blob.area >= p.max_area) {
            return false;
        }
        if p.filter_by_circularity && blob.circularity < p.min_circularity {
            return false;
        }
        true
    }
}

/// Outer boundaries of every foreground region, in raster order of their
/// first pixel. Points are pixel centers in mask coordinates.
///
/// The mask is traced inside a one-pixel background frame so regions touching
/// the left edge start their border like any other.
fn outer_contours(mask: &MotionMask) -> Vec<Vec<Point<i32>>> {
    let (w, h) = mask.dimensions();
    let mut framed = GrayImage::new(w + 2, h + 2);
    image::imageops::replace(&mut framed, &mask.pixels, 1, 1);

    find_contours::<i32>(&framed)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect()
        })
        .collect()
}

/// Polygon moments of a closed contour. `None` for degenerate (zero-area)
/// contours such as single pixels and one-pixel-wide lines.
fn measure(contour: &[Point<i32>]) -> Option<Blob> {
    let signed_area = oriented_contour_area(contour);
    if signed_area == 0.0 {
        return None;
    }
    let n = contour.len();
    let (mut cx6, mut cy6) = (0f64, 0f64);
    for i in 0..n {
        let (x0, y0) = (contour[i].x as f64, contour[i].y as f64);
        let (x1, y1) = (contour[(i + 1) % n].x as f64, contour[(i + 1) % n].y as f64);
        let cross = x0 * y1 - x1 * y0;
        cx6 += (x0 + x1) * cross;
        cy6 += (y0 + y1) * cross;
    }
    let area = signed_area.abs();
    let perimeter = arc_length(contour, true);
    Some(Blob {
        centroid: (cx6 / (6.0 * signed_area), cy6 / (6.0 * signed_area)),
        area,
        perimeter,
        circularity: 4.0 * PI * area / (perimeter * perimeter),
    })
}
