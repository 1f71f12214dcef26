//! Text-line estimator: merges glyphs into line blobs and reads their layout.
//!
//! Dark ink is closed with a small square element so characters of one line
//! fuse into a single elongated blob. The blobs' common direction fixes the
//! axis; the side where the line starts line up (left-aligned text) fixes the
//! direction.

use super::{
    too_small, with_luma, AbstainReason, Diagnostics, EstimatorResult, Method,
    OrientationEstimator, Side, tie_rotation,
};
use crate::config::DetectorConfig;
use crate::geometry::{normalize_half_turn, principal_axes};
use crate::image::ImageView;
use crate::morphology;
use crate::rotation::Rotation;
use crate::segmentation::label_components_with_stats;
use crate::threshold::{binarize_to_vec, IntensityModel, Polarity};
use bumpalo::Bump;
use std::f64::consts::PI;

/// Blobs within this angle of the dominant direction form the line family.
const FAMILY_TOLERANCE_DEG: f64 = 30.0;

/// Blobs touching this many image borders wrap around the page and are
/// background, not text. Lines cropped at one or two edges still count.
const FRAME_BORDERS: u8 = 3;

/// Votes from the direction and alignment of text lines.
#[derive(Clone, Debug)]
pub struct TextLineEstimator {
    min_side: usize,
    min_contrast: u8,
    close_radius: usize,
    min_blob_area: u32,
    max_blob_fraction: f64,
    min_elongation: f64,
    saturation_count: usize,
}

/// A line-shaped blob.
#[derive(Clone, Copy, Debug)]
struct TextBlob {
    cx: f64,
    cy: f64,
    angle: f64,
    /// Half the length of a uniform bar with the same major variance.
    half_length: f64,
}

impl TextLineEstimator {
    /// Build from the detector configuration.
    #[must_use]
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            min_side: config.min_side,
            min_contrast: config.min_contrast,
            close_radius: config.text_close_radius,
            min_blob_area: config.text_min_blob_area,
            max_blob_fraction: config.text_max_blob_fraction,
            min_elongation: config.text_min_elongation,
            saturation_count: config.text_saturation_count.max(1),
        }
    }

    fn find_blobs(&self, img: &ImageView, threshold: u8) -> Vec<TextBlob> {
        let (w, h) = (img.width, img.height);
        let ink = binarize_to_vec(img, threshold, Polarity::Dark);
        let closed = morphology::close(&ink, w, h, self.close_radius);

        let arena = Bump::new();
        let labels = label_components_with_stats(&arena, &closed, w, h);
        let max_area = self.max_blob_fraction * (w * h) as f64;

        labels
            .component_stats
            .iter()
            .filter(|s| s.pixel_count >= self.min_blob_area)
            .filter(|s| f64::from(s.pixel_count) <= max_area)
            .filter(|s| s.touched_borders(w, h) < FRAME_BORDERS)
            .filter_map(|s| {
                let (cx, cy) = s.moments.centroid()?;
                let (sxx, sxy, syy) = s.moments.covariance()?;
                let axes = principal_axes(sxx, sxy, syy);
                (axes.elongation() >= self.min_elongation).then(|| TextBlob {
                    cx,
                    cy,
                    angle: axes.angle,
                    half_length: (3.0 * axes.major).sqrt(),
                })
            })
            .collect()
    }

    fn estimate_gray(&self, img: &ImageView) -> EstimatorResult {
        if too_small(img, self.min_side) {
            return EstimatorResult::abstain(AbstainReason::TooSmall);
        }
        let model = IntensityModel::analyze(img);
        if model.contrast() < self.min_contrast {
            return EstimatorResult::abstain(AbstainReason::LowContrast);
        }

        let blobs = self.find_blobs(img, model.threshold);
        if blobs.is_empty() {
            return EstimatorResult::abstain(AbstainReason::NoTextBlobs);
        }

        // Length-weighted circular mean of doubled angles.
        let (mut c, mut s, mut weight) = (0.0, 0.0, 0.0);
        for b in &blobs {
            let len = 2.0 * b.half_length;
            c += len * (2.0 * b.angle).cos();
            s += len * (2.0 * b.angle).sin();
            weight += len;
        }
        if weight <= 0.0 {
            return EstimatorResult::abstain(AbstainReason::NoTextBlobs);
        }
        let consistency = (c.hypot(s) / weight).min(1.0);
        let dominant = normalize_half_turn(s.atan2(c) / 2.0);
        let count_factor = (blobs.len() as f64 / self.saturation_count as f64).min(1.0);

        let horizontal_axis = dominant <= PI / 4.0 || dominant > 3.0 * PI / 4.0;
        let (mut dy, mut dx) = dominant.sin_cos();
        // Reading direction: rightwards for horizontal lines, downwards for vertical ones.
        if (horizontal_axis && dx < 0.0) || (!horizontal_axis && dy < 0.0) {
            dx = -dx;
            dy = -dy;
        }

        let tolerance = FAMILY_TOLERANCE_DEG.to_radians();
        let (starts, ends): (Vec<f64>, Vec<f64>) = blobs
            .iter()
            .filter(|b| {
                let d = (b.angle - dominant).rem_euclid(PI);
                d.min(PI - d) <= tolerance
            })
            .map(|b| {
                let p = b.cx * dx + b.cy * dy;
                (p - b.half_length, p + b.half_length)
            })
            .unzip();
        let start_spread = std_dev(&starts);
        let end_spread = std_dev(&ends);

        let margin = 0.05 * start_spread.max(end_spread) + 0.5;
        let angle = if end_spread - start_spread > margin {
            aligned(horizontal_axis, true)
        } else if start_spread - end_spread > margin {
            aligned(horizontal_axis, false)
        } else {
            tie_rotation(horizontal_axis)
        };

        EstimatorResult::new(
            angle,
            100.0 * consistency * count_factor,
            Diagnostics::TextLines {
                blobs: blobs.len(),
                dominant_angle_deg: dominant.to_degrees(),
                consistency,
                start_spread,
                end_spread,
            },
        )
    }
}

/// Rotation implied by line starts (or ends) sharing a coordinate.
fn aligned(horizontal_axis: bool, at_start: bool) -> Rotation {
    let side = match (horizontal_axis, at_start) {
        (true, true) => Side::Left,
        (true, false) => Side::Right,
        (false, true) => Side::Top,
        (false, false) => Side::Bottom,
    };
    side.as_document_left()
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

impl OrientationEstimator for TextLineEstimator {
    fn method(&self) -> Method {
        Method::TextLines
    }

    fn estimate(&self, img: &ImageView) -> EstimatorResult {
        with_luma(img, |gray| self.estimate_gray(gray))
    }
}
