//! Edge-line estimator: votes from the dominant direction of long straight edges.
//!
//! Segment directions are folded modulo 90° into a circular histogram, so the
//! two perpendicular edge families of a rectangle reinforce each other. The
//! axis comes from which family carries more length, the direction from where
//! that family's length is concentrated.

use super::{
    too_small, with_luma, AbstainReason, Diagnostics, EstimatorResult, Method,
    OrientationEstimator, Side, tie_rotation,
};
use crate::config::DetectorConfig;
use crate::gradient::{compute_sobel, extract_line_segments, LineSegment};
use crate::image::ImageView;

/// Offsets within this fraction of the extent count as centred.
const POLARITY_DEADBAND: f64 = 0.02;

/// Votes from long straight edges.
#[derive(Clone, Debug)]
pub struct EdgeLineEstimator {
    min_side: usize,
    magnitude_threshold: u16,
    tolerance_rad: f64,
    min_length_fraction: f64,
    min_segments: usize,
    bin_width_deg: f64,
}

impl EdgeLineEstimator {
    /// Build from the detector configuration.
    #[must_use]
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            min_side: config.min_side,
            magnitude_threshold: config.edge_magnitude_threshold,
            tolerance_rad: config.line_angle_tolerance_deg.to_radians(),
            min_length_fraction: config.line_min_length_fraction,
            min_segments: config.line_min_segments.max(1),
            bin_width_deg: config.line_bin_width_deg,
        }
    }

    fn estimate_gray(&self, img: &ImageView) -> EstimatorResult {
        if too_small(img, self.min_side) {
            return EstimatorResult::abstain(AbstainReason::TooSmall);
        }

        let grads = compute_sobel(img);
        let min_length = self.min_length_fraction * img.width.min(img.height) as f64;
        let segments = extract_line_segments(
            &grads,
            img.width,
            img.height,
            self.magnitude_threshold,
            self.tolerance_rad,
            min_length,
        );
        if segments.len() < self.min_segments {
            return EstimatorResult::abstain(AbstainReason::TooFewSegments);
        }

        let histogram = OrientationHistogram::build(&segments, self.bin_width_deg);
        let winner = histogram.peak();
        let total = histogram.total();
        if total <= 0.0 {
            return EstimatorResult::abstain(AbstainReason::TooFewSegments);
        }
        let winning_mass = histogram.mass[winner] / total;

        let members: Vec<&LineSegment> = segments
            .iter()
            .filter(|s| histogram.bin_of(s) == winner)
            .collect();
        let horizontal_mass: f64 = members
            .iter()
            .filter(|s| s.is_horizontal())
            .map(|s| s.length)
            .sum();
        let vertical_mass: f64 = members
            .iter()
            .filter(|s| !s.is_horizontal())
            .map(|s| s.length)
            .sum();
        let horizontal_axis = horizontal_mass >= vertical_mass;

        let offset = polarity_offset(
            members
                .iter()
                .filter(|s| s.is_horizontal() == horizontal_axis)
                .map(|s| {
                    let (mx, my) = s.midpoint();
                    (if horizontal_axis { my } else { mx }, s.length)
                }),
        );

        let angle = if offset.abs() <= POLARITY_DEADBAND {
            tie_rotation(horizontal_axis)
        } else {
            let side = match (horizontal_axis, offset < 0.0) {
                (true, true) => Side::Top,
                (true, false) => Side::Bottom,
                (false, true) => Side::Left,
                (false, false) => Side::Right,
            };
            side.as_document_top()
        };

        EstimatorResult::new(
            angle,
            100.0 * winning_mass,
            Diagnostics::EdgeLines {
                segments: segments.len(),
                dominant_tilt_deg: histogram.center_deg(winner),
                winning_mass,
                horizontal_mass,
                vertical_mass,
                polarity_offset: offset,
            },
        )
    }
}

impl OrientationEstimator for EdgeLineEstimator {
    fn method(&self) -> Method {
        Method::EdgeLines
    }

    fn estimate(&self, img: &ImageView) -> EstimatorResult {
        with_luma(img, |gray| self.estimate_gray(gray))
    }
}

/// Length-weighted histogram of segment directions modulo 90°.
///
/// Bins are centred on multiples of the bin width and wrap around, so 89°
/// and 1° share the bin at 0°.
struct OrientationHistogram {
    bin_width: f64,
    mass: Vec<f64>,
}

impl OrientationHistogram {
    fn build(segments: &[LineSegment], bin_width_deg: f64) -> Self {
        let bins = if bin_width_deg.is_finite() && bin_width_deg > 0.0 {
            ((90.0 / bin_width_deg).round() as usize).clamp(1, 90)
        } else {
            1
        };
        let mut hist = Self {
            bin_width: 90.0 / bins as f64,
            mass: vec![0.0; bins],
        };
        for s in segments {
            let bin = hist.bin_of(s);
            hist.mass[bin] += s.length;
        }
        hist
    }

    fn bin_of(&self, segment: &LineSegment) -> usize {
        let folded = segment.angle.to_degrees().rem_euclid(90.0);
        (folded / self.bin_width).round() as usize % self.mass.len()
    }

    /// First bin with the largest mass.
    fn peak(&self) -> usize {
        let mut best = 0;
        for (i, &m) in self.mass.iter().enumerate() {
            if m > self.mass[best] {
                best = i;
            }
        }
        best
    }

    fn total(&self) -> f64 {
        self.mass.iter().sum()
    }

    /// Bin centre as a tilt in `(-45, 45]`.
    fn center_deg(&self, bin: usize) -> f64 {
        let c = bin as f64 * self.bin_width;
        if c > 45.0 { c - 90.0 } else { c }
    }
}

/// Offset of the weighted mean of `(position, weight)` from the middle of the
/// positions' extent, as a signed fraction of that extent.
fn polarity_offset(samples: impl Iterator<Item = (f64, f64)>) -> f64 {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    let mut weighted = 0.0;
    let mut weight = 0.0;
    for (pos, w) in samples {
        lo = lo.min(pos);
        hi = hi.max(pos);
        weighted += pos * w;
        weight += w;
    }
    let extent = hi - lo;
    if weight <= 0.0 || !extent.is_finite() || extent <= f64::EPSILON {
        return 0.0;
    }
    let mean = weighted / weight;
    (mean - (lo + hi) / 2.0) / extent
}
