//! Gradient-direction estimator: horizontal versus vertical edge energy.

use super::{
    too_small, with_luma, AbstainReason, Diagnostics, EstimatorResult, Method,
    OrientationEstimator, Side,
};
use crate::config::DetectorConfig;
use crate::gradient::compute_sobel;
use crate::image::ImageView;

/// Votes from the balance of horizontal and vertical edges.
#[derive(Clone, Debug)]
pub struct GradientDirectionEstimator {
    min_side: usize,
    magnitude_threshold: u16,
}

impl GradientDirectionEstimator {
    /// Build from the detector configuration.
    #[must_use]
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            min_side: config.min_side,
            magnitude_threshold: config.gradient_magnitude_threshold,
        }
    }

    fn estimate_gray(&self, img: &ImageView) -> EstimatorResult {
        if too_small(img, self.min_side) {
            return EstimatorResult::abstain(AbstainReason::TooSmall);
        }
        let w = img.width;
        let grads = compute_sobel(img);
        let threshold = self.magnitude_threshold.max(1);

        let mut horizontal_energy = 0.0;
        let mut vertical_energy = 0.0;
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (usize::MAX, 0, usize::MAX, 0);
        for (i, g) in grads.iter().enumerate() {
            if g.mag < threshold {
                continue;
            }
            // |gy| > |gx|: intensity changes vertically, so the edge runs horizontally.
            if g.gy.unsigned_abs() > g.gx.unsigned_abs() {
                horizontal_energy += f64::from(g.mag);
            } else {
                vertical_energy += f64::from(g.mag);
            }
            let (x, y) = (i % w, i / w);
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        let total = horizontal_energy + vertical_energy;
        if total <= 0.0 {
            return EstimatorResult::abstain(AbstainReason::NoEdges);
        }
        let horizontal_axis = horizontal_energy >= vertical_energy;
        let center_x = (min_x + max_x) as f64 / 2.0;
        let center_y = (min_y + max_y) as f64 / 2.0;

        // Split the dominant population about the centre of all edge pixels.
        // Leading is top (horizontal axis) or right (vertical axis).
        let mut leading_energy = 0.0;
        let mut trailing_energy = 0.0;
        for (i, g) in grads.iter().enumerate() {
            if g.mag < threshold {
                continue;
            }
            let is_horizontal_edge = g.gy.unsigned_abs() > g.gx.unsigned_abs();
            if is_horizontal_edge != horizontal_axis {
                continue;
            }
            let (x, y) = ((i % w) as f64, (i / w) as f64);
            let (leading, trailing) = if horizontal_axis {
                (y < center_y, y > center_y)
            } else {
                (x > center_x, x < center_x)
            };
            if leading {
                leading_energy += f64::from(g.mag);
            } else if trailing {
                trailing_energy += f64::from(g.mag);
            }
        }

        let side = match (horizontal_axis, leading_energy >= trailing_energy) {
            (true, true) => Side::Top,
            (true, false) => Side::Bottom,
            (false, true) => Side::Right,
            (false, false) => Side::Left,
        };

        EstimatorResult::new(
            side.as_document_top(),
            100.0 * (horizontal_energy - vertical_energy).abs() / total,
            Diagnostics::GradientDirection {
                horizontal_energy,
                vertical_energy,
                leading_energy,
                trailing_energy,
            },
        )
    }
}

impl OrientationEstimator for GradientDirectionEstimator {
    fn method(&self) -> Method {
        Method::GradientDirection
    }

    fn estimate(&self, img: &ImageView) -> EstimatorResult {
        with_luma(img, |gray| self.estimate_gray(gray))
    }
}
