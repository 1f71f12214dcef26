//! Boundary-contour estimator: the primary vote.
//!
//! The document is taken to be the largest connected component (of either
//! polarity) that does not span the frame. A scan cropped to the page has no
//! such component; then a background component filling most of the frame
//! stands in for the page. Its minimum-area rectangle gives the axis; the ink
//! inside the rectangle decides which long side is the top.

use super::{
    too_small, with_luma, AbstainReason, Diagnostics, EstimatorResult, Method,
    OrientationEstimator, Side, tie_rotation,
};
use crate::config::DetectorConfig;
use crate::geometry::{min_area_rect, MinAreaRect, Point};
use crate::image::ImageView;
use crate::segmentation::{label_components_with_stats, ComponentStats, LabelResult};
use crate::threshold::{binarize_to_vec, IntensityModel, Polarity};
use bumpalo::Bump;
use std::cmp::Reverse;

/// Components touching this many image borders are background.
const BACKGROUND_BORDERS: u8 = 3;

/// A background component covering at least this share of the image is a
/// page cropped to the frame.
const FRAME_FILL_FRACTION: f64 = 0.5;

/// Votes from the outline of the document.
#[derive(Clone, Debug)]
pub struct BoundaryContourEstimator {
    min_side: usize,
    min_contrast: u8,
    min_area_fraction: f64,
    aspect_min: f64,
    aspect_max: f64,
    aspect_falloff: f64,
    inset_fraction: f64,
}

/// The selected document component.
struct DocumentRegion {
    polarity: Polarity,
    area: u32,
    outline: Vec<Point>,
    frame_filling: bool,
}

impl DocumentRegion {
    /// Pixel-corner outline of every row: the hull of these is the exact
    /// convex hull of the component's pixel squares.
    fn from_component(
        labels: &LabelResult,
        index: usize,
        stats: &ComponentStats,
        width: usize,
        polarity: Polarity,
    ) -> Self {
        let mut outline = Vec::new();
        for (y, a, b) in labels.row_extents(index as u32 + 1, width) {
            let (y, a, b) = (f64::from(y), f64::from(a), f64::from(b) + 1.0);
            outline.extend_from_slice(&[
                Point::new(a, y),
                Point::new(b, y),
                Point::new(a, y + 1.0),
                Point::new(b, y + 1.0),
            ]);
        }
        Self {
            polarity,
            area: stats.pixel_count,
            outline,
            frame_filling: false,
        }
    }
}

/// Replace `slot` when the candidate is strictly larger.
fn keep_larger(
    slot: &mut Option<DocumentRegion>,
    labels: &LabelResult,
    candidate: Option<(usize, &ComponentStats)>,
    width: usize,
    polarity: Polarity,
) {
    let Some((index, stats)) = candidate else {
        return;
    };
    if slot.as_ref().is_some_and(|r| r.area >= stats.pixel_count) {
        return;
    }
    *slot = Some(DocumentRegion::from_component(labels, index, stats, width, polarity));
}

impl BoundaryContourEstimator {
    /// Build from the detector configuration.
    #[must_use]
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            min_side: config.min_side,
            min_contrast: config.min_contrast,
            min_area_fraction: config.contour_min_area_fraction,
            aspect_min: config.aspect_ratio_min,
            aspect_max: config.aspect_ratio_max,
            aspect_falloff: config.aspect_falloff,
            inset_fraction: config.contour_inset_fraction,
        }
    }

    /// 1 inside the expected aspect range, decaying exponentially outside it.
    fn aspect_score(&self, aspect: f64) -> f64 {
        let distance = if aspect < self.aspect_min {
            self.aspect_min - aspect
        } else if aspect > self.aspect_max {
            aspect - self.aspect_max
        } else {
            0.0
        };
        if distance <= 0.0 {
            1.0
        } else if self.aspect_falloff > 0.0 {
            (-distance / self.aspect_falloff).exp()
        } else {
            0.0
        }
    }

    /// Largest non-background component above the area floor, over both
    /// polarities, falling back to a frame-filling background component.
    fn find_document(&self, img: &ImageView, threshold: u8) -> Option<DocumentRegion> {
        let (w, h) = (img.width, img.height);
        let total = (w * h) as f64;
        let min_area = self.min_area_fraction * total;
        let arena = Bump::new();
        let mut best: Option<DocumentRegion> = None;
        let mut frame: Option<DocumentRegion> = None;

        for polarity in [Polarity::Bright, Polarity::Dark] {
            let mask = binarize_to_vec(img, threshold, polarity);
            let labels = label_components_with_stats(&arena, &mask, w, h);
            let largest = |background: bool, floor: f64| {
                labels
                    .component_stats
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| (s.touched_borders(w, h) >= BACKGROUND_BORDERS) == background)
                    .filter(|(_, s)| f64::from(s.pixel_count) >= floor)
                    .max_by_key(|(i, s)| (s.pixel_count, Reverse(*i)))
            };

            keep_larger(&mut best, &labels, largest(false, min_area), w, polarity);
            if best.is_none() {
                let floor = (FRAME_FILL_FRACTION * total).max(min_area);
                keep_larger(&mut frame, &labels, largest(true, floor), w, polarity);
            }
        }

        best.or_else(|| {
            frame.map(|mut region| {
                region.frame_filling = true;
                region
            })
        })
    }

    fn estimate_gray(&self, img: &ImageView) -> EstimatorResult {
        if too_small(img, self.min_side) {
            return EstimatorResult::abstain(AbstainReason::TooSmall);
        }
        let model = IntensityModel::analyze(img);
        if model.contrast() < self.min_contrast {
            return EstimatorResult::abstain(AbstainReason::LowContrast);
        }

        let Some(document) = self.find_document(img, model.threshold) else {
            return EstimatorResult::abstain(AbstainReason::NoContour);
        };
        let Some(rect) = min_area_rect(&document.outline) else {
            return EstimatorResult::abstain(AbstainReason::DegenerateContour);
        };
        if rect.short_side() < 1.0 {
            return EstimatorResult::abstain(AbstainReason::DegenerateContour);
        }

        let aspect_ratio = rect.aspect_ratio();
        let aspect_score = self.aspect_score(aspect_ratio);

        let mut tilt_deg = rect.long_axis_angle().to_degrees();
        if tilt_deg > 90.0 {
            tilt_deg -= 180.0;
        }
        let horizontal_axis = tilt_deg.abs() <= 45.0;
        let deviation = if horizontal_axis {
            tilt_deg.abs()
        } else {
            90.0 - tilt_deg.abs()
        };
        let axis_score = (1.0 - deviation / 45.0).max(0.0);

        let inset = self.inset_fraction * rect.short_side();
        let (positive, negative) = count_ink(img, &rect, inset, model.threshold, document.polarity);
        let ink = positive + negative;
        let polarity = if ink == 0 {
            0.0
        } else {
            positive.abs_diff(negative) as f64 / ink as f64
        };

        let angle = if positive == negative {
            tie_rotation(horizontal_axis)
        } else {
            // Short axis v = (-uy, ux); the heavier half marks the document's top.
            let (uy, ux) = rect.long_axis_angle().sin_cos();
            let sign = if positive > negative { 1.0 } else { -1.0 };
            Side::from_vector(-uy * sign, ux * sign).as_document_top()
        };

        EstimatorResult::new(
            angle,
            100.0 * aspect_score * axis_score * (0.5 + 0.5 * polarity),
            Diagnostics::BoundaryContour {
                area_fraction: f64::from(document.area) / (img.width * img.height) as f64,
                aspect_ratio,
                aspect_score,
                tilt_deg,
                polarity,
                rect_long: rect.long_side(),
                rect_short: rect.short_side(),
                frame_filling: document.frame_filling,
            },
        )
    }
}

impl OrientationEstimator for BoundaryContourEstimator {
    fn method(&self) -> Method {
        Method::BoundaryContour
    }

    fn estimate(&self, img: &ImageView) -> EstimatorResult {
        with_luma(img, |gray| self.estimate_gray(gray))
    }
}

/// Count pixels of the class opposite to the document inside the inset
/// rectangle, split by the sign of their short-axis coordinate.
fn count_ink(
    img: &ImageView,
    rect: &MinAreaRect,
    inset: f64,
    threshold: u8,
    document: Polarity,
) -> (u64, u64) {
    let half_long = rect.long_side() / 2.0 - inset;
    let half_short = rect.short_side() / 2.0 - inset;
    if half_long <= 0.0 || half_short <= 0.0 {
        return (0, 0);
    }

    let (uy, ux) = rect.long_axis_angle().sin_cos();
    let reach_x = half_long * ux.abs() + half_short * uy.abs();
    let reach_y = half_long * uy.abs() + half_short * ux.abs();
    let clip = |v: f64, len: usize| v.floor().clamp(0.0, len as f64) as usize;
    let x_range = clip(rect.center_x - reach_x, img.width)..clip(rect.center_x + reach_x + 1.0, img.width);
    let y_range = clip(rect.center_y - reach_y, img.height)..clip(rect.center_y + reach_y + 1.0, img.height);

    let ink_class = document.opposite();
    let mut positive = 0u64;
    let mut negative = 0u64;
    for y in y_range {
        let row = img.get_row(y);
        for x in x_range.clone() {
            if !ink_class.matches(row[x], threshold) {
                continue;
            }
            let (u, v) = rect.local_coordinates(x as f64 + 0.5, y as f64 + 0.5);
            if u.abs() > half_long || v.abs() > half_short {
                continue;
            }
            if v > 0.0 {
                positive += 1;
            } else if v < 0.0 {
                negative += 1;
            }
        }
    }
    (positive, negative)
}
