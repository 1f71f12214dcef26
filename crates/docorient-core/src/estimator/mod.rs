//! Orientation estimators and their shared result types.
//!
//! Each estimator looks at one kind of evidence and votes for a single
//! [`Rotation`] with a confidence in `[0, 100]`. An estimator that finds no
//! usable evidence abstains: it reports confidence 0 and an [`AbstainReason`].
//! Estimators never fail and never panic on valid [`ImageView`]s.

pub mod boundary_contour;
pub mod edge_line;
pub mod gradient_direction;
pub mod text_line;

pub use boundary_contour::BoundaryContourEstimator;
pub use edge_line::EdgeLineEstimator;
pub use gradient_direction::GradientDirectionEstimator;
pub use text_line::TextLineEstimator;

use crate::config::DetectorConfig;
use crate::image::ImageView;
use crate::rotation::Rotation;
use std::fmt;

/// Identity of an estimator.
///
/// The ordering is used for deterministic iteration and tie-breaking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Method {
    /// Long straight edges.
    EdgeLines,
    /// Outline of the largest rectangular component.
    BoundaryContour,
    /// Horizontal versus vertical gradient energy.
    GradientDirection,
    /// Morphologically merged text lines.
    TextLines,
}

impl Method {
    /// All methods in canonical order.
    pub const ALL: [Method; 4] = [
        Method::EdgeLines,
        Method::BoundaryContour,
        Method::GradientDirection,
        Method::TextLines,
    ];

    /// Stable snake_case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Method::EdgeLines => "edge_lines",
            Method::BoundaryContour => "boundary_contour",
            Method::GradientDirection => "gradient_direction",
            Method::TextLines => "text_lines",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why an estimator produced no evidence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AbstainReason {
    /// The shorter image side is below the configured minimum.
    TooSmall,
    /// Intensity spread too low to binarise.
    LowContrast,
    /// No component large enough to be the document.
    NoContour,
    /// The document outline collapsed to a line or point.
    DegenerateContour,
    /// Not enough straight segments.
    TooFewSegments,
    /// No pixel passed the gradient threshold.
    NoEdges,
    /// No elongated text-like blob.
    NoTextBlobs,
}

impl AbstainReason {
    /// Stable snake_case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            AbstainReason::TooSmall => "too_small",
            AbstainReason::LowContrast => "low_contrast",
            AbstainReason::NoContour => "no_contour",
            AbstainReason::DegenerateContour => "degenerate_contour",
            AbstainReason::TooFewSegments => "too_few_segments",
            AbstainReason::NoEdges => "no_edges",
            AbstainReason::NoTextBlobs => "no_text_blobs",
        }
    }
}

impl fmt::Display for AbstainReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Evidence behind an estimator's vote.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Diagnostics {
    /// No vote was cast.
    Abstained(AbstainReason),
    /// Edge-line histogram summary.
    EdgeLines {
        /// Segments that passed the length filters.
        segments: usize,
        /// Centre of the winning orientation bin, degrees in `(-45, 45]`.
        dominant_tilt_deg: f64,
        /// Fraction of segment length in the winning bin.
        winning_mass: f64,
        /// Length of near-horizontal segments in the winning bin.
        horizontal_mass: f64,
        /// Length of near-vertical segments in the winning bin.
        vertical_mass: f64,
        /// Offset of the weighted mean from the middle, as a fraction of the extent.
        polarity_offset: f64,
    },
    /// Document outline summary.
    BoundaryContour {
        /// Component area over image area.
        area_fraction: f64,
        /// Long over short side of the fitted rectangle.
        aspect_ratio: f64,
        /// Aspect agreement in `[0, 1]`.
        aspect_score: f64,
        /// Long-axis angle from horizontal, degrees in `(-90, 90]`.
        tilt_deg: f64,
        /// Ink imbalance across the short-axis centre line, `[0, 1]`.
        polarity: f64,
        /// Long side of the fitted rectangle.
        rect_long: f64,
        /// Short side of the fitted rectangle.
        rect_short: f64,
        /// The page fills the frame, so its outline is the image border.
        frame_filling: bool,
    },
    /// Gradient energy summary.
    GradientDirection {
        /// Energy of horizontal edges (`|gy| > |gx|`).
        horizontal_energy: f64,
        /// Energy of vertical edges.
        vertical_energy: f64,
        /// Dominant energy in the top (horizontal axis) or right (vertical axis) half.
        leading_energy: f64,
        /// Dominant energy in the opposite half.
        trailing_energy: f64,
    },
    /// Text blob summary.
    TextLines {
        /// Qualifying blobs.
        blobs: usize,
        /// Dominant line direction, degrees in `[0, 180)`.
        dominant_angle_deg: f64,
        /// Resultant length of the doubled-angle mean, `[0, 1]`.
        consistency: f64,
        /// Standard deviation of line starts.
        start_spread: f64,
        /// Standard deviation of line ends.
        end_spread: f64,
    },
}

/// One estimator's vote.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EstimatorResult {
    /// Voted rotation.
    pub angle: Rotation,
    /// Confidence in `[0, 100]`.
    pub confidence: f64,
    /// Supporting evidence.
    pub diagnostics: Diagnostics,
}

impl EstimatorResult {
    /// Create a result, clamping `confidence` into `[0, 100]` (NaN becomes 0).
    #[must_use]
    pub fn new(angle: Rotation, confidence: f64, diagnostics: Diagnostics) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 100.0)
        };
        Self {
            angle,
            confidence,
            diagnostics,
        }
    }

    /// A zero-confidence vote for 0°.
    #[must_use]
    pub fn abstain(reason: AbstainReason) -> Self {
        Self::new(Rotation::Deg0, 0.0, Diagnostics::Abstained(reason))
    }

    /// Reason for abstaining, if any.
    #[must_use]
    pub fn abstain_reason(&self) -> Option<AbstainReason> {
        match self.diagnostics {
            Diagnostics::Abstained(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Common interface of all orientation estimators.
pub trait OrientationEstimator: Send + Sync {
    /// Which method this is.
    fn method(&self) -> Method;

    /// Vote on the rotation of `img`.
    ///
    /// Three-channel input is converted to luma first.
    fn estimate(&self, img: &ImageView) -> EstimatorResult;
}

/// The four estimators, configured from `config`, in [`Method::ALL`] order.
#[must_use]
pub fn all_estimators(config: &DetectorConfig) -> Vec<Box<dyn OrientationEstimator>> {
    Method::ALL
        .iter()
        .map(|&method| estimator_for(method, config))
        .collect()
}

/// A single estimator configured from `config`.
#[must_use]
pub fn estimator_for(method: Method, config: &DetectorConfig) -> Box<dyn OrientationEstimator> {
    match method {
        Method::EdgeLines => Box::new(EdgeLineEstimator::from_config(config)),
        Method::BoundaryContour => Box::new(BoundaryContourEstimator::from_config(config)),
        Method::GradientDirection => Box::new(GradientDirectionEstimator::from_config(config)),
        Method::TextLines => Box::new(TextLineEstimator::from_config(config)),
    }
}

/// Side of the image a feature points to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    /// Rotation that moves the document's top edge to this side.
    pub(crate) fn as_document_top(self) -> Rotation {
        match self {
            Side::Top => Rotation::Deg0,
            Side::Right => Rotation::Deg90,
            Side::Bottom => Rotation::Deg180,
            Side::Left => Rotation::Deg270,
        }
    }

    /// Rotation that moves the document's left edge to this side.
    pub(crate) fn as_document_left(self) -> Rotation {
        self.as_document_top().compose(Rotation::Deg90)
    }

    /// Side a direction vector points to (y down). Vertical wins exact diagonals.
    pub(crate) fn from_vector(x: f64, y: f64) -> Self {
        if y.abs() >= x.abs() {
            if y < 0.0 { Side::Top } else { Side::Bottom }
        } else if x > 0.0 {
            Side::Right
        } else {
            Side::Left
        }
    }
}

/// Rotation used when a pair cannot be told apart: the smaller angle.
pub(crate) fn tie_rotation(horizontal_axis: bool) -> Rotation {
    if horizontal_axis {
        Rotation::Deg0
    } else {
        Rotation::Deg90
    }
}

/// Run `f` on a grayscale version of `img`, converting only when needed.
pub(crate) fn with_luma<R>(img: &ImageView, f: impl FnOnce(&ImageView) -> R) -> R {
    if img.channels == 1 {
        f(img)
    } else {
        let luma = img.to_luma();
        f(&luma.view())
    }
}

/// Whether the shorter side is below `min_side`.
pub(crate) fn too_small(img: &ImageView, min_side: usize) -> bool {
    img.width.min(img.height) < min_side
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_clamps_confidence() {
        let diag = Diagnostics::Abstained(AbstainReason::NoEdges);
        assert_eq!(EstimatorResult::new(Rotation::Deg90, 250.0, diag).confidence, 100.0);
        assert_eq!(EstimatorResult::new(Rotation::Deg90, -3.0, diag).confidence, 0.0);
        assert_eq!(EstimatorResult::new(Rotation::Deg90, f64::NAN, diag).confidence, 0.0);
    }

    #[test]
    fn test_abstain() {
        let r = EstimatorResult::abstain(AbstainReason::TooSmall);
        assert_eq!(r.angle, Rotation::Deg0);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.abstain_reason(), Some(AbstainReason::TooSmall));
        assert_eq!(AbstainReason::TooSmall.to_string(), "too_small");
    }

    #[test]
    fn test_side_mapping() {
        assert_eq!(Side::Right.as_document_top(), Rotation::Deg90);
        assert_eq!(Side::Left.as_document_top(), Rotation::Deg270);
        // Left-aligned text turned a quarter clockwise aligns at the top.
        assert_eq!(Side::Left.as_document_left(), Rotation::Deg0);
        assert_eq!(Side::Top.as_document_left(), Rotation::Deg90);
        assert_eq!(Side::Right.as_document_left(), Rotation::Deg180);
        assert_eq!(Side::Bottom.as_document_left(), Rotation::Deg270);
        assert_eq!(Side::from_vector(0.0, -1.0), Side::Top);
        assert_eq!(Side::from_vector(1.0, 0.2), Side::Right);
        assert_eq!(Side::from_vector(-1.0, 0.0), Side::Left);
    }

    #[test]
    fn test_method_order_and_names() {
        let mut sorted = Method::ALL;
        sorted.sort();
        assert_eq!(sorted, Method::ALL);
        assert_eq!(Method::BoundaryContour.to_string(), "boundary_contour");
    }

    #[test]
    fn test_estimators_in_canonical_order() {
        let estimators = all_estimators(&DetectorConfig::default());
        let methods: Vec<Method> = estimators.iter().map(|e| e.method()).collect();
        assert_eq!(methods, Method::ALL.to_vec());
    }
}
