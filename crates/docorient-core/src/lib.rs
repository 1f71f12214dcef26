//! Core orientation detection for the docorient library.
//!
//! docorient decides which of the four canonical rotations (0°, 90°, 180°,
//! 270°) a photographed document went through, and how sure it is, so that a
//! downstream text recogniser knows which rotation to try first.
//!
//! # Architecture Overview
//!
//! Detection is a pure function of the input image:
//!
//! 1. **Preprocessing**:
//!    - The [`ImageView`] constructor is the only precondition check.
//!    - RGB input is reduced to BT.601 luma; large images are decimated.
//!
//! 2. **Estimation** (independent, run in parallel on the rayon pool):
//!    - [`estimator::EdgeLineEstimator`]: long straight edges.
//!    - [`estimator::BoundaryContourEstimator`]: the document's outline and its
//!      minimum-area rectangle (the primary vote).
//!    - [`estimator::GradientDirectionEstimator`]: horizontal versus vertical edge energy.
//!    - [`estimator::TextLineEstimator`]: merged text lines and their alignment.
//!
//! 3. **Combination**:
//!    - [`combiner::combine`] renormalises the static weights over the
//!      estimators that found evidence and tallies confidence-weighted votes.
//!
//! Rotations are clockwise. A detected angle is the turn the upright document
//! went through; [`correct_orientation`] applies its inverse.
//!
//! # Configuration
//!
//! [`config::DetectorConfig`] holds every threshold and the method weights. It
//! is immutable once a [`Detector`] is built.
//!
//! # Example
//!
//! ```
//! use docorient_core::{correct_orientation, Detector, Rotation};
//! use docorient_core::test_utils::DocumentScene;
//!
//! let scene = DocumentScene::new(600, 425).render_rotated(Rotation::Deg90);
//! let detector = Detector::new();
//! let result = detector.detect(&scene.view());
//! assert_eq!(result.angle, Rotation::Deg90);
//!
//! let upright = correct_orientation(&scene.view(), &result);
//! assert_eq!((upright.width(), upright.height()), (600, 425));
//! ```

/// Weighted vote aggregation.
pub mod combiner;
/// Configuration types for the detector pipeline.
pub mod config;
/// Orientation estimators and their shared trait.
pub mod estimator;
/// Convex hulls, rotated rectangles and principal axes.
pub mod geometry;
/// Sobel gradients and line segment extraction.
pub mod gradient;
/// Image buffer abstractions.
pub mod image;
/// Binary morphology.
pub mod morphology;
/// Quarter-turn rotations.
pub mod rotation;
/// Connected components labeling using Union-Find.
pub mod segmentation;
/// Confidence-tiered retry policy.
pub mod strategy;
/// Utilities for testing and synthetic data generation.
pub mod test_utils;
/// Global thresholding.
pub mod threshold;

pub use crate::combiner::{AngleVotes, CombinedResult};
pub use crate::config::{DetectorConfig, MethodWeights};
pub use crate::estimator::{AbstainReason, Diagnostics, EstimatorResult, Method, OrientationEstimator};
pub use crate::image::{Image, ImageError, ImageView};
pub use crate::rotation::{apply_rotation, Rotation};
pub use crate::strategy::{RetryPolicy, RetryTier};

use crate::estimator::all_estimators;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Instant;

/// Timings and counters for a single detection call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineStats {
    /// Luma conversion and decimation in milliseconds.
    pub preprocess_ms: f64,
    /// Edge-line estimator in milliseconds.
    pub edge_lines_ms: f64,
    /// Boundary-contour estimator in milliseconds.
    pub boundary_contour_ms: f64,
    /// Gradient-direction estimator in milliseconds.
    pub gradient_direction_ms: f64,
    /// Text-line estimator in milliseconds.
    pub text_lines_ms: f64,
    /// Vote combination in milliseconds.
    pub combine_ms: f64,
    /// Total pipeline time in milliseconds.
    pub total_ms: f64,
    /// Decimation factor applied to the input (1 = none).
    pub decimation: usize,
    /// Estimators that cast a vote.
    pub active_estimators: usize,
}

impl PipelineStats {
    fn record(&mut self, method: Method, ms: f64) {
        match method {
            Method::EdgeLines => self.edge_lines_ms = ms,
            Method::BoundaryContour => self.boundary_contour_ms = ms,
            Method::GradientDirection => self.gradient_direction_ms = ms,
            Method::TextLines => self.text_lines_ms = ms,
        }
    }
}

/// The main entry point for orientation detection.
///
/// A detector is immutable after construction and can be shared across
/// threads; every call allocates its own scratch space.
pub struct Detector {
    config: DetectorConfig,
    estimators: Vec<Box<dyn OrientationEstimator>>,
}

impl Detector {
    /// Create a new detector instance with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    /// Create a detector with custom pipeline configuration.
    #[must_use]
    pub fn with_config(config: DetectorConfig) -> Self {
        Self {
            estimators: all_estimators(&config),
            config,
        }
    }

    /// Get the detector configuration.
    #[must_use]
    pub fn config(&self) -> DetectorConfig {
        self.config
    }

    /// Detect the rotation of a document.
    #[must_use]
    pub fn detect(&self, img: &ImageView) -> CombinedResult {
        self.detect_with_stats(img).0
    }

    /// Detection with per-stage timing statistics.
    #[must_use]
    pub fn detect_with_stats(&self, img: &ImageView) -> (CombinedResult, PipelineStats) {
        let start_total = Instant::now();
        let mut stats = PipelineStats::default();

        let start_pre = Instant::now();
        let (prepared, decimation) = {
            let _span = tracing::info_span!("preprocess").entered();
            self.preprocess(img)
        };
        stats.preprocess_ms = start_pre.elapsed().as_secs_f64() * 1000.0;
        stats.decimation = decimation;

        let view = prepared.view();
        let run = |estimator: &dyn OrientationEstimator| {
            let method = estimator.method();
            let _span = tracing::info_span!("estimate", method = method.name()).entered();
            let start = Instant::now();
            let result = estimator.estimate(&view);
            log_result(method, &result);
            (method, result, start.elapsed().as_secs_f64() * 1000.0)
        };
        let outcomes: Vec<(Method, EstimatorResult, f64)> = if self.config.parallel {
            self.estimators.par_iter().map(|e| run(e.as_ref())).collect()
        } else {
            self.estimators.iter().map(|e| run(e.as_ref())).collect()
        };

        let mut results = BTreeMap::new();
        for (method, result, ms) in outcomes {
            stats.record(method, ms);
            if result.confidence > 0.0 && self.config.weights.get(method) > 0.0 {
                stats.active_estimators += 1;
            }
            results.insert(method, result);
        }

        let start_combine = Instant::now();
        let combined = {
            let _span = tracing::info_span!("combine").entered();
            combiner::combine(results, &self.config.weights)
        };
        stats.combine_ms = start_combine.elapsed().as_secs_f64() * 1000.0;
        stats.total_ms = start_total.elapsed().as_secs_f64() * 1000.0;

        tracing::debug!(
            angle = combined.angle.degrees(),
            confidence = combined.confidence,
            winning_method = combined.winning_method.map(Method::name),
            active = stats.active_estimators,
            "orientation decided"
        );
        (combined, stats)
    }

    /// Boundary-contour vote only; 0° when it abstains.
    #[must_use]
    pub fn quick_estimate(&self, img: &ImageView) -> Rotation {
        self.estimate_method(Method::BoundaryContour, img).angle
    }

    /// Run a single estimator after the usual preprocessing.
    #[must_use]
    pub fn estimate_method(&self, method: Method, img: &ImageView) -> EstimatorResult {
        let (prepared, _) = self.preprocess(img);
        let view = prepared.view();
        let result = match self.estimators.iter().find(|e| e.method() == method) {
            Some(estimator) => estimator.estimate(&view),
            None => estimator::estimator_for(method, &self.config).estimate(&view),
        };
        log_result(method, &result);
        result
    }

    /// Luma conversion and decimation.
    fn preprocess(&self, img: &ImageView) -> (Image, usize) {
        let factor = self.config.decimation_for(img.width, img.height);
        let reduced = img.decimate(factor);
        let luma = if reduced.channels() == 1 {
            reduced
        } else {
            reduced.view().to_luma()
        };
        (luma, factor)
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::new()
    }
}

fn log_result(method: Method, result: &EstimatorResult) {
    match result.abstain_reason() {
        Some(reason) => tracing::debug!(method = method.name(), reason = reason.name(), "estimator abstained"),
        None => tracing::debug!(
            method = method.name(),
            angle = result.angle.degrees(),
            confidence = result.confidence,
            "estimator voted"
        ),
    }
}

/// Detect orientation with the default configuration.
#[must_use]
pub fn detect_orientation(img: &ImageView) -> CombinedResult {
    Detector::new().detect(img)
}

/// Boundary-contour-only estimate with the default configuration.
#[must_use]
pub fn quick_estimate(img: &ImageView) -> Rotation {
    Detector::new().quick_estimate(img)
}

/// Rotate `img` upright according to a detection.
#[must_use]
pub fn correct_orientation(img: &ImageView, result: &CombinedResult) -> Image {
    apply_rotation(img, result.correction())
}
