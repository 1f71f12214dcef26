//! Configuration types for the orientation pipeline.
//!
//! - [`DetectorConfig`]: preprocessing, per-estimator thresholds and method weights
//! - [`MethodWeights`]: the static vote weight of each estimator

use crate::estimator::Method;

// ============================================================================
// MethodWeights: vote weights for the combiner
// ============================================================================

/// Static vote weight of each estimator.
///
/// The defaults sum to 1.0. The combiner rescales them over the estimators
/// that actually produced evidence, so custom weights need not be normalised.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodWeights {
    /// Weight of the edge-line estimator (default: 0.25).
    pub edge_lines: f64,
    /// Weight of the boundary-contour estimator (default: 0.35).
    pub boundary_contour: f64,
    /// Weight of the gradient-direction estimator (default: 0.15).
    pub gradient_direction: f64,
    /// Weight of the text-line estimator (default: 0.25).
    pub text_lines: f64,
}

impl Default for MethodWeights {
    fn default() -> Self {
        Self {
            edge_lines: 0.25,
            boundary_contour: 0.35,
            gradient_direction: 0.15,
            text_lines: 0.25,
        }
    }
}

impl MethodWeights {
    /// Weight assigned to `method`.
    #[must_use]
    pub fn get(&self, method: Method) -> f64 {
        match method {
            Method::EdgeLines => self.edge_lines,
            Method::BoundaryContour => self.boundary_contour,
            Method::GradientDirection => self.gradient_direction,
            Method::TextLines => self.text_lines,
        }
    }

    /// Sum of all four weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        Method::ALL.iter().map(|&m| self.get(m)).sum()
    }
}

// ============================================================================
// DetectorConfig: pipeline-level configuration
// ============================================================================

/// Pipeline-level configuration for the orientation detector.
///
/// Immutable after the `Detector` is constructed. Use the builder for
/// ergonomic construction.
///
/// # Example
/// ```
/// use docorient_core::config::DetectorConfig;
///
/// let config = DetectorConfig::builder()
///     .max_dimension(800)
///     .aspect_ratio_range(1.5, 1.7)
///     .build();
/// assert_eq!(config.max_dimension, 800);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorConfig {
    // Preprocessing
    /// Longest side after decimation; 0 disables decimation (default: 1024).
    pub max_dimension: usize,
    /// Shorter side below which every estimator abstains (default: 16).
    pub min_side: usize,
    /// Minimum `max - min` intensity spread for binarising estimators (default: 24).
    pub min_contrast: u8,
    /// Run the four estimators on the rayon pool (default: true).
    pub parallel: bool,

    /// Static vote weights.
    pub weights: MethodWeights,

    // Edge-line estimator
    /// Sobel `|gx| + |gy|` needed for a pixel to join a line region (default: 96).
    pub edge_magnitude_threshold: u16,
    /// Gradient direction tolerance while growing a line region, degrees (default: 22.5).
    pub line_angle_tolerance_deg: f64,
    /// Minimum segment length as a fraction of the shorter image side (default: 0.04).
    pub line_min_length_fraction: f64,
    /// Minimum number of segments for a vote (default: 2).
    pub line_min_segments: usize,
    /// Orientation histogram bin width, degrees (default: 10.0).
    pub line_bin_width_deg: f64,

    // Boundary-contour estimator
    /// Minimum document area as a fraction of the image (default: 0.1).
    pub contour_min_area_fraction: f64,
    /// Lower bound of the expected long/short side ratio (default: 1.4).
    pub aspect_ratio_min: f64,
    /// Upper bound of the expected long/short side ratio (default: 1.9).
    pub aspect_ratio_max: f64,
    /// Decay length of the aspect score outside the expected range (default: 0.3).
    pub aspect_falloff: f64,
    /// Inset of the ink-sampling window, fraction of the short side (default: 0.04).
    pub contour_inset_fraction: f64,

    // Gradient-direction estimator
    /// Sobel `|gx| + |gy|` for a pixel to count as edge energy (default: 96).
    pub gradient_magnitude_threshold: u16,

    // Text-line estimator
    /// Radius of the square closing element, `2r + 1` wide (default: 2).
    pub text_close_radius: usize,
    /// Minimum blob area in pixels (default: 24).
    pub text_min_blob_area: u32,
    /// Maximum blob area as a fraction of the image (default: 0.1).
    pub text_max_blob_fraction: f64,
    /// Minimum ratio of major to minor principal axis (default: 3.0).
    pub text_min_elongation: f64,
    /// Blob count at which the count factor saturates (default: 6).
    pub text_saturation_count: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            min_side: 16,
            min_contrast: 24,
            parallel: true,
            weights: MethodWeights::default(),
            edge_magnitude_threshold: 96,
            line_angle_tolerance_deg: 22.5,
            line_min_length_fraction: 0.04,
            line_min_segments: 2,
            line_bin_width_deg: 10.0,
            contour_min_area_fraction: 0.1,
            aspect_ratio_min: 1.4,
            aspect_ratio_max: 1.9,
            aspect_falloff: 0.3,
            contour_inset_fraction: 0.04,
            gradient_magnitude_threshold: 96,
            text_close_radius: 2,
            text_min_blob_area: 24,
            text_max_blob_fraction: 0.1,
            text_min_elongation: 3.0,
            text_saturation_count: 6,
        }
    }
}

impl DetectorConfig {
    /// Create a new builder for `DetectorConfig`.
    #[must_use]
    pub fn builder() -> DetectorConfigBuilder {
        DetectorConfigBuilder::default()
    }

    /// Decimation factor applied to an image of the given size.
    #[must_use]
    pub fn decimation_for(&self, width: usize, height: usize) -> usize {
        let longest = width.max(height);
        if self.max_dimension == 0 || longest <= self.max_dimension {
            1
        } else {
            longest.div_ceil(self.max_dimension)
        }
    }
}

/// Builder for [`DetectorConfig`].
#[derive(Default)]
pub struct DetectorConfigBuilder {
    max_dimension: Option<usize>,
    min_side: Option<usize>,
    min_contrast: Option<u8>,
    parallel: Option<bool>,
    weights: Option<MethodWeights>,
    edge_magnitude_threshold: Option<u16>,
    line_angle_tolerance_deg: Option<f64>,
    line_min_length_fraction: Option<f64>,
    line_min_segments: Option<usize>,
    line_bin_width_deg: Option<f64>,
    contour_min_area_fraction: Option<f64>,
    aspect_ratio_min: Option<f64>,
    aspect_ratio_max: Option<f64>,
    aspect_falloff: Option<f64>,
    contour_inset_fraction: Option<f64>,
    gradient_magnitude_threshold: Option<u16>,
    text_close_radius: Option<usize>,
    text_min_blob_area: Option<u32>,
    text_max_blob_fraction: Option<f64>,
    text_min_elongation: Option<f64>,
    text_saturation_count: Option<usize>,
}

impl DetectorConfigBuilder {
    /// Set the longest side kept after decimation (0 disables decimation).
    #[must_use]
    pub fn max_dimension(mut self, pixels: usize) -> Self {
        self.max_dimension = Some(pixels);
        self
    }

    /// Set the shorter side below which estimators abstain.
    #[must_use]
    pub fn min_side(mut self, pixels: usize) -> Self {
        self.min_side = Some(pixels);
        self
    }

    /// Set the minimum intensity spread.
    #[must_use]
    pub fn min_contrast(mut self, contrast: u8) -> Self {
        self.min_contrast = Some(contrast);
        self
    }

    /// Enable or disable parallel estimator execution.
    #[must_use]
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = Some(enabled);
        self
    }

    /// Set the method vote weights.
    #[must_use]
    pub fn weights(mut self, weights: MethodWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Set the line-region gradient magnitude threshold.
    #[must_use]
    pub fn edge_magnitude_threshold(mut self, threshold: u16) -> Self {
        self.edge_magnitude_threshold = Some(threshold);
        self
    }

    /// Set the line-region angle tolerance in degrees.
    #[must_use]
    pub fn line_angle_tolerance_deg(mut self, degrees: f64) -> Self {
        self.line_angle_tolerance_deg = Some(degrees);
        self
    }

    /// Set the minimum segment length fraction.
    #[must_use]
    pub fn line_min_length_fraction(mut self, fraction: f64) -> Self {
        self.line_min_length_fraction = Some(fraction);
        self
    }

    /// Set the minimum number of segments.
    #[must_use]
    pub fn line_min_segments(mut self, count: usize) -> Self {
        self.line_min_segments = Some(count);
        self
    }

    /// Set the orientation histogram bin width in degrees.
    #[must_use]
    pub fn line_bin_width_deg(mut self, degrees: f64) -> Self {
        self.line_bin_width_deg = Some(degrees);
        self
    }

    /// Set the minimum document area fraction.
    #[must_use]
    pub fn contour_min_area_fraction(mut self, fraction: f64) -> Self {
        self.contour_min_area_fraction = Some(fraction);
        self
    }

    /// Set the expected long/short side ratio range.
    #[must_use]
    pub fn aspect_ratio_range(mut self, min: f64, max: f64) -> Self {
        self.aspect_ratio_min = Some(min);
        self.aspect_ratio_max = Some(max);
        self
    }

    /// Set the aspect score decay length.
    #[must_use]
    pub fn aspect_falloff(mut self, falloff: f64) -> Self {
        self.aspect_falloff = Some(falloff);
        self
    }

    /// Set the ink-sampling inset fraction.
    #[must_use]
    pub fn contour_inset_fraction(mut self, fraction: f64) -> Self {
        self.contour_inset_fraction = Some(fraction);
        self
    }

    /// Set the edge-energy gradient threshold.
    #[must_use]
    pub fn gradient_magnitude_threshold(mut self, threshold: u16) -> Self {
        self.gradient_magnitude_threshold = Some(threshold);
        self
    }

    /// Set the closing element radius.
    #[must_use]
    pub fn text_close_radius(mut self, radius: usize) -> Self {
        self.text_close_radius = Some(radius);
        self
    }

    /// Set the minimum text blob area.
    #[must_use]
    pub fn text_min_blob_area(mut self, area: u32) -> Self {
        self.text_min_blob_area = Some(area);
        self
    }

    /// Set the maximum text blob area fraction.
    #[must_use]
    pub fn text_max_blob_fraction(mut self, fraction: f64) -> Self {
        self.text_max_blob_fraction = Some(fraction);
        self
    }

    /// Set the minimum blob elongation.
    #[must_use]
    pub fn text_min_elongation(mut self, ratio: f64) -> Self {
        self.text_min_elongation = Some(ratio);
        self
    }

    /// Set the blob count at which text confidence saturates.
    #[must_use]
    pub fn text_saturation_count(mut self, count: usize) -> Self {
        self.text_saturation_count = Some(count);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> DetectorConfig {
        let d = DetectorConfig::default();
        DetectorConfig {
            max_dimension: self.max_dimension.unwrap_or(d.max_dimension),
            min_side: self.min_side.unwrap_or(d.min_side),
            min_contrast: self.min_contrast.unwrap_or(d.min_contrast),
            parallel: self.parallel.unwrap_or(d.parallel),
            weights: self.weights.unwrap_or(d.weights),
            edge_magnitude_threshold: self
                .edge_magnitude_threshold
                .unwrap_or(d.edge_magnitude_threshold),
            line_angle_tolerance_deg: self
                .line_angle_tolerance_deg
                .unwrap_or(d.line_angle_tolerance_deg),
            line_min_length_fraction: self
                .line_min_length_fraction
                .unwrap_or(d.line_min_length_fraction),
            line_min_segments: self.line_min_segments.unwrap_or(d.line_min_segments),
            line_bin_width_deg: self.line_bin_width_deg.unwrap_or(d.line_bin_width_deg),
            contour_min_area_fraction: self
                .contour_min_area_fraction
                .unwrap_or(d.contour_min_area_fraction),
            aspect_ratio_min: self.aspect_ratio_min.unwrap_or(d.aspect_ratio_min),
            aspect_ratio_max: self.aspect_ratio_max.unwrap_or(d.aspect_ratio_max),
            aspect_falloff: self.aspect_falloff.unwrap_or(d.aspect_falloff),
            contour_inset_fraction: self
                .contour_inset_fraction
                .unwrap_or(d.contour_inset_fraction),
            gradient_magnitude_threshold: self
                .gradient_magnitude_threshold
                .unwrap_or(d.gradient_magnitude_threshold),
            text_close_radius: self.text_close_radius.unwrap_or(d.text_close_radius),
            text_min_blob_area: self.text_min_blob_area.unwrap_or(d.text_min_blob_area),
            text_max_blob_fraction: self
                .text_max_blob_fraction
                .unwrap_or(d.text_max_blob_fraction),
            text_min_elongation: self.text_min_elongation.unwrap_or(d.text_min_elongation),
            text_saturation_count: self
                .text_saturation_count
                .unwrap_or(d.text_saturation_count),
        }
    }
}
