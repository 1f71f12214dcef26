//! Python bindings for the docorient library.
#![allow(unsafe_code)]

use docorient_core::estimator::Method;
use docorient_core::image::{Image, ImageView};
use docorient_core::{CombinedResult, EstimatorResult, MethodWeights, RetryPolicy, Rotation};
use numpy::{PyArray1, PyArrayMethods, PyReadonlyArrayDyn, PyUntypedArrayMethods};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::HashMap;

// ============================================================================
// Results and Stats (Python-compatible wrappers)
// ============================================================================

/// One estimator's vote.
#[pyclass(frozen)]
#[derive(Clone)]
pub struct MethodResult {
    /// Estimator name, e.g. `"boundary_contour"`.
    #[pyo3(get)]
    pub method: String,
    /// Voted rotation in degrees clockwise.
    #[pyo3(get)]
    pub angle: i32,
    /// Confidence in `[0, 100]`.
    #[pyo3(get)]
    pub confidence: f64,
    /// Why the estimator declined to vote, if it did.
    #[pyo3(get)]
    pub abstain_reason: Option<String>,
}

impl MethodResult {
    fn new(method: Method, result: &EstimatorResult) -> Self {
        Self {
            method: method.name().to_string(),
            angle: i32::from(result.angle.degrees()),
            confidence: result.confidence,
            abstain_reason: result.abstain_reason().map(|r| r.name().to_string()),
        }
    }
}

#[pymethods]
impl MethodResult {
    fn __repr__(&self) -> String {
        format!(
            "MethodResult(method={:?}, angle={}, confidence={:.1})",
            self.method, self.angle, self.confidence
        )
    }
}

/// Python-compatible orientation decision.
#[pyclass(frozen)]
#[derive(Clone)]
pub struct OrientationResult {
    /// Detected rotation in degrees clockwise (0, 90, 180 or 270).
    #[pyo3(get)]
    pub angle: i32,
    /// Confidence in `[0, 100]`.
    #[pyo3(get)]
    pub confidence: f64,
    /// Rotation in degrees clockwise that turns the image upright.
    #[pyo3(get)]
    pub correction: i32,
    /// Largest contributor to the winning angle.
    #[pyo3(get)]
    pub winning_method: Option<String>,
    /// Vote mass keyed by angle in degrees.
    #[pyo3(get)]
    pub votes: HashMap<i32, f64>,
    /// Per-estimator results keyed by method name.
    #[pyo3(get)]
    pub details: HashMap<String, MethodResult>,
}

impl From<CombinedResult> for OrientationResult {
    fn from(r: CombinedResult) -> Self {
        Self {
            angle: i32::from(r.angle.degrees()),
            confidence: r.confidence,
            correction: i32::from(r.correction().degrees()),
            winning_method: r.winning_method.map(|m| m.name().to_string()),
            votes: r.per_angle_votes.iter().map(|(a, v)| (i32::from(a.degrees()), v)).collect(),
            details: r
                .per_method_details
                .iter()
                .map(|(&m, d)| (m.name().to_string(), MethodResult::new(m, d)))
                .collect(),
        }
    }
}

#[pymethods]
impl OrientationResult {
    /// Rotations worth trying for this detection, best first.
    #[pyo3(signature = (high_confidence = 70.0, low_confidence = 40.0))]
    fn candidates(&self, high_confidence: f64, low_confidence: f64) -> PyResult<Vec<i32>> {
        let policy = RetryPolicy {
            high_confidence,
            low_confidence,
        };
        Ok(policy
            .candidates(parse_rotation(self.angle)?, self.confidence)
            .into_iter()
            .map(|r| i32::from(r.degrees()))
            .collect())
    }

    fn __repr__(&self) -> String {
        format!(
            "OrientationResult(angle={}, confidence={:.1}, winning_method={:?})",
            self.angle, self.confidence, self.winning_method
        )
    }
}

/// Python-compatible pipeline statistics.
#[pyclass(frozen)]
#[derive(Clone, Default)]
pub struct PipelineStats {
    /// Luma conversion and decimation time (ms).
    #[pyo3(get)]
    pub preprocess_ms: f64,
    /// Edge-line estimator time (ms).
    #[pyo3(get)]
    pub edge_lines_ms: f64,
    /// Boundary-contour estimator time (ms).
    #[pyo3(get)]
    pub boundary_contour_ms: f64,
    /// Gradient-direction estimator time (ms).
    #[pyo3(get)]
    pub gradient_direction_ms: f64,
    /// Text-line estimator time (ms).
    #[pyo3(get)]
    pub text_lines_ms: f64,
    /// Vote combination time (ms).
    #[pyo3(get)]
    pub combine_ms: f64,
    /// Total time (ms).
    #[pyo3(get)]
    pub total_ms: f64,
    /// Decimation factor applied to the input.
    #[pyo3(get)]
    pub decimation: usize,
    /// Number of estimators that voted.
    #[pyo3(get)]
    pub active_estimators: usize,
}

impl From<docorient_core::PipelineStats> for PipelineStats {
    fn from(s: docorient_core::PipelineStats) -> Self {
        Self {
            preprocess_ms: s.preprocess_ms,
            edge_lines_ms: s.edge_lines_ms,
            boundary_contour_ms: s.boundary_contour_ms,
            gradient_direction_ms: s.gradient_direction_ms,
            text_lines_ms: s.text_lines_ms,
            combine_ms: s.combine_ms,
            total_ms: s.total_ms,
            decimation: s.decimation,
            active_estimators: s.active_estimators,
        }
    }
}

// ============================================================================
// Detector class
// ============================================================================

/// The main detector class.
///
/// Detection releases the GIL, so one detector can serve several threads.
///
/// Example:
///     detector = docorient.Detector()
///     result = detector.detect(image)
///     upright = docorient.correct_orientation(image, result)
///
///     # With custom config
///     detector = docorient.Detector(
///         max_dimension=800,
///         gradient_direction_weight=0.0,
///     )
#[pyclass(frozen)]
pub struct Detector {
    inner: docorient_core::Detector,
}

#[pymethods]
impl Detector {
    /// Create a new detector with optional configuration.
    ///
    /// Args:
    ///     max_dimension: Longest side after decimation, 0 disables it (default: 1024)
    ///     min_side: Shorter side below which estimators abstain (default: 16)
    ///     min_contrast: Minimum intensity spread (default: 24)
    ///     parallel: Run estimators on a thread pool (default: True)
    ///     edge_lines_weight: Vote weight of the edge-line estimator (default: 0.25)
    ///     boundary_contour_weight: Vote weight of the contour estimator (default: 0.35)
    ///     gradient_direction_weight: Vote weight of the gradient estimator (default: 0.15)
    ///     text_lines_weight: Vote weight of the text-line estimator (default: 0.25)
    #[new]
    #[pyo3(signature = (
        max_dimension = 1024,
        min_side = 16,
        min_contrast = 24,
        parallel = true,
        edge_lines_weight = 0.25,
        boundary_contour_weight = 0.35,
        gradient_direction_weight = 0.15,
        text_lines_weight = 0.25
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        max_dimension: usize,
        min_side: usize,
        min_contrast: u8,
        parallel: bool,
        edge_lines_weight: f64,
        boundary_contour_weight: f64,
        gradient_direction_weight: f64,
        text_lines_weight: f64,
    ) -> PyResult<Self> {
        let weights = MethodWeights {
            edge_lines: edge_lines_weight,
            boundary_contour: boundary_contour_weight,
            gradient_direction: gradient_direction_weight,
            text_lines: text_lines_weight,
        };
        if Method::ALL.iter().any(|&m| weights.get(m).is_nan() || weights.get(m) < 0.0) {
            return Err(PyValueError::new_err("method weights must be non-negative"));
        }
        if weights.total() <= 0.0 {
            return Err(PyValueError::new_err("at least one method weight must be positive"));
        }
        let config = docorient_core::DetectorConfig::builder()
            .max_dimension(max_dimension)
            .min_side(min_side)
            .min_contrast(min_contrast)
            .parallel(parallel)
            .weights(weights)
            .build();
        Ok(Self {
            inner: docorient_core::Detector::with_config(config),
        })
    }

    /// Detect the rotation of a grayscale (H, W) or RGB (H, W, 3) uint8 image.
    #[allow(clippy::needless_pass_by_value)]
    fn detect(&self, py: Python<'_>, img: PyReadonlyArrayDyn<u8>) -> PyResult<OrientationResult> {
        let view = create_image_view(&img)?;
        let result = py.allow_threads(|| self.inner.detect(&view));
        Ok(result.into())
    }

    /// Detect with timing statistics.
    #[allow(clippy::needless_pass_by_value)]
    fn detect_with_stats(
        &self,
        py: Python<'_>,
        img: PyReadonlyArrayDyn<u8>,
    ) -> PyResult<(OrientationResult, PipelineStats)> {
        let view = create_image_view(&img)?;
        let (result, stats) = py.allow_threads(|| self.inner.detect_with_stats(&view));
        Ok((result.into(), stats.into()))
    }

    /// Contour-only estimate in degrees; 0 when no document outline is found.
    #[allow(clippy::needless_pass_by_value)]
    fn quick_estimate(&self, py: Python<'_>, img: PyReadonlyArrayDyn<u8>) -> PyResult<i32> {
        let view = create_image_view(&img)?;
        Ok(py.allow_threads(|| self.inner.quick_estimate(&view)).degrees().into())
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Create an ImageView over a 2D or 3D uint8 array without copying.
#[allow(clippy::cast_sign_loss)]
fn create_image_view<'a>(img: &'a PyReadonlyArrayDyn<'a, u8>) -> PyResult<ImageView<'a>> {
    let shape = img.shape();
    let strides = img.strides();
    let (height, width, channels) = match *shape {
        [h, w] => (h, w, 1),
        [h, w, c] => (h, w, c),
        _ => {
            return Err(PyValueError::new_err(format!(
                "expected a 2D (H, W) or 3D (H, W, C) uint8 array, got {} dimensions",
                shape.len()
            )))
        }
    };
    if shape.len() == 3 && strides[2] != 1 {
        return Err(PyValueError::new_err("channels must be interleaved (innermost stride 1)"));
    }
    if strides[1] != channels as isize {
        return Err(PyValueError::new_err("pixels within a row must be contiguous"));
    }
    if strides[0] < 0 {
        return Err(PyValueError::new_err("negative row strides are not supported"));
    }
    if height == 0 || width == 0 {
        return ImageView::new(&[], width, height, 0, channels)
            .map_err(|e| PyValueError::new_err(e.to_string()));
    }
    let stride = strides[0] as usize;
    let required = (height - 1)
        .checked_mul(stride)
        .and_then(|n| n.checked_add(width.checked_mul(channels)?))
        .ok_or_else(|| PyValueError::new_err("array layout overflows the addressable size"))?;

    // SAFETY: every byte up to `required` lies inside the array given the
    // strides checked above, and the readonly borrow keeps it alive and unaliased.
    let data = unsafe { std::slice::from_raw_parts(img.data(), required) };
    ImageView::new(data, width, height, stride, channels)
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

fn parse_rotation(degrees: i32) -> PyResult<Rotation> {
    Rotation::from_degrees(degrees).ok_or_else(|| {
        PyValueError::new_err(format!("angle must be one of 0, 90, 180, 270, got {degrees}"))
    })
}

/// Hand an owned image to NumPy as an (H, W) or (H, W, C) array.
fn image_to_numpy(py: Python<'_>, image: Image) -> PyResult<PyObject> {
    let (width, height, channels) = (image.width(), image.height(), image.channels());
    let array = PyArray1::from_vec(py, image.into_vec());
    let reshaped = if channels == 1 {
        array.reshape([height, width])?.into_any()
    } else {
        array.reshape([height, width, channels])?.into_any()
    };
    Ok(reshaped.unbind())
}

// ============================================================================
// Function-based API
// ============================================================================

/// Detect orientation with the default configuration.
#[pyfunction]
#[allow(clippy::needless_pass_by_value)]
fn detect_orientation(py: Python<'_>, img: PyReadonlyArrayDyn<u8>) -> PyResult<OrientationResult> {
    let view = create_image_view(&img)?;
    Ok(py.allow_threads(|| docorient_core::detect_orientation(&view)).into())
}

/// Contour-only estimate in degrees with the default configuration.
#[pyfunction]
#[allow(clippy::needless_pass_by_value)]
fn quick_estimate(py: Python<'_>, img: PyReadonlyArrayDyn<u8>) -> PyResult<i32> {
    let view = create_image_view(&img)?;
    Ok(py.allow_threads(|| docorient_core::quick_estimate(&view)).degrees().into())
}

/// Rotate an image clockwise by 0, 90, 180 or 270 degrees.
#[pyfunction]
#[allow(clippy::needless_pass_by_value)]
fn apply_rotation(py: Python<'_>, img: PyReadonlyArrayDyn<u8>, angle: i32) -> PyResult<PyObject> {
    let rotation = parse_rotation(angle)?;
    let view = create_image_view(&img)?;
    let rotated = py.allow_threads(|| docorient_core::apply_rotation(&view, rotation));
    image_to_numpy(py, rotated)
}

/// Turn an image upright according to a detection result.
#[pyfunction]
#[allow(clippy::needless_pass_by_value)]
fn correct_orientation(
    py: Python<'_>,
    img: PyReadonlyArrayDyn<u8>,
    result: PyRef<'_, OrientationResult>,
) -> PyResult<PyObject> {
    let correction = parse_rotation(result.correction)?;
    let view = create_image_view(&img)?;
    let upright = py.allow_threads(|| docorient_core::apply_rotation(&view, correction));
    image_to_numpy(py, upright)
}

// ============================================================================
// Module registration
// ============================================================================

/// The docorient Python module.
#[pymodule]
fn docorient(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<MethodResult>()?;
    m.add_class::<OrientationResult>()?;
    m.add_class::<PipelineStats>()?;
    m.add_class::<Detector>()?;

    m.add_function(wrap_pyfunction!(detect_orientation, m)?)?;
    m.add_function(wrap_pyfunction!(quick_estimate, m)?)?;
    m.add_function(wrap_pyfunction!(apply_rotation, m)?)?;
    m.add_function(wrap_pyfunction!(correct_orientation, m)?)?;
    Ok(())
}
