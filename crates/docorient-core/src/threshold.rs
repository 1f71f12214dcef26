//! Global (Otsu) thresholding and binarisation.
//!
//! Documents photographed against a background are strongly bimodal, so a single
//! global threshold separates the card from its surroundings and ink from paper.

use crate::image::ImageView;
use multiversion::multiversion;

/// Which side of the threshold counts as foreground.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Polarity {
    /// Pixels strictly above the threshold.
    Bright,
    /// Pixels at or below the threshold.
    Dark,
}

impl Polarity {
    /// The other polarity.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Polarity::Bright => Polarity::Dark,
            Polarity::Dark => Polarity::Bright,
        }
    }

    /// Whether `value` is foreground under this polarity.
    #[inline]
    #[must_use]
    pub fn matches(self, value: u8, threshold: u8) -> bool {
        match self {
            Polarity::Bright => value > threshold,
            Polarity::Dark => value <= threshold,
        }
    }
}

/// Global intensity statistics of a grayscale image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntensityModel {
    /// Darkest pixel.
    pub min: u8,
    /// Brightest pixel.
    pub max: u8,
    /// Otsu threshold; pixels `<= threshold` form the dark class.
    pub threshold: u8,
}

impl IntensityModel {
    /// Intensity range and Otsu threshold of `img`.
    #[must_use]
    pub fn analyze(img: &ImageView) -> Self {
        let (min, max) = intensity_range(img);
        let hist = histogram(img);
        Self {
            min,
            max,
            threshold: otsu_threshold(&hist),
        }
    }

    /// Spread between the brightest and darkest pixel.
    #[must_use]
    pub fn contrast(&self) -> u8 {
        self.max - self.min
    }
}

/// 256-bin intensity histogram.
#[must_use]
pub fn histogram(img: &ImageView) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for y in 0..img.height {
        for &p in img.get_row(y) {
            hist[p as usize] += 1;
        }
    }
    hist
}

/// Minimum and maximum intensity.
#[must_use]
pub fn intensity_range(img: &ImageView) -> (u8, u8) {
    let mut min = 255u8;
    let mut max = 0u8;
    for y in 0..img.height {
        let (rmin, rmax) = compute_min_max_simd(img.get_row(y));
        min = min.min(rmin);
        max = max.max(rmax);
    }
    (min, max)
}

/// Otsu's threshold: the split maximising between-class variance.
///
/// Returns the last value of the dark class. Ties keep the lowest threshold.
#[must_use]
pub fn otsu_threshold(hist: &[u32; 256]) -> u8 {
    let total: f64 = hist.iter().map(|&c| f64::from(c)).sum();
    if total == 0.0 {
        return 0;
    }
    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * f64::from(c))
        .sum();

    let mut weight_bg = 0.0;
    let mut sum_bg = 0.0;
    let mut best_var = 0.0;
    let mut best = 0u8;

    for (t, &count) in hist.iter().enumerate() {
        weight_bg += f64::from(count);
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += t as f64 * f64::from(count);
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let between = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);
        if between > best_var {
            best_var = between;
            best = t as u8;
        }
    }
    best
}

/// Write a packed binary mask (255 = foreground, 0 = background).
///
/// `output` must hold `width * height` bytes.
pub fn binarize(img: &ImageView, threshold: u8, polarity: Polarity, output: &mut [u8]) {
    let w = img.width;
    for (y, dst) in output.chunks_exact_mut(w).take(img.height).enumerate() {
        threshold_row_simd(img.get_row(y), dst, threshold, polarity == Polarity::Dark);
    }
}

/// Packed binary mask as a new buffer.
#[must_use]
pub fn binarize_to_vec(img: &ImageView, threshold: u8, polarity: Polarity) -> Vec<u8> {
    let mut mask = vec![0u8; img.width * img.height];
    binarize(img, threshold, polarity, &mut mask);
    mask
}

/// Branchless row binarisation.
#[multiversion(targets(
    "x86_64+avx2+bmi1+bmi2+popcnt+lzcnt",
    "x86_64+avx512f+avx512bw+avx512dq+avx512vl",
    "aarch64+neon"
))]
fn threshold_row_simd(src: &[u8], dst: &mut [u8], threshold: u8, invert: bool) {
    let flip = u8::from(invert).wrapping_neg();
    for (d, &s) in dst.iter_mut().zip(src) {
        // 0xFF when above the threshold, then flipped for dark foreground
        *d = u8::from(s > threshold).wrapping_neg() ^ flip;
    }
}

#[multiversion(targets = "simd")]
fn compute_min_max_simd(data: &[u8]) -> (u8, u8) {
    let mut min = 255u8;
    let mut max = 0u8;
    for &b in data {
        min = min.min(b);
        max = max.max(b);
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_min_max_invariants(data in prop::collection::vec(0..=255u8, 1..64)) {
            let (rmin, rmax) = compute_min_max_simd(&data);
            prop_assert_eq!(rmin, *data.iter().min().unwrap());
            prop_assert_eq!(rmax, *data.iter().max().unwrap());
        }

        #[test]
        fn test_binarization_invariants(src in prop::collection::vec(0..=255u8, 16), thresh in 0..=255u8) {
            let mut dst = vec![0u8; 16];
            threshold_row_simd(&src, &mut dst, thresh, false);
            for (i, &s) in src.iter().enumerate() {
                prop_assert_eq!(dst[i], if s > thresh { 255 } else { 0 });
            }

            threshold_row_simd(&src, &mut dst, thresh, true);
            for (i, &s) in src.iter().enumerate() {
                prop_assert_eq!(dst[i], if s <= thresh { 255 } else { 0 });
            }
        }

        #[test]
        fn test_otsu_separates_two_levels(lo in 0..100u8, hi in 150..=255u8, n_lo in 1..500u32, n_hi in 1..500u32) {
            let mut hist = [0u32; 256];
            hist[lo as usize] = n_lo;
            hist[hi as usize] = n_hi;
            let t = otsu_threshold(&hist);
            prop_assert!(t >= lo && t < hi);
        }
    }

    #[test]
    fn test_otsu_uniform_and_empty() {
        let mut hist = [0u32; 256];
        assert_eq!(otsu_threshold(&hist), 0);
        hist[77] = 1000;
        // A single level has no second class; the threshold is never above it.
        assert!(otsu_threshold(&hist) <= 77);
    }

    #[test]
    fn test_intensity_model_on_card() {
        let width = 32;
        let height = 16;
        let mut data = vec![40u8; width * height];
        for y in 4..12 {
            for x in 8..24 {
                data[y * width + x] = 230;
            }
        }
        let img = ImageView::gray(&data, width, height).unwrap();
        let model = IntensityModel::analyze(&img);
        assert_eq!((model.min, model.max), (40, 230));
        assert_eq!(model.contrast(), 190);
        assert!(model.threshold >= 40 && model.threshold < 230);

        let mask = binarize_to_vec(&img, model.threshold, Polarity::Bright);
        assert_eq!(mask.iter().filter(|&&v| v == 255).count(), 8 * 16);
        let dark = binarize_to_vec(&img, model.threshold, Polarity::Dark);
        assert_eq!(dark[0], 255);
        assert_eq!(dark[8 * width + 12], 0);
    }

    #[test]
    fn test_binarize_respects_stride() {
        let data = [10, 200, 99, 10, 200, 99];
        let img = ImageView::new(&data, 2, 2, 3, 1).unwrap();
        let mask = binarize_to_vec(&img, 100, Polarity::Bright);
        assert_eq!(mask, vec![0, 255, 0, 255]);
    }
}
