//! Binary morphology with square structuring elements.
//!
//! Masks are packed `width * height` buffers (non-zero = foreground). Filters are
//! separable: a horizontal pass per row followed by a vertical pass that folds
//! neighbouring rows together. Windows are clipped at the image border, so a
//! blob touching the border is not eroded by it.

use multiversion::multiversion;
use rayon::prelude::*;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Op {
    Dilate,
    Erode,
}

/// Dilate with a `(2r + 1) x (2r + 1)` square.
#[must_use]
pub fn dilate(mask: &[u8], width: usize, height: usize, radius: usize) -> Vec<u8> {
    square_filter(mask, width, height, radius, Op::Dilate)
}

/// Erode with a `(2r + 1) x (2r + 1)` square.
#[must_use]
pub fn erode(mask: &[u8], width: usize, height: usize, radius: usize) -> Vec<u8> {
    square_filter(mask, width, height, radius, Op::Erode)
}

/// Closing (dilate then erode): bridges gaps narrower than the element.
#[must_use]
pub fn close(mask: &[u8], width: usize, height: usize, radius: usize) -> Vec<u8> {
    let dilated = dilate(mask, width, height, radius);
    erode(&dilated, width, height, radius)
}

fn square_filter(mask: &[u8], width: usize, height: usize, radius: usize, op: Op) -> Vec<u8> {
    let normalized: Vec<u8> = mask[..width * height]
        .iter()
        .map(|&v| if v != 0 { 255 } else { 0 })
        .collect();
    if radius == 0 || width == 0 || height == 0 {
        return normalized;
    }

    let mut horizontal = vec![0u8; width * height];
    horizontal
        .par_chunks_mut(width)
        .zip(normalized.par_chunks(width))
        .for_each(|(dst, src)| {
            for (x, d) in dst.iter_mut().enumerate() {
                let lo = x.saturating_sub(radius);
                let hi = (x + radius).min(width - 1);
                let window = &src[lo..=hi];
                *d = match op {
                    Op::Dilate => window.iter().copied().max().unwrap_or(0),
                    Op::Erode => window.iter().copied().min().unwrap_or(0),
                };
            }
        });

    let mut out = vec![0u8; width * height];
    out.par_chunks_mut(width).enumerate().for_each(|(y, dst)| {
        let lo = y.saturating_sub(radius);
        let hi = (y + radius).min(height - 1);
        dst.copy_from_slice(&horizontal[lo * width..(lo + 1) * width]);
        for yy in lo + 1..=hi {
            let src = &horizontal[yy * width..(yy + 1) * width];
            match op {
                Op::Dilate => max_rows_simd(dst, src),
                Op::Erode => min_rows_simd(dst, src),
            }
        }
    });
    out
}

#[multiversion(targets(
    "x86_64+avx2+bmi1+bmi2+popcnt+lzcnt",
    "x86_64+avx512f+avx512bw+avx512dq+avx512vl",
    "aarch64+neon"
))]
fn max_rows_simd(dst: &mut [u8], src: &[u8]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = (*d).max(s);
    }
}

#[multiversion(targets(
    "x86_64+avx2+bmi1+bmi2+popcnt+lzcnt",
    "x86_64+avx512f+avx512bw+avx512dq+avx512vl",
    "aarch64+neon"
))]
fn min_rows_simd(dst: &mut [u8], src: &[u8]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = (*d).min(s);
    }
}
