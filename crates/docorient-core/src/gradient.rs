//! Sobel gradients and line-support-region segment extraction.

#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use crate::geometry::{normalize_half_turn, principal_axes};
use crate::image::ImageView;
use crate::segmentation::Moments;
use rayon::prelude::*;
use std::collections::VecDeque;
use std::f64::consts::PI;

/// Segments must be at least this many times longer than thick.
const MIN_SEGMENT_ASPECT: f64 = 2.5;

/// Gradient data for a single pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Gradient {
    /// Gradient in x-direction.
    pub gx: i16,
    /// Gradient in y-direction.
    pub gy: i16,
    /// `|gx| + |gy|`.
    pub mag: u16,
}

impl Gradient {
    /// Direction of the gradient vector in radians.
    #[inline]
    #[must_use]
    pub fn direction(&self) -> f64 {
        f64::from(self.gy).atan2(f64::from(self.gx))
    }
}

/// Compute Sobel gradients for a grayscale image.
///
/// Border pixels get a zero gradient. Rows are processed in parallel.
#[must_use]
pub fn compute_sobel(img: &ImageView) -> Vec<Gradient> {
    let w = img.width;
    let h = img.height;
    let mut grads = vec![Gradient::default(); w * h];
    if w < 3 || h < 3 {
        return grads;
    }

    // Gx: [-1 0 1; -2 0 2; -1 0 1]
    // Gy: [-1 -2 -1; 0 0 0; 1 2 1]
    grads
        .par_chunks_mut(w)
        .enumerate()
        .skip(1)
        .take(h - 2)
        .for_each(|(y, out)| {
            let above = img.get_row(y - 1);
            let row = img.get_row(y);
            let below = img.get_row(y + 1);
            for x in 1..w - 1 {
                let p = |r: &[u8], i: usize| i16::from(r[i]);
                let gx = -p(above, x - 1) + p(above, x + 1) - 2 * p(row, x - 1)
                    + 2 * p(row, x + 1)
                    - p(below, x - 1)
                    + p(below, x + 1);
                let gy = -p(above, x - 1) - 2 * p(above, x) - p(above, x + 1)
                    + p(below, x - 1)
                    + 2 * p(below, x)
                    + p(below, x + 1);
                out[x] = Gradient {
                    gx,
                    gy,
                    mag: gx.unsigned_abs() + gy.unsigned_abs(),
                };
            }
        });

    grads
}

/// A straight segment fitted to a line-support region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSegment {
    /// Start x coordinate.
    pub x0: f64,
    /// Start y coordinate.
    pub y0: f64,
    /// End x coordinate.
    pub x1: f64,
    /// End y coordinate.
    pub y1: f64,
    /// Direction of the segment in `[0, π)`.
    pub angle: f64,
    /// Extent along the segment direction.
    pub length: f64,
    /// Extent across the segment direction.
    pub thickness: f64,
}

impl LineSegment {
    /// Midpoint `(x, y)`.
    #[must_use]
    pub fn midpoint(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Whether the segment is closer to horizontal than to vertical.
    #[must_use]
    pub fn is_horizontal(&self) -> bool {
        self.angle <= PI / 4.0 || self.angle > 3.0 * PI / 4.0
    }
}

/// Angular distance between two gradient directions, modulo π.
#[inline]
fn undirected_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(PI);
    d.min(PI - d)
}

/// Grow line-support regions and fit a segment to each.
///
/// A region is the 8-connected set of pixels reachable from a seed whose
/// magnitude is at least `mag_thresh` and whose gradient direction is within
/// `tolerance` radians of the seed's (opposite gradients count as equal, so
/// both flanks of a thin stroke join one region). Regions shorter than
/// `min_length` or less than 2.5 times longer than thick are discarded.
#[must_use]
pub fn extract_line_segments(
    grads: &[Gradient],
    width: usize,
    height: usize,
    mag_thresh: u16,
    tolerance: f64,
    min_length: f64,
) -> Vec<LineSegment> {
    let mut used = vec![false; width * height];
    let mut segments = Vec::new();
    let mut queue = VecDeque::new();
    let mut region: Vec<(usize, usize)> = Vec::new();

    for seed_idx in 0..width * height {
        if used[seed_idx] || grads[seed_idx].mag < mag_thresh {
            continue;
        }
        let seed_angle = grads[seed_idx].direction();
        used[seed_idx] = true;
        queue.push_back((seed_idx % width, seed_idx / width));
        region.clear();

        while let Some((x, y)) = queue.pop_front() {
            region.push((x, y));
            for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                    let nidx = ny * width + nx;
                    if used[nidx] || grads[nidx].mag < mag_thresh {
                        continue;
                    }
                    if undirected_difference(grads[nidx].direction(), seed_angle) <= tolerance {
                        used[nidx] = true;
                        queue.push_back((nx, ny));
                    }
                }
            }
        }

        if let Some(segment) = fit_segment(&region) {
            if segment.length >= min_length && segment.length >= MIN_SEGMENT_ASPECT * segment.thickness
            {
                segments.push(segment);
            }
        }
    }

    segments
}

/// Principal-axis fit of a pixel set.
fn fit_segment(points: &[(usize, usize)]) -> Option<LineSegment> {
    let mut moments = Moments::default();
    for &(x, y) in points {
        moments.add_run(y as u32, x as u32, x as u32);
    }
    let (cx, cy) = moments.centroid()?;
    let (sxx, sxy, syy) = moments.covariance()?;
    let axes = principal_axes(sxx, sxy, syy);
    let (uy, ux) = axes.angle.sin_cos();

    let mut min_u = f64::INFINITY;
    let mut max_u = f64::NEG_INFINITY;
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;
    for &(x, y) in points {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        let u = dx * ux + dy * uy;
        let v = -dx * uy + dy * ux;
        min_u = min_u.min(u);
        max_u = max_u.max(u);
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }

    Some(LineSegment {
        x0: cx + min_u * ux,
        y0: cy + min_u * uy,
        x1: cx + max_u * ux,
        y1: cy + max_u * uy,
        angle: normalize_half_turn(axes.angle),
        length: max_u - min_u + 1.0,
        thickness: max_v - min_v + 1.0,
    })
}
