//! Planar geometry: convex hulls, minimum-area rectangles and principal axes.
//!
//! Coordinates follow the image convention (x right, y down). Angles are in
//! radians, measured from the +x axis towards +y.

use nalgebra::{Matrix2, SymmetricEigen};
use std::f64::consts::PI;

/// A point in image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Fold an angle into `[0, π)`, the range of undirected lines.
#[must_use]
pub fn normalize_half_turn(angle: f64) -> f64 {
    let a = angle.rem_euclid(PI);
    if a >= PI { 0.0 } else { a }
}

#[inline]
fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Convex hull by Andrew's monotone chain.
///
/// Collinear points are dropped. Fewer than three distinct points are returned as-is.
#[must_use]
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Point> = Vec::with_capacity(pts.len() * 2);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// A rotated rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MinAreaRect {
    /// Centre x.
    pub center_x: f64,
    /// Centre y.
    pub center_y: f64,
    /// Side length along `angle`.
    pub width: f64,
    /// Side length perpendicular to `angle`.
    pub height: f64,
    /// Direction of the `width` side in `[0, π)`.
    pub angle: f64,
}

impl MinAreaRect {
    /// Length of the longer side.
    #[must_use]
    pub fn long_side(&self) -> f64 {
        self.width.max(self.height)
    }

    /// Length of the shorter side.
    #[must_use]
    pub fn short_side(&self) -> f64 {
        self.width.min(self.height)
    }

    /// `long / short`, or infinity for a degenerate rectangle.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        let short = self.short_side();
        if short <= f64::EPSILON {
            f64::INFINITY
        } else {
            self.long_side() / short
        }
    }

    /// Direction of the long side in `[0, π)`.
    #[must_use]
    pub fn long_axis_angle(&self) -> f64 {
        if self.width >= self.height {
            self.angle
        } else {
            normalize_half_turn(self.angle + PI / 2.0)
        }
    }

    /// Coordinates of `(x, y)` along the long and short axes, relative to the centre.
    #[must_use]
    pub fn local_coordinates(&self, x: f64, y: f64) -> (f64, f64) {
        let (uy, ux) = self.long_axis_angle().sin_cos();
        let dx = x - self.center_x;
        let dy = y - self.center_y;
        (dx * ux + dy * uy, -dx * uy + dy * ux)
    }
}

/// Minimum-area enclosing rectangle of a point set.
///
/// Evaluates one candidate per hull edge (rotating calipers). Returns `None`
/// for an empty input; degenerate hulls fall back to the axis-aligned box.
#[must_use]
pub fn min_area_rect(points: &[Point]) -> Option<MinAreaRect> {
    let hull = convex_hull(points);
    if hull.is_empty() {
        return None;
    }
    if hull.len() < 3 {
        return Some(axis_aligned_rect(&hull));
    }

    let mut best: Option<(f64, MinAreaRect)> = None;
    let n = hull.len();
    for i in 0..n {
        let a = hull[i];
        let b = hull[(i + 1) % n];
        let (ex, ey) = (b.x - a.x, b.y - a.y);
        let len = ex.hypot(ey);
        if len < f64::EPSILON {
            continue;
        }
        let (ux, uy) = (ex / len, ey / len);
        let (vx, vy) = (-uy, ux);

        let mut min_u = f64::INFINITY;
        let mut max_u = f64::NEG_INFINITY;
        let mut min_v = f64::INFINITY;
        let mut max_v = f64::NEG_INFINITY;
        for p in &hull {
            let pu = (p.x - a.x) * ux + (p.y - a.y) * uy;
            let pv = (p.x - a.x) * vx + (p.y - a.y) * vy;
            min_u = min_u.min(pu);
            max_u = max_u.max(pu);
            min_v = min_v.min(pv);
            max_v = max_v.max(pv);
        }

        let area = (max_u - min_u) * (max_v - min_v);
        if best.as_ref().map_or(true, |(best_area, _)| area < *best_area) {
            let cu = (min_u + max_u) / 2.0;
            let cv = (min_v + max_v) / 2.0;
            best = Some((
                area,
                MinAreaRect {
                    center_x: a.x + cu * ux + cv * vx,
                    center_y: a.y + cu * uy + cv * vy,
                    width: max_u - min_u,
                    height: max_v - min_v,
                    angle: normalize_half_turn(uy.atan2(ux)),
                },
            ));
        }
    }
    Some(best.map_or_else(|| axis_aligned_rect(&hull), |(_, rect)| rect))
}

fn axis_aligned_rect(points: &[Point]) -> MinAreaRect {
    let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    MinAreaRect {
        center_x: (min_x + max_x) / 2.0,
        center_y: (min_y + max_y) / 2.0,
        width: max_x - min_x,
        height: max_y - min_y,
        angle: 0.0,
    }
}

/// Principal axes of a 2x2 covariance matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrincipalAxes {
    /// Direction of the major axis in `[0, π)`.
    pub angle: f64,
    /// Larger eigenvalue (variance along the major axis).
    pub major: f64,
    /// Smaller eigenvalue.
    pub minor: f64,
}

impl PrincipalAxes {
    /// `sqrt(major / minor)`; infinite for a one-pixel-thick set.
    #[must_use]
    pub fn elongation(&self) -> f64 {
        if self.major <= f64::EPSILON {
            1.0
        } else if self.minor <= f64::EPSILON {
            f64::INFINITY
        } else {
            (self.major / self.minor).sqrt()
        }
    }
}

/// Eigen-decompose the covariance `[[sxx, sxy], [sxy, syy]]`.
#[must_use]
pub fn principal_axes(sxx: f64, sxy: f64, syy: f64) -> PrincipalAxes {
    let eig = SymmetricEigen::new(Matrix2::new(sxx, sxy, sxy, syy));
    let (major_idx, minor_idx) = if eig.eigenvalues[0] >= eig.eigenvalues[1] {
        (0, 1)
    } else {
        (1, 0)
    };
    let v = eig.eigenvectors.column(major_idx);
    PrincipalAxes {
        angle: normalize_half_turn(v[1].atan2(v[0])),
        major: eig.eigenvalues[major_idx].max(0.0),
        minor: eig.eigenvalues[minor_idx].max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rect_corners(cx: f64, cy: f64, w: f64, h: f64, angle: f64) -> Vec<Point> {
        let (s, c) = angle.sin_cos();
        [(-w, -h), (w, -h), (w, h), (-w, h)]
            .iter()
            .map(|&(dx, dy)| {
                let (dx, dy) = (dx / 2.0, dy / 2.0);
                Point::new(cx + dx * c - dy * s, cy + dx * s + dy * c)
            })
            .collect()
    }

    #[test]
    fn test_hull_drops_interior_points() {
        let mut pts = rect_corners(0.0, 0.0, 10.0, 4.0, 0.0);
        pts.push(Point::new(0.0, 0.0));
        pts.push(Point::new(1.0, 1.0));
        pts.push(Point::new(5.0, 0.0)); // on an edge
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
    }

    #[test]
    fn test_min_area_rect_axis_aligned() {
        let pts = rect_corners(50.0, 20.0, 100.0, 60.0, 0.0);
        let rect = min_area_rect(&pts).unwrap();
        assert!((rect.long_side() - 100.0).abs() < 1e-9);
        assert!((rect.short_side() - 60.0).abs() < 1e-9);
        assert!((rect.center_x - 50.0).abs() < 1e-9);
        assert!((rect.center_y - 20.0).abs() < 1e-9);
        let a = rect.long_axis_angle();
        assert!(a.abs() < 1e-9 || (a - PI).abs() < 1e-9);
    }

    #[test]
    fn test_min_area_rect_degenerate() {
        assert!(min_area_rect(&[]).is_none());
        let line = [Point::new(0.0, 0.0), Point::new(4.0, 0.0)];
        let rect = min_area_rect(&line).unwrap();
        assert_eq!(rect.short_side(), 0.0);
        assert!(rect.aspect_ratio().is_infinite());
    }

    #[test]
    fn test_local_coordinates() {
        let rect = MinAreaRect {
            center_x: 10.0,
            center_y: 10.0,
            width: 4.0,
            height: 20.0,
            angle: 0.0,
        };
        // Long axis points down (+y); the short axis then points to -x.
        let (u, v) = rect.local_coordinates(10.0, 15.0);
        assert!((u - 5.0).abs() < 1e-9);
        assert!(v.abs() < 1e-9);
        let (u, v) = rect.local_coordinates(12.0, 10.0);
        assert!(u.abs() < 1e-9);
        assert!((v + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_principal_axes_of_diagonal_spread() {
        // Points spread along y = x
        let axes = principal_axes(1.0, 0.9, 1.0);
        assert!((axes.angle - PI / 4.0).abs() < 1e-9);
        assert!((axes.major - 1.9).abs() < 1e-9);
        assert!((axes.minor - 0.1).abs() < 1e-9);
        assert!((axes.elongation() - 19.0f64.sqrt()).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_min_area_rect_recovers_rotated_box(
            w in 20.0..200.0f64,
            h in 20.0..200.0f64,
            angle in 0.0..PI,
        ) {
            let pts = rect_corners(300.0, 300.0, w, h, angle);
            let rect = min_area_rect(&pts).unwrap();
            prop_assert!((rect.long_side() * rect.short_side() - w * h).abs() < 1e-6 * w * h);
            prop_assert!((rect.long_side() - w.max(h)).abs() < 1e-6);
            prop_assert!((rect.center_x - 300.0).abs() < 1e-6);
        }

        #[test]
        fn prop_normalize_half_turn_range(angle in -20.0..20.0f64) {
            let a = normalize_half_turn(angle);
            prop_assert!((0.0..PI).contains(&a));
        }
    }
}
