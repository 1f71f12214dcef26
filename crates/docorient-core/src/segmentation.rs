//! Run-based connected components labeling with per-component moments.
//!
//! Foreground is any non-zero mask byte. Runs on adjacent rows that overlap
//! horizontally are joined (4-connectivity). Each component carries its bounding
//! box and raw first/second-order moments, accumulated in closed form per run.

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;

/// Disjoint sets over run indices, stored in a [`Bump`].
///
/// Uses path halving and union by size.
pub struct UnionFind<'a> {
    parent: &'a mut [u32],
    size: &'a mut [u32],
}

impl<'a> UnionFind<'a> {
    /// `len` singleton sets allocated in `arena`.
    pub fn new_in(arena: &'a Bump, len: usize) -> Self {
        Self {
            parent: arena.alloc_slice_fill_with(len, |i| i as u32),
            size: arena.alloc_slice_fill_copy(len, 1u32),
        }
    }

    /// Representative of the set holding `i`.
    #[inline]
    pub fn find(&mut self, mut i: u32) -> u32 {
        loop {
            let p = self.parent[i as usize];
            if p == i {
                return i;
            }
            let grand = self.parent[p as usize];
            self.parent[i as usize] = grand;
            i = grand;
        }
    }

    /// Merge the sets holding `a` and `b`.
    #[inline]
    pub fn union(&mut self, a: u32, b: u32) {
        let (mut big, mut small) = (self.find(a), self.find(b));
        if big == small {
            return;
        }
        if self.size[big as usize] < self.size[small as usize] {
            std::mem::swap(&mut big, &mut small);
        }
        self.parent[small as usize] = big;
        self.size[big as usize] += self.size[small as usize];
    }
}

/// Raw image moments of a pixel set (pixel centres at integer coordinates).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Moments {
    /// Number of pixels.
    pub m00: f64,
    /// Sum of x.
    pub m10: f64,
    /// Sum of y.
    pub m01: f64,
    /// Sum of x².
    pub m20: f64,
    /// Sum of y².
    pub m02: f64,
    /// Sum of x·y.
    pub m11: f64,
}

impl Moments {
    /// Add the horizontal run `x_start..=x_end` on row `y`.
    #[inline]
    pub fn add_run(&mut self, y: u32, x_start: u32, x_end: u32) {
        let n = f64::from(x_end - x_start + 1);
        let a = f64::from(x_start);
        let b = f64::from(x_end);
        let y = f64::from(y);
        let sum_x = (a + b) * n / 2.0;
        // Σx² over [a, b] = S(b) - S(a - 1), S(k) = k(k+1)(2k+1)/6
        let s = |k: f64| k * (k + 1.0) * (2.0 * k + 1.0) / 6.0;
        let sum_xx = s(b) - s(a - 1.0);

        self.m00 += n;
        self.m10 += sum_x;
        self.m01 += n * y;
        self.m20 += sum_xx;
        self.m02 += n * y * y;
        self.m11 += y * sum_x;
    }

    /// Centroid `(x, y)`, or `None` for an empty set.
    #[must_use]
    pub fn centroid(&self) -> Option<(f64, f64)> {
        (self.m00 > 0.0).then(|| (self.m10 / self.m00, self.m01 / self.m00))
    }

    /// Central second moments `(mu20, mu11, mu02)` normalised by area.
    #[must_use]
    pub fn covariance(&self) -> Option<(f64, f64, f64)> {
        let (cx, cy) = self.centroid()?;
        let sxx = (self.m20 / self.m00 - cx * cx).max(0.0);
        let syy = (self.m02 / self.m00 - cy * cy).max(0.0);
        let sxy = self.m11 / self.m00 - cx * cy;
        Some((sxx, sxy, syy))
    }
}

/// Bounding box and statistics for a connected component.
#[derive(Clone, Copy, Debug)]
pub struct ComponentStats {
    /// Minimum x coordinate.
    pub min_x: u32,
    /// Maximum x coordinate.
    pub max_x: u32,
    /// Minimum y coordinate.
    pub min_y: u32,
    /// Maximum y coordinate.
    pub max_y: u32,
    /// Total number of pixels in the component.
    pub pixel_count: u32,
    /// Raw moments of the component's pixels.
    pub moments: Moments,
}

impl Default for ComponentStats {
    fn default() -> Self {
        Self {
            min_x: u32::MAX,
            max_x: 0,
            min_y: u32::MAX,
            max_y: 0,
            pixel_count: 0,
            moments: Moments::default(),
        }
    }
}

impl ComponentStats {
    /// How many of the four image borders the bounding box touches.
    #[must_use]
    pub fn touched_borders(&self, width: usize, height: usize) -> u8 {
        u8::from(self.min_x == 0)
            + u8::from(self.min_y == 0)
            + u8::from(self.max_x as usize + 1 >= width)
            + u8::from(self.max_y as usize + 1 >= height)
    }
}

/// Result of connected component labeling.
pub struct LabelResult<'a> {
    /// Flat array of pixel labels (row-major), 0 for background.
    pub labels: &'a [u32],
    /// Statistics for each component (indexed by label - 1).
    pub component_stats: Vec<ComponentStats>,
}

impl LabelResult<'_> {
    /// Leftmost and rightmost pixel of `label` on each row it occupies.
    ///
    /// Returned as `(y, x_min, x_max)` in ascending row order.
    #[must_use]
    pub fn row_extents(&self, label: u32, width: usize) -> Vec<(u32, u32, u32)> {
        let Some(stats) = label
            .checked_sub(1)
            .and_then(|i| self.component_stats.get(i as usize))
        else {
            return Vec::new();
        };
        let mut extents = Vec::with_capacity((stats.max_y - stats.min_y + 1) as usize);
        for y in stats.min_y..=stats.max_y {
            let row = &self.labels[y as usize * width..(y as usize + 1) * width];
            let span = &row[stats.min_x as usize..=stats.max_x as usize];
            let first = span.iter().position(|&l| l == label);
            let last = span.iter().rposition(|&l| l == label);
            if let (Some(first), Some(last)) = (first, last) {
                extents.push((y, stats.min_x + first as u32, stats.min_x + last as u32));
            }
        }
        extents
    }
}

/// Inclusive horizontal span of foreground on one row.
#[derive(Clone, Copy, Debug)]
struct Run {
    y: u32,
    x0: u32,
    x1: u32,
}

impl Run {
    fn overlaps(&self, other: &Run) -> bool {
        self.x0 <= other.x1 && other.x0 <= self.x1
    }
}

/// Foreground spans of one mask row, left to right.
fn row_runs(row: &[u8], y: u32) -> impl Iterator<Item = Run> + '_ {
    let mut x = 0;
    std::iter::from_fn(move || {
        x += row.get(x..)?.iter().position(|&v| v != 0)?;
        let len = row[x..].iter().position(|&v| v == 0).unwrap_or(row.len() - x);
        let run = Run {
            y,
            x0: x as u32,
            x1: (x + len - 1) as u32,
        };
        x += len;
        Some(run)
    })
}

/// Label 4-connected components and gather bounding box and moments for each.
///
/// Labels are assigned in raster order of each component's first run.
pub fn label_components_with_stats<'a>(
    arena: &'a Bump,
    binary: &[u8],
    width: usize,
    height: usize,
) -> LabelResult<'a> {
    let labels = arena.alloc_slice_fill_copy(width * height, 0u32);
    let mut runs = BumpVec::new_in(arena);
    // Index of the first run of every row, plus a sentinel.
    let mut row_start = BumpVec::with_capacity_in(height + 1, arena);
    for (y, row) in binary.chunks_exact(width).take(height).enumerate() {
        row_start.push(runs.len());
        runs.extend(row_runs(row, y as u32));
    }
    row_start.push(runs.len());

    if runs.is_empty() {
        return LabelResult {
            labels,
            component_stats: Vec::new(),
        };
    }

    let mut sets = UnionFind::new_in(arena, runs.len());
    for y in 1..height {
        let above = row_start[y - 1]..row_start[y];
        let here = row_start[y]..row_start[y + 1];
        // Both rows are sorted by x, so a single forward cursor suffices.
        let mut cursor = above.start;
        for c in here {
            while cursor < above.end && runs[cursor].x1 < runs[c].x0 {
                cursor += 1;
            }
            let mut p = cursor;
            while p < above.end && runs[p].overlaps(&runs[c]) {
                sets.union(c as u32, p as u32);
                p += 1;
            }
        }
    }

    let mut label_of_root = vec![0u32; runs.len()];
    let mut component_stats: Vec<ComponentStats> = Vec::new();
    for (i, run) in runs.iter().enumerate() {
        let root = sets.find(i as u32) as usize;
        if label_of_root[root] == 0 {
            component_stats.push(ComponentStats::default());
            label_of_root[root] = component_stats.len() as u32;
        }
        let label = label_of_root[root];
        let stats = &mut component_stats[label as usize - 1];
        stats.min_x = stats.min_x.min(run.x0);
        stats.max_x = stats.max_x.max(run.x1);
        stats.min_y = stats.min_y.min(run.y);
        stats.max_y = stats.max_y.max(run.y);
        stats.pixel_count += run.x1 - run.x0 + 1;
        stats.moments.add_run(run.y, run.x0, run.x1);

        let offset = run.y as usize * width;
        labels[offset + run.x0 as usize..=offset + run.x1 as usize].fill(label);
    }

    LabelResult {
        labels,
        component_stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use proptest::prelude::*;

    #[test]
    fn test_union_find() {
        let arena = Bump::new();
        let mut uf = UnionFind::new_in(&arena, 10);

        uf.union(1, 2);
        uf.union(2, 3);
        uf.union(5, 6);

        assert_eq!(uf.find(1), uf.find(3));
        assert_ne!(uf.find(1), uf.find(5));

        uf.union(3, 5);
        assert_eq!(uf.find(1), uf.find(6));
    }

    #[test]
    fn test_label_components_simple() {
        let arena = Bump::new();
        // Two separate 2x2 squares of foreground
        let binary = [
            255, 255, 0, 0, //
            255, 255, 0, 0, //
            0, 0, 255, 255, //
            0, 0, 255, 255,
        ];
        let result = label_components_with_stats(&arena, &binary, 4, 4);

        assert_eq!(result.component_stats.len(), 2);
        let s1 = result.component_stats[0];
        assert_eq!(s1.pixel_count, 4);
        assert_eq!((s1.min_x, s1.max_x, s1.min_y, s1.max_y), (0, 1, 0, 1));
        assert_eq!(s1.moments.centroid(), Some((0.5, 0.5)));

        let s2 = result.component_stats[1];
        assert_eq!((s2.min_x, s2.max_x, s2.min_y, s2.max_y), (2, 3, 2, 3));
        assert_eq!(s2.touched_borders(4, 4), 2);
        assert_eq!(result.labels[15], 2);
    }

    #[test]
    fn test_u_shape_merges() {
        let arena = Bump::new();
        let binary = [
            1, 0, 1, //
            1, 0, 1, //
            1, 1, 1,
        ];
        let result = label_components_with_stats(&arena, &binary, 3, 3);
        assert_eq!(result.component_stats.len(), 1);
        assert_eq!(result.component_stats[0].pixel_count, 7);
        assert_eq!(result.row_extents(1, 3), vec![(0, 0, 2), (1, 0, 2), (2, 0, 2)]);
        assert!(result.row_extents(2, 3).is_empty());
    }

    #[test]
    fn test_moments_of_horizontal_bar() {
        let arena = Bump::new();
        let width = 20;
        let height = 6;
        let mut binary = vec![0u8; width * height];
        for y in 2..4 {
            for x in 2..18 {
                binary[y * width + x] = 255;
            }
        }
        let result = label_components_with_stats(&arena, &binary, width, height);
        let m = result.component_stats[0].moments;
        let (cx, cy) = m.centroid().unwrap();
        assert!((cx - 9.5).abs() < 1e-9);
        assert!((cy - 2.5).abs() < 1e-9);
        let (sxx, sxy, syy) = m.covariance().unwrap();
        // Discrete uniform variance (n² - 1) / 12
        assert!((sxx - (16.0 * 16.0 - 1.0) / 12.0).abs() < 1e-9);
        assert!((syy - 0.25).abs() < 1e-9);
        assert!(sxy.abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_union_find_reflexivity(size in 1..1000usize) {
            let arena = Bump::new();
            let mut uf = UnionFind::new_in(&arena, size);
            for i in 0..size as u32 {
                prop_assert_eq!(uf.find(i), i);
            }
        }

        #[test]
        fn prop_label_components_consistent(
            width in 1..48usize,
            height in 1..48usize,
            data in prop::collection::vec(0..=1u8, 48 * 48)
        ) {
            let arena = Bump::new();
            let slice = &data[..width * height];
            let result = label_components_with_stats(&arena, slice, width, height);

            let mut total = 0u32;
            for stat in &result.component_stats {
                prop_assert!(stat.pixel_count > 0);
                prop_assert!((stat.max_x as usize) < width);
                prop_assert!((stat.max_y as usize) < height);
                prop_assert!(stat.min_x <= stat.max_x);
                prop_assert!(stat.min_y <= stat.max_y);
                prop_assert_eq!(stat.moments.m00, f64::from(stat.pixel_count));
                total += stat.pixel_count;
            }
            let foreground = slice.iter().filter(|&&b| b != 0).count() as u32;
            prop_assert_eq!(total, foreground);
            for (i, &b) in slice.iter().enumerate() {
                prop_assert_eq!(b != 0, result.labels[i] != 0);
            }
        }
    }
}
