//! Canonical quarter-turn rotations and the lossless rotation corrector.
//!
//! All rotations are **clockwise**: applying [`Rotation::Deg90`] moves the left
//! edge of the input to the top of the output. A detected angle describes the
//! clockwise turn the upright document went through, so the correction is its
//! [`Rotation::inverse`].

use crate::image::{Image, ImageView};
use rayon::prelude::*;
use std::fmt;

/// One of the four canonical rotations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rotation {
    /// No rotation.
    #[default]
    Deg0,
    /// A quarter turn clockwise.
    Deg90,
    /// A half turn.
    Deg180,
    /// Three quarter turns clockwise (one counter-clockwise).
    Deg270,
}

impl Rotation {
    /// All rotations in canonical (ascending) order.
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Number of clockwise quarter turns (0..4).
    #[must_use]
    pub const fn quarter_turns(self) -> u8 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    /// Angle in degrees.
    #[must_use]
    pub const fn degrees(self) -> u16 {
        self.quarter_turns() as u16 * 90
    }

    /// Position in [`Rotation::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self.quarter_turns() as usize
    }

    /// Rotation for any number of clockwise quarter turns, negative included.
    #[must_use]
    pub const fn from_quarter_turns(turns: i64) -> Self {
        match turns.rem_euclid(4) {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    /// Parse a multiple of 90 degrees, normalised modulo 360.
    ///
    /// Returns `None` for angles that are not quarter turns.
    #[must_use]
    pub const fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(Self::from_quarter_turns(degrees as i64 / 90))
    }

    /// `self` followed by `other`.
    #[must_use]
    pub const fn compose(self, other: Rotation) -> Self {
        Self::from_quarter_turns(self.quarter_turns() as i64 + other.quarter_turns() as i64)
    }

    /// The rotation that undoes `self`.
    #[must_use]
    pub const fn inverse(self) -> Self {
        Self::from_quarter_turns(-(self.quarter_turns() as i64))
    }

    /// The rotation 180 degrees away.
    #[must_use]
    pub const fn complement(self) -> Self {
        self.compose(Rotation::Deg180)
    }

    /// Whether width and height trade places.
    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        self.quarter_turns() % 2 == 1
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Dimensions of `width x height` after rotating.
#[must_use]
pub fn output_dimensions(width: usize, height: usize, rotation: Rotation) -> (usize, usize) {
    if rotation.swaps_axes() {
        (height, width)
    } else {
        (width, height)
    }
}

/// Source pixel for output pixel `(x, y)` in an `out_w x out_h` result.
#[inline]
fn source_coordinates(
    x: usize,
    y: usize,
    out_w: usize,
    out_h: usize,
    rotation: Rotation,
) -> (usize, usize) {
    match rotation {
        Rotation::Deg0 => (x, y),
        Rotation::Deg90 => (y, out_w - 1 - x),
        Rotation::Deg180 => (out_w - 1 - x, out_h - 1 - y),
        Rotation::Deg270 => (out_h - 1 - y, x),
    }
}

/// Rotate an image clockwise by a quarter-turn multiple.
///
/// The transform permutes pixels without resampling and keeps every channel.
/// [`Rotation::Deg0`] yields a packed copy.
#[must_use]
pub fn apply_rotation(img: &ImageView, rotation: Rotation) -> Image {
    let c = img.channels;
    let (out_w, out_h) = output_dimensions(img.width, img.height, rotation);
    let mut data = vec![0u8; out_w * out_h * c];

    data.par_chunks_mut(out_w * c)
        .enumerate()
        .for_each(|(y, row)| {
            if rotation == Rotation::Deg0 {
                row.copy_from_slice(img.get_row(y));
                return;
            }
            for (x, dst) in row.chunks_exact_mut(c).enumerate() {
                let (sx, sy) = source_coordinates(x, y, out_w, out_h, rotation);
                dst.copy_from_slice(img.pixel(sx, sy));
            }
        });

    Image::from_parts(data, out_w, out_h, c)
}
