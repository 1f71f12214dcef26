//! Synthetic inputs for tests and benchmarks.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

pub mod scene;

pub use scene::DocumentScene;

use crate::image::Image;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// A uniform grayscale image.
#[must_use]
pub fn blank(width: usize, height: usize, gray: u8) -> Image {
    Image::from_parts(vec![gray; width * height], width, height, 1)
}

/// A white page with `lines` left-aligned horizontal dark bars of ragged length.
///
/// No bar touches the image border.
#[must_use]
pub fn text_page(width: usize, height: usize, lines: usize) -> Image {
    let mut data = vec![255u8; width * height];
    let margin_x = width / 10;
    let thickness = (height / 40).max(2);
    let spacing = thickness * 3;
    let usable = width - 2 * margin_x;
    let lengths = [1.0, 0.7, 0.85, 0.55, 0.9, 0.6];

    for i in 0..lines {
        let top = height / 10 + i * spacing;
        if top + thickness >= height - 1 {
            break;
        }
        let len = (usable as f64 * lengths[i % lengths.len()]) as usize;
        for y in top..top + thickness {
            data[y * width + margin_x..y * width + margin_x + len].fill(20);
        }
    }
    Image::from_parts(data, width, height, 1)
}

/// Add zero-mean Gaussian noise, reproducible for a given `seed`.
pub fn add_gaussian_noise(data: &mut [u8], sigma: f64, seed: u64) {
    let Ok(normal) = Normal::new(0.0, sigma) else {
        return;
    };
    let mut rng = StdRng::seed_from_u64(seed);
    for pixel in data {
        let noisy = f64::from(*pixel) + normal.sample(&mut rng);
        *pixel = noisy.round().clamp(0.0, 255.0) as u8;
    }
}

/// Interleaved RGB copy of a grayscale image with a slight colour cast.
#[must_use]
pub fn to_rgb(gray: &Image) -> Image {
    let mut data = Vec::with_capacity(gray.data().len() * 3);
    for &g in gray.data() {
        data.extend_from_slice(&[g, g.saturating_sub(8), g.saturating_add(6)]);
    }
    Image::from_parts(data, gray.width(), gray.height(), 3)
}

/// Copy an image into a buffer whose rows are padded by `padding` bytes.
///
/// Returns the buffer and its stride.
#[must_use]
pub fn with_row_padding(img: &Image, padding: usize) -> (Vec<u8>, usize) {
    let row_len = img.width() * img.channels();
    let stride = row_len + padding;
    let mut data = vec![0xAB; stride * img.height()];
    for (dst, src) in data.chunks_exact_mut(stride).zip(img.data().chunks_exact(row_len)) {
        dst[..row_len].copy_from_slice(src);
    }
    (data, stride)
}
