//! Stride-aware image views and owned pixel buffers.
//!
//! [`ImageView`] borrows caller memory (including padded NumPy rows) and is the
//! single place where malformed input is rejected. [`Image`] owns a tightly
//! packed buffer and is what the rotation corrector and preprocessing produce.

use thiserror::Error;

/// Precondition failures for image buffers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// Width or height is zero.
    #[error("image has zero area ({width}x{height})")]
    Empty {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },
    /// Only grayscale and interleaved RGB are supported.
    #[error("unsupported channel count {0}, expected 1 or 3")]
    UnsupportedChannels(usize),
    /// Row stride shorter than one row of pixels.
    #[error("stride ({stride}) cannot be less than row length ({row_len})")]
    StrideTooSmall {
        /// Requested stride in bytes.
        stride: usize,
        /// Bytes needed for one row.
        row_len: usize,
    },
    /// The buffer cannot hold the described image.
    #[error(
        "buffer size ({len}) is too small for {width}x{height}x{channels} image with stride {stride} (required: {required})"
    )]
    BufferTooSmall {
        /// Actual buffer length.
        len: usize,
        /// Image width.
        width: usize,
        /// Image height.
        height: usize,
        /// Channel count.
        channels: usize,
        /// Row stride.
        stride: usize,
        /// Minimum buffer length.
        required: usize,
    },
    /// The described layout does not fit in the address space.
    #[error("{width}x{height}x{channels} image overflows the addressable size")]
    TooLarge {
        /// Image width.
        width: usize,
        /// Image height.
        height: usize,
        /// Channel count.
        channels: usize,
    },
    /// An owned buffer whose length does not match its dimensions.
    #[error("buffer length {len} does not match {width}x{height}x{channels}")]
    LengthMismatch {
        /// Actual buffer length.
        len: usize,
        /// Image width.
        width: usize,
        /// Image height.
        height: usize,
        /// Channel count.
        channels: usize,
    },
}

/// Validates the shape and returns the packed row length in bytes.
fn check_layout(width: usize, height: usize, channels: usize) -> Result<usize, ImageError> {
    if channels != 1 && channels != 3 {
        return Err(ImageError::UnsupportedChannels(channels));
    }
    if width == 0 || height == 0 {
        return Err(ImageError::Empty { width, height });
    }
    width.checked_mul(channels).ok_or(ImageError::TooLarge {
        width,
        height,
        channels,
    })
}

/// A view into an image buffer with explicit stride support.
///
/// Pixels are interleaved: a 3-channel view stores `R, G, B` per pixel.
#[derive(Clone, Copy, Debug)]
pub struct ImageView<'a> {
    /// Raw bytes, at least `(height - 1) * stride + width * channels` long.
    pub data: &'a [u8],
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Distance between row starts in bytes.
    pub stride: usize,
    /// 1 (grayscale) or 3 (RGB).
    pub channels: usize,
}

impl<'a> ImageView<'a> {
    /// Create a new view after validating dimensions, channel count and buffer size.
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        stride: usize,
        channels: usize,
    ) -> Result<Self, ImageError> {
        let row_len = check_layout(width, height, channels)?;
        if stride < row_len {
            return Err(ImageError::StrideTooSmall { stride, row_len });
        }
        let required = (height - 1)
            .checked_mul(stride)
            .and_then(|n| n.checked_add(row_len))
            .ok_or(ImageError::TooLarge {
                width,
                height,
                channels,
            })?;
        if data.len() < required {
            return Err(ImageError::BufferTooSmall {
                len: data.len(),
                width,
                height,
                channels,
                stride,
                required,
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            channels,
        })
    }

    /// View over a tightly packed buffer (stride equals the row length).
    pub fn packed(
        data: &'a [u8],
        width: usize,
        height: usize,
        channels: usize,
    ) -> Result<Self, ImageError> {
        let stride = check_layout(width, height, channels)?;
        Self::new(data, width, height, stride, channels)
    }

    /// View over a tightly packed grayscale buffer.
    pub fn gray(data: &'a [u8], width: usize, height: usize) -> Result<Self, ImageError> {
        Self::packed(data, width, height, 1)
    }

    /// Bytes in one row, excluding stride padding.
    #[inline]
    #[must_use]
    pub fn row_len(&self) -> usize {
        self.width * self.channels
    }

    /// Safe accessor for a specific row (all channels, no padding).
    #[inline(always)]
    pub fn get_row(&self, y: usize) -> &'a [u8] {
        assert!(y < self.height, "Row index {y} out of bounds");
        let start = y * self.stride;
        &self.data[start..start + self.row_len()]
    }

    /// Intensity of a single-channel pixel.
    ///
    /// For RGB views this returns the red sample; convert with [`Self::to_luma`] first.
    #[inline(always)]
    pub fn get_pixel(&self, x: usize, y: usize) -> u8 {
        assert!(x < self.width, "Column index {x} out of bounds");
        self.get_row(y)[x * self.channels]
    }

    /// All channel samples of one pixel.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &'a [u8] {
        assert!(x < self.width, "Column index {x} out of bounds");
        let c = self.channels;
        &self.get_row(y)[x * c..(x + 1) * c]
    }

    /// Packed copy of the view.
    #[must_use]
    pub fn to_image(&self) -> Image {
        let mut data = Vec::with_capacity(self.row_len() * self.height);
        for y in 0..self.height {
            data.extend_from_slice(self.get_row(y));
        }
        Image {
            data,
            width: self.width,
            height: self.height,
            channels: self.channels,
        }
    }

    /// Packed grayscale copy using integer BT.601 luma weights.
    #[must_use]
    pub fn to_luma(&self) -> Image {
        if self.channels == 1 {
            return self.to_image();
        }
        let mut data = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            for px in self.get_row(y).chunks_exact(3) {
                let luma = 77 * u32::from(px[0]) + 150 * u32::from(px[1]) + 29 * u32::from(px[2]);
                data.push(((luma + 128) >> 8) as u8);
            }
        }
        Image {
            data,
            width: self.width,
            height: self.height,
            channels: 1,
        }
    }

    /// Nearest-neighbour decimation keeping every `factor`-th pixel.
    ///
    /// A factor of 0 or 1 returns a packed copy.
    #[must_use]
    pub fn decimate(&self, factor: usize) -> Image {
        if factor <= 1 {
            return self.to_image();
        }
        let new_w = (self.width / factor).max(1);
        let new_h = (self.height / factor).max(1);
        let c = self.channels;
        let mut data = Vec::with_capacity(new_w * new_h * c);
        for y in 0..new_h {
            let src = self.get_row(y * factor);
            for x in 0..new_w {
                let sx = x * factor * c;
                data.extend_from_slice(&src[sx..sx + c]);
            }
        }
        Image {
            data,
            width: new_w,
            height: new_h,
            channels: c,
        }
    }
}

/// An owned, tightly packed image buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
}

impl Image {
    /// Wrap an existing packed buffer.
    pub fn from_vec(
        data: Vec<u8>,
        width: usize,
        height: usize,
        channels: usize,
    ) -> Result<Self, ImageError> {
        let expected = check_layout(width, height, channels)?
            .checked_mul(height)
            .ok_or(ImageError::TooLarge {
                width,
                height,
                channels,
            })?;
        if data.len() != expected {
            return Err(ImageError::LengthMismatch {
                len: data.len(),
                width,
                height,
                channels,
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Assemble from parts already known to be consistent.
    pub(crate) fn from_parts(data: Vec<u8>, width: usize, height: usize, channels: usize) -> Self {
        debug_assert_eq!(data.len(), width * height * channels);
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Channel count.
    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Packed pixel bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the image, returning its buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Borrow as a view. Dimensions were validated on construction.
    #[must_use]
    pub fn view(&self) -> ImageView<'_> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width * self.channels,
            channels: self.channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_view_stride() {
        let data = vec![
            1, 2, 3, 0, // row 0 + padding
            4, 5, 6, 0, // row 1 + padding
        ];
        let view = ImageView::new(&data, 3, 2, 4, 1).unwrap();
        assert_eq!(view.get_row(0), &[1, 2, 3]);
        assert_eq!(view.get_row(1), &[4, 5, 6]);
        assert_eq!(view.get_pixel(1, 1), 5);
        assert_eq!(view.to_image().data(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_invalid_buffer_size() {
        let data = vec![1, 2, 3];
        let result = ImageView::new(&data, 2, 2, 2, 1);
        assert!(matches!(result, Err(ImageError::BufferTooSmall { required: 4, .. })));
    }

    #[test]
    fn test_rejects_malformed_layouts() {
        let data = vec![0u8; 64];
        assert_eq!(
            ImageView::packed(&data, 4, 4, 2).unwrap_err(),
            ImageError::UnsupportedChannels(2)
        );
        assert!(matches!(
            ImageView::gray(&data, 0, 4),
            Err(ImageError::Empty { width: 0, height: 4 })
        ));
        assert!(matches!(
            ImageView::new(&data, 4, 4, 8, 3),
            Err(ImageError::StrideTooSmall { stride: 8, row_len: 12 })
        ));
        assert!(matches!(
            Image::from_vec(vec![0; 10], 3, 3, 1),
            Err(ImageError::LengthMismatch { len: 10, .. })
        ));
    }

    #[test]
    fn test_oversized_layouts_are_rejected() {
        let data = [0u8; 4];
        let huge = usize::MAX / 3 + 1;
        assert_eq!(
            ImageView::new(&data, huge, 1, 2, 3).unwrap_err(),
            ImageError::TooLarge { width: huge, height: 1, channels: 3 }
        );
        assert_eq!(
            ImageView::packed(&data, huge, 1, 3).unwrap_err(),
            ImageError::TooLarge { width: huge, height: 1, channels: 3 }
        );
        // Row length fits, but the rows together do not.
        assert!(matches!(
            ImageView::new(&data, 2, usize::MAX, usize::MAX / 2, 1),
            Err(ImageError::TooLarge { width: 2, .. })
        ));
        assert!(matches!(
            Image::from_vec(vec![0; 4], usize::MAX, 2, 1),
            Err(ImageError::TooLarge { height: 2, .. })
        ));
    }

    #[test]
    fn test_luma_conversion() {
        let data = [255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let view = ImageView::packed(&data, 4, 1, 3).unwrap();
        let luma = view.to_luma();
        assert_eq!(luma.channels(), 1);
        assert_eq!(luma.data(), &[77, 149, 29, 255]);
    }

    #[test]
    fn test_decimate_picks_every_nth_pixel() {
        let data: Vec<u8> = (0..36).collect();
        let view = ImageView::gray(&data, 6, 6).unwrap();
        let small = view.decimate(2);
        assert_eq!((small.width(), small.height()), (3, 3));
        assert_eq!(small.data(), &[0, 2, 4, 12, 14, 16, 24, 26, 28]);
        assert_eq!(view.decimate(1), view.to_image());
    }
}
