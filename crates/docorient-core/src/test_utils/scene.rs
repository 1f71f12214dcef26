#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

use crate::image::Image;
use crate::rotation::{apply_rotation, Rotation};

/// Relative lengths of the rendered text lines, cycled.
const LINE_LENGTHS: [f64; 5] = [0.85, 0.6, 0.75, 0.5, 0.65];

/// A builder for a photographed card: a bordered rectangle with left-aligned
/// text lines in its upper half, lying on a darker background.
///
/// Rendering samples each canvas pixel by mapping it back into card
/// coordinates, so any tilt produces hard (aliased) edges.
#[derive(Debug, Clone)]
pub struct DocumentScene {
    width: usize,
    height: usize,
    card_width: f64,
    card_height: f64,
    tilt_deg: f64,
    background_gray: u8,
    paper_gray: u8,
    border_gray: u8,
    border_width: f64,
    ink_gray: u8,
    text_lines: usize,
    noise: Option<(f64, u64)>,
}

impl Default for DocumentScene {
    /// A 1000x650 card with a 20 px black border on a 1200x850 canvas.
    fn default() -> Self {
        Self::new(1200, 850)
    }
}

impl DocumentScene {
    /// Create a scene on a `width x height` canvas.
    ///
    /// The card covers 5/6 of the width and 13/17 of the height, so a
    /// 1200x850 canvas holds a 1000x650 card.
    pub fn new(width: usize, height: usize) -> Self {
        let card_height = height as f64 * 13.0 / 17.0;
        Self {
            width,
            height,
            card_width: width as f64 * 5.0 / 6.0,
            card_height,
            tilt_deg: 0.0,
            background_gray: 60,
            paper_gray: 255,
            border_gray: 0,
            border_width: (card_height / 32.5).max(2.0),
            ink_gray: 0,
            text_lines: 5,
            noise: None,
        }
    }

    /// Set the card size in pixels.
    pub fn with_card(mut self, width: f64, height: f64) -> Self {
        self.card_width = width;
        self.card_height = height;
        self
    }

    /// Tilt the card clockwise by a small angle in degrees.
    pub fn with_tilt(mut self, degrees: f64) -> Self {
        self.tilt_deg = degrees;
        self
    }

    /// Set the background gray level.
    pub fn with_background(mut self, gray: u8) -> Self {
        self.background_gray = gray;
        self
    }

    /// Set the paper gray level.
    pub fn with_paper(mut self, gray: u8) -> Self {
        self.paper_gray = gray;
        self
    }

    /// Set the border width (0 disables it) and gray level.
    pub fn with_border(mut self, width: f64, gray: u8) -> Self {
        self.border_width = width;
        self.border_gray = gray;
        self
    }

    /// Set the number of text lines (0 for a blank card).
    pub fn with_text_lines(mut self, count: usize) -> Self {
        self.text_lines = count;
        self
    }

    /// Set the ink gray level.
    pub fn with_ink(mut self, gray: u8) -> Self {
        self.ink_gray = gray;
        self
    }

    /// Add seeded Gaussian noise with standard deviation `sigma`.
    pub fn with_noise(mut self, sigma: f64, seed: u64) -> Self {
        self.noise = Some((sigma, seed));
        self
    }

    /// Render the upright scene as a grayscale image.
    pub fn render(&self) -> Image {
        let mut data = vec![self.background_gray; self.width * self.height];
        let (s, c) = self.tilt_deg.to_radians().sin_cos();
        let cx = self.width as f64 / 2.0;
        let cy = self.height as f64 / 2.0;

        for y in 0..self.height {
            for x in 0..self.width {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                // Undo the clockwise tilt to land in card coordinates.
                let u = dx * c + dy * s + self.card_width / 2.0;
                let v = -dx * s + dy * c + self.card_height / 2.0;
                if let Some(gray) = self.card_sample(u, v) {
                    data[y * self.width + x] = gray;
                }
            }
        }

        if let Some((sigma, seed)) = self.noise {
            super::add_gaussian_noise(&mut data, sigma, seed);
        }

        Image::from_parts(data, self.width, self.height, 1)
    }

    /// Render the scene after a clockwise quarter-turn rotation.
    pub fn render_rotated(&self, rotation: Rotation) -> Image {
        let upright = self.render();
        apply_rotation(&upright.view(), rotation)
    }

    /// Gray level at card coordinates `(u, v)`, or `None` outside the card.
    fn card_sample(&self, u: f64, v: f64) -> Option<u8> {
        if u < 0.0 || v < 0.0 || u >= self.card_width || v >= self.card_height {
            return None;
        }
        let b = self.border_width;
        if u < b || v < b || u >= self.card_width - b || v >= self.card_height - b {
            return Some(self.border_gray);
        }

        let thickness = 0.035 * self.card_height;
        let spacing = 2.2 * thickness;
        let top = b + 0.1 * self.card_height;
        let left = b + 0.06 * self.card_width;
        let usable = self.card_width - 2.0 * left;
        for i in 0..self.text_lines {
            let line_top = top + i as f64 * spacing;
            let line_len = usable * LINE_LENGTHS[i % LINE_LENGTHS.len()];
            if v >= line_top && v < line_top + thickness && u >= left && u < left + line_len {
                return Some(self.ink_gray);
            }
        }
        Some(self.paper_gray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scene_layout() {
        let img = DocumentScene::default().render();
        assert_eq!((img.width(), img.height()), (1200, 850));
        let px = |x: usize, y: usize| img.data()[y * 1200 + x];
        assert_eq!(px(10, 10), 60);
        assert_eq!(px(105, 425), 0); // left border
        assert_eq!(px(600, 700), 255); // blank lower half of the card
        assert_eq!(px(200, 195), 0); // first text line
    }

    #[test]
    fn test_custom_gray_levels() {
        let img = DocumentScene::new(120, 85)
            .with_background(200)
            .with_paper(90)
            .with_border(3.0, 10)
            .with_ink(250)
            .render();
        let px = |x: usize, y: usize| img.data()[y * 120 + x];
        assert_eq!(px(2, 2), 200);
        assert_eq!(px(11, 40), 10);
        assert_eq!(px(30, 20), 250);
        assert_eq!(px(60, 65), 90);
    }

    #[test]
    fn test_rotated_render_swaps_dimensions() {
        let scene = DocumentScene::new(120, 85);
        let img = scene.render_rotated(Rotation::Deg90);
        assert_eq!((img.width(), img.height()), (85, 120));
    }
}
