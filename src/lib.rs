//! A library for fast and accurate color quantization in perceptual color spaces.
//!
//! `patolette` reduces the palette of an image to a bounded number of representative
//! colors and maps every pixel to its nearest palette entry. Palettes are constructed in
//! a perceptual working color space ([CIELuv or ICtCp](ColorSpace)) using one of two
//! [heuristics](Heuristic):
//!
//! - [`Heuristic::Wu`]: variance-minimizing axis-aligned box splitting
//!   (see the [`wu`] module).
//! - [`Heuristic::Patolette`]: divisive clustering along principal axes
//!   (see the [`cluster`] module).
//!
//! The easiest way to get started is the [`Quantizer`] builder:
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use patolette::{Heuristic, ImageBuf, Quantizer};
//! use palette::Srgb;
//!
//! let pixels = vec![Srgb::new(120u8, 30, 220); 256];
//! let image = ImageBuf::new(16, 16, pixels)?;
//!
//! let output = Quantizer::new()
//!     .heuristic(Heuristic::Patolette)
//!     .palette_size(64usize.try_into()?)
//!     .quantize_srgb8(image.as_ref())?;
//!
//! assert!(output.palette.len() <= 64);
//! assert_eq!(output.indices.len(), 256);
//! # Ok(())
//! # }
//! ```
//!
//! The lower level building blocks ([`ColorHistogram`], [`wu`], [`cluster`],
//! [`PaletteIndex`], and the conversions in [`color`]) are public for pipelines that
//! need more control than the builder exposes.
//!
//! # Features
//!
//! - `threads` (default): parallel versions of the data-parallel stages via [`rayon`].
//! - `image` (default): buffer interop with the [`image`] crate.
//! - `kmeans` (default): palette refinement by weighted batch k-means
//!   (see the [`kmeans`] module).

pub mod cluster;
pub mod color;
mod histogram;
#[cfg(feature = "kmeans")]
pub mod kmeans;
mod math;
mod nearest;
mod pipeline;
mod types;
pub mod wu;

pub use color::ColorSpace;
pub use histogram::{ColorHistogram, ColorStats};
pub use nearest::PaletteIndex;
pub use pipeline::{Heuristic, QuantizeOutput, Quantizer};
pub use types::*;

/// The maximum number of pixels in an image, which is `u32::MAX`.
pub const MAX_PIXELS: u32 = u32::MAX;

#[cfg(test)]
pub(crate) mod tests {
    use crate::ImageBuf;
    use palette::Srgb;

    /// Deterministic pseudo random `u32`s (xorshift).
    pub struct TestRng(u32);

    impl TestRng {
        pub fn new() -> Self {
            Self(0x2545_f491)
        }

        pub fn next_u32(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }
    }

    /// `n` deterministic working space colors, with plenty of duplicates mixed in.
    pub fn test_working_colors(n: usize) -> Vec<[f64; 3]> {
        let mut rng = TestRng::new();
        (0..n)
            .map(|_| {
                // Quantized coordinates so that duplicates actually occur.
                let mut channel = || f64::from(rng.next_u32() % 64) * 1.61803 - 50.0;
                [channel(), channel(), channel()]
            })
            .collect()
    }

    /// A deterministic `width` x `height` test image of `Srgb<u8>` pixels.
    pub fn test_srgb8_image(width: u32, height: u32) -> ImageBuf<Srgb<u8>> {
        let mut rng = TestRng::new();
        let pixels = (0..width as usize * height as usize)
            .map(|_| {
                let v = rng.next_u32();
                // Mask to 5 bits per channel so that duplicates actually occur.
                let [r, g, b] = [v, v >> 8, v >> 16].map(|c| (c & 0xf8) as u8);
                Srgb::new(r, g, b)
            })
            .collect();
        ImageBuf::new(width, height, pixels).unwrap()
    }

    /// Asserts that no two colors in a palette are identical.
    pub fn assert_distinct_colors(palette: &[[f64; 3]]) {
        for i in 0..palette.len() {
            for j in (i + 1)..palette.len() {
                assert_ne!(palette[i], palette[j], "palette entries {i} and {j} collide");
            }
        }
    }
}
