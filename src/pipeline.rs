//! The high level quantization entry point.
//!
//! [`Quantizer`] is a builder over the full pipeline: color space conversion, histogram
//! aggregation, palette construction with the selected [`Heuristic`], optional k-means
//! refinement, and the nearest palette color assignment of every pixel.

#[cfg(feature = "kmeans")]
use crate::kmeans::Refinement;
use crate::{
    ColorHistogram, ColorSpace, ImageRef, PaletteBuf, PaletteIndex, PaletteSize, QuantizeError,
    cluster,
    color::{srgb_to_working, working_to_srgb},
    wu,
};
use palette::Srgb;

/// The set of supported palette construction heuristics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Heuristic {
    /// Wu's variance-minimizing box splitting.
    ///
    /// Restricted to axis-aligned cuts; fast and reliable. See the [`wu`] module.
    Wu,
    /// Divisive clustering along principal axes.
    ///
    /// Splits are not restricted to axis-aligned cuts, which tends to track the shape of
    /// the color distribution better. See the [`cluster`] module.
    #[default]
    Patolette,
}

/// The output of a quantization run: the palette and one palette index per input pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizeOutput {
    /// The color palette, in sRGB.
    pub palette: PaletteBuf<Srgb<u8>>,
    /// For every input pixel, in order, the index of its palette color.
    pub indices: Vec<u8>,
}

/// A builder specifying the options of a quantization run.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use patolette::{ColorSpace, Heuristic, ImageBuf, Quantizer};
/// use palette::Srgb;
///
/// let pixels = vec![Srgb::new(0.5f64, 0.25, 0.125); 64];
/// let image = ImageBuf::new(8, 8, pixels)?;
///
/// let output = Quantizer::new()
///     .color_space(ColorSpace::CieLuv)
///     .heuristic(Heuristic::Wu)
///     .palette_size(16usize.try_into()?)
///     .quantize(image.as_ref())?;
///
/// assert_eq!(output.palette.len(), 1); // a single unique input color
/// assert!(output.indices.iter().all(|&i| i == 0));
/// # Ok(())
/// # }
/// ```
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub struct Quantizer {
    /// The working color space.
    color_space: ColorSpace,
    /// The palette construction heuristic.
    heuristic: Heuristic,
    /// The maximum number of palette colors.
    k: PaletteSize,
    #[cfg(feature = "kmeans")]
    /// Optional k-means refinement of the constructed palette.
    refinement: Option<Refinement>,
    #[cfg(feature = "threads")]
    /// Whether to run the data-parallel stages across multiple threads.
    parallel: bool,
}

impl Quantizer {
    /// Create a new [`Quantizer`] with default options.
    pub fn new() -> Self {
        Self {
            color_space: ColorSpace::default(),
            heuristic: Heuristic::default(),
            k: PaletteSize::MAX,
            #[cfg(feature = "kmeans")]
            refinement: None,
            #[cfg(feature = "threads")]
            parallel: false,
        }
    }

    /// Sets the working color space palettes are constructed in.
    ///
    /// The default is [`ColorSpace::CieLuv`].
    #[inline]
    pub fn color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    /// Sets the palette construction heuristic.
    ///
    /// The default is [`Heuristic::Patolette`].
    #[inline]
    pub fn heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Sets the maximum number of colors to put in the palette.
    ///
    /// The default is [`PaletteSize::MAX`].
    #[inline]
    pub fn palette_size(mut self, k: PaletteSize) -> Self {
        self.k = k;
        self
    }

    #[cfg(feature = "kmeans")]
    /// Sets the optional k-means refinement of the constructed palette.
    ///
    /// The default is `None`, i.e. no refinement.
    #[inline]
    pub fn refinement(mut self, refinement: impl Into<Option<Refinement>>) -> Self {
        self.refinement = refinement.into();
        self
    }

    #[cfg(feature = "threads")]
    /// Sets whether to run the data-parallel stages across multiple threads.
    ///
    /// Use a [`rayon::ThreadPool`] to control the number of threads if necessary.
    ///
    /// The default is `false`.
    #[inline]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Quantize an image of `Srgb<f64>` pixels with channels in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`QuantizeError::EmptyImage`] if the image has zero pixels, or
    /// [`QuantizeError::InvalidColorValue`] if any pixel channel is NaN or outside
    /// `[0, 1]`.
    pub fn quantize(
        &self,
        image: ImageRef<'_, Srgb<f64>>,
    ) -> Result<QuantizeOutput, QuantizeError> {
        let (palette, pixels) = self.build_palette(image)?;
        let indices = self.assign(&palette, &pixels);
        let palette = self.encode_palette(&palette);
        Ok(QuantizeOutput { palette, indices })
    }

    /// Quantize an image of `Srgb<u8>` pixels.
    ///
    /// # Errors
    ///
    /// Returns [`QuantizeError::EmptyImage`] if the image has zero pixels. `Srgb<u8>`
    /// pixels are always valid colors.
    pub fn quantize_srgb8(
        &self,
        image: ImageRef<'_, Srgb<u8>>,
    ) -> Result<QuantizeOutput, QuantizeError> {
        let image = crate::ImageBuf::from_srgb8(image);
        self.quantize(image.as_ref())
    }

    /// Compute only the color palette of an image, skipping the per-pixel assignment.
    ///
    /// # Errors
    ///
    /// See [`quantize`](Self::quantize).
    pub fn quantize_palette(
        &self,
        image: ImageRef<'_, Srgb<f64>>,
    ) -> Result<PaletteBuf<Srgb<u8>>, QuantizeError> {
        let (palette, _) = self.build_palette(image)?;
        Ok(self.encode_palette(&palette))
    }

    /// Run the pipeline up to palette construction.
    ///
    /// Returns the working space palette and the working space pixels for the
    /// assignment pass.
    fn build_palette(
        &self,
        image: ImageRef<'_, Srgb<f64>>,
    ) -> Result<(Vec<[f64; 3]>, Vec<[f64; 3]>), QuantizeError> {
        if image.is_empty() {
            return Err(QuantizeError::EmptyImage);
        }
        validate_pixels(image.as_slice())?;

        let pixels = self.to_working(image.as_slice());
        let hist = self.histogram(&pixels);

        let palette = match self.heuristic {
            Heuristic::Wu => wu::palette(&hist, self.k),
            Heuristic::Patolette => cluster::palette(&hist, self.k),
        };

        #[cfg(feature = "kmeans")]
        let palette = match self.refinement {
            Some(refinement) => crate::kmeans::refine(&hist, palette, refinement).0,
            None => palette,
        };

        Ok((palette, pixels))
    }

    fn to_working(&self, pixels: &[Srgb<f64>]) -> Vec<[f64; 3]> {
        #[cfg(feature = "threads")]
        if self.parallel {
            return crate::color::srgb_to_working_par(self.color_space, pixels);
        }
        srgb_to_working(self.color_space, pixels)
    }

    fn histogram(&self, pixels: &[[f64; 3]]) -> ColorHistogram {
        #[cfg(feature = "threads")]
        if self.parallel {
            return ColorHistogram::new_par(pixels);
        }
        ColorHistogram::new(pixels)
    }

    fn assign(&self, palette: &[[f64; 3]], pixels: &[[f64; 3]]) -> Vec<u8> {
        let index = PaletteIndex::new(palette);
        #[cfg(feature = "threads")]
        if self.parallel {
            return index.assign_par(pixels);
        }
        index.assign(pixels)
    }

    /// Convert a working space palette back to sRGB and encode it as `Srgb<u8>`.
    fn encode_palette(&self, palette: &[[f64; 3]]) -> PaletteBuf<Srgb<u8>> {
        let srgb = working_to_srgb(self.color_space, palette);
        PaletteBuf::new_unchecked(srgb.into_iter().map(Srgb::into_format).collect())
    }
}

impl Default for Quantizer {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Reject pixels with NaN or out of range channels, reporting the first offender.
fn validate_pixels(pixels: &[Srgb<f64>]) -> Result<(), QuantizeError> {
    for (index, srgb) in pixels.iter().enumerate() {
        let [r, g, b] = palette::cast::into_array(*srgb);
        // `!(0.0..=1.0).contains(&c)` also catches NaN.
        if !(0.0..=1.0).contains(&r) || !(0.0..=1.0).contains(&g) || !(0.0..=1.0).contains(&b) {
            return Err(QuantizeError::InvalidColorValue { index });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImageBuf;
    use crate::tests::test_srgb8_image;

    fn quantizers() -> Vec<Quantizer> {
        let mut quantizers = Vec::new();
        for color_space in [ColorSpace::CieLuv, ColorSpace::ICtCp] {
            for heuristic in [Heuristic::Wu, Heuristic::Patolette] {
                quantizers.push(
                    Quantizer::new()
                        .color_space(color_space)
                        .heuristic(heuristic),
                );
            }
        }
        quantizers
    }

    #[test]
    fn empty_image_is_an_error() {
        let image = ImageBuf::new(0, 0, Vec::new()).unwrap();
        for quantizer in quantizers() {
            assert_eq!(
                quantizer.quantize(image.as_ref()).unwrap_err(),
                QuantizeError::EmptyImage
            );
        }
    }

    #[test]
    fn invalid_channels_are_rejected() {
        for bad in [
            Srgb::new(f64::NAN, 0.0, 0.0),
            Srgb::new(0.0, -0.5, 0.0),
            Srgb::new(0.0, 0.0, 1.5),
        ] {
            let pixels = vec![Srgb::new(0.5, 0.5, 0.5), bad, Srgb::new(0.1, 0.1, 0.1)];
            let image = ImageBuf::new(3, 1, pixels).unwrap();
            assert_eq!(
                Quantizer::new().quantize(image.as_ref()).unwrap_err(),
                QuantizeError::InvalidColorValue { index: 1 }
            );
        }
    }

    #[test]
    fn indices_are_valid_and_cover_every_pixel() {
        let image = test_srgb8_image(64, 48);
        for quantizer in quantizers() {
            let quantizer = quantizer.palette_size(32usize.try_into().unwrap());
            let output = quantizer.quantize_srgb8(image.as_ref()).unwrap();

            assert_eq!(output.indices.len(), image.as_slice().len());
            assert!(output.palette.len() <= 32);
            let len = output.palette.len();
            assert!(output.indices.iter().all(|&i| usize::from(i) < len));
        }
    }

    #[test]
    fn single_color_image_maps_to_index_zero() {
        let pixels = vec![Srgb::new(0.25f64, 0.5, 0.75); 30];
        let image = ImageBuf::new(5, 6, pixels).unwrap();
        for quantizer in quantizers() {
            let output = quantizer.quantize(image.as_ref()).unwrap();
            assert_eq!(output.palette.len(), 1);
            assert!(output.indices.iter().all(|&i| i == 0));
        }
    }

    #[test]
    fn palette_size_of_one() {
        let image = test_srgb8_image(16, 16);
        for quantizer in quantizers() {
            let output = quantizer
                .palette_size(PaletteSize::MIN)
                .quantize_srgb8(image.as_ref())
                .unwrap();
            assert_eq!(output.palette.len(), 1);
            assert!(output.indices.iter().all(|&i| i == 0));
        }
    }

    #[test]
    fn deterministic() {
        let image = test_srgb8_image(32, 32);
        for quantizer in quantizers() {
            let a = quantizer.quantize_srgb8(image.as_ref()).unwrap();
            let b = quantizer.quantize_srgb8(image.as_ref()).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn palette_only_matches_full_run() {
        let image = test_srgb8_image(24, 24);
        let image = ImageBuf::from_srgb8(image.as_ref());
        for quantizer in quantizers() {
            let output = quantizer.quantize(image.as_ref()).unwrap();
            let palette = quantizer.quantize_palette(image.as_ref()).unwrap();
            assert_eq!(output.palette, palette);
        }
    }

    #[test]
    fn few_distinct_colors_palette_is_exact_for_wu() {
        let colors = [
            Srgb::new(10u8, 20, 30),
            Srgb::new(200, 40, 90),
            Srgb::new(0, 255, 0),
            Srgb::new(3, 3, 3),
        ];
        let pixels: Vec<_> = (0..64).map(|i| colors[i % colors.len()]).collect();
        let image = ImageBuf::new(8, 8, pixels).unwrap();

        let output = Quantizer::new()
            .heuristic(Heuristic::Wu)
            .quantize_srgb8(image.as_ref())
            .unwrap();
        assert_eq!(output.palette.len(), colors.len());

        // With as many palette entries as distinct colors, every pixel maps to
        // exactly its own color.
        let mut sorted: Vec<_> = output.palette.iter().copied().collect();
        sorted.sort_by_key(|c| (c.red, c.green, c.blue));
        let mut expected = colors.to_vec();
        expected.sort_by_key(|c| (c.red, c.green, c.blue));
        assert_eq!(sorted, expected);
    }

    #[cfg(feature = "kmeans")]
    #[test]
    fn refinement_is_applied_and_valid() {
        use crate::kmeans::Refinement;

        let image = test_srgb8_image(48, 48);
        for quantizer in quantizers() {
            let quantizer = quantizer
                .palette_size(16usize.try_into().unwrap())
                .refinement(Refinement::new().iterations(4));
            let output = quantizer.quantize_srgb8(image.as_ref()).unwrap();
            assert!(output.palette.len() <= 16);
            let len = output.palette.len();
            assert!(output.indices.iter().all(|&i| usize::from(i) < len));
        }
    }

    #[cfg(feature = "threads")]
    #[test]
    fn parallel_matches_serial() {
        let image = test_srgb8_image(40, 40);
        for quantizer in quantizers() {
            let serial = quantizer.clone().parallel(false);
            let parallel = quantizer.parallel(true);
            assert_eq!(
                serial.quantize_srgb8(image.as_ref()).unwrap(),
                parallel.quantize_srgb8(image.as_ref()).unwrap()
            );
        }
    }
}
