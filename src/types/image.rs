use crate::{CreateImageBufError, CreateImageError};
use core::marker::PhantomData;
use palette::Srgb;

/// The base image type parameterized by the type of the container.
///
/// Typically you want to use one of the image types with a defined container:
/// - [`ImageBuf`]: an owned image backed by a [`Vec`].
/// - [`ImageRef`]: a borrowed image backed by an immutable slice reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Image<Color, Container> {
    /// The color type stored in `pixels`.
    color: PhantomData<Color>,
    /// The width of the image.
    width: u32,
    /// The height of the image.
    height: u32,
    /// The pixel buffer or slice in row-major order.
    pixels: Container,
}

/// An owned image buffer backed by a [`Vec`].
///
/// The length of the pixel [`Vec`] is guaranteed to match `width * height` and be less than or
/// equal to [`MAX_PIXELS`](crate::MAX_PIXELS).
pub type ImageBuf<Color> = Image<Color, Vec<Color>>;

/// A borrowed image backed by a reference to a slice.
///
/// The length of the pixel slice is guaranteed to match `width * height` and be less than or
/// equal to [`MAX_PIXELS`](crate::MAX_PIXELS).
pub type ImageRef<'a, Color> = Image<Color, &'a [Color]>;

impl<Color, Container> Image<Color, Container>
where
    Container: AsRef<[Color]>,
{
    /// Create a new [`Image`] with the given dimensions and pixel container.
    ///
    /// # Errors
    ///
    /// Returns an error if `width * height` overflows, exceeds
    /// [`MAX_PIXELS`](crate::MAX_PIXELS), or does not match the length of `pixels`.
    pub fn new(width: u32, height: u32, pixels: Container) -> Result<Self, CreateImageBufError<Container>> {
        let error = CreateImageError {
            width,
            height,
            length: pixels.as_ref().len(),
        };
        // `checked_mul` doubles as the MAX_PIXELS bound: `u32` products cannot exceed it.
        match width.checked_mul(height) {
            Some(len) if len as usize == pixels.as_ref().len() => Ok(Self {
                color: PhantomData,
                width,
                height,
                pixels,
            }),
            _ => Err(CreateImageBufError { error, buffer: pixels }),
        }
    }

    /// Create a new [`Image`] without validating any invariants.
    #[inline]
    pub(crate) fn new_unchecked(width: u32, height: u32, pixels: Container) -> Self {
        debug_assert_eq!(
            width.checked_mul(height).map(|len| len as usize),
            Some(pixels.as_ref().len())
        );
        Self {
            color: PhantomData,
            width,
            height,
            pixels,
        }
    }

    /// Returns the width of an [`Image`].
    #[inline]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of an [`Image`].
    #[inline]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns the width and height of an [`Image`].
    #[inline]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the pixels of an [`Image`] as a slice in row-major order.
    #[inline]
    pub fn as_slice(&self) -> &[Color] {
        self.pixels.as_ref()
    }

    /// Returns whether an [`Image`] contains zero pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.as_ref().is_empty()
    }

    /// Returns an [`ImageRef`] borrowing this image's pixels.
    #[inline]
    pub fn as_ref(&self) -> ImageRef<'_, Color> {
        Image {
            color: PhantomData,
            width: self.width,
            height: self.height,
            pixels: self.pixels.as_ref(),
        }
    }
}

impl<Color> ImageBuf<Color> {
    /// Consume an [`ImageBuf`] and return the underlying pixel [`Vec`].
    #[must_use]
    #[inline]
    pub fn into_vec(self) -> Vec<Color> {
        self.pixels
    }
}

impl ImageBuf<Srgb<f64>> {
    /// Convert an image of `Srgb<u8>` pixels to an owned image of `Srgb<f64>` pixels
    /// with channels in `[0, 1]`.
    #[must_use]
    pub fn from_srgb8(image: ImageRef<'_, Srgb<u8>>) -> Self {
        let pixels = image
            .as_slice()
            .iter()
            .map(|srgb| srgb.into_format())
            .collect();
        Self::new_unchecked(image.width(), image.height(), pixels)
    }
}

#[cfg(feature = "image")]
mod image_interop {
    use super::{ImageBuf, ImageRef};
    use crate::CreateImageBufError;
    use palette::Srgb;

    impl TryFrom<image::RgbImage> for ImageBuf<Srgb<u8>> {
        type Error = CreateImageBufError<image::RgbImage>;

        fn try_from(image: image::RgbImage) -> Result<Self, Self::Error> {
            let (width, height) = image.dimensions();
            let pixels = image
                .as_raw()
                .chunks_exact(3)
                .map(|rgb| Srgb::new(rgb[0], rgb[1], rgb[2]))
                .collect::<Vec<_>>();
            match Self::new(width, height, pixels) {
                Ok(buf) => Ok(buf),
                Err(CreateImageBufError { error, .. }) => {
                    Err(CreateImageBufError { error, buffer: image })
                }
            }
        }
    }

    impl<'a> TryFrom<&'a image::RgbImage> for ImageRef<'a, Srgb<u8>> {
        type Error = crate::CreateImageError;

        fn try_from(image: &'a image::RgbImage) -> Result<Self, Self::Error> {
            let (width, height) = image.dimensions();
            let pixels = palette::cast::from_component_slice(image.as_raw());
            Self::new(width, height, pixels).map_err(|err| err.error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_is_rejected() {
        let pixels = vec![Srgb::new(0.0, 0.0, 0.0); 5];
        assert!(ImageBuf::new(2, 2, pixels).is_err());
    }

    #[test]
    fn valid_dimensions_roundtrip() {
        let pixels = vec![Srgb::new(0u8, 0, 0); 6];
        let image = ImageBuf::new(3, 2, pixels).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.as_ref().as_slice().len(), 6);
    }

    #[test]
    fn zero_sized_image_is_allowed_at_construction() {
        let image = ImageBuf::<Srgb<f64>>::new(0, 0, Vec::new()).unwrap();
        assert!(image.is_empty());
    }
}
