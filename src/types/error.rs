use core::{
    error::Error,
    fmt::{self, Debug},
};

/// The error returned when quantization cannot be performed on the given input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantizeError {
    /// A pixel channel was NaN or outside the supported `[0, 1]` range.
    InvalidColorValue {
        /// The index of the first invalid pixel.
        index: usize,
    },
    /// The input image contains zero pixels.
    EmptyImage,
}

impl fmt::Display for QuantizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::InvalidColorValue { index } => {
                write!(
                    f,
                    "pixel at index {index} has a NaN or out of range channel value",
                )
            }
            Self::EmptyImage => f.write_str("the input image contains zero pixels"),
        }
    }
}

impl Error for QuantizeError {}

/// The error returned when an [`Image`](crate::Image) failed to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateImageError {
    /// The provided image width.
    pub(crate) width: u32,
    /// The provided image height.
    pub(crate) height: u32,
    /// The length of the pixel buffer.
    pub(crate) length: usize,
}

impl fmt::Display for CreateImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { width, height, length } = *self;
        if width.checked_mul(height).is_some() {
            write!(
                f,
                "image dimensions of ({width}, {height}) do not match the buffer length of {length}"
            )
        } else {
            write!(
                f,
                "image dimensions of ({width}, {height}) are above the maximum number of pixels of {}",
                crate::MAX_PIXELS,
            )
        }
    }
}

impl Error for CreateImageError {}

/// The error returned when an [`Image`](crate::Image) failed to be created. Includes the pixel
/// buffer used to try and create the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateImageBufError<T> {
    /// The underlying error/reason.
    pub error: CreateImageError,
    /// The provided container holding the pixels of the image.
    pub buffer: T,
}

impl<T> fmt::Display for CreateImageBufError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T: Debug> Error for CreateImageBufError<T> {}
