mod error;
mod image;
mod palette;

pub use error::*;
pub use image::*;
pub use palette::*;
