pub mod color;
pub mod encoded;
pub mod error;
pub mod trimmer;

pub use color::Color;
pub use encoded::{EncodedImage, ImageMime};
pub use error::ImageTrimError;
pub use trimmer::{EdgeSide, FitSize, ImageTrimmer, MarginTrim};
