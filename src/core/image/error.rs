use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageTrimError {
    #[error("Image decode error: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Image encode error: {0}")]
    Encode(#[source] image::ImageError),
    #[error("WebP encode error: {0}")]
    WebpEncode(String),
    #[error("Invalid data URL")]
    InvalidDataUrl,
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Unsupported image MIME type: {0}")]
    UnsupportedMime(String),
    #[error("Invalid color code: {0}")]
    InvalidColor(String),
    #[error("Empty crop region: x={x}, y={y}, {width}x{height}")]
    EmptyCrop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}
