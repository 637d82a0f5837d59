use crate::core::image::ImageTrimError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoseSetError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid generator: {0}")]
    InvalidGenerator(String),
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u64),
    #[error("poses.json not found in archive")]
    MissingPosesJson,
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] ImageTrimError),
    #[error("Config error: {0}")]
    Config(#[from] json5::Error),
    #[error("Invalid {kind} vector length: expected {expected}, got {actual}")]
    InvalidVectorLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("No body vector in landmark result")]
    NoBodyVector,
    #[error("No hand vector in landmark result")]
    NoHandVector,
}

pub type Result<T> = std::result::Result<T, PoseSetError>;
