//! Error types for the khaisinh-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the khaisinh library.
///
/// Only construction, configuration and file loading surface these to
/// callers. Extraction itself never fails; see [`crate::FieldExtractor`].
#[derive(Error, Debug)]
pub enum KhaiSinhError {
    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Inference error from the inference layer.
    #[error("inference error: {0}")]
    Inference(#[from] khaisinh_inference::InferenceError),

    /// Image decoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A model file or recognizer configuration does not exist.
    #[error("model not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The input image cannot be processed at all.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Errors raised by the detection and recognition oracles.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Region detection failed.
    #[error("region detection failed: {0}")]
    Detection(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Result type for the khaisinh library.
pub type Result<T> = std::result::Result<T, KhaiSinhError>;
