//! Error types for the inference layer.

use thiserror::Error;

/// Errors that can occur while loading or running an ONNX model.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// The model file could not be parsed or committed to a session.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Failed to create an inference session.
    #[error("failed to create session: {0}")]
    SessionCreate(String),

    /// Input tensor could not be converted for the runtime.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Inference execution failed.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// A model output was missing or had an unexpected element type.
    #[error("failed to extract output: {0}")]
    OutputExtraction(String),

    /// I/O error when reading model files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
