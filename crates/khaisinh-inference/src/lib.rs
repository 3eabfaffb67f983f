//! ONNX inference abstraction layer for khaisinh.
//!
//! The extraction pipeline only ever sees the [`InferenceBackend`] trait:
//! the region detector and the text recognizer each own one backend
//! holding a single loaded model. On native targets the backend is
//! `ort` with the XNNPACK execution provider.

mod backend;
mod error;
mod tensor;

pub use backend::{InferenceBackend, NamedOutputs};
pub use error::InferenceError;
pub use tensor::{InputTensor, OutputTensor, TensorType};

#[cfg(feature = "native")]
pub use backend::ort::{OrtBackend, SessionOptions};

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
