//! Inference backend implementations.

#[cfg(feature = "native")]
pub mod ort;

use crate::{InferenceError, InputTensor, OutputTensor, Result};

/// Named output tensors in the order the model declares them.
pub type NamedOutputs = Vec<(String, OutputTensor)>;

/// Trait for ONNX inference backends.
///
/// A backend wraps exactly one loaded model. Implementations must be safe
/// to call from several threads at once since one detector and one
/// recognizer are shared by every request the process handles.
pub trait InferenceBackend: Send + Sync {
    /// Run inference with the given named inputs.
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<NamedOutputs>;

    /// Get the input names expected by the model.
    fn input_names(&self) -> &[String];

    /// Get the output names produced by the model.
    fn output_names(&self) -> &[String];

    /// Run a single-input model and return its first output.
    ///
    /// Falls back to the model's own first input name when `name` is not
    /// declared, so exports with renamed inputs still work.
    fn run_single(&self, name: &str, input: InputTensor) -> Result<OutputTensor> {
        let declared = self.input_names();
        let name = if declared.is_empty() || declared.iter().any(|n| n == name) {
            name
        } else {
            declared[0].as_str()
        };

        self.run(&[(name, input)])?
            .into_iter()
            .next()
            .map(|(_, tensor)| tensor)
            .ok_or_else(|| InferenceError::OutputExtraction("model produced no outputs".to_string()))
    }
}
