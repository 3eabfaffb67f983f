//! Tensor types passed across the inference boundary.

use ndarray::{ArrayD, IxDyn};

use crate::{InferenceError, Result};

/// Element types the detector and recognizer models use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorType {
    Float32,
    Int64,
}

/// Input tensor for inference.
#[derive(Debug, Clone)]
pub enum InputTensor {
    Float32(ArrayD<f32>),
    Int64(ArrayD<i64>),
}

impl InputTensor {
    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            InputTensor::Float32(arr) => arr.shape(),
            InputTensor::Int64(arr) => arr.shape(),
        }
    }

    /// Get the data type of the tensor.
    pub fn dtype(&self) -> TensorType {
        match self {
            InputTensor::Float32(_) => TensorType::Float32,
            InputTensor::Int64(_) => TensorType::Int64,
        }
    }

    /// Create a Float32 tensor from raw data and shape.
    pub fn from_f32(data: Vec<f32>, shape: &[usize]) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(InputTensor::Float32)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))
    }
}

/// Output tensor from inference.
#[derive(Debug, Clone)]
pub enum OutputTensor {
    Float32(ArrayD<f32>),
    Int64(ArrayD<i64>),
}

impl OutputTensor {
    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            OutputTensor::Float32(arr) => arr.shape(),
            OutputTensor::Int64(arr) => arr.shape(),
        }
    }

    /// Get the data type of the tensor.
    pub fn dtype(&self) -> TensorType {
        match self {
            OutputTensor::Float32(_) => TensorType::Float32,
            OutputTensor::Int64(_) => TensorType::Int64,
        }
    }

    /// Try to get the inner Float32 array.
    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            OutputTensor::Float32(arr) => Some(arr),
            _ => None,
        }
    }

    /// Consume the tensor, requiring Float32 elements.
    ///
    /// Int64 outputs are widened, which covers models exported with
    /// integer class-index heads.
    pub fn into_f32(self) -> ArrayD<f32> {
        match self {
            OutputTensor::Float32(arr) => arr,
            OutputTensor::Int64(arr) => arr.mapv(|v| v as f32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_f32_shape_checked() {
        let tensor = InputTensor::from_f32(vec![0.0; 6], &[1, 2, 3]).unwrap();
        assert_eq!(tensor.shape(), &[1, 2, 3]);
        assert_eq!(tensor.dtype(), TensorType::Float32);

        let err = InputTensor::from_f32(vec![0.0; 5], &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidInput(_)));
    }

    #[test]
    fn test_int_output_widened() {
        let arr = ArrayD::from_shape_vec(IxDyn(&[2]), vec![3i64, 7]).unwrap();
        let out = OutputTensor::Int64(arr);
        assert!(out.as_f32().is_none());
        assert_eq!(out.into_f32().into_raw_vec_and_offset().0, vec![3.0, 7.0]);
    }
}
