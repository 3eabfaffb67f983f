//! Region detection and text recognition.
//!
//! The pipeline talks to its two models through narrow oracle traits:
//! [`DetectionOracle`] finds labeled regions on a page and
//! [`RecognitionOracle`] reads one line of text from a crop. The
//! [`RegionDetector`] and [`TextRecognizer`] adapters wrap them with
//! geometry checks and fault recovery; [`YoloDetector`] and
//! [`CtcRecognizer`] are the ONNX-backed implementations.

mod ctc;
mod detector;
mod loader;
mod preprocessing;
mod recognizer;
mod yolo;

use std::sync::Arc;

use image::DynamicImage;

use crate::error::OcrError;

pub use ctc::{default_vietnamese_dictionary, load_dictionary, CtcRecognizer, RecognizerSpec};
pub use detector::RegionDetector;
pub use loader::ModelPaths;
pub use preprocessing::{crop_region, padded_crop, to_rgb, ImagePreprocessor, Letterbox};
pub use recognizer::TextRecognizer;
pub use yolo::YoloDetector;

#[cfg(feature = "native")]
pub use loader::{create_extractor, OnnxFieldExtractor};

/// A detection as emitted by the model, before validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    /// Box corners `[x1, y1, x2, y2]` in source image pixels.
    pub bbox: [f32; 4],
    /// Detection confidence.
    pub confidence: f32,
    /// Class index.
    pub class_id: u32,
}

/// A pretrained model locating labeled regions on a document image.
pub trait DetectionOracle: Send + Sync {
    /// Return every region scoring at least `confidence_threshold`.
    fn predict(
        &self,
        image: &DynamicImage,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>, OcrError>;
}

/// A pretrained model reading the text of a cropped region.
pub trait RecognitionOracle: Send + Sync {
    /// Return the text in `crop`.
    fn predict(&self, crop: &DynamicImage) -> Result<String, OcrError>;
}

impl<T: DetectionOracle + ?Sized> DetectionOracle for Arc<T> {
    fn predict(
        &self,
        image: &DynamicImage,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>, OcrError> {
        (**self).predict(image, confidence_threshold)
    }
}

impl<T: RecognitionOracle + ?Sized> RecognitionOracle for Arc<T> {
    fn predict(&self, crop: &DynamicImage) -> Result<String, OcrError> {
        (**self).predict(crop)
    }
}
