//! Core library for Vietnamese birth certificate OCR.
//!
//! This crate provides:
//! - Region detection over a YOLO model and line recognition over a CTC model
//! - Selection of the best region per field label
//! - Field-specific text normalization (names, captions, dates, document type)
//! - Repair of swapped mother/father name fields
//!
//! The models sit behind the [`DetectionOracle`] and [`RecognitionOracle`]
//! traits, so the whole pipeline can run against deterministic fakes.

pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;

pub use error::{KhaiSinhError, OcrError, Result};
pub use extraction::{
    decode_image, load_image, select_regions, FieldExtractor, FieldExtractorBuilder, FieldKind,
    FieldNormalizer, ParentFieldCorrector,
};
pub use models::{
    labels, BirthCertificate, BoundingBox, ClassLabelMap, ExtractionReport, ExtractionStatus,
    FieldMap, FieldRecord, KhaiSinhConfig, Region,
};
pub use ocr::{
    CtcRecognizer, DetectionOracle, ModelPaths, RawDetection, RecognitionOracle, RegionDetector,
    TextRecognizer, YoloDetector,
};
#[cfg(feature = "native")]
pub use ocr::{create_extractor, OnnxFieldExtractor};

/// Re-export inference types.
pub use khaisinh_inference::{InferenceBackend, InputTensor, OutputTensor};

#[cfg(feature = "native")]
pub use khaisinh_inference::OrtBackend;
