//! Resolving and loading the detector and recognizer models.

use std::path::PathBuf;

use crate::error::{KhaiSinhError, Result};
use crate::models::KhaiSinhConfig;

use super::ctc::RecognizerSpec;

/// Verified locations of every file the pipeline loads at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPaths {
    /// Detector weights.
    pub detector: PathBuf,
    /// Recognizer configuration file.
    pub recognizer_config: PathBuf,
    /// Parsed recognizer configuration with resolved paths.
    pub recognizer: RecognizerSpec,
}

impl ModelPaths {
    /// Resolve model paths from configuration.
    ///
    /// Fails with [`KhaiSinhError::ModelNotFound`] naming the first file
    /// that does not exist.
    pub fn resolve(config: &KhaiSinhConfig) -> Result<Self> {
        let detector = config.detector_path();
        if !detector.exists() {
            return Err(KhaiSinhError::ModelNotFound(detector));
        }

        let recognizer_config = config.recognizer_config_path();
        let recognizer = RecognizerSpec::from_file(&recognizer_config)?;

        if !recognizer.model.exists() {
            return Err(KhaiSinhError::ModelNotFound(recognizer.model.clone()));
        }
        if let Some(dictionary) = recognizer.dictionary.as_ref().filter(|d| !d.exists()) {
            return Err(KhaiSinhError::ModelNotFound(dictionary.clone()));
        }

        Ok(Self {
            detector,
            recognizer_config,
            recognizer,
        })
    }
}

/// Field extractor running both models on ONNX Runtime.
#[cfg(feature = "native")]
pub type OnnxFieldExtractor = crate::extraction::FieldExtractor<
    super::YoloDetector<khaisinh_inference::OrtBackend>,
    super::CtcRecognizer<khaisinh_inference::OrtBackend>,
>;

/// Load both models once and build a ready-to-use extractor.
///
/// This is the only place model problems surface; every failure here is
/// fatal for the caller.
#[cfg(feature = "native")]
pub fn create_extractor(config: &KhaiSinhConfig) -> Result<OnnxFieldExtractor> {
    use khaisinh_inference::{OrtBackend, SessionOptions};
    use tracing::info;

    use crate::error::OcrError;
    use crate::extraction::FieldExtractor;

    use super::{CtcRecognizer, YoloDetector};

    let paths = ModelPaths::resolve(config)?;
    let options = SessionOptions {
        intra_threads: config.models.num_threads.max(1),
    };

    let backend = OrtBackend::from_file_with_options(&paths.detector, options)
        .map_err(|e| OcrError::ModelLoad(format!("Failed to load detector: {}", e)))?;
    let detector = YoloDetector::new(backend)
        .with_input_size(config.detection.input_size)
        .with_iou_threshold(config.detection.iou_threshold);
    info!("Loaded detector from {}", paths.detector.display());

    let backend = OrtBackend::from_file_with_options(&paths.recognizer.model, options)
        .map_err(|e| OcrError::ModelLoad(format!("Failed to load recognizer: {}", e)))?;
    let recognizer = CtcRecognizer::from_spec(backend, &paths.recognizer)?;
    info!("Loaded recognizer from {}", paths.recognizer.model.display());

    FieldExtractor::builder()
        .with_config(config.clone())
        .with_detector(detector)
        .with_recognizer(recognizer)
        .build()
}
