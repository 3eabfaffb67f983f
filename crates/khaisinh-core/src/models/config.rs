//! Configuration structures for the extraction pipeline.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::field::ClassLabelMap;

/// Main configuration for the khaisinh pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KhaiSinhConfig {
    /// Region detection configuration.
    pub detection: DetectionConfig,

    /// Text recognition configuration.
    pub recognition: RecognitionConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Model configuration.
    pub models: ModelConfig,
}

/// Region detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum region confidence (0.0 - 1.0).
    pub confidence_threshold: f32,

    /// IoU above which same-class boxes are suppressed.
    pub iou_threshold: f32,

    /// Square input size of the detector model.
    pub input_size: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.3,
            iou_threshold: 0.7,
            input_size: 640,
        }
    }
}

/// Text recognizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Pixels added on every side of a region before cropping.
    pub padding: u32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self { padding: 2 }
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Labels to extract. `None` extracts every detected field.
    pub fields: Option<Vec<String>>,

    /// Detector class index to field label table.
    pub class_labels: ClassLabelMap,

    /// Capacity of the name normalization cache (0 disables it).
    pub name_cache_size: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            fields: None,
            class_labels: ClassLabelMap::default(),
            name_cache_size: 128,
        }
    }
}

impl ExtractionConfig {
    /// The allow-list as a set, if a non-empty one is configured.
    pub fn field_filter(&self) -> Option<HashSet<String>> {
        self.fields
            .as_ref()
            .filter(|fields| !fields.is_empty())
            .map(|fields| fields.iter().cloned().collect())
    }
}

/// Model file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Detector weights file name (ONNX export).
    pub detector_model: String,

    /// Recognizer configuration file name (JSON).
    pub recognizer_config: String,

    /// Number of CPU threads per inference session.
    pub num_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detector_model: "best.onnx".to_string(),
            recognizer_config: "recognizer.json".to_string(),
            num_threads: 4,
        }
    }
}

impl KhaiSinhConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.models.model_dir.join(model_name)
    }

    /// Path of the detector weights.
    pub fn detector_path(&self) -> PathBuf {
        self.model_path(&self.models.detector_model)
    }

    /// Path of the recognizer configuration.
    pub fn recognizer_config_path(&self) -> PathBuf {
        self.model_path(&self.models.recognizer_config)
    }
}
