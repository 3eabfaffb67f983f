//! Line recognizer decoded with greedy CTC over a character dictionary.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{KhaiSinhError, OcrError};
use khaisinh_inference::{InferenceBackend, InputTensor};

use super::preprocessing::ImagePreprocessor;

/// Recognizer configuration file (`recognizer.json`).
///
/// Relative paths are resolved against the directory holding the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerSpec {
    /// Recognition model file.
    pub model: PathBuf,

    /// Character dictionary, one character per line. `None` uses the
    /// built-in Vietnamese alphabet.
    pub dictionary: Option<PathBuf>,

    /// Model input height.
    pub image_height: u32,

    /// Maximum model input width.
    pub max_width: u32,

    /// Model input name.
    pub input_name: String,

    /// Append a space class after the dictionary entries.
    pub use_space_char: bool,
}

impl Default for RecognizerSpec {
    fn default() -> Self {
        Self {
            model: PathBuf::from("rec.onnx"),
            dictionary: Some(PathBuf::from("vi_dict.txt")),
            image_height: 48,
            max_width: 640,
            input_name: "x".to_string(),
            use_space_char: true,
        }
    }
}

impl RecognizerSpec {
    /// Load a spec and resolve its paths relative to the file.
    pub fn from_file(path: &Path) -> Result<Self, KhaiSinhError> {
        if !path.exists() {
            return Err(KhaiSinhError::ModelNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let mut spec: RecognizerSpec = serde_json::from_str(&content)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        spec.model = base.join(&spec.model);
        spec.dictionary = spec.dictionary.map(|d| base.join(d));

        if spec.image_height == 0 || spec.max_width == 0 {
            return Err(KhaiSinhError::Config(format!(
                "recognizer input must be non-empty, got {}x{}",
                spec.max_width, spec.image_height
            )));
        }

        Ok(spec)
    }

    /// Build the CTC label table: blank, dictionary entries, optional space.
    pub fn load_labels(&self) -> Result<Vec<char>, KhaiSinhError> {
        let mut labels = match &self.dictionary {
            Some(path) => load_dictionary(path)?,
            None => default_vietnamese_dictionary(),
        };
        if self.use_space_char {
            labels.push(' ');
        }
        Ok(labels)
    }
}

/// Load a dictionary file. Index 0 is the CTC blank.
pub fn load_dictionary(path: &Path) -> Result<Vec<char>, KhaiSinhError> {
    if !path.exists() {
        return Err(KhaiSinhError::ModelNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let mut chars: Vec<char> = vec![' '];
    chars.extend(content.lines().filter_map(|line| line.chars().next()));

    debug!("Loaded dictionary with {} characters", chars.len());
    Ok(chars)
}

/// Built-in Vietnamese alphabet. Index 0 is the CTC blank.
pub fn default_vietnamese_dictionary() -> Vec<char> {
    const VOWELS: &str = "aàáảãạăằắẳẵặâầấẩẫậeèéẻẽẹêềếểễệiìíỉĩị\
                          oòóỏõọôồốổỗộơờớởỡợuùúủũụưừứửữựyỳýỷỹỵ";

    let mut chars = vec![' '];
    chars.extend('0'..='9');

    let lower: Vec<char> = ('a'..='z')
        .chain(VOWELS.chars().filter(|c| !c.is_ascii()))
        .chain(['đ'])
        .collect();
    let upper: Vec<char> = lower
        .iter()
        .filter_map(|c| c.to_uppercase().next())
        .collect();
    chars.extend(lower);
    chars.extend(upper);

    chars.extend([
        '.', ',', ';', ':', '!', '?', '-', '_', '/', '\\', '(', ')', '"', '\'', '&', '%', '+',
    ]);

    chars
}

/// Line recognizer using a CTC model.
pub struct CtcRecognizer<B: InferenceBackend> {
    backend: B,
    preprocessor: ImagePreprocessor,
    labels: Vec<char>,
    input_name: String,
}

impl<B: InferenceBackend> CtcRecognizer<B> {
    /// Create a new recognizer; `labels[0]` must be the blank.
    pub fn new(backend: B, labels: Vec<char>) -> Self {
        Self {
            backend,
            preprocessor: ImagePreprocessor::new(),
            labels,
            input_name: "x".to_string(),
        }
    }

    /// Create a recognizer from a loaded spec.
    pub fn from_spec(backend: B, spec: &RecognizerSpec) -> Result<Self, KhaiSinhError> {
        let labels = spec.load_labels()?;
        Ok(Self {
            backend,
            preprocessor: ImagePreprocessor::new()
                .with_recognition_shape(spec.image_height, spec.max_width),
            labels,
            input_name: spec.input_name.clone(),
        })
    }

    fn decode(&self, output: &ArrayD<f32>) -> Result<String, OcrError> {
        // Output shape is [1, T, num_classes]
        let shape = output.shape();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(OcrError::Recognition(format!("Invalid output shape: {:?}", shape)));
        }

        let (seq_len, num_classes) = (shape[1], shape[2]);
        let mut text = String::new();
        let mut prev_idx = 0usize;

        for t in 0..seq_len {
            let mut max_idx = 0;
            let mut max_val = f32::NEG_INFINITY;
            for c in 0..num_classes {
                let val = output[[0, t, c]];
                if val > max_val {
                    max_val = val;
                    max_idx = c;
                }
            }

            if max_idx != 0 && max_idx != prev_idx {
                if let Some(&c) = self.labels.get(max_idx) {
                    text.push(c);
                }
            }
            prev_idx = max_idx;
        }

        trace!("CTC decoded {} steps into '{}'", seq_len, text);
        Ok(text)
    }
}

impl<B: InferenceBackend> super::RecognitionOracle for CtcRecognizer<B> {
    fn predict(&self, crop: &DynamicImage) -> Result<String, OcrError> {
        let tensor = self.preprocessor.preprocess_for_recognition(crop)?;

        let output = self
            .backend
            .run_single(&self.input_name, InputTensor::Float32(tensor.into_dyn()))
            .map_err(|e| OcrError::Recognition(e.to_string()))?;

        self.decode(&output.into_f32())
    }
}
