//! Subcommands and the pieces they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod models;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use khaisinh_core::{ExtractionReport, ExtractionStatus, FieldMap, KhaiSinhConfig};

/// Image extensions accepted as input.
const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp", "gif"];

/// Location of the user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("khaisinh")
        .join("config.json")
}

/// Load configuration from `path`, else the user config file, else defaults.
/// `model_dir` overrides the configured model directory.
pub fn load_config(path: Option<&str>, model_dir: Option<&Path>) -> anyhow::Result<KhaiSinhConfig> {
    let mut config = match path {
        Some(path) => KhaiSinhConfig::from_file(Path::new(path))?,
        None => {
            let user_config = default_config_path();
            if user_config.exists() {
                debug!("Using config {}", user_config.display());
                KhaiSinhConfig::from_file(&user_config)?
            } else {
                KhaiSinhConfig::default()
            }
        }
    };

    if let Some(dir) = model_dir {
        config.models.model_dir = dir.to_path_buf();
    }

    Ok(config)
}

/// Whether `path` has an image file extension.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Response envelope for one processed image.
#[derive(Debug, Serialize)]
pub struct ExtractionResponse {
    pub success: bool,
    pub filename: String,
    /// Label to value pairs.
    pub data: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

/// Per-field confidence and bounds plus run details.
#[derive(Debug, Serialize)]
pub struct ResponseMetadata {
    pub status: ExtractionStatus,
    pub regions_detected: usize,
    pub processing_time_ms: u64,
    pub processed_at: String,
    pub fields: FieldMap,
}

impl ExtractionResponse {
    pub fn from_report(filename: &str, report: ExtractionReport, with_metadata: bool) -> Self {
        let data = report.fields.values();
        let metadata = with_metadata.then(|| ResponseMetadata {
            status: report.status,
            regions_detected: report.regions_detected,
            processing_time_ms: report.processing_time_ms,
            processed_at: chrono::Utc::now().to_rfc3339(),
            fields: report.fields,
        });

        Self {
            success: true,
            filename: filename.to_string(),
            data,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use khaisinh_core::{labels, BoundingBox, FieldRecord};
    use pretty_assertions::assert_eq;

    fn report() -> ExtractionReport {
        let mut fields = FieldMap::new();
        fields.insert(
            labels::CHILD_NAME,
            FieldRecord {
                value: "NGUYỄN VĂN AN".to_string(),
                confidence: 0.5,
                bbox: BoundingBox::new(1, 2, 30, 12),
            },
        );
        ExtractionReport {
            fields,
            status: ExtractionStatus::Extracted,
            regions_detected: 3,
            processing_time_ms: 12,
        }
    }

    #[test]
    fn test_image_extensions() {
        assert!(is_image_path(Path::new("scan.JPG")));
        assert!(is_image_path(Path::new("dir/scan.tiff")));
        assert!(!is_image_path(Path::new("scan.pdf")));
        assert!(!is_image_path(Path::new("scan")));
    }

    #[test]
    fn test_envelope_without_metadata() {
        let response = ExtractionResponse::from_report("a.png", report(), false);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "filename": "a.png",
                "data": { "Họ và tên": "NGUYỄN VĂN AN" }
            })
        );
    }

    #[test]
    fn test_envelope_with_metadata() {
        let response = ExtractionResponse::from_report("a.png", report(), true);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["metadata"]["status"], "extracted");
        assert_eq!(json["metadata"]["regions_detected"], 3);
        assert_eq!(json["metadata"]["fields"]["Họ và tên"]["bbox"], serde_json::json!([1, 2, 30, 12]));
    }

    #[test]
    fn test_model_dir_override() {
        let config = load_config(None, Some(Path::new("/opt/models"))).unwrap();
        assert_eq!(config.models.model_dir, PathBuf::from("/opt/models"));
    }
}
