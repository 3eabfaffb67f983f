//! Birth certificate view and extraction reports.

use serde::{Deserialize, Serialize};

use super::field::{labels, FieldMap};

/// Typed view of the fields read from a birth certificate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BirthCertificate {
    /// Child's full name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_name: Option<String>,

    /// Mother's full name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mother_name: Option<String>,

    /// Father's full name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,

    /// Document title, canonically "Giấy khai sinh".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
}

impl BirthCertificate {
    /// Build the view from extracted fields. Missing fields stay `None`.
    pub fn from_fields(fields: &FieldMap) -> Self {
        let value = |label: &str| fields.value(label).map(str::to_string);
        Self {
            child_name: value(labels::CHILD_NAME),
            mother_name: value(labels::MOTHER_NAME),
            father_name: value(labels::FATHER_NAME),
            document_type: value(labels::DOCUMENT_TYPE),
        }
    }

    /// Whether the document was recognized as a birth certificate.
    pub fn is_birth_certificate(&self) -> bool {
        self.document_type.as_deref() == Some(crate::extraction::CANONICAL_DOCUMENT_TYPE)
    }
}

/// How an extraction ended.
///
/// An empty field map alone cannot tell "nothing on the page" from
/// "the detector broke"; the status can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// At least one field was extracted.
    Extracted,
    /// Regions were detected but every one produced empty text.
    Empty,
    /// The detector returned no usable regions.
    NoDetections,
    /// The detection oracle failed.
    DetectorFault,
    /// The input or the pipeline itself failed.
    Failed,
}

/// Fields extracted from one image together with how the run went.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionReport {
    /// Extracted fields (may be empty).
    pub fields: FieldMap,

    /// Outcome of the run.
    pub status: ExtractionStatus,

    /// Usable regions returned by the detector.
    pub regions_detected: usize,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl ExtractionReport {
    pub(crate) fn new(status: ExtractionStatus) -> Self {
        Self {
            fields: FieldMap::new(),
            status,
            regions_detected: 0,
            processing_time_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::{BoundingBox, FieldRecord};

    #[test]
    fn test_from_fields() {
        let mut fields = FieldMap::new();
        let bbox = BoundingBox::new(0, 0, 10, 10);
        fields.insert(
            labels::MOTHER_NAME,
            FieldRecord { value: "TRẦN THỊ HOA".to_string(), confidence: 0.9, bbox },
        );
        fields.insert(
            labels::DOCUMENT_TYPE,
            FieldRecord { value: "Giấy khai sinh".to_string(), confidence: 0.7, bbox },
        );

        let cert = BirthCertificate::from_fields(&fields);
        assert_eq!(cert.mother_name.as_deref(), Some("TRẦN THỊ HOA"));
        assert!(cert.father_name.is_none());
        assert!(cert.is_birth_certificate());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ExtractionStatus::NoDetections).unwrap();
        assert_eq!(json, "\"no_detections\"");
    }
}
