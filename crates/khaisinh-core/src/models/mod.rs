//! Data models and configuration.

pub mod certificate;
pub mod config;
pub mod field;

pub use certificate::{BirthCertificate, ExtractionReport, ExtractionStatus};
pub use config::KhaiSinhConfig;
pub use field::{is_valid_bbox, labels, BoundingBox, ClassLabelMap, FieldMap, FieldRecord, Region};
