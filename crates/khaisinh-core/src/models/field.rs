//! Detected regions and extracted field records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field labels produced by the birth certificate detector.
pub mod labels {
    /// Printed caption preceding the child's name.
    pub const CHILD_CAPTION: &str = "k_name";
    /// Child's full name.
    pub const CHILD_NAME: &str = "Họ và tên";
    /// Printed caption preceding the mother's name.
    pub const MOTHER_CAPTION: &str = "k_m_name";
    /// Mother's full name.
    pub const MOTHER_NAME: &str = "Họ và tên Mẹ";
    /// Printed caption preceding the father's name.
    pub const FATHER_CAPTION: &str = "k_c_name";
    /// Father's full name.
    pub const FATHER_NAME: &str = "Họ và tên Cha";
    /// Document title ("Giấy khai sinh").
    pub const DOCUMENT_TYPE: &str = "object";

    /// Labels holding a person's full name.
    pub const NAME_FIELDS: [&str; 3] = [CHILD_NAME, MOTHER_NAME, FATHER_NAME];

    /// Labels holding a printed caption.
    pub const CAPTION_FIELDS: [&str; 3] = [CHILD_CAPTION, MOTHER_CAPTION, FATHER_CAPTION];
}

/// Axis-aligned bounding box in integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Convert detector coordinates, truncating towards zero.
    ///
    /// Returns `None` for boxes rejected by [`is_valid_bbox`].
    pub fn from_detection(coords: [f32; 4]) -> Option<Self> {
        if !is_valid_bbox(coords) {
            return None;
        }
        Some(Self::new(
            coords[0] as u32,
            coords[1] as u32,
            coords[2] as u32,
            coords[3] as u32,
        ))
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

impl From<[u32; 4]> for BoundingBox {
    fn from(v: [u32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [u32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Check that `[x1, y1, x2, y2]` describes a non-empty box with no
/// negative coordinate. NaN coordinates are rejected.
pub fn is_valid_bbox(coords: [f32; 4]) -> bool {
    let [x1, y1, x2, y2] = coords;
    x2 > x1 && y2 > y1 && coords.iter().all(|&c| c >= 0.0)
}

/// A labeled candidate region returned by the detector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    /// Region bounds on the source image.
    pub bbox: BoundingBox,
    /// Detection confidence (0.0 - 1.0).
    pub confidence: f32,
    /// Raw detector class index.
    pub class_id: u32,
    /// Field label derived from `class_id`.
    pub label: String,
}

/// Mapping from detector class index to field label.
///
/// Must follow the class order the detector was trained with; a mismatch
/// silently mislabels every detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassLabelMap(BTreeMap<u32, String>);

impl ClassLabelMap {
    pub fn new(entries: BTreeMap<u32, String>) -> Self {
        Self(entries)
    }

    /// Label for a class index, or `unknown_<id>` when unmapped.
    pub fn label(&self, class_id: u32) -> String {
        self.0
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| format!("unknown_{}", class_id))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ClassLabelMap {
    fn default() -> Self {
        let entries = [
            labels::CHILD_CAPTION,
            labels::CHILD_NAME,
            labels::MOTHER_CAPTION,
            labels::MOTHER_NAME,
            labels::FATHER_CAPTION,
            labels::FATHER_NAME,
            labels::DOCUMENT_TYPE,
        ]
        .into_iter()
        .enumerate()
        .map(|(id, label)| (id as u32, label.to_string()))
        .collect();

        Self(entries)
    }
}

/// One selected, recognized and normalized field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    /// Post-processed text.
    pub value: String,
    /// Confidence of the source region.
    pub confidence: f32,
    /// Bounds of the source region.
    pub bbox: BoundingBox,
}

/// Extracted fields keyed by label; at most one record per label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, FieldRecord>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, label: &str) -> Option<&FieldRecord> {
        self.0.get(label)
    }

    /// Value of a field, if present.
    pub fn value(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(|r| r.value.as_str())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains_key(label)
    }

    pub fn insert(&mut self, label: impl Into<String>, record: FieldRecord) -> Option<FieldRecord> {
        self.0.insert(label.into(), record)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldRecord)> {
        self.0.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Exchange the whole records stored under `a` and `b`.
    ///
    /// Nothing happens unless both labels are present. Returns whether
    /// the records were exchanged.
    pub fn swap(&mut self, a: &str, b: &str) -> bool {
        if a == b || !self.contains(a) || !self.contains(b) {
            return false;
        }
        if let (Some(ra), Some(rb)) = (self.0.remove(a), self.0.remove(b)) {
            self.0.insert(a.to_string(), rb);
            self.0.insert(b.to_string(), ra);
        }
        true
    }

    /// Label to value projection, dropping confidence and bounds.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(label, record)| (label.clone(), record.value.clone()))
            .collect()
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, FieldRecord);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
