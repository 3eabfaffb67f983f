//! Region detection adapter.

use image::DynamicImage;
use tracing::{debug, error};

use crate::error::OcrError;
use crate::models::{BoundingBox, ClassLabelMap, Region};

use super::preprocessing::to_rgb;
use super::{DetectionOracle, RawDetection};

/// Default minimum region confidence.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Wraps a detection oracle: converts the page to RGB, labels the
/// regions and drops degenerate ones.
pub struct RegionDetector<D: DetectionOracle> {
    oracle: D,
    class_labels: ClassLabelMap,
    confidence_threshold: f32,
}

impl<D: DetectionOracle> RegionDetector<D> {
    /// Create a new region detector with the default label table.
    pub fn new(oracle: D) -> Self {
        Self {
            oracle,
            class_labels: ClassLabelMap::default(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    /// Set the class index to label table.
    pub fn with_class_labels(mut self, class_labels: ClassLabelMap) -> Self {
        self.class_labels = class_labels;
        self
    }

    /// Set the confidence threshold passed to the oracle.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Detect regions, degrading any oracle fault to "nothing found".
    ///
    /// An empty result is therefore ambiguous; use [`Self::try_detect`]
    /// to tell the two apart.
    pub fn detect(&self, image: &DynamicImage) -> Vec<Region> {
        match self.try_detect(image) {
            Ok(regions) => regions,
            Err(e) => {
                error!("Detection failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Detect regions, surfacing oracle faults.
    pub fn try_detect(&self, image: &DynamicImage) -> Result<Vec<Region>, OcrError> {
        let rgb = to_rgb(image);
        let raw = self.oracle.predict(&rgb, self.confidence_threshold)?;
        let total = raw.len();

        let regions: Vec<Region> = raw.into_iter().filter_map(|d| self.to_region(d)).collect();

        if regions.len() < total {
            debug!("Dropped {} degenerate detections", total - regions.len());
        }
        debug!("Detected {} regions", regions.len());

        Ok(regions)
    }

    fn to_region(&self, detection: RawDetection) -> Option<Region> {
        if !detection.confidence.is_finite() {
            return None;
        }
        let bbox = BoundingBox::from_detection(detection.bbox)?;

        Some(Region {
            bbox,
            confidence: detection.confidence,
            class_id: detection.class_id,
            label: self.class_labels.label(detection.class_id),
        })
    }
}
