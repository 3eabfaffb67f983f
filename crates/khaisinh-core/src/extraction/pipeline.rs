//! Extraction pipeline orchestrating detection, recognition and cleanup.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, error, info, warn};

use crate::error::{KhaiSinhError, Result};
use crate::models::{
    ClassLabelMap, ExtractionReport, ExtractionStatus, FieldMap, FieldRecord, KhaiSinhConfig,
};
use crate::ocr::{to_rgb, DetectionOracle, RecognitionOracle, RegionDetector, TextRecognizer};

use super::correct::ParentFieldCorrector;
use super::normalize::FieldNormalizer;
use super::select::select_regions;

/// Birth certificate field extractor.
///
/// Holds both oracles for its whole lifetime and no per-call state, so one
/// instance can serve many images (and threads, when the oracles allow).
/// Extraction never fails: faults are logged and yield an empty or
/// partial [`FieldMap`]. Use [`FieldExtractor::extract_report`] to learn
/// why a map came back empty.
pub struct FieldExtractor<D: DetectionOracle, R: RecognitionOracle> {
    detector: RegionDetector<D>,
    recognizer: TextRecognizer<R>,
    normalizer: FieldNormalizer,
    corrector: ParentFieldCorrector,
    fields: Option<HashSet<String>>,
}

/// Builder for [`FieldExtractor`].
pub struct FieldExtractorBuilder<D: DetectionOracle, R: RecognitionOracle> {
    detector: Option<D>,
    recognizer: Option<R>,
    config: KhaiSinhConfig,
}

impl<D: DetectionOracle, R: RecognitionOracle> FieldExtractorBuilder<D, R> {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            detector: None,
            recognizer: None,
            config: KhaiSinhConfig::default(),
        }
    }

    /// Set the detection oracle.
    pub fn with_detector(mut self, detector: D) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Set the recognition oracle.
    pub fn with_recognizer(mut self, recognizer: R) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Set configuration.
    pub fn with_config(mut self, config: KhaiSinhConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the class label table from the configuration.
    pub fn with_class_map(mut self, class_labels: ClassLabelMap) -> Self {
        self.config.extraction.class_labels = class_labels;
        self
    }

    /// Restrict extraction to the given labels.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.extraction.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Build the extractor.
    pub fn build(self) -> Result<FieldExtractor<D, R>> {
        let detector = self
            .detector
            .ok_or_else(|| KhaiSinhError::Config("no detection oracle configured".to_string()))?;
        let recognizer = self
            .recognizer
            .ok_or_else(|| KhaiSinhError::Config("no recognition oracle configured".to_string()))?;

        let threshold = self.config.detection.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(KhaiSinhError::Config(format!(
                "confidence threshold must be within [0, 1], got {}",
                threshold
            )));
        }

        let extraction = self.config.extraction;
        Ok(FieldExtractor {
            detector: RegionDetector::new(detector)
                .with_class_labels(extraction.class_labels.clone())
                .with_threshold(threshold),
            recognizer: TextRecognizer::new(recognizer).with_padding(self.config.recognition.padding),
            normalizer: FieldNormalizer::with_cache_size(extraction.name_cache_size),
            corrector: ParentFieldCorrector::new(),
            fields: extraction.field_filter(),
        })
    }
}

impl<D: DetectionOracle, R: RecognitionOracle> Default for FieldExtractorBuilder<D, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DetectionOracle, R: RecognitionOracle> FieldExtractor<D, R> {
    /// Create a new builder.
    pub fn builder() -> FieldExtractorBuilder<D, R> {
        FieldExtractorBuilder::new()
    }

    /// The allow-list set at construction, if any.
    pub fn field_filter(&self) -> Option<&HashSet<String>> {
        self.fields.as_ref()
    }

    /// Extract fields using the allow-list set at construction.
    pub fn extract(&self, image: &DynamicImage) -> FieldMap {
        self.extract_report(image, self.fields.as_ref()).fields
    }

    /// Extract only the labels in `fields`, ignoring the configured list.
    pub fn extract_only(&self, image: &DynamicImage, fields: &HashSet<String>) -> FieldMap {
        self.extract_report(image, Some(fields)).fields
    }

    /// Extract fields from each image in turn. Output order follows input.
    pub fn extract_batch(&self, images: &[DynamicImage]) -> Vec<FieldMap> {
        images.iter().map(|image| self.extract(image)).collect()
    }

    /// Extract fields and report how the run ended.
    ///
    /// `allow` replaces the configured allow-list; `None` or an empty set
    /// extracts every detected label.
    pub fn extract_report(
        &self,
        image: &DynamicImage,
        allow: Option<&HashSet<String>>,
    ) -> ExtractionReport {
        let start = Instant::now();

        let mut report = match self.run(image, allow) {
            Ok(report) => report,
            Err(e) => {
                error!("Extraction failed: {}", e);
                ExtractionReport::new(ExtractionStatus::Failed)
            }
        };

        report.processing_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            "Extraction finished with {:?} in {}ms",
            report.status, report.processing_time_ms
        );
        report
    }

    fn run(&self, image: &DynamicImage, allow: Option<&HashSet<String>>) -> Result<ExtractionReport> {
        let image = prepare_image(image)?;

        let regions = match self.detector.try_detect(&image) {
            Ok(regions) => regions,
            Err(e) => {
                error!("Detection failed: {}", e);
                return Ok(ExtractionReport::new(ExtractionStatus::DetectorFault));
            }
        };

        if regions.is_empty() {
            warn!("No fields detected");
            return Ok(ExtractionReport::new(ExtractionStatus::NoDetections));
        }

        let regions_detected = regions.len();
        let mut fields = FieldMap::new();

        for region in select_regions(regions, allow) {
            let raw = self.recognizer.read_region(&image, &region.bbox);
            let value = self.normalizer.normalize(&region.label, &raw);
            if value.is_empty() {
                debug!("Dropping '{}': no text", region.label);
                continue;
            }

            fields.insert(
                region.label,
                FieldRecord {
                    value,
                    confidence: region.confidence,
                    bbox: region.bbox,
                },
            );
        }

        let fields = self.corrector.correct(fields);
        info!("Extracted {} fields", fields.len());

        let status = if fields.is_empty() {
            ExtractionStatus::Empty
        } else {
            ExtractionStatus::Extracted
        };

        Ok(ExtractionReport {
            fields,
            status,
            regions_detected,
            processing_time_ms: 0,
        })
    }
}

/// Reject empty images and convert the rest to RGB.
pub fn prepare_image(image: &DynamicImage) -> Result<Cow<'_, DynamicImage>> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(KhaiSinhError::InvalidInput(format!(
            "image has no pixels ({}x{})",
            width, height
        )));
    }
    Ok(to_rgb(image))
}

/// Load an image file.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let image = image::open(path)?;
    debug!(
        "Loaded {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Decode an image from encoded bytes (PNG, JPEG, ...).
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::models::labels;
    use crate::ocr::RawDetection;
    use image::{GrayImage, RgbImage};
    use pretty_assertions::assert_eq;

    struct StaticDetector(Vec<RawDetection>);

    impl DetectionOracle for StaticDetector {
        fn predict(&self, _: &DynamicImage, _: f32) -> std::result::Result<Vec<RawDetection>, OcrError> {
            Ok(self.0.clone())
        }
    }

    struct FaultyDetector;

    impl DetectionOracle for FaultyDetector {
        fn predict(&self, _: &DynamicImage, _: f32) -> std::result::Result<Vec<RawDetection>, OcrError> {
            Err(OcrError::Detection("session crashed".to_string()))
        }
    }

    /// Answers with the crop width, so tests can tell regions apart.
    struct WidthReader;

    impl RecognitionOracle for WidthReader {
        fn predict(&self, crop: &DynamicImage) -> std::result::Result<String, OcrError> {
            Ok(format!("w{}", crop.width()))
        }
    }

    struct BlankReader;

    impl RecognitionOracle for BlankReader {
        fn predict(&self, _: &DynamicImage) -> std::result::Result<String, OcrError> {
            Ok("   ".to_string())
        }
    }

    fn detection(x1: f32, width: f32, confidence: f32, class_id: u32) -> RawDetection {
        RawDetection {
            bbox: [x1, 10.0, x1 + width, 30.0],
            confidence,
            class_id,
        }
    }

    fn page() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(400, 200))
    }

    fn extractor<D: DetectionOracle, R: RecognitionOracle>(detector: D, reader: R) -> FieldExtractor<D, R> {
        FieldExtractor::builder()
            .with_detector(detector)
            .with_recognizer(reader)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_both_oracles() {
        let missing = FieldExtractorBuilder::<StaticDetector, WidthReader>::new()
            .with_detector(StaticDetector(Vec::new()))
            .build();
        assert!(matches!(missing, Err(KhaiSinhError::Config(_))));

        let missing = FieldExtractorBuilder::<StaticDetector, WidthReader>::new()
            .with_recognizer(WidthReader)
            .build();
        assert!(matches!(missing, Err(KhaiSinhError::Config(_))));
    }

    #[test]
    fn test_build_rejects_bad_threshold() {
        let mut config = KhaiSinhConfig::default();
        config.detection.confidence_threshold = 1.5;

        let result = FieldExtractor::builder()
            .with_config(config)
            .with_detector(StaticDetector(Vec::new()))
            .with_recognizer(WidthReader)
            .build();
        assert!(matches!(result, Err(KhaiSinhError::Config(_))));
    }

    #[test]
    fn test_deduplicates_and_normalizes() {
        let extractor = extractor(
            StaticDetector(vec![
                detection(10.0, 20.0, 0.4, 1),
                detection(100.0, 30.0, 0.9, 1),
                detection(200.0, 40.0, 0.8, 6),
            ]),
            WidthReader,
        );

        let report = extractor.extract_report(&page(), None);
        assert_eq!(report.status, ExtractionStatus::Extracted);
        assert_eq!(report.regions_detected, 3);

        let child = report.fields.get(labels::CHILD_NAME).unwrap();
        assert_eq!(child.value, "W34");
        assert_eq!(child.confidence, 0.9);
        assert_eq!(report.fields.value(labels::DOCUMENT_TYPE), Some("w44"));
    }

    #[test]
    fn test_configured_and_per_call_allow_lists() {
        let detections = vec![detection(10.0, 20.0, 0.7, 1), detection(100.0, 30.0, 0.9, 6)];
        let extractor = FieldExtractor::builder()
            .with_detector(StaticDetector(detections))
            .with_recognizer(WidthReader)
            .with_fields([labels::DOCUMENT_TYPE])
            .build()
            .unwrap();

        let fields = extractor.extract(&page());
        assert_eq!(fields.labels().collect::<Vec<_>>(), vec![labels::DOCUMENT_TYPE]);

        let only_child: HashSet<String> = [labels::CHILD_NAME.to_string()].into_iter().collect();
        let fields = extractor.extract_only(&page(), &only_child);
        assert_eq!(fields.labels().collect::<Vec<_>>(), vec![labels::CHILD_NAME]);
    }

    #[test]
    fn test_empty_allow_list_extracts_everything() {
        let detections = vec![detection(10.0, 20.0, 0.7, 1), detection(100.0, 30.0, 0.9, 6)];
        let extractor = FieldExtractor::builder()
            .with_detector(StaticDetector(detections))
            .with_recognizer(WidthReader)
            .with_fields(Vec::<String>::new())
            .build()
            .unwrap();

        assert_eq!(extractor.extract(&page()).len(), 2);
        assert_eq!(extractor.extract_only(&page(), &HashSet::new()).len(), 2);
    }

    #[test]
    fn test_zero_size_image_fails_softly() {
        let extractor = extractor(StaticDetector(vec![detection(0.0, 5.0, 0.9, 1)]), WidthReader);
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));

        let report = extractor.extract_report(&empty, None);
        assert_eq!(report.status, ExtractionStatus::Failed);
        assert!(report.fields.is_empty());
        assert!(extractor.extract(&empty).is_empty());
    }

    #[test]
    fn test_status_distinguishes_empty_outcomes() {
        let gray = DynamicImage::ImageLuma8(GrayImage::new(50, 50));

        let report = extractor(FaultyDetector, WidthReader).extract_report(&gray, None);
        assert_eq!(report.status, ExtractionStatus::DetectorFault);

        let report = extractor(StaticDetector(Vec::new()), WidthReader).extract_report(&gray, None);
        assert_eq!(report.status, ExtractionStatus::NoDetections);

        let report = extractor(StaticDetector(vec![detection(0.0, 5.0, 0.9, 1)]), BlankReader)
            .extract_report(&gray, None);
        assert_eq!(report.status, ExtractionStatus::Empty);
        assert_eq!(report.regions_detected, 1);
        assert!(report.fields.is_empty());
    }

    #[test]
    fn test_batch_preserves_order() {
        let extractor = extractor(StaticDetector(vec![detection(10.0, 20.0, 0.9, 1)]), WidthReader);
        let images = vec![
            page(),
            DynamicImage::ImageRgb8(RgbImage::new(0, 10)),
            page(),
        ];

        let results = extractor.extract_batch(&images);
        let sizes: Vec<usize> = results.iter().map(FieldMap::len).collect();
        assert_eq!(sizes, vec![1, 0, 1]);
    }

    #[test]
    fn test_decode_image_rejects_garbage() {
        assert!(matches!(decode_image(b"not an image"), Err(KhaiSinhError::Image(_))));
    }

    #[test]
    fn test_load_image_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        RgbImage::new(12, 7).save(&path).unwrap();

        let image = load_image(&path).unwrap();
        assert_eq!(image.dimensions(), (12, 7));
        assert!(load_image(&dir.path().join("missing.png")).is_err());
    }
}
