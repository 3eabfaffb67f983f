//! End-to-end extraction against painted pages and fake models.

use std::collections::HashMap;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use pretty_assertions::assert_eq;

use khaisinh_core::{
    labels, DetectionOracle, ExtractionStatus, FieldExtractor, OcrError, RawDetection,
    RecognitionOracle,
};

/// A painted block on the page: class, corners, confidence, shade, text.
struct Block {
    class_id: u32,
    bbox: [u32; 4],
    confidence: f32,
    shade: u8,
    text: &'static str,
}

/// Returns every block as a detection.
struct PageDetector(Vec<RawDetection>);

impl DetectionOracle for PageDetector {
    fn predict(&self, _: &DynamicImage, threshold: f32) -> Result<Vec<RawDetection>, OcrError> {
        Ok(self.0.iter().filter(|d| d.confidence >= threshold).copied().collect())
    }
}

/// Reads a crop by looking up the shade at its centre.
struct ShadeReader(HashMap<u8, &'static str>);

impl RecognitionOracle for ShadeReader {
    fn predict(&self, crop: &DynamicImage) -> Result<String, OcrError> {
        let (w, h) = crop.dimensions();
        let shade = crop.to_rgb8().get_pixel(w / 2, h / 2).0[0];
        self.0
            .get(&shade)
            .map(|text| text.to_string())
            .ok_or_else(|| OcrError::Recognition(format!("nothing painted at shade {}", shade)))
    }
}

fn setup(blocks: &[Block]) -> (DynamicImage, PageDetector, ShadeReader) {
    let mut page = RgbImage::from_pixel(400, 300, Rgb([255, 255, 255]));
    for block in blocks {
        let [x1, y1, x2, y2] = block.bbox;
        for y in y1..y2 {
            for x in x1..x2 {
                page.put_pixel(x, y, Rgb([block.shade; 3]));
            }
        }
    }

    let detections = blocks
        .iter()
        .map(|b| RawDetection {
            bbox: b.bbox.map(|c| c as f32),
            confidence: b.confidence,
            class_id: b.class_id,
        })
        .collect();
    let texts = blocks.iter().map(|b| (b.shade, b.text)).collect();

    (DynamicImage::ImageRgb8(page), PageDetector(detections), ShadeReader(texts))
}

fn block(class_id: u32, row: u32, confidence: f32, text: &'static str) -> Block {
    Block {
        class_id,
        bbox: [20, 10 + row * 40, 300, 40 + row * 40],
        confidence,
        shade: 10 + row as u8 * 20,
        text,
    }
}

fn certificate(father_caption: &'static str) -> Vec<Block> {
    vec![
        block(6, 0, 0.95, " GIẤY  KHAI SINH "),
        block(0, 1, 0.88, "Họ  và tên:"),
        block(1, 2, 0.91, "nguyễn  văn an"),
        block(2, 3, 0.80, "Họ tên mẹ:"),
        block(3, 4, 0.86, "trần_thị hoa"),
        block(4, 5, 0.83, father_caption),
        block(5, 6, 0.87, "lê-văn bình"),
    ]
}

fn extractor(
    detector: PageDetector,
    reader: ShadeReader,
) -> FieldExtractor<PageDetector, ShadeReader> {
    FieldExtractor::builder()
        .with_detector(detector)
        .with_recognizer(reader)
        .build()
        .unwrap()
}

#[test]
fn zero_detections_yield_empty_map() {
    let (page, detector, reader) = setup(&[]);
    let extractor = extractor(detector, reader);

    assert!(extractor.extract(&page).is_empty());
    assert_eq!(extractor.extract_report(&page, None).status, ExtractionStatus::NoDetections);
}

#[test]
fn full_certificate_is_normalized() {
    let (page, detector, reader) = setup(&certificate("Họ tên cha:"));
    let fields = extractor(detector, reader).extract(&page);

    let values: Vec<(&str, &str)> = fields
        .iter()
        .map(|(label, record)| (label.as_str(), record.value.as_str()))
        .collect();
    assert_eq!(
        values,
        vec![
            (labels::CHILD_NAME, "NGUYỄN VĂN AN"),
            (labels::FATHER_NAME, "LÊ VĂN BÌNH"),
            (labels::MOTHER_NAME, "TRẦN THỊ HOA"),
            (labels::FATHER_CAPTION, "Họ tên cha:"),
            (labels::MOTHER_CAPTION, "Họ tên mẹ:"),
            (labels::CHILD_CAPTION, "Họ và tên:"),
            (labels::DOCUMENT_TYPE, "Giấy khai sinh"),
        ]
    );

    let child = fields.get(labels::CHILD_NAME).unwrap();
    assert_eq!(child.confidence, 0.91);
    assert_eq!(<[u32; 4]>::from(child.bbox), [20, 90, 300, 120]);
}

#[test]
fn empty_text_is_dropped() {
    let mut blocks = certificate("Họ tên cha:");
    blocks[2].text = "   ";
    let (page, detector, reader) = setup(&blocks);

    let report = extractor(detector, reader).extract_report(&page, None);
    assert!(!report.fields.contains(labels::CHILD_NAME));
    assert_eq!(report.fields.len(), 6);
    assert_eq!(report.status, ExtractionStatus::Extracted);
}

#[test]
fn mislabeled_father_caption_swaps_parents() {
    let (page, detector, reader) = setup(&certificate("Họ và tên mẹ"));
    let fields = extractor(detector, reader).extract(&page);

    let mother = fields.get(labels::MOTHER_NAME).unwrap();
    assert_eq!(mother.value, "LÊ VĂN BÌNH");
    assert_eq!(mother.confidence, 0.87);
    assert_eq!(fields.value(labels::FATHER_NAME), Some("TRẦN THỊ HOA"));
}

#[test]
fn duplicate_labels_keep_the_most_confident() {
    let mut blocks = certificate("Họ tên cha:");
    blocks.push(Block {
        class_id: 1,
        bbox: [20, 290, 300, 299],
        confidence: 0.4,
        shade: 250,
        text: "sai tên",
    });
    let (page, detector, reader) = setup(&blocks);

    let fields = extractor(detector, reader).extract(&page);
    assert_eq!(fields.value(labels::CHILD_NAME), Some("NGUYỄN VĂN AN"));
}

#[test]
fn shared_models_serve_concurrent_pages() {
    let (page, detector, reader) = setup(&certificate("Họ tên cha:"));
    let detector = Arc::new(detector);
    let reader = Arc::new(reader);

    let first = FieldExtractor::builder()
        .with_detector(Arc::clone(&detector))
        .with_recognizer(Arc::clone(&reader))
        .build()
        .unwrap();
    let second = FieldExtractor::builder()
        .with_detector(detector)
        .with_recognizer(reader)
        .with_fields([labels::DOCUMENT_TYPE])
        .build()
        .unwrap();

    std::thread::scope(|s| {
        let a = s.spawn(|| first.extract_batch(&[page.clone(), page.clone()]));
        let b = s.spawn(|| second.extract(&page));

        let batch = a.join().unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|fields| fields.len() == 7));
        assert_eq!(b.join().unwrap().len(), 1);
    });
}
