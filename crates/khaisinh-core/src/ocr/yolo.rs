//! YOLO region detector on top of an ONNX backend.
//!
//! Expects an Ultralytics-style export: a single `images` input of shape
//! `[1, 3, S, S]` and a single output holding, per anchor, the box centre,
//! size and one score per class. Both `[1, 4 + C, N]` and the transposed
//! `[1, N, 4 + C]` layouts are accepted.

use image::{DynamicImage, GenericImageView};
use ndarray::ArrayD;
use tracing::debug;

use crate::error::OcrError;
use khaisinh_inference::{InferenceBackend, InputTensor};

use super::preprocessing::{ImagePreprocessor, Letterbox};
use super::{DetectionOracle, RawDetection};

/// Region detector running a YOLO model.
pub struct YoloDetector<B: InferenceBackend> {
    backend: B,
    preprocessor: ImagePreprocessor,
    iou_threshold: f32,
}

impl<B: InferenceBackend> YoloDetector<B> {
    /// Create a new detector with the given backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            preprocessor: ImagePreprocessor::new(),
            iou_threshold: 0.7,
        }
    }

    /// Set the square model input size.
    pub fn with_input_size(mut self, size: u32) -> Self {
        self.preprocessor = self.preprocessor.with_detection_size(size);
        self
    }

    /// Set NMS IoU threshold.
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    fn decode(
        &self,
        output: &ArrayD<f32>,
        letterbox: Letterbox,
        (width, height): (u32, u32),
        threshold: f32,
    ) -> Result<Vec<RawDetection>, OcrError> {
        let shape = output.shape();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(OcrError::Detection(format!("Invalid output shape: {:?}", shape)));
        }

        // Ultralytics puts attributes first; anchors always outnumber them.
        let transposed = shape[1] > shape[2];
        let (attrs, anchors) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if attrs <= 4 {
            return Err(OcrError::Detection(format!(
                "Output has no class scores: {:?}",
                shape
            )));
        }

        let value = |anchor: usize, attr: usize| {
            if transposed {
                output[[0, anchor, attr]]
            } else {
                output[[0, attr, anchor]]
            }
        };

        let (w, h) = (width as f32, height as f32);
        let mut detections = Vec::new();

        for anchor in 0..anchors {
            let (class_id, score) = (4..attrs)
                .map(|attr| (attr - 4, value(anchor, attr)))
                .fold((0, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });

            // Written this way so NaN scores never pass.
            if !(score >= threshold) {
                continue;
            }

            let (cx, cy) = (value(anchor, 0), value(anchor, 1));
            let (bw, bh) = (value(anchor, 2), value(anchor, 3));
            let (x1, y1) = letterbox.unmap(cx - bw / 2.0, cy - bh / 2.0);
            let (x2, y2) = letterbox.unmap(cx + bw / 2.0, cy + bh / 2.0);

            detections.push(RawDetection {
                bbox: [x1.clamp(0.0, w), y1.clamp(0.0, h), x2.clamp(0.0, w), y2.clamp(0.0, h)],
                confidence: score,
                class_id: class_id as u32,
            });
        }

        let candidates = detections.len();
        let kept = non_max_suppression(detections, self.iou_threshold);
        debug!("YOLO kept {} of {} candidates after NMS", kept.len(), candidates);

        Ok(kept)
    }
}

impl<B: InferenceBackend> DetectionOracle for YoloDetector<B> {
    fn predict(
        &self,
        image: &DynamicImage,
        confidence_threshold: f32,
    ) -> Result<Vec<RawDetection>, OcrError> {
        let (tensor, letterbox) = self.preprocessor.preprocess_for_detection(image)?;

        let output = self
            .backend
            .run_single("images", InputTensor::Float32(tensor.into_dyn()))
            .map_err(|e| OcrError::Detection(e.to_string()))?;

        debug!("Detection output shape: {:?}", output.shape());

        self.decode(&output.into_f32(), letterbox, image.dimensions(), confidence_threshold)
    }
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    let area = |r: &[f32; 4]| (r[2] - r[0]).max(0.0) * (r[3] - r[1]).max(0.0);
    let union = area(a) + area(b) - intersection;

    if union > 0.0 { intersection / union } else { 0.0 }
}

/// Class-aware NMS; output is ordered by confidence, highest first.
fn non_max_suppression(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<RawDetection> = Vec::with_capacity(detections.len());
    for det in detections {
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == det.class_id && iou(&k.bbox, &det.bbox) > iou_threshold);
        if !suppressed {
            keep.push(det);
        }
    }

    keep
}
