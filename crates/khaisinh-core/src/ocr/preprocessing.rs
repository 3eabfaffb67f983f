//! Image preprocessing for the detector and recognizer models.

use std::borrow::Cow;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use tracing::debug;

use crate::error::OcrError;
use crate::models::BoundingBox;

/// Grey level the detector was trained to see in letterbox padding.
const LETTERBOX_FILL: f32 = 114.0 / 255.0;

/// Convert any colour layout (grey, palette, alpha, 16-bit) to 8-bit RGB.
///
/// Images that are already RGB8 are borrowed, not copied.
pub fn to_rgb(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageRgb8(_) => Cow::Borrowed(image),
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    }
}

/// Expand `bbox` by `padding` on every side and clamp it to a
/// `width` x `height` image.
///
/// Returns `(x, y, w, h)` of the crop, or `None` when the clamped area
/// is empty.
pub fn padded_crop(
    bbox: &BoundingBox,
    padding: u32,
    (width, height): (u32, u32),
) -> Option<(u32, u32, u32, u32)> {
    let x1 = bbox.x1.saturating_sub(padding);
    let y1 = bbox.y1.saturating_sub(padding);
    let x2 = bbox.x2.saturating_add(padding).min(width);
    let y2 = bbox.y2.saturating_add(padding).min(height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some((x1, y1, x2 - x1, y2 - y1))
}

/// Crop a padded region out of `image`, or `None` for a zero-area crop.
pub fn crop_region(image: &DynamicImage, bbox: &BoundingBox, padding: u32) -> Option<DynamicImage> {
    let (x, y, w, h) = padded_crop(bbox, padding, image.dimensions())?;
    Some(image.crop_imm(x, y, w, h))
}

/// Scale and offsets applied when letterboxing an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    /// Map a model-space point back onto the source image.
    pub fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Image preprocessor for the detector and recognizer models.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    /// Square input size of the detector.
    det_input_size: u32,
    /// Input height of the recognizer.
    rec_height: u32,
    /// Maximum input width of the recognizer.
    rec_max_width: u32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self {
            det_input_size: 640,
            rec_height: 48,
            rec_max_width: 640,
        }
    }

    /// Set detector input size.
    pub fn with_detection_size(mut self, size: u32) -> Self {
        self.det_input_size = size.max(32);
        self
    }

    /// Set recognizer input height and maximum width.
    pub fn with_recognition_shape(mut self, height: u32, max_width: u32) -> Self {
        self.rec_height = height.max(1);
        self.rec_max_width = max_width.max(1);
        self
    }

    pub fn detection_size(&self) -> u32 {
        self.det_input_size
    }

    /// Letterbox an image into the detector's square input.
    ///
    /// Returns an NCHW tensor with values in [0, 1] plus the transform
    /// needed to map boxes back.
    pub fn preprocess_for_detection(
        &self,
        image: &DynamicImage,
    ) -> Result<(Array4<f32>, Letterbox), OcrError> {
        let (orig_width, orig_height) = image.dimensions();
        if orig_width == 0 || orig_height == 0 {
            return Err(OcrError::InvalidImage(format!(
                "image has zero size: {}x{}",
                orig_width, orig_height
            )));
        }

        let size = self.det_input_size;
        let scale = (size as f32 / orig_width as f32).min(size as f32 / orig_height as f32);
        let new_width = ((orig_width as f32 * scale).round() as u32).clamp(1, size);
        let new_height = ((orig_height as f32 * scale).round() as u32).clamp(1, size);
        let pad_x = ((size - new_width) / 2) as f32;
        let pad_y = ((size - new_height) / 2) as f32;

        debug!(
            "Letterbox {}x{} -> {}x{} (scale {:.3}, pad {}x{})",
            orig_width, orig_height, new_width, new_height, scale, pad_x, pad_y
        );

        let rgb = image
            .resize_exact(new_width, new_height, FilterType::Triangle)
            .to_rgb8();

        let mut tensor =
            Array4::<f32>::from_elem((1, 3, size as usize, size as usize), LETTERBOX_FILL);

        let (ox, oy) = (pad_x as usize, pad_y as usize);
        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, oy + y as usize, ox + x as usize]] = pixel[c] as f32 / 255.0;
            }
        }

        Ok((tensor, Letterbox { scale, pad_x, pad_y }))
    }

    /// Resize a text crop to the recognizer height, keeping aspect ratio.
    ///
    /// Values are normalized to [-1, 1].
    pub fn preprocess_for_recognition(&self, image: &DynamicImage) -> Result<Array4<f32>, OcrError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage("empty crop".to_string()));
        }

        let aspect_ratio = width as f32 / height as f32;
        let target_width = ((self.rec_height as f32 * aspect_ratio).round() as u32)
            .clamp(1, self.rec_max_width);

        let rgb = image
            .resize_exact(target_width, self.rec_height, FilterType::Triangle)
            .to_rgb8();

        let mut tensor =
            Array4::<f32>::zeros((1, 3, self.rec_height as usize, target_width as usize));

        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                tensor[[0, c, y as usize, x as usize]] = (value - 0.5) / 0.5;
            }
        }

        Ok(tensor)
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}
