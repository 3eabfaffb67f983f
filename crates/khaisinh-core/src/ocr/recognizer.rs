//! Text recognition adapter.

use image::DynamicImage;
use tracing::{error, trace, warn};

use crate::models::BoundingBox;

use super::preprocessing::crop_region;
use super::RecognitionOracle;

/// Default padding around a region before cropping.
pub const DEFAULT_PADDING: u32 = 2;

/// Wraps a recognition oracle: crops regions with padding and turns
/// every failure into an empty string.
pub struct TextRecognizer<R: RecognitionOracle> {
    oracle: R,
    padding: u32,
}

impl<R: RecognitionOracle> TextRecognizer<R> {
    /// Create a new text recognizer.
    pub fn new(oracle: R) -> Self {
        Self {
            oracle,
            padding: DEFAULT_PADDING,
        }
    }

    /// Set crop padding.
    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn padding(&self) -> u32 {
        self.padding
    }

    /// Read the text inside `bbox` on `image`.
    ///
    /// A crop that clamps to zero area yields "" without calling the
    /// oracle.
    pub fn read_region(&self, image: &DynamicImage, bbox: &BoundingBox) -> String {
        match crop_region(image, bbox, self.padding) {
            Some(crop) => self.recognize(&crop),
            None => {
                warn!("Empty crop for bbox: {:?}", <[u32; 4]>::from(*bbox));
                String::new()
            }
        }
    }

    /// Recognize an already cropped image; output is trimmed.
    pub fn recognize(&self, crop: &DynamicImage) -> String {
        match self.oracle.predict(crop) {
            Ok(text) => {
                trace!("Recognized: '{}'", text);
                text.trim().to_string()
            }
            Err(e) => {
                error!("OCR failed for {}x{} crop: {}", crop.width(), crop.height(), e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use image::{GenericImageView, RgbImage};
    use std::sync::Mutex;

    /// Records crop sizes and answers with fixed text.
    struct SizeOracle {
        text: &'static str,
        calls: Mutex<Vec<(u32, u32)>>,
    }

    impl RecognitionOracle for SizeOracle {
        fn predict(&self, crop: &DynamicImage) -> Result<String, OcrError> {
            self.calls.lock().unwrap().push(crop.dimensions());
            Ok(self.text.to_string())
        }
    }

    struct FailingOracle;

    impl RecognitionOracle for FailingOracle {
        fn predict(&self, _: &DynamicImage) -> Result<String, OcrError> {
            Err(OcrError::Recognition("decoder blew up".to_string()))
        }
    }

    fn page() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(100, 60))
    }

    #[test]
    fn test_crop_is_padded_and_text_trimmed() {
        let recognizer = TextRecognizer::new(SizeOracle {
            text: "  Nguyễn Văn An \n",
            calls: Mutex::new(Vec::new()),
        });

        let text = recognizer.read_region(&page(), &BoundingBox::new(10, 10, 30, 20));
        assert_eq!(text, "Nguyễn Văn An");
        assert_eq!(recognizer.oracle.calls.lock().unwrap().as_slice(), &[(24, 14)]);
    }

    #[test]
    fn test_zero_area_crop_skips_oracle() {
        let recognizer = TextRecognizer::new(SizeOracle {
            text: "never",
            calls: Mutex::new(Vec::new()),
        });

        let text = recognizer.read_region(&page(), &BoundingBox::new(150, 70, 160, 80));
        assert_eq!(text, "");
        assert!(recognizer.oracle.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_oracle_fault_yields_empty_text() {
        let recognizer = TextRecognizer::new(FailingOracle).with_padding(0);
        assert_eq!(recognizer.read_region(&page(), &BoundingBox::new(0, 0, 5, 5)), "");
    }
}
