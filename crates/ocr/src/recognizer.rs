use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
}

/// Abstraction over the OCR engine.
/// Implementations accept raw image bytes and return the recognized text.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError>;
}

/// Returns a pre-set string regardless of the image. Lets the extraction
/// and categorization paths run without an OCR engine installed.
pub struct MockRecognizer {
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        if image_bytes.is_empty() {
            return Err(OcrError::ImageDecode("empty image".to_string()));
        }
        Ok(self.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_preset_text() {
        let r = MockRecognizer::new("PG&E\n$120.50");
        assert_eq!(r.recognize(b"fake image data").unwrap(), "PG&E\n$120.50");
    }

    #[test]
    fn mock_rejects_empty_image() {
        let r = MockRecognizer::new("hello");
        assert!(matches!(r.recognize(b""), Err(OcrError::ImageDecode(_))));
    }
}
