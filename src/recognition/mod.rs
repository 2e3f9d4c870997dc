//! Text recognition: the ONNX engine and the admission-controlled service
//! that guards it.
//!
//! The engine (detection + recognition ONNX sessions) is the single
//! expensive resource of the whole system. It is never used directly by
//! request handlers; access goes through [`OcrService`], which loads it
//! lazily exactly once and bounds concurrent executions with a counting
//! admission gate.

pub mod detector;
pub mod engine;
pub mod preprocess;
pub mod recognizer;
pub mod service;

pub use engine::OnnxOcrEngine;
pub use service::{HealthSnapshot, OcrService};

use crate::core::errors::OcrError;
use crate::domain::RecognizedWord;
use image::RgbImage;

/// The recognition resource behind the admission gate.
///
/// Implementations run full-page OCR and return one entry per recognized
/// word, each with a non-empty text and a quadrilateral box in page-pixel
/// coordinates. The service serializes access according to its capacity
/// limit, so implementations only need internal consistency, not lock-free
/// concurrency.
pub trait RecognitionBackend: Send + Sync {
    /// Recognizes all words in a page image.
    fn recognize(&self, image: &RgbImage) -> Result<Vec<RecognizedWord>, OcrError>;
}
