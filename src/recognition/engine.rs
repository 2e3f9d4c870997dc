//! The concrete ONNX recognition engine: detection followed by recognition.

use image::RgbImage;
use std::path::Path;

use super::detector::TextDetector;
use super::preprocess::{crop_word_region, prepare_det_input, prepare_rec_batches};
use super::recognizer::TextRecognizer;
use super::RecognitionBackend;
use crate::core::config::EngineConfig;
use crate::core::errors::OcrError;
use crate::domain::RecognizedWord;

/// Recognition strips per inference call.
const REC_BATCH_SIZE: usize = 32;

/// A PP-OCR-style two-stage engine: DB text detection plus CTC text
/// recognition, both running on ONNX Runtime.
///
/// Loading is expensive (two model files plus a dictionary); the service
/// loads one engine per process and shares it behind the admission gate.
pub struct OnnxOcrEngine {
    detector: TextDetector,
    recognizer: TextRecognizer,
}

impl OnnxOcrEngine {
    /// Loads the engine from its configuration.
    ///
    /// Model and dictionary paths are validated before the sessions are
    /// created so a misconfigured path fails with a useful message instead
    /// of a runtime error deep inside ONNX Runtime.
    pub fn load(config: &EngineConfig) -> Result<Self, OcrError> {
        require_file(&config.det_model, "detection model")?;
        require_file(&config.rec_model, "recognition model")?;
        require_file(&config.dict_path, "character dictionary")?;

        tracing::info!(model = %config.det_model.display(), "loading detection model");
        let detector = TextDetector::load(&config.det_model, config.intra_threads)?;

        tracing::info!(model = %config.rec_model.display(), "loading recognition model");
        let recognizer =
            TextRecognizer::load(&config.rec_model, &config.dict_path, config.intra_threads)?;

        tracing::info!("recognition engine loaded");
        Ok(Self {
            detector,
            recognizer,
        })
    }
}

impl RecognitionBackend for OnnxOcrEngine {
    fn recognize(&self, image: &RgbImage) -> Result<Vec<RecognizedWord>, OcrError> {
        let (det_input, _, _) = prepare_det_input(image);
        let boxes = self.detector.detect(det_input, image.width(), image.height())?;
        tracing::debug!(boxes = boxes.len(), "text regions detected");

        if boxes.is_empty() {
            return Ok(Vec::new());
        }

        let crops: Vec<RgbImage> = boxes
            .iter()
            .map(|b| crop_word_region(image, &b.points))
            .collect();

        let mut texts = Vec::with_capacity(crops.len());
        for batch in prepare_rec_batches(&crops, REC_BATCH_SIZE) {
            texts.extend(self.recognizer.recognize_batch(batch)?);
        }

        let words = boxes
            .into_iter()
            .zip(texts)
            .filter(|(_, text)| !text.text.trim().is_empty())
            .map(|(b, text)| RecognizedWord::new(text.text, b.points))
            .collect();

        Ok(words)
    }
}

fn require_file(path: &Path, what: &str) -> Result<(), OcrError> {
    if path.exists() {
        Ok(())
    } else {
        Err(OcrError::model_load(
            path.display().to_string(),
            format!("{} not found", what),
        ))
    }
}
