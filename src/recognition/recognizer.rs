//! Text recognition (CRNN-style model with CTC decoding).

use ndarray::{Array4, ArrayViewD};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;

use crate::core::errors::OcrError;

/// Text and confidence for one recognized strip.
#[derive(Debug, Clone)]
pub struct RecognizedText {
    /// The decoded text (possibly empty).
    pub text: String,
    /// Mean per-character confidence.
    pub confidence: f32,
}

/// The text recognition session plus its character dictionary.
pub struct TextRecognizer {
    session: Mutex<Session>,
    charset: Vec<String>,
}

impl TextRecognizer {
    /// Loads the recognition model and character dictionary.
    ///
    /// The dictionary holds one entry per line; CTC class `i + 1` maps to
    /// line `i` (class 0 is the blank).
    pub fn load(model_path: &Path, dict_path: &Path, intra_threads: usize) -> Result<Self, OcrError> {
        let session = Session::builder()
            .and_then(|b| Ok(b.with_optimization_level(GraphOptimizationLevel::Level3)?))
            .and_then(|b| Ok(b.with_intra_threads(intra_threads.max(1))?))
            .and_then(|mut b| b.commit_from_file(model_path))
            .map_err(|e| OcrError::model_load(model_path.display().to_string(), e.to_string()))?;

        let charset = load_charset(dict_path)?;
        tracing::info!(entries = charset.len(), "character dictionary loaded");

        Ok(Self {
            session: Mutex::new(session),
            charset,
        })
    }

    /// Recognizes a batch of prepared strips, one result per batch row.
    pub fn recognize_batch(&self, input: Array4<f32>) -> Result<Vec<RecognizedText>, OcrError> {
        let batch_size = input.shape()[0];

        let input_tensor = Tensor::from_array(input)
            .map_err(|e| OcrError::inference("recognition", e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| OcrError::inference("recognition", "session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| OcrError::inference("recognition", e.to_string()))?;

        let output_view = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| OcrError::inference("recognition", e.to_string()))?;
        let output = output_view.to_owned();
        drop(outputs);
        drop(session);

        let shape = output.shape();
        if shape.len() != 3 {
            return Err(OcrError::inference(
                "recognition",
                format!("unexpected output shape: {:?}", shape),
            ));
        }
        let seq_len = shape[1];
        let num_classes = shape[2];

        let mut results = Vec::with_capacity(batch_size);
        for b in 0..batch_size {
            results.push(decode_ctc(&output.view(), b, seq_len, num_classes, &self.charset));
        }
        Ok(results)
    }
}

/// Greedy CTC decode: argmax per timestep, collapse repeats, drop blanks.
fn decode_ctc(
    output: &ArrayViewD<f32>,
    batch_idx: usize,
    seq_len: usize,
    num_classes: usize,
    charset: &[String],
) -> RecognizedText {
    let mut text = String::new();
    let mut confidence_sum = 0.0f32;
    let mut char_count = 0usize;
    let mut last_idx: Option<usize> = None;

    for t in 0..seq_len {
        let mut max_prob = f32::NEG_INFINITY;
        let mut max_idx = 0usize;
        for c in 0..num_classes {
            let prob = output[[batch_idx, t, c]];
            if prob > max_prob {
                max_prob = prob;
                max_idx = c;
            }
        }

        const BLANK_IDX: usize = 0;
        if max_idx != BLANK_IDX && Some(max_idx) != last_idx {
            let char_idx = max_idx - 1;
            if char_idx < charset.len() {
                text.push_str(&charset[char_idx]);
                confidence_sum += max_prob.clamp(0.0, 1.0);
                char_count += 1;
            }
        }
        last_idx = Some(max_idx);
    }

    let confidence = if char_count > 0 {
        confidence_sum / char_count as f32
    } else {
        0.0
    };
    RecognizedText { text, confidence }
}

fn load_charset(path: &Path) -> Result<Vec<String>, OcrError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| OcrError::model_load(path.display().to_string(), e.to_string()))?;
    let charset: Vec<String> = content.lines().map(|s| s.to_string()).collect();
    if charset.is_empty() {
        return Err(OcrError::model_load(
            path.display().to_string(),
            "character dictionary is empty",
        ));
    }
    Ok(charset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn charset() -> Vec<String> {
        vec!["1".into(), "2".into(), "3".into(), "円".into()]
    }

    fn logits(steps: &[usize], num_classes: usize) -> Array3<f32> {
        let mut output = Array3::<f32>::zeros((1, steps.len(), num_classes));
        for (t, &class) in steps.iter().enumerate() {
            output[[0, t, class]] = 0.95;
        }
        output
    }

    #[test]
    fn ctc_collapses_repeats_and_blanks() {
        // blank, '1', '1', blank, '2', '2', '円'
        let output = logits(&[0, 1, 1, 0, 2, 2, 4], 5);
        let dyn_view = output.view().into_dyn();
        let result = decode_ctc(&dyn_view, 0, 7, 5, &charset());
        assert_eq!(result.text, "12円");
        assert!(result.confidence > 0.9);
    }

    #[test]
    fn repeated_char_across_blank_is_kept() {
        // '1', blank, '1' must decode to "11".
        let output = logits(&[1, 0, 1], 5);
        let dyn_view = output.view().into_dyn();
        let result = decode_ctc(&dyn_view, 0, 3, 5, &charset());
        assert_eq!(result.text, "11");
    }

    #[test]
    fn all_blank_sequence_is_empty_with_zero_confidence() {
        let output = logits(&[0, 0, 0], 5);
        let dyn_view = output.view().into_dyn();
        let result = decode_ctc(&dyn_view, 0, 3, 5, &charset());
        assert_eq!(result.text, "");
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn out_of_dictionary_class_is_skipped() {
        // Class 5 has no charset entry (charset has 4 entries, classes 1-4).
        let output = logits(&[5, 1], 6);
        let dyn_view = output.view().into_dyn();
        let result = decode_ctc(&dyn_view, 0, 2, 6, &charset());
        assert_eq!(result.text, "1");
    }
}
