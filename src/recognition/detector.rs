//! Text detection (DB-style differentiable binarization model).
//!
//! The model outputs a per-pixel text probability map. Post-processing
//! thresholds the map, grows connected components, filters them by size and
//! mean score, unclips the resulting boxes, and rescales them to original
//! page coordinates.

use ndarray::{Array2, Array4, ArrayViewD};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;

use crate::core::errors::OcrError;

/// Binarization threshold over the probability map.
const THRESH: f32 = 0.3;
/// Minimum mean score for a component to be kept as a text box.
const BOX_THRESH: f32 = 0.5;
/// Minimum box side length in map pixels.
const MIN_SIZE: f32 = 5.0;
/// Box expansion factor applied after component extraction.
const UNCLIP_RATIO: f32 = 1.6;

/// A detected text box in original page coordinates.
#[derive(Debug, Clone)]
pub struct DetectedBox {
    /// The four corners of the box, `[x, y]` pairs, top-left first.
    pub points: [[f32; 2]; 4],
    /// Mean probability-map score over the component.
    pub score: f32,
}

/// The text detection session.
///
/// The session requires exclusive access to run, so it sits behind a mutex;
/// the service's admission gate bounds contention on it.
pub struct TextDetector {
    session: Mutex<Session>,
}

impl TextDetector {
    /// Loads the detection model from an ONNX file.
    pub fn load(model_path: &Path, intra_threads: usize) -> Result<Self, OcrError> {
        let session = Session::builder()
            .and_then(|b| Ok(b.with_optimization_level(GraphOptimizationLevel::Level3)?))
            .and_then(|b| Ok(b.with_intra_threads(intra_threads.max(1))?))
            .and_then(|mut b| b.commit_from_file(model_path))
            .map_err(|e| OcrError::model_load(model_path.display().to_string(), e.to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
        })
    }

    /// Detects text boxes in a prepared input tensor.
    ///
    /// `orig_w`/`orig_h` are the original page dimensions used to rescale
    /// boxes out of model-input space.
    pub fn detect(
        &self,
        input: Array4<f32>,
        orig_w: u32,
        orig_h: u32,
    ) -> Result<Vec<DetectedBox>, OcrError> {
        let input_tensor = Tensor::from_array(input)
            .map_err(|e| OcrError::inference("detection", e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| OcrError::inference("detection", "session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| OcrError::inference("detection", e.to_string()))?;

        let output_view = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| OcrError::inference("detection", e.to_string()))?;
        let prob_map = output_view.to_owned();
        drop(outputs);
        drop(session);

        post_process(&prob_map.view(), orig_w, orig_h)
    }
}

/// Thresholds the probability map and extracts scored boxes.
fn post_process(
    output: &ArrayViewD<f32>,
    orig_w: u32,
    orig_h: u32,
) -> Result<Vec<DetectedBox>, OcrError> {
    let shape = output.shape();
    let (h, w) = match shape.len() {
        4 => (shape[2], shape[3]),
        3 => (shape[1], shape[2]),
        _ => {
            return Err(OcrError::inference(
                "detection",
                format!("unexpected output shape: {:?}", shape),
            ))
        }
    };

    let mut binary = Array2::<u8>::zeros((h, w));
    for i in 0..h {
        for j in 0..w {
            let val = map_value(output, i, j);
            if val > THRESH {
                binary[[i, j]] = 255;
            }
        }
    }

    Ok(find_boxes(&binary, output, orig_w, orig_h))
}

fn map_value(output: &ArrayViewD<f32>, y: usize, x: usize) -> f32 {
    if output.shape().len() == 4 {
        output[[0, 0, y, x]]
    } else {
        output[[0, y, x]]
    }
}

/// Grows 4-connected components over the binarized map and converts each
/// surviving component into an unclipped, rescaled box.
fn find_boxes(binary: &Array2<u8>, prob_map: &ArrayViewD<f32>, orig_w: u32, orig_h: u32) -> Vec<DetectedBox> {
    let h = binary.shape()[0];
    let w = binary.shape()[1];
    let mut visited = Array2::<bool>::from_elem((h, w), false);
    let mut boxes = Vec::new();

    for start_y in 0..h {
        for start_x in 0..w {
            if binary[[start_y, start_x]] != 255 || visited[[start_y, start_x]] {
                continue;
            }

            let mut min_x = start_x;
            let mut max_x = start_x;
            let mut min_y = start_y;
            let mut max_y = start_y;
            let mut score_sum = 0.0f32;
            let mut count = 0usize;
            let mut stack = vec![(start_x, start_y)];
            visited[[start_y, start_x]] = true;

            while let Some((x, y)) = stack.pop() {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
                score_sum += map_value(prob_map, y, x);
                count += 1;

                for (dx, dy) in &[(0i64, -1i64), (0, 1), (-1, 0), (1, 0)] {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx >= 0 && nx < w as i64 && ny >= 0 && ny < h as i64 {
                        let (nx, ny) = (nx as usize, ny as usize);
                        if binary[[ny, nx]] == 255 && !visited[[ny, nx]] {
                            visited[[ny, nx]] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            let box_w = (max_x - min_x) as f32;
            let box_h = (max_y - min_y) as f32;
            if box_w < MIN_SIZE || box_h < MIN_SIZE {
                continue;
            }
            let avg_score = score_sum / count as f32;
            if avg_score < BOX_THRESH {
                continue;
            }

            let expand_w = box_w * (UNCLIP_RATIO - 1.0) / 2.0;
            let expand_h = box_h * (UNCLIP_RATIO - 1.0) / 2.0;
            let x1 = (min_x as f32 - expand_w).max(0.0);
            let y1 = (min_y as f32 - expand_h).max(0.0);
            let x2 = (max_x as f32 + expand_w).min(w as f32 - 1.0);
            let y2 = (max_y as f32 + expand_h).min(h as f32 - 1.0);

            let scale_x = orig_w as f32 / w as f32;
            let scale_y = orig_h as f32 / h as f32;

            boxes.push(DetectedBox {
                points: [
                    [x1 * scale_x, y1 * scale_y],
                    [x2 * scale_x, y1 * scale_y],
                    [x2 * scale_x, y2 * scale_y],
                    [x1 * scale_x, y2 * scale_y],
                ],
                score: avg_score,
            });
        }
    }

    // Top-to-bottom order; the extraction stage re-derives reading order
    // within a field, so this is only for stable output.
    boxes.sort_by(|a, b| {
        a.points[0][1]
            .partial_cmp(&b.points[0][1])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    boxes
}
