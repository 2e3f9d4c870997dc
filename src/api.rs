//! Wire types for the recognition service HTTP API.
//!
//! Shared between the `ryoshu-ocr-server` binary and [`crate::client`], so
//! both sides of the contract serialize the same shapes.

use crate::domain::{RecognizedWord, Roi};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request body for `POST /ocr`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OcrRequest {
    /// The page image, base64-encoded (PNG or JPEG).
    pub image_base64: String,
}

/// Response body for `POST /ocr`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OcrResponse {
    /// `"completed"` on success.
    pub status: String,
    /// Every recognized word with its quadrilateral box.
    pub words: Vec<RecognizedWord>,
    /// Wall-clock processing time, including queue wait.
    pub processing_time_ms: f64,
}

/// Request body for `POST /extract-roi`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractRoiRequest {
    /// Recognition output for the page.
    pub words: Vec<RecognizedWord>,
    /// The field rectangles to reconstruct.
    pub rois: Vec<Roi>,
}

/// Response body for `POST /extract-roi`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractRoiResponse {
    /// One trimmed entry per input ROI label (empty string on no match).
    pub extractions: BTreeMap<String, String>,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"healthy"` while the server is up.
    pub status: String,
    /// Whether the recognition engine has been loaded.
    pub resource_available: bool,
    /// Number of recognition jobs currently executing.
    pub queue_size: usize,
    /// The configured concurrency limit.
    pub max_concurrent: usize,
}

/// Error body returned with 4xx/5xx statuses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `"error"`.
    pub status: String,
    /// Human-readable failure description.
    pub detail: String,
}

impl ErrorResponse {
    /// Creates an error body from a failure description.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Rect;

    #[test]
    fn ocr_response_wire_shape() {
        let response = OcrResponse {
            status: "completed".into(),
            words: vec![RecognizedWord::new(
                "500円",
                [[1.0, 2.0], [3.0, 2.0], [3.0, 4.0], [1.0, 4.0]],
            )],
            processing_time_ms: 12.5,
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["words"][0]["content"], "500円");
        assert_eq!(json["words"][0]["points"][0][0], 1.0);
    }

    #[test]
    fn extract_request_parses_flat_rois() {
        let json = r#"{
            "words": [{"content": "abc", "points": [[0,0],[9,0],[9,9],[0,9]]}],
            "rois": [{"label": "金額", "x": 1, "y": 2, "w": 3, "h": 4}]
        }"#;
        let request: ExtractRoiRequest = serde_json::from_str(json).expect("deserialize");
        assert_eq!(request.rois[0].label, "金額");
        assert_eq!(request.rois[0].rect, Rect::new(1.0, 2.0, 3.0, 4.0));
    }
}
