//! HTTP client for the recognition service.
//!
//! Used by frontends that run the wizard against a remote `ryoshu-ocr-server`
//! instead of an in-process engine. The base URL defaults to the
//! `RYOSHU_SERVER_URL` environment variable, falling back to localhost.

use image::RgbImage;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::api::{ExtractRoiRequest, ExtractRoiResponse, HealthResponse, OcrRequest, OcrResponse};
use crate::core::errors::OcrError;
use crate::domain::{RecognizedWord, Roi};
use crate::utils::encode_base64_png;

const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Recognition can take a while on large scans.
const OCR_TIMEOUT: Duration = Duration::from_secs(120);
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the three service endpoints.
pub struct OcrClient {
    base_url: String,
    http: reqwest::Client,
}

impl OcrClient {
    /// Creates a client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Creates a client from `RYOSHU_SERVER_URL`, defaulting to localhost.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("RYOSHU_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        Self::new(base_url)
    }

    /// Checks server liveness and load.
    pub async fn health(&self) -> Result<HealthResponse, OcrError> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_error)?;
        response.json().await.map_err(http_error)
    }

    /// Runs OCR on a page image and returns the recognized words.
    pub async fn recognize(&self, image: &RgbImage) -> Result<Vec<RecognizedWord>, OcrError> {
        let request = OcrRequest {
            image_base64: encode_base64_png(image)?,
        };
        let response = self
            .http
            .post(format!("{}/ocr", self.base_url))
            .timeout(OCR_TIMEOUT)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_error)?;
        let body: OcrResponse = response.json().await.map_err(http_error)?;
        Ok(body.words)
    }

    /// Extracts field text from recognized words for a set of ROIs.
    pub async fn extract_rois(
        &self,
        words: Vec<RecognizedWord>,
        rois: Vec<Roi>,
    ) -> Result<BTreeMap<String, String>, OcrError> {
        let request = ExtractRoiRequest { words, rois };
        let response = self
            .http
            .post(format!("{}/extract-roi", self.base_url))
            .timeout(EXTRACT_TIMEOUT)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_error)?;
        let body: ExtractRoiResponse = response.json().await.map_err(http_error)?;
        Ok(body.extractions)
    }
}

fn http_error(error: reqwest::Error) -> OcrError {
    OcrError::Http {
        message: error.to_string(),
    }
}
