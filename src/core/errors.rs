//! Error types for the receipt OCR pipeline.
//!
//! A single [`OcrError`] enum covers every fallible stage: decoding client
//! input, loading the recognition models, running inference, and IO around
//! templates and image files. Expected "no match" outcomes (an unparseable
//! date, an ROI that covers no words) are never errors; they degrade to
//! best-effort strings in the normalization and extraction code.

use thiserror::Error;

/// Errors that can occur in the receipt OCR pipeline.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The input image bytes could not be decoded.
    ///
    /// This is a client-input error: it is raised before a recognition job
    /// is admitted and never consumes a capacity slot.
    #[error("image decode failed: {message}")]
    ImageDecode {
        /// Description of the decode failure.
        message: String,
    },

    /// A recognition model or character dictionary failed to load.
    #[error("model load failed for '{path}': {reason}")]
    ModelLoad {
        /// Path of the model or dictionary that failed to load.
        path: String,
        /// Short reason string.
        reason: String,
    },

    /// Inference failed while a recognition job was executing.
    ///
    /// Fatal to the job, not to the service: the capacity slot is released
    /// and subsequent jobs remain admittable.
    #[error("inference failed in {stage}: {message}")]
    Inference {
        /// The pipeline stage where inference failed (e.g. "detection").
        stage: String,
        /// Additional context about the failure.
        message: String,
    },

    /// Invalid input that is not an image decode problem.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// A configuration problem (missing model files, bad settings).
    #[error("configuration: {message}")]
    Config {
        /// A message describing the configuration error.
        message: String,
    },

    /// An HTTP transport error from the service client.
    #[error("request failed: {message}")]
    Http {
        /// Description of the transport failure.
        message: String,
    },

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    /// Creates an image decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::ImageDecode {
            message: message.into(),
        }
    }

    /// Creates a model load error for the given path.
    pub fn model_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an inference error for the given pipeline stage.
    pub fn inference(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Inference {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if this error was caused by bad client input rather
    /// than a failure inside the service.
    ///
    /// The server maps client-input errors to HTTP 400 and everything else
    /// to HTTP 500.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            OcrError::ImageDecode { .. } | OcrError::InvalidInput { .. }
        )
    }
}

impl From<image::ImageError> for OcrError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageDecode {
            message: error.to_string(),
        }
    }
}
