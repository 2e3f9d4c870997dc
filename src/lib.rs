//! Receipt OCR pipeline library.
//!
//! This crate turns scanned paper receipts into structured per-field data.
//! It provides the four core stages of that pipeline:
//!
//! - [`layout`]: layout fingerprinting and style-group clustering, so pages
//!   that share the same receipt form are processed with the same field
//!   template.
//! - [`recognition`]: an admission-controlled OCR service around a single
//!   shared ONNX recognition engine (PP-OCR style detection + recognition).
//! - [`roi`]: reconstruction of field-level text from word-level recognition
//!   output against caller-defined rectangles.
//! - [`normalize`]: receipt field normalization (currency digits, Japanese
//!   era dates).
//!
//! The [`pipeline`] module composes the stages over a batch of pages, and
//! [`api`]/[`client`] define the HTTP wire contract served by the
//! `ryoshu-ocr-server` binary.

pub mod api;
pub mod client;
pub mod core;
pub mod domain;
pub mod layout;
pub mod normalize;
pub mod pipeline;
pub mod recognition;
pub mod roi;
pub mod utils;

// Re-export the types most callers need.
pub use crate::core::config::{EngineConfig, ServiceConfig};
pub use crate::core::errors::OcrError;
pub use crate::domain::{
    ExtractedField, Page, RecognizedWord, Rect, Roi, StyleGroup, TemplateStore,
};
pub use crate::layout::cluster_pages;
pub use crate::recognition::{HealthSnapshot, OcrService, RecognitionBackend};
