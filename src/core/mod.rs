//! Core configuration and error types shared across the pipeline.

pub mod config;
pub mod errors;

pub use config::{EngineConfig, ServiceConfig};
pub use errors::OcrError;
