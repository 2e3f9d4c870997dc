//! Configuration types for the server binary.

use ryoshu_ocr::core::config::{EngineConfig, ServiceConfig};

/// Configuration for the HTTP server.
#[derive(Clone)]
pub struct ServerConfig {
    pub engine: EngineConfig,
    pub service: ServiceConfig,
    pub host: String,
    pub port: u16,
}
