//! Configuration types for the recognition engine and the admission gate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the ONNX recognition engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the text detection model.
    pub det_model: PathBuf,
    /// Path to the text recognition model.
    pub rec_model: PathBuf,
    /// Path to the character dictionary (one entry per line).
    pub dict_path: PathBuf,
    /// Intra-op thread count for each ONNX session.
    #[serde(default = "EngineConfig::default_intra_threads")]
    pub intra_threads: usize,
}

impl EngineConfig {
    /// Creates an engine configuration from the three required model paths.
    pub fn new(
        det_model: impl Into<PathBuf>,
        rec_model: impl Into<PathBuf>,
        dict_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            det_model: det_model.into(),
            rec_model: rec_model.into(),
            dict_path: dict_path.into(),
            intra_threads: Self::default_intra_threads(),
        }
    }

    /// Sets the intra-op thread count for the ONNX sessions.
    pub fn with_intra_threads(mut self, intra_threads: usize) -> Self {
        self.intra_threads = intra_threads.max(1);
        self
    }

    fn default_intra_threads() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .min(4)
    }
}

/// Configuration for the admission-controlled recognition service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Maximum number of recognition jobs executing simultaneously.
    ///
    /// Defaults to 1: the recognition engine is commonly backed by a single
    /// exclusive accelerator. Excess requests queue; they are never rejected.
    #[serde(default = "ServiceConfig::default_max_concurrent")]
    pub max_concurrent: usize,
}

impl ServiceConfig {
    fn default_max_concurrent() -> usize {
        1
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_concurrent: Self::default_max_concurrent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_service_config_is_single_slot() {
        assert_eq!(ServiceConfig::default().max_concurrent, 1);
    }

    #[test]
    fn engine_config_clamps_thread_count() {
        let config = EngineConfig::new("det.onnx", "rec.onnx", "dict.txt").with_intra_threads(0);
        assert_eq!(config.intra_threads, 1);
    }
}
