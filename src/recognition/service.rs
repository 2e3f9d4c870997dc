//! The admission-controlled recognition service.
//!
//! One engine, one gate: the recognition engine is loaded lazily exactly
//! once per process (concurrent first callers coalesce on a single load),
//! and a counting semaphore bounds how many recognition jobs execute
//! simultaneously regardless of how many requests arrive. Excess requests
//! queue on the semaphore rather than being rejected; fairness across
//! waiters is "eventually admitted", not arrival order. Once a job is
//! admitted it runs to completion; there is no mid-flight cancellation.
//!
//! The engine handle and the slot counter are the only process-wide mutable
//! state. Everything else (images, word lists, results) is local to one
//! request/response cycle.

use image::RgbImage;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info, warn};

use super::engine::OnnxOcrEngine;
use super::RecognitionBackend;
use crate::core::config::{EngineConfig, ServiceConfig};
use crate::core::errors::OcrError;
use crate::domain::RecognizedWord;
use crate::utils::load_rgb_from_bytes;

type SharedBackend = Arc<dyn RecognitionBackend>;
type BackendLoader = Arc<dyn Fn() -> Result<SharedBackend, OcrError> + Send + Sync>;

/// Point-in-time load snapshot of the service.
///
/// `queue_size` counts in-flight executions (admitted, not yet finished);
/// it is informational and makes no promise about future admission.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HealthSnapshot {
    /// Whether the recognition engine has been loaded.
    pub resource_available: bool,
    /// Number of capacity slots currently held by executing jobs.
    pub queue_size: usize,
    /// The configured capacity limit.
    pub max_concurrent: usize,
}

/// Serializes access to the shared recognition engine.
pub struct OcrService {
    backend: OnceCell<SharedBackend>,
    loader: BackendLoader,
    gate: Semaphore,
    max_concurrent: usize,
}

impl OcrService {
    /// Creates a service that lazily loads its backend from `loader` on
    /// first use.
    pub fn new(config: &ServiceConfig, loader: BackendLoader) -> Self {
        let max_concurrent = config.max_concurrent.max(1);
        Self {
            backend: OnceCell::new(),
            loader,
            gate: Semaphore::new(max_concurrent),
            max_concurrent,
        }
    }

    /// Creates a service backed by the ONNX engine described by
    /// `engine_config`. The engine is not loaded until the first
    /// recognition call.
    pub fn with_engine_config(config: &ServiceConfig, engine_config: EngineConfig) -> Self {
        Self::new(
            config,
            Arc::new(move || {
                let engine = OnnxOcrEngine::load(&engine_config)?;
                Ok(Arc::new(engine) as SharedBackend)
            }),
        )
    }

    /// Creates a service around an already-constructed backend.
    pub fn with_backend(config: &ServiceConfig, backend: SharedBackend) -> Self {
        let max_concurrent = config.max_concurrent.max(1);
        Self {
            backend: OnceCell::new_with(Some(backend)),
            loader: Arc::new(|| Err(OcrError::config("backend was provided at construction"))),
            gate: Semaphore::new(max_concurrent),
            max_concurrent,
        }
    }

    /// Recognizes all words in an encoded image.
    ///
    /// Decoding happens before admission: undecodable input fails fast with
    /// a client-input error and never consumes a capacity slot.
    pub async fn recognize_bytes(&self, bytes: &[u8]) -> Result<Vec<RecognizedWord>, OcrError> {
        let image = load_rgb_from_bytes(bytes)?;
        self.recognize(image).await
    }

    /// Recognizes all words in a decoded page image.
    ///
    /// The caller's task blocks while waiting for a capacity slot; the
    /// recognition call itself runs on the blocking pool so concurrent
    /// request handling is never stalled by an executing job. The slot is
    /// released on every exit path, including recognition failure.
    pub async fn recognize(&self, image: RgbImage) -> Result<Vec<RecognizedWord>, OcrError> {
        let backend = self.backend().await?;

        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| OcrError::inference("admission", "capacity gate closed"))?;
        debug!(
            in_flight = self.max_concurrent - self.gate.available_permits(),
            "recognition job admitted"
        );

        let joined = tokio::task::spawn_blocking(move || backend.recognize(&image)).await;
        match joined {
            Ok(result) => {
                if let Err(ref e) = result {
                    warn!(error = %e, "recognition job failed");
                }
                result
            }
            Err(e) => Err(OcrError::inference(
                "recognition",
                format!("recognition task aborted: {e}"),
            )),
        }
        // _permit drops here: the slot is returned no matter how the job
        // ended.
    }

    /// Returns a point-in-time load snapshot.
    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            resource_available: self.backend.initialized(),
            queue_size: self
                .max_concurrent
                .saturating_sub(self.gate.available_permits()),
            max_concurrent: self.max_concurrent,
        }
    }

    /// Returns the shared backend, loading it on first use.
    ///
    /// The once-cell guarantees a single load even when the first callers
    /// arrive concurrently; the load itself runs on the blocking pool.
    async fn backend(&self) -> Result<SharedBackend, OcrError> {
        let loader = Arc::clone(&self.loader);
        let backend = self
            .backend
            .get_or_try_init(|| async move {
                info!("loading recognition engine");
                match tokio::task::spawn_blocking(move || loader()).await {
                    Ok(result) => result,
                    Err(e) => Err(OcrError::inference(
                        "engine load",
                        format!("load task aborted: {e}"),
                    )),
                }
            })
            .await?;
        Ok(Arc::clone(backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingBackend {
        active: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingBackend {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                delay,
            })
        }
    }

    impl RecognitionBackend for CountingBackend {
        fn recognize(&self, _image: &RgbImage) -> Result<Vec<RecognizedWord>, OcrError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    struct FailingBackend;

    impl RecognitionBackend for FailingBackend {
        fn recognize(&self, _image: &RgbImage) -> Result<Vec<RecognizedWord>, OcrError> {
            Err(OcrError::inference("detection", "synthetic failure"))
        }
    }

    fn service_with(backend: SharedBackend, max_concurrent: usize) -> Arc<OcrService> {
        Arc::new(OcrService::with_backend(
            &ServiceConfig { max_concurrent },
            backend,
        ))
    }

    fn test_image() -> RgbImage {
        RgbImage::new(8, 8)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn executing_jobs_never_exceed_capacity() {
        let backend = CountingBackend::new(Duration::from_millis(30));
        let service = service_with(backend.clone(), 2);

        let mut handles = Vec::new();
        for _ in 0..6 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(
                async move { service.recognize(test_image()).await },
            ));
        }
        for handle in handles {
            handle.await.expect("join").expect("recognize");
        }

        assert_eq!(backend.calls.load(Ordering::SeqCst), 6);
        assert!(backend.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_slot_serializes_execution() {
        let backend = CountingBackend::new(Duration::from_millis(20));
        let service = service_with(backend.clone(), 1);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(
                async move { service.recognize(test_image()).await },
            ));
        }
        for handle in handles {
            handle.await.expect("join").expect("recognize");
        }

        assert_eq!(backend.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_job_releases_its_slot() {
        let service = service_with(Arc::new(FailingBackend), 1);

        let first = service.recognize(test_image()).await;
        assert!(first.is_err());
        assert_eq!(service.health().queue_size, 0);

        // The slot must be immediately admittable again.
        let second = service.recognize(test_image()).await;
        assert!(second.is_err());
        assert_eq!(service.health().queue_size, 0);
    }

    #[tokio::test]
    async fn health_reports_capacity_and_availability() {
        let backend = CountingBackend::new(Duration::ZERO);
        let service = service_with(backend, 3);

        let health = service.health();
        assert!(health.resource_available);
        assert_eq!(health.queue_size, 0);
        assert_eq!(health.max_concurrent, 3);
    }

    #[tokio::test]
    async fn lazy_loader_runs_once_for_concurrent_first_callers() {
        let loads = Arc::new(AtomicUsize::new(0));
        let loads_in_loader = Arc::clone(&loads);
        let service = Arc::new(OcrService::new(
            &ServiceConfig { max_concurrent: 2 },
            Arc::new(move || {
                loads_in_loader.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                Ok(CountingBackend::new(Duration::ZERO) as SharedBackend)
            }),
        ));

        assert!(!service.health().resource_available);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(
                async move { service.recognize(test_image()).await },
            ));
        }
        for handle in handles {
            handle.await.expect("join").expect("recognize");
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(service.health().resource_available);
    }

    #[tokio::test]
    async fn undecodable_bytes_fail_without_consuming_a_slot() {
        let backend = CountingBackend::new(Duration::ZERO);
        let service = service_with(backend.clone(), 1);

        let result = service.recognize_bytes(b"not an image").await;
        match result {
            Err(e) => assert!(e.is_client_error()),
            Ok(_) => panic!("garbage bytes must not decode"),
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.health().queue_size, 0);
    }
}
