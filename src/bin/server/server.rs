//! HTTP server for receipt OCR processing.

use crate::config::ServerConfig;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ryoshu_ocr::api::{
    ErrorResponse, ExtractRoiRequest, ExtractRoiResponse, HealthResponse, OcrRequest, OcrResponse,
};
use ryoshu_ocr::recognition::OcrService;
use ryoshu_ocr::roi::extract_many;
use ryoshu_ocr::utils::decode_base64_image;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
struct AppState {
    service: OcrService,
}

/// Run the HTTP server.
pub async fn run_server(
    config: ServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // The engine loads lazily on the first recognition request; the server
    // accepts connections immediately.
    let service = OcrService::with_engine_config(&config.service, config.engine.clone());
    let state = Arc::new(AppState { service });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/ocr", post(ocr_handler))
        .route("/extract-roi", post(extract_roi_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    info!("Server listening on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /health      - Health check and load snapshot");
    info!("  POST /ocr         - Recognize words in a page image");
    info!("  POST /extract-roi - Reconstruct field text from words");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Health check endpoint.
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health();
    Json(HealthResponse {
        status: "healthy".to_string(),
        resource_available: health.resource_available,
        queue_size: health.queue_size,
        max_concurrent: health.max_concurrent,
    })
}

/// OCR processing endpoint.
///
/// Undecodable input is rejected with 400 before a capacity slot is
/// consumed; recognition failures map to 500 with the slot released.
async fn ocr_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OcrRequest>,
) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let start = Instant::now();

    let image = match decode_base64_image(&request.image_base64) {
        Ok(image) => image,
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Failed to decode image");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(format!("Invalid image data: {}", e))),
            )
                .into_response();
        }
    };

    info!(
        request_id = %request_id,
        width = image.width(),
        height = image.height(),
        "Processing OCR request"
    );

    match state.service.recognize(image).await {
        Ok(words) => {
            let processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
            info!(
                request_id = %request_id,
                words = words.len(),
                total_ms = processing_time_ms,
                "OCR completed"
            );
            (
                StatusCode::OK,
                Json(OcrResponse {
                    status: "completed".to_string(),
                    words,
                    processing_time_ms,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "OCR processing failed");
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(ErrorResponse::new(e.to_string()))).into_response()
        }
    }
}

/// ROI extraction endpoint.
async fn extract_roi_handler(
    Json(request): Json<ExtractRoiRequest>,
) -> Json<ExtractRoiResponse> {
    let extractions = extract_many(&request.words, &request.rois);
    Json(ExtractRoiResponse { extractions })
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
