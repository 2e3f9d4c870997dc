//! Utility functions: image decoding helpers and logging setup.

use crate::core::errors::OcrError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::RgbImage;
use std::path::Path;

/// Initializes the tracing subscriber for logging.
///
/// Sets up the tracing subscriber with an environment filter and a
/// formatting layer. Typically called once at application startup.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Decodes an encoded image (PNG, JPEG, ...) into an RGB buffer.
pub fn load_rgb_from_bytes(bytes: &[u8]) -> Result<RgbImage, OcrError> {
    let img = image::load_from_memory(bytes).map_err(|e| OcrError::decode(e.to_string()))?;
    Ok(img.to_rgb8())
}

/// Loads an image file into an RGB buffer.
pub fn load_rgb_from_path(path: &Path) -> Result<RgbImage, OcrError> {
    let img = image::open(path)
        .map_err(|e| OcrError::decode(format!("{}: {}", path.display(), e)))?;
    Ok(img.to_rgb8())
}

/// Decodes a base64-encoded image as received on the wire.
pub fn decode_base64_image(encoded: &str) -> Result<RgbImage, OcrError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| OcrError::decode(format!("base64: {}", e)))?;
    load_rgb_from_bytes(&bytes)
}

/// Encodes an RGB image as base64 PNG for the wire.
pub fn encode_base64_png(image: &RgbImage) -> Result<String, OcrError> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| OcrError::decode(format!("png encode: {}", e)))?;
    Ok(BASE64.encode(buffer.into_inner()))
}
