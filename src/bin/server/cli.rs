//! CLI mode for batch receipt processing.

use ryoshu_ocr::core::config::{EngineConfig, ServiceConfig};
use ryoshu_ocr::core::errors::OcrError;
use ryoshu_ocr::domain::TemplateStore;
use ryoshu_ocr::pipeline::{ingest_pages, process_pages, ReceiptRow};
use ryoshu_ocr::recognition::OcrService;
use ryoshu_ocr::utils::load_rgb_from_path;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Process a batch of page images against a field template file.
pub async fn process_batch(
    image_paths: &[PathBuf],
    template_path: &Path,
    engine: EngineConfig,
    output_format: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let start = Instant::now();

    info!("Loading {} page images...", image_paths.len());
    let images = image_paths
        .iter()
        .map(|path| load_rgb_from_path(path))
        .collect::<Result<Vec<_>, OcrError>>()?;

    info!("Loading field templates from {}...", template_path.display());
    let templates = TemplateStore::from_json_file(template_path)?;

    info!("Clustering pages into style groups...");
    let pages = ingest_pages(images);
    let cluster_time = start.elapsed();
    info!("Clustered in {:.2}ms", cluster_time.as_secs_f64() * 1000.0);

    // Local batch processing is sequential; a single slot is enough.
    let service = OcrService::with_engine_config(&ServiceConfig::default(), engine);

    info!("Processing {} pages...", pages.len());
    let ocr_start = Instant::now();
    let rows = process_pages(&service, &pages, &templates).await?;
    info!(
        "Processing completed in {:.2}ms",
        ocr_start.elapsed().as_secs_f64() * 1000.0
    );

    output_rows(&rows, output_format)?;
    Ok(())
}

/// Output the processed rows in the specified format.
fn output_rows(rows: &[ReceiptRow], format: &str) -> Result<(), OcrError> {
    match format {
        "json" => {
            let body = serde_json::to_string_pretty(rows).map_err(|e| OcrError::InvalidInput {
                message: format!("serialize rows: {}", e),
            })?;
            println!("{}", body);
        }
        _ => {
            println!("\n=== Receipt OCR Results ===");
            println!("Pages: {}", rows.len());
            println!();

            for row in rows {
                println!("--- Page {} (group {}) ---", row.page_num, row.style_id);
                if row.fields.is_empty() {
                    println!("  (no template for this style group)");
                }
                for field in &row.fields {
                    if field.normalized_text == field.raw_text {
                        println!("  {}: {}", field.label, field.raw_text);
                    } else {
                        println!(
                            "  {}: {} (raw: \"{}\")",
                            field.label, field.normalized_text, field.raw_text
                        );
                    }
                }
                println!();
            }
        }
    }

    Ok(())
}
