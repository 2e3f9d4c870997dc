//! Receipt OCR server and CLI.
//!
//! A cross-platform binary for receipt processing via CLI or HTTP server.
//!
//! # Usage
//!
//! ## Server Mode
//! ```bash
//! ryoshu-ocr-server serve --det-model models/det.onnx --rec-model models/rec.onnx \
//!     --dict-path models/dict.txt --port 8000 --max-concurrent 1
//! ```
//!
//! ## CLI Mode
//! ```bash
//! ryoshu-ocr-server process --det-model models/det.onnx --rec-model models/rec.onnx \
//!     --dict-path models/dict.txt --templates templates.json page1.png page2.png
//! ```

mod cli;
mod config;
mod server;

use clap::{Parser, Subcommand};
use ryoshu_ocr::core::config::{EngineConfig, ServiceConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "ryoshu-ocr-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Receipt OCR processing via CLI or HTTP server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Path to the text detection model
        #[arg(long = "det-model", env = "RYOSHU_DET_MODEL")]
        det_model: PathBuf,

        /// Path to the text recognition model
        #[arg(long = "rec-model", env = "RYOSHU_REC_MODEL")]
        rec_model: PathBuf,

        /// Path to the character dictionary
        #[arg(long = "dict-path", env = "RYOSHU_DICT_PATH")]
        dict_path: PathBuf,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0", env = "RYOSHU_HOST")]
        host: String,

        /// Port to listen on
        #[arg(long, short, default_value = "8000", env = "RYOSHU_PORT")]
        port: u16,

        /// Maximum number of simultaneously executing recognition jobs
        #[arg(long, default_value = "1", env = "RYOSHU_MAX_CONCURRENT")]
        max_concurrent: usize,

        /// Intra-op threads per ONNX session
        #[arg(long, env = "RYOSHU_INTRA_THREADS")]
        intra_threads: Option<usize>,
    },
    /// Process a batch of page images via CLI
    Process {
        /// Page image files, in page order
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Path to the field template JSON (style_id -> labeled rectangles)
        #[arg(long, env = "RYOSHU_TEMPLATES")]
        templates: PathBuf,

        /// Path to the text detection model
        #[arg(long = "det-model", env = "RYOSHU_DET_MODEL")]
        det_model: PathBuf,

        /// Path to the text recognition model
        #[arg(long = "rec-model", env = "RYOSHU_REC_MODEL")]
        rec_model: PathBuf,

        /// Path to the character dictionary
        #[arg(long = "dict-path", env = "RYOSHU_DICT_PATH")]
        dict_path: PathBuf,

        /// Output format (json, pretty)
        #[arg(long, default_value = "pretty")]
        output: String,

        /// Intra-op threads per ONNX session
        #[arg(long, env = "RYOSHU_INTRA_THREADS")]
        intra_threads: Option<usize>,
    },
}

fn engine_config(
    det_model: PathBuf,
    rec_model: PathBuf,
    dict_path: PathBuf,
    intra_threads: Option<usize>,
) -> EngineConfig {
    let mut config = EngineConfig::new(det_model, rec_model, dict_path);
    if let Some(threads) = intra_threads {
        config = config.with_intra_threads(threads);
    }
    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    ryoshu_ocr::utils::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            det_model,
            rec_model,
            dict_path,
            host,
            port,
            max_concurrent,
            intra_threads,
        } => {
            let config = config::ServerConfig {
                engine: engine_config(det_model, rec_model, dict_path, intra_threads),
                service: ServiceConfig { max_concurrent },
                host,
                port,
            };

            info!("Starting server on {}:{}", config.host, config.port);
            server::run_server(config).await?;
        }
        Commands::Process {
            images,
            templates,
            det_model,
            rec_model,
            dict_path,
            output,
            intra_threads,
        } => {
            let engine = engine_config(det_model, rec_model, dict_path, intra_threads);
            cli::process_batch(&images, &templates, engine, &output).await?;
        }
    }

    Ok(())
}
