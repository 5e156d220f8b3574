mod page;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use credence_ai::{Analyzer, EngineCell, EngineOptions, InferenceEngine, MAX_LENGTH};
use tracing_subscriber::EnvFilter;

use crate::server::AppState;

/// Classify an article as credible or fabricated and show which tokens drove the decision.
#[derive(Debug, Parser)]
#[command(name = "credence", version)]
struct Cli {
    /// Directory containing model.onnx and tokenizer.json
    /// [default: ../model beside the executable's directory, which is target/model
    /// under `cargo run`; pass --model-dir model to use the repository checkout's model/]
    #[arg(long, env = "CREDENCE_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Address to serve the page on
    #[arg(long, env = "CREDENCE_BIND", default_value = "127.0.0.1:8501")]
    bind: SocketAddr,

    /// Occluded variants scored per forward pass when computing attributions
    #[arg(long, env = "CREDENCE_ATTRIBUTION_BATCH", default_value_t = 16)]
    attribution_batch: usize,
}

impl Cli {
    fn model_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.model_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_model_dir(),
        }
    }
}

/// `../model` relative to the directory holding the executable.
///
/// For an installed `bin/credence` this is the sibling `model/`; for a cargo
/// build it lands in `target/`, not the repository root.
fn default_model_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("locating the credence executable")?;
    let bin_dir = exe
        .parent()
        .ok_or_else(|| anyhow::anyhow!("executable has no parent directory: {}", exe.display()))?;
    Ok(bin_dir.join("..").join("model"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::info!("credence v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let model_dir = cli.model_dir()?;
    let options = EngineOptions {
        max_length: MAX_LENGTH,
        attribution_batch: cli.attribution_batch,
    };

    let engine: EngineCell<dyn Analyzer> = EngineCell::new(move || {
        let engine = InferenceEngine::load(&model_dir, &options)?;
        Ok(Arc::new(engine) as Arc<dyn Analyzer>)
    });
    let state = AppState::new(engine);

    // Load up front; a failure is cached and shown on the page.
    let warm = Arc::clone(&state.engine);
    tokio::task::spawn_blocking(move || warm.get().is_ok())
        .await
        .context("loading the model")?;

    server::run(state, cli.bind).await
}
