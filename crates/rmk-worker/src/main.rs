//! Reality Maker pipeline worker binary.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rmk_ai::OllamaClient;
use rmk_media::{
    EspeakSynthesizer, FfmpegToolkit, PySceneDetector, RotatingSpeakerLabeler, WhisperTranscriber,
};
use rmk_queue::{RedisQueue, StatusBoard};
use rmk_store::RedisStore;
use rmk_worker::{Dispatcher, ProcessingContext, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rmk=info,rmk_worker=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("starting rmk-worker");

    let config = WorkerConfig::from_env();
    info!(?config, "worker config loaded");

    let store = RedisStore::from_env().context("failed to create store")?;
    let queue = RedisQueue::from_env().context("failed to create job queue")?;
    queue.init().await.context("failed to init queue streams")?;

    let backend = OllamaClient::from_env().context("failed to create ollama client")?;
    if backend.is_available().await {
        if let Err(e) = backend.ensure_model().await {
            warn!(error = %e, "could not ensure ollama model, generation may fail");
        }
    } else {
        warn!("ollama is not reachable, showrunner jobs will fail until it is");
    }

    let temp_dir = config.temp_dir();
    let ctx = Arc::new(ProcessingContext {
        config,
        store: Arc::new(store),
        queue: Arc::new(queue),
        board: StatusBoard::new(),
        detector: Arc::new(PySceneDetector::new(temp_dir.clone())),
        transcriber: Arc::new(WhisperTranscriber::new(temp_dir)),
        labeler: Arc::new(RotatingSpeakerLabeler::default()),
        backend: Arc::new(backend),
        synthesizer: Arc::new(EspeakSynthesizer::default()),
        media: Arc::new(FfmpegToolkit::new()),
    });

    let dispatcher = Arc::new(Dispatcher::new(ctx));

    let signal_dispatcher = Arc::clone(&dispatcher);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown signal received");
        signal_dispatcher.shutdown();
    });

    dispatcher.run().await.context("dispatcher crashed")?;

    info!("worker shutdown complete");
    Ok(())
}
