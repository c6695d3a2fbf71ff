mod config;
mod error;
mod feed;
mod input;
mod output;
mod pipeline;
mod state;
mod types;
mod ws;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, InputSource};
use crate::error::Result;
use crate::output::{CsvAppender, RowSink};
use crate::pipeline::Pipeline;
use crate::types::Row;
use crate::ws::WsSource;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cfg = match Config::from_env(std::env::args().nth(1)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let sink = CsvAppender::open(&cfg.output_csv, &Row::HEADER)?;
    info!(
        "Logging price changes from {} to {}",
        cfg.input,
        sink.path().display()
    );

    let mut pipeline = Pipeline::new(sink, cfg.stats_every_lines);

    let outcome = tokio::select! {
        res = drive(&cfg.input, &mut pipeline) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, flushing output");
            Ok(())
        }
    };

    pipeline.finish()?;
    if pipeline.stats().lines_read == 0 {
        warn!("No input lines were received");
    }
    outcome
}

/// Pump the configured source through the pipeline until it ends.
async fn drive<S: RowSink>(source: &InputSource, pipeline: &mut Pipeline<S>) -> Result<()> {
    match source {
        InputSource::Stdin => input::run_stdin(pipeline).await,
        InputSource::File(path) => input::run_file(path, pipeline).await,
        InputSource::WebSocket { url, subscribe } => {
            WsSource::new(url.clone(), subscribe.clone()).run(pipeline).await
        }
    }
}
