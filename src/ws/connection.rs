use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::time::interval;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::config::{RECONNECT_BACKOFF_MS, WS_PING_INTERVAL_SECS};
use crate::error::{AppError, Result};
use crate::feed::frame_lines;
use crate::output::RowSink;
use crate::pipeline::Pipeline;

/// Reads the change stream from a single WebSocket connection, reconnecting
/// with backoff. Store and dedup state live in the pipeline and survive
/// reconnects.
pub struct WsSource {
    ws_url: String,
    /// Sent as a text frame after every successful connect.
    subscribe: Option<String>,
    /// Total text frames received since process start.
    frames_received: u64,
}

impl WsSource {
    pub fn new(ws_url: String, subscribe: Option<String>) -> Self {
        Self {
            ws_url,
            subscribe,
            frames_received: 0,
        }
    }

    /// Runs until a non-transport error (e.g. the output sink failing).
    pub async fn run<S: RowSink>(&mut self, pipeline: &mut Pipeline<S>) -> Result<()> {
        let mut backoff_idx = 0usize;

        loop {
            info!("WS connecting to {}", self.ws_url);
            match self.connect_once(pipeline).await {
                Ok(()) => {
                    info!("WS connection closed cleanly");
                    backoff_idx = 0;
                }
                Err(AppError::WebSocket(e)) => {
                    error!("WS connection error: {e}");
                }
                Err(e) => return Err(e),
            }

            let delay_ms = backoff_delay_ms(backoff_idx);
            backoff_idx = (backoff_idx + 1).min(RECONNECT_BACKOFF_MS.len() - 1);

            warn!("WS reconnecting in {delay_ms}ms");
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    async fn connect_once<S: RowSink>(&mut self, pipeline: &mut Pipeline<S>) -> Result<()> {
        let (ws_stream, _) = connect_async(self.ws_url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();
        info!("WS connected");

        if let Some(sub) = &self.subscribe {
            write.send(Message::Text(sub.clone())).await?;
            debug!("WS subscribe frame sent ({} bytes)", sub.len());
        }

        let mut ping_interval = interval(Duration::from_secs(WS_PING_INTERVAL_SECS));
        ping_interval.tick().await; // consume immediate first tick

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_frame(&text, pipeline)?;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return Ok(());
                        }
                        Some(Err(e)) => return Err(e.into()),
                        Some(Ok(_)) => {}
                    }
                }
                _ = ping_interval.tick() => {
                    write.send(Message::Ping(Vec::new())).await?;
                    debug!(frames = self.frames_received, "WS ping sent");
                }
            }
        }
    }

    fn handle_frame<S: RowSink>(&mut self, text: &str, pipeline: &mut Pipeline<S>) -> Result<()> {
        self.frames_received += 1;
        for line in frame_lines(text) {
            pipeline.process_line(line)?;
        }
        Ok(())
    }
}

fn backoff_delay_ms(idx: usize) -> u64 {
    RECONNECT_BACKOFF_MS
        .get(idx)
        .or(RECONNECT_BACKOFF_MS.last())
        .copied()
        .unwrap_or(0)
}
