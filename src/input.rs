use std::path::Path;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{debug, info};

use crate::config::MAX_LINE_BYTES;
use crate::error::Result;
use crate::output::RowSink;
use crate::pipeline::Pipeline;

/// Feed every newline-terminated line of `reader` through the pipeline, in
/// order, until EOF. Lines that are not valid UTF-8 or exceed
/// [`MAX_LINE_BYTES`] count as malformed.
pub async fn run_lines<R, S>(reader: R, pipeline: &mut Pipeline<S>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    S: RowSink,
{
    run_bounded_lines(reader, pipeline, MAX_LINE_BYTES).await
}

async fn run_bounded_lines<R, S>(mut reader: R, pipeline: &mut Pipeline<S>, max_len: usize) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    S: RowSink,
{
    // Room for the line plus its newline; one byte more means too long.
    let limit = max_len as u64 + 1;
    let mut buf = Vec::with_capacity(4096);
    loop {
        buf.clear();
        let n = (&mut reader).take(limit).read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        if n as u64 == limit && buf.last() != Some(&b'\n') {
            skip_rest_of_line(&mut reader).await?;
            debug!("Skipping input line longer than {max_len} bytes");
            pipeline.record_malformed();
            continue;
        }
        match std::str::from_utf8(&buf) {
            Ok(line) => {
                pipeline.process_line(line)?;
            }
            Err(_) => pipeline.record_malformed(),
        }
    }
}

/// Consume bytes up to and including the next newline without keeping them.
async fn skip_rest_of_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<()> {
    loop {
        let (used, done) = {
            let chunk = reader.fill_buf().await?;
            if chunk.is_empty() {
                return Ok(());
            }
            match chunk.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (chunk.len(), false),
            }
        };
        reader.consume(used);
        if done {
            return Ok(());
        }
    }
}

pub async fn run_stdin<S: RowSink>(pipeline: &mut Pipeline<S>) -> Result<()> {
    info!("Reading change lines from stdin");
    run_lines(BufReader::new(tokio::io::stdin()), pipeline).await
}

pub async fn run_file<S: RowSink>(path: &Path, pipeline: &mut Pipeline<S>) -> Result<()> {
    info!("Reading change lines from {}", path.display());
    let file = tokio::fs::File::open(path).await?;
    run_lines(BufReader::new(file), pipeline).await
}
