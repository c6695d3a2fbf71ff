use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use ::csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use tracing::info;

use crate::error::Result;
use crate::output::change_logger::RowSink;
use crate::types::Row;

/// Minimal quoting (only fields holding a comma, quote, CR or LF) and `\n`
/// line endings. The header is written by [`CsvAppender::open`], never by the
/// writer itself.
fn builder() -> WriterBuilder {
    let mut builder = WriterBuilder::new();
    builder
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'));
    builder
}

/// Append-only CSV file. The header is written only when the file does not
/// exist at open time; an existing file is appended to as is.
pub struct CsvAppender {
    path: PathBuf,
    writer: Writer<BufWriter<File>>,
}

impl CsvAppender {
    pub fn open(path: impl AsRef<Path>, header: &[&str]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existed = path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut appender = Self {
            writer: builder().from_writer(BufWriter::new(file)),
            path,
        };
        if !existed {
            appender.write_record(header)?;
            appender.writer.flush()?;
            info!("Created {} with header", appender.path.display());
        }
        Ok(appender)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_record(&mut self, fields: &[&str]) -> Result<()> {
        self.writer.write_record(fields)?;
        Ok(())
    }
}

impl RowSink for CsvAppender {
    fn append(&mut self, row: &Row) -> Result<()> {
        self.write_record(&row.values())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
