//! Row output.

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Write;

/// Writes rows as newline-delimited JSON to any underlying writer.
pub struct RowWriter<W: Write> {
    writer: W,
}

impl<W: Write> RowWriter<W> {
    pub fn new(writer: W) -> RowWriter<W> {
        RowWriter { writer }
    }

    /// Write each row on its own line.
    pub fn write_rows(&mut self, rows: &[Value]) -> Result<()> {
        for row in rows {
            let line = serde_json::to_string(row).context("Failed to serialize row")?;
            writeln!(self.writer, "{}", line).context("Failed to write row")?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }

    /// Hand back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
