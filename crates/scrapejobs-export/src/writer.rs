//! Filtered CSV writer.

use std::io::Write;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::ExportError;
use crate::record::{Record, ResultData};
use crate::selection::FieldSelection;

/// CSV writer that only writes selected fields.
///
/// The header row comes from the first record written. Drive it from a
/// single consumer; producers share the channel sender instead.
pub struct FilteredCsvWriter<W: Write> {
    writer: csv::Writer<W>,
    selection: FieldSelection,
    headers_written: bool,
    rows_written: u64,
}

impl<W: Write> FilteredCsvWriter<W> {
    /// Create a writer over `sink` keeping the comma-separated `fields`.
    pub fn new(sink: W, fields: &str) -> Self {
        let writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .flexible(true)
            .from_writer(sink);
        Self::from_csv_writer(writer, fields)
    }

    /// Wrap an already configured CSV writer.
    pub fn from_csv_writer(writer: csv::Writer<W>, fields: &str) -> Self {
        Self {
            writer,
            selection: FieldSelection::parse(fields),
            headers_written: false,
            rows_written: 0,
        }
    }

    /// Get the column selection.
    pub fn selection(&self) -> &FieldSelection {
        &self.selection
    }

    /// Check if the header row has been written.
    pub fn headers_written(&self) -> bool {
        self.headers_written
    }

    /// Number of data rows written.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Consume results until the channel closes, then flush.
    ///
    /// An unsupported item stops processing; rows already written stay in
    /// the sink.
    pub async fn run(&mut self, mut input: mpsc::Receiver<ResultData>) -> Result<(), ExportError> {
        while let Some(item) = input.recv().await {
            self.write_item(item)?;
        }
        self.finish()
    }

    /// Same as [`run`](Self::run) for a writer driven from a blocking thread,
    /// e.g. inside `spawn_blocking`. Panics if called from async context.
    pub fn run_blocking(&mut self, mut input: mpsc::Receiver<ResultData>) -> Result<(), ExportError> {
        while let Some(item) = input.blocking_recv() {
            self.write_item(item)?;
        }
        self.finish()
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        self.writer.flush()?;
        debug!("CSV export finished, {} rows written", self.rows_written);
        Ok(())
    }

    /// Write one stream item.
    pub fn write_item(&mut self, item: ResultData) -> Result<(), ExportError> {
        match item {
            ResultData::Record(record) => self.write_record(record.as_ref()),
            ResultData::Collection(items) => {
                for item in items {
                    // Nested batches and foreign payloads inside a batch are skipped
                    if let ResultData::Record(record) = item {
                        self.write_record(record.as_ref())?;
                    }
                }
                Ok(())
            }
            unsupported @ ResultData::Unsupported { .. } => {
                Err(ExportError::InvalidDataType(unsupported.shape()))
            }
        }
    }

    /// Write a single record, preceded by the header row if none was written yet.
    pub fn write_record(&mut self, record: &dyn Record) -> Result<(), ExportError> {
        let headers = record.headers();
        let row = record.row();

        if headers.len() != row.len() {
            return Err(ExportError::RowLength {
                headers: headers.len(),
                values: row.len(),
            });
        }

        if !self.headers_written {
            self.write_fields(self.selection.filter_headers(&headers))?;
            self.headers_written = true;
        }

        self.write_fields(self.selection.filter_row(&headers, &row))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Write one line of already projected fields.
    fn write_fields(&mut self, fields: Vec<String>) -> Result<(), ExportError> {
        if fields.is_empty() {
            // The csv crate encodes a zero-field record as `""`.
            self.writer.flush()?;
            self.writer.get_mut().write_all(b"\r\n")?;
            return Ok(());
        }
        self.writer.write_record(&fields)?;
        Ok(())
    }

    /// Flush buffered output.
    pub fn flush(&mut self) -> Result<(), ExportError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying sink.
    pub fn into_inner(self) -> Result<W, ExportError> {
        self.writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
