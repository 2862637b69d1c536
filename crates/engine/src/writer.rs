use log::{debug, warn};

use crate::{Batch, BulkChannel, BulkError, DriverError, DriverErrorKind, Result};

/// Batches and records acknowledged by the database so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteProgress {
    pub batches: usize,
    pub records: usize,
    pub bytes: usize,
    pub rows_affected: u64,
}

impl WriteProgress {
    pub(crate) fn record(&mut self, batch: &Batch, rows_affected: u64) {
        self.batches += 1;
        self.records += batch.records();
        self.bytes += batch.size();
        self.rows_affected += rows_affected;
    }
}

/// Sends accumulated payloads to the database.
pub trait ContentWriter {
    /// Hand `batch` over for writing.
    fn write_content(&mut self, batch: Batch) -> Result<()>;

    /// Block until every handed-over batch has been acknowledged.
    fn wait_for_write(&mut self) -> Result<()> {
        Ok(())
    }

    fn progress(&self) -> WriteProgress;

    /// Release the underlying channel.
    fn close(&mut self) -> Result<()>;
}

/// Synchronous [ContentWriter] over a native bulk channel.
pub struct ChannelContentWriter<C: BulkChannel> {
    channel: C,
    header: String,
    error_on_missing_row: bool,
    progress: WriteProgress,
    closed: bool,
}

impl<C: BulkChannel> ChannelContentWriter<C> {
    pub fn new(channel: C, header: impl Into<String>) -> Self {
        Self {
            channel,
            header: header.into(),
            error_on_missing_row: false,
            progress: WriteProgress::default(),
            closed: false,
        }
    }

    /// Fail a batch when the server silently skipped some of its rows.
    pub fn error_on_missing_row(mut self, enabled: bool) -> Self {
        self.error_on_missing_row = enabled;
        self
    }

    fn write_error(&self, batch: &Batch, source: DriverError) -> BulkError {
        BulkError::DatabaseWrite {
            batch: batch.seq(),
            progress: self.progress,
            source,
        }
    }
}

impl<C: BulkChannel> ContentWriter for ChannelContentWriter<C> {
    fn write_content(&mut self, batch: Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        debug!(
            "writing batch {}: {} records, {} bytes",
            batch.seq(),
            batch.records(),
            batch.size()
        );

        let ack = self
            .channel
            .send(&self.header, batch.bytes())
            .map_err(|e| self.write_error(&batch, e))?;

        let expected = batch.records() as u64;
        if ack.rows_affected < expected {
            let missing = expected - ack.rows_affected;
            if self.error_on_missing_row {
                let source = DriverError::new(
                    DriverErrorKind::MissingReference,
                    format!(
                        "{missing} of {expected} rows were skipped by the server ({} warnings)",
                        ack.warnings
                    ),
                );
                return Err(self.write_error(&batch, source));
            }
            warn!(
                "batch {}: server skipped {missing} of {expected} rows ({} warnings)",
                batch.seq(),
                ack.warnings
            );
        }

        self.progress.record(&batch, ack.rows_affected);
        Ok(())
    }

    fn progress(&self) -> WriteProgress {
        self.progress
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.channel.close().map_err(BulkError::ChannelClose)
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
