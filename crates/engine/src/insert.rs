use std::{borrow::Borrow, sync::Arc, thread, time::Instant};

use log::{debug, info, warn};

use crate::{
    BulkChannelProvider, BulkError, ChannelContentWriter, ContentBuilder, ContentWriter,
    InsertConfig, PipelinedContentWriter, Result, SchemaDescriptor, WriteProgress, header_sql,
    transaction::{self, Outcome, TransactionPolicy},
};

/// Upper bound for pre-sizing batch buffers; larger batches grow on demand.
const MAX_PREALLOCATED_BATCH: u64 = 16 * 1_024 * 1_024;

/// What a successful [BulkInsert::insert_all] wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertSummary {
    pub records: usize,
    pub batches: usize,
    pub bytes: usize,
    pub rows_affected: u64,
}

impl From<WriteProgress> for InsertSummary {
    fn from(p: WriteProgress) -> Self {
        Self {
            records: p.records,
            batches: p.batches,
            bytes: p.bytes,
            rows_affected: p.rows_affected,
        }
    }
}

/// Streams records into one table through the connection's bulk channel.
pub struct BulkInsert<T> {
    schema: Arc<SchemaDescriptor<T>>,
    config: InsertConfig,
}

impl<T> BulkInsert<T> {
    pub fn new(schema: SchemaDescriptor<T>, config: InsertConfig) -> Self {
        Self::with_schema(Arc::new(schema), config)
    }

    pub fn with_schema(schema: Arc<SchemaDescriptor<T>>, config: InsertConfig) -> Self {
        debug!(
            "bulk insert for `{}` ({} columns), config {:?}",
            schema.table(),
            schema.len(),
            config
        );
        Self { schema, config }
    }

    pub fn schema(&self) -> &SchemaDescriptor<T> {
        &self.schema
    }

    pub fn config(&self) -> &InsertConfig {
        &self.config
    }

    /// Insert every record of `records`, in order.
    ///
    /// Returns once all data has been acknowledged by the database. On error
    /// the channel is closed and the transaction policy has settled the
    /// connection (rolled back under a long transaction, committed prefix of
    /// batches under autocommit) before the error is returned.
    pub fn insert_all<C, I>(&self, conn: &mut C, records: I) -> Result<InsertSummary>
    where
        C: BulkChannelProvider,
        I: IntoIterator,
        I::Item: Borrow<T>,
    {
        let started = Instant::now();
        let format = conn.bulk_format();
        let header = header_sql(format, &self.schema);
        let batch_size = self.config.effective_batch_size(format);
        debug!("bulk header for `{}`: {header}", self.schema.table());
        debug!("batch size: {batch_size} bytes");

        let channel = conn
            .open_bulk_channel()
            .map_err(BulkError::ChannelAcquisition)?;
        let mut writer = ChannelContentWriter::new(channel, header)
            .error_on_missing_row(self.config.error_on_missing_row);

        let mut policy = match transaction::acquire(conn, &self.config) {
            Ok(policy) => policy,
            Err(e) => {
                if let Err(ce) = writer.close() {
                    warn!("closing bulk channel after failed policy setup: {ce}");
                }
                return Err(e);
            }
        };

        let capacity = batch_size.min(MAX_PREALLOCATED_BATCH) as usize;
        let mut builder = ContentBuilder::with_capacity(Arc::clone(&self.schema), format, capacity);

        let written = if self.config.concurrent {
            thread::scope(|s| {
                let mut writer = PipelinedContentWriter::spawn(s, writer)?;
                let result = drive(&mut builder, &mut writer, records, batch_size, policy.as_mut());
                teardown(&mut writer, result, policy.as_mut())
            })
        } else {
            let result = drive(&mut builder, &mut writer, records, batch_size, policy.as_mut());
            teardown(&mut writer, result, policy.as_mut())
        };

        let outcome = match written {
            Ok(_) => Outcome::Success,
            Err(_) => Outcome::Failure,
        };
        let summary = prefer_first(written, policy.close(outcome), "transaction close")?;

        info!(
            "inserted {} records into `{}` in {} batches ({} bytes, {:?})",
            summary.records,
            self.schema.table(),
            summary.batches,
            summary.bytes,
            started.elapsed()
        );
        Ok(summary)
    }
}

/// Pull every record through the builder, writing full batches as they fill.
fn drive<T, W, I>(
    builder: &mut ContentBuilder<T>,
    writer: &mut W,
    records: I,
    batch_size: u64,
    policy: &mut dyn TransactionPolicy,
) -> Result<()>
where
    W: ContentWriter,
    I: IntoIterator,
    I::Item: Borrow<T>,
{
    for record in records {
        builder.add(record.borrow())?;

        if builder.is_filled(batch_size) {
            let batch = builder.take_content();
            debug!(
                "writing batch {} ({} records, {} bytes)",
                batch.seq(),
                batch.records(),
                batch.size()
            );
            // The previous batch must be settled before the next one runs.
            writer.wait_for_write()?;
            policy.settle_batches(writer.progress())?;
            writer.write_content(batch)?;
        }
    }

    if !builder.is_empty() {
        let batch = builder.take_content();
        debug!(
            "flushing batch {} ({} records, {} bytes)",
            batch.seq(),
            batch.records(),
            batch.size()
        );
        writer.write_content(batch)?;
    }

    writer.wait_for_write()?;
    policy.settle_batches(writer.progress())
}

/// Close the writer on every path, keeping the first error.
fn teardown<W: ContentWriter>(
    writer: &mut W,
    result: Result<()>,
    policy: &mut dyn TransactionPolicy,
) -> Result<InsertSummary> {
    let closed = writer.close();
    let progress = writer.progress();
    policy.observe(progress);

    prefer_first(result, closed, "channel close").map(|()| progress.into())
}

fn prefer_first<T>(primary: Result<T>, secondary: Result<()>, what: &str) -> Result<T> {
    match (primary, secondary) {
        (Ok(v), Ok(())) => Ok(v),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(ignored)) => {
            warn!("{what} also failed: {ignored}");
            Err(e)
        }
    }
}

#[cfg(test)]
#[path = "insert_tests.rs"]
mod tests;
