use std::{mem, sync::Arc};

use crate::{
    BulkError, BulkFormat, Result, SchemaDescriptor,
    format::{FIELD_DELIMITER, LINE_TERMINATOR},
};

/// One bounded unit of serialized records, sent as a single bulk operation.
///
/// Moving a `Batch` into a writer transfers the buffer; the builder starts
/// over with a fresh one.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Batch {
    seq: usize,
    records: usize,
    bytes: Vec<u8>,
}

impl Batch {
    /// 1-based position of this batch in the insert operation.
    pub fn seq(&self) -> usize {
        self.seq
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Serializes records into the payload of the batch under construction.
pub struct ContentBuilder<T> {
    schema: Arc<SchemaDescriptor<T>>,
    format: BulkFormat,
    capacity: usize,
    current: Batch,
}

impl<T> ContentBuilder<T> {
    pub fn new(schema: Arc<SchemaDescriptor<T>>, format: BulkFormat) -> Self {
        Self::with_capacity(schema, format, 0)
    }

    /// Pre-size every batch buffer, typically to the flush threshold.
    pub fn with_capacity(schema: Arc<SchemaDescriptor<T>>, format: BulkFormat, capacity: usize) -> Self {
        Self {
            schema,
            format,
            capacity,
            current: Batch {
                seq: 1,
                records: 0,
                bytes: Vec::with_capacity(capacity),
            },
        }
    }

    /// Serialize `record` as one line of the current batch.
    ///
    /// On failure the batch is left exactly as it was before the call.
    pub fn add(&mut self, record: &T) -> Result<()> {
        let start = self.current.bytes.len();

        if let Err(e) = self.encode_line(record) {
            self.current.bytes.truncate(start);
            return Err(e);
        }

        self.current.records += 1;
        Ok(())
    }

    fn encode_line(&mut self, record: &T) -> Result<()> {
        let buf = &mut self.current.bytes;

        for (i, column) in self.schema.columns().iter().enumerate() {
            if i > 0 {
                buf.push(FIELD_DELIMITER);
            }

            let encoded = column
                .extract(record)
                .and_then(|value| self.format.encode_field(&value, buf));

            if let Err(e) = encoded {
                return Err(BulkError::Serialization {
                    batch: self.current.seq,
                    position: self.current.records,
                    column: column.name().to_string(),
                    reason: e.0,
                });
            }
        }

        buf.push(LINE_TERMINATOR);
        Ok(())
    }

    /// Accumulated payload size in bytes.
    pub fn size(&self) -> usize {
        self.current.size()
    }

    pub fn records(&self) -> usize {
        self.current.records
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// True once the payload is strictly larger than `threshold` bytes.
    pub fn is_filled(&self, threshold: u64) -> bool {
        self.size() as u64 > threshold
    }

    /// Hand over the current batch and start the next one.
    pub fn take_content(&mut self) -> Batch {
        let next = Batch {
            seq: self.current.seq + 1,
            records: 0,
            bytes: Vec::with_capacity(self.capacity),
        };
        mem::replace(&mut self.current, next)
    }

    /// Sequence number the next taken batch will carry.
    pub fn next_seq(&self) -> usize {
        self.current.seq
    }
}

#[cfg(test)]
#[path = "content_tests.rs"]
mod tests;
