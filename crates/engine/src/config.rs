use serde::Deserialize;

use crate::BulkFormat;

/// Knobs of one [crate::BulkInsert].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InsertConfig {
    /// Flush threshold in bytes; `None` uses the format's default.
    pub batch_size_bytes: Option<u64>,
    /// Run the whole operation in one transaction instead of autocommitting
    /// each batch.
    pub long_transaction: bool,
    /// Treat rows silently skipped by the server (missing referenced row)
    /// as a write failure.
    pub error_on_missing_row: bool,
    /// Build the next batch while the previous one is being written.
    pub concurrent: bool,
    /// With `long_transaction`, commit on success instead of leaving the
    /// transaction open for the caller.
    pub commit_on_close: bool,
}

impl Default for InsertConfig {
    fn default() -> Self {
        Self {
            batch_size_bytes: None,
            long_transaction: false,
            error_on_missing_row: false,
            concurrent: true,
            commit_on_close: false,
        }
    }
}

impl InsertConfig {
    pub fn batch_size(mut self, bytes: u64) -> Self {
        self.batch_size_bytes = Some(bytes);
        self
    }

    pub fn long_transaction(mut self, enabled: bool) -> Self {
        self.long_transaction = enabled;
        self
    }

    pub fn error_on_missing_row(mut self, enabled: bool) -> Self {
        self.error_on_missing_row = enabled;
        self
    }

    pub fn concurrent(mut self, enabled: bool) -> Self {
        self.concurrent = enabled;
        self
    }

    pub fn commit_on_close(mut self, enabled: bool) -> Self {
        self.commit_on_close = enabled;
        self
    }

    pub fn effective_batch_size(&self, format: BulkFormat) -> u64 {
        self.batch_size_bytes
            .unwrap_or_else(|| format.default_batch_size())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
