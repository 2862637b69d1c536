use std::fmt;

use thiserror::Error;

use crate::writer::WriteProgress;

/// Failure category reported by a database driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// Unique / primary key / check constraint rejected a row.
    ConstraintViolation,
    /// A foreign key referenced a row that does not exist.
    MissingReference,
    /// A field could not be parsed as the column's type.
    TypeMismatch,
    /// The connection cannot perform the requested operation.
    Unsupported,
    Other,
}

/// Error as reported by the database, independent of any driver crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub kind: DriverErrorKind,
    /// Native error code (SQLSTATE, MySQL errno) when the driver exposes one.
    pub code: Option<String>,
    pub message: String,
}

impl DriverError {
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DriverError {}

/// A single value could not be rendered into the bulk payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct FieldError(pub String);

impl FieldError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

#[derive(Debug, Error)]
pub enum BulkError {
    #[error("invalid schema: {0}")]
    Schema(String),

    #[error(
        "cannot serialize record {position} of batch {batch}, column `{column}`: {reason}"
    )]
    Serialization {
        /// Sequence number of the batch being built.
        batch: usize,
        /// 0-based position of the record inside that batch.
        position: usize,
        column: String,
        reason: String,
    },

    #[error("database rejected batch {batch} ({} batches written before it): {source}", .progress.batches)]
    DatabaseWrite {
        batch: usize,
        /// Batches acknowledged before the failing one.
        progress: WriteProgress,
        #[source]
        source: DriverError,
    },

    #[error("connection cannot provide a bulk-load channel: {0}")]
    ChannelAcquisition(#[source] DriverError),

    #[error("closing the bulk-load channel failed: {0}")]
    ChannelClose(#[source] DriverError),

    #[error("transaction control failed: {0}")]
    Transaction(#[source] DriverError),

    #[error("background writer terminated unexpectedly")]
    WorkerLost,
}

/// Fieldless view of [BulkError] for callers that only branch on category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Schema,
    Serialization,
    DatabaseWrite,
    ChannelAcquisition,
    ChannelClose,
    Transaction,
    WorkerLost,
}

impl BulkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BulkError::Schema(_) => ErrorKind::Schema,
            BulkError::Serialization { .. } => ErrorKind::Serialization,
            BulkError::DatabaseWrite { .. } => ErrorKind::DatabaseWrite,
            BulkError::ChannelAcquisition(_) => ErrorKind::ChannelAcquisition,
            BulkError::ChannelClose(_) => ErrorKind::ChannelClose,
            BulkError::Transaction(_) => ErrorKind::Transaction,
            BulkError::WorkerLost => ErrorKind::WorkerLost,
        }
    }

    /// Driver detail, when the failure came from the database.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            BulkError::DatabaseWrite { source, .. }
            | BulkError::ChannelAcquisition(source)
            | BulkError::ChannelClose(source)
            | BulkError::Transaction(source) => Some(source),
            _ => None,
        }
    }

    /// Batches fully acknowledged before a write failure.
    pub fn batches_written(&self) -> Option<usize> {
        match self {
            BulkError::DatabaseWrite { progress, .. } => Some(progress.batches),
            _ => None,
        }
    }
}

pub type Result<T, E = BulkError> = std::result::Result<T, E>;
