//! Driver-facing seams.
//!
//! A target database is plugged in by implementing [BulkChannelProvider] for
//! its connection type. The engine never sees a concrete driver.

use crate::{BulkFormat, DriverError};

/// Database acknowledgement of one bulk operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadAck {
    pub rows_affected: u64,
    /// Rows the server skipped or coerced while reporting success.
    pub warnings: u64,
}

/// Transaction control on a database connection.
pub trait Connection {
    fn autocommit(&self) -> bool;

    fn set_autocommit(&mut self, enabled: bool) -> Result<(), DriverError>;

    fn commit(&mut self) -> Result<(), DriverError>;

    fn rollback(&mut self) -> Result<(), DriverError>;
}

/// Native fast-path ingestion endpoint of a connection.
///
/// Statements sent through the channel run in the owning connection's
/// session and therefore follow its transaction state.
pub trait BulkChannel: Send {
    /// Run one bulk operation and block until the server has answered.
    fn send(&mut self, header: &str, payload: &[u8]) -> Result<LoadAck, DriverError>;

    fn close(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Capability of a connection to open a [BulkChannel].
pub trait BulkChannelProvider: Connection {
    type Channel: BulkChannel;

    /// Payload grammar the channel expects.
    fn bulk_format(&self) -> BulkFormat;

    /// Fails with [crate::DriverErrorKind::Unsupported] when the connection
    /// has no bulk-load capability (e.g. `local_infile` disabled).
    fn open_bulk_channel(&mut self) -> Result<Self::Channel, DriverError>;
}
