//! In-memory relational target for bulk loads.
//!
//! [MemDatabase] hands out connections implementing the engine's
//! [fleetload_engine::BulkChannelProvider]. Payloads are read back with the
//! server-side grammar of each format and checked against column types,
//! primary keys and foreign keys, so a load can be verified end to end
//! without a database server.

mod catalog;
mod connection;
mod payload;
mod types;

pub use catalog::{ColumnDef, ForeignKey, TableDef};
pub use connection::{MemChannel, MemConnection, MemDatabase};
pub use payload::{PayloadError, RawRow, parse_payload};
pub use types::ColumnType;
