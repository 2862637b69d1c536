mod channel;
mod config;
mod content;
mod error;
mod format;
mod insert;
mod pipelined;
mod schema;
mod sql;
pub mod transaction;
mod value;
mod writer;

#[cfg(test)]
mod testing;

pub use channel::{BulkChannel, BulkChannelProvider, Connection, LoadAck};
pub use config::InsertConfig;
pub use content::{Batch, ContentBuilder};
pub use error::{BulkError, DriverError, DriverErrorKind, ErrorKind, FieldError, Result};
pub use format::{BulkFormat, ESCAPE, FIELD_DELIMITER, LINE_TERMINATOR, NULL_MARKER};
pub use insert::{BulkInsert, InsertSummary};
pub use pipelined::PipelinedContentWriter;
pub use schema::{ColumnDescriptor, Extractor, SchemaBuilder, SchemaDescriptor};
pub use sql::{HeaderTarget, header_sql};
pub use transaction::{Outcome, TransactionPolicy};
pub use value::Value;
pub use writer::{ChannelContentWriter, ContentWriter, WriteProgress};
