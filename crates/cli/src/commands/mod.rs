pub mod load;
pub mod render;

use std::path::PathBuf;

use clap::{Args, Subcommand};
use fleetload_engine::BulkFormat;
pub use load::LoadArgs;
pub use render::RenderArgs;

/// Common error type for command handlers
pub type CommandResult<T> = anyhow::Result<T>;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the bulk statement and payload batches for a JSONL file.
    ///
    /// Example:
    ///   fleetload render --table employee --columns id:int,name employees.jsonl
    Render(RenderArgs),

    /// Load a JSONL file into an in-memory table and report batch statistics.
    ///
    /// Example:
    ///   fleetload load --table employee --columns id:int,name --batch-size 65536 employees.jsonl
    Load(LoadArgs),
}

/// Target table, column layout and payload grammar shared by all commands.
#[derive(Debug, Args)]
pub struct TableArgs {
    /// Target table name
    #[arg(long, short = 't')]
    pub table: String,

    /// Comma separated `name:type` list (bool, int, float, decimal, text,
    /// bytes, date, time, timestamp, timestamptz)
    #[arg(long, short = 'c')]
    pub columns: String,

    /// Payload grammar: `copy` (PostgreSQL) or `load-data` (MySQL)
    #[arg(long, short = 'f', default_value = "copy")]
    pub format: BulkFormat,

    /// Flush threshold in bytes (default depends on the format)
    #[arg(long, short = 'b', value_name = "BYTES")]
    pub batch_size: Option<u64>,

    /// JSONL input, one object per record
    pub input: PathBuf,
}

impl TableArgs {
    pub fn batch_size_or_default(&self) -> u64 {
        self.batch_size
            .unwrap_or_else(|| self.format.default_batch_size())
    }
}
