use std::{fs, path::PathBuf, process::ExitCode, time::Duration, time::Instant};

use anyhow::Context;
use clap::Args;
use fleetload_engine::{BulkInsert, Connection, InsertConfig, InsertSummary};
use fleetload_memdb::MemDatabase;
use log::{error, info};

use crate::commands::{CommandResult, TableArgs};
use crate::input::{self, parse_columns, read_records, table_def};

#[derive(Debug, Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub table: TableArgs,

    /// Primary key column of the target table
    #[arg(long, value_name = "COLUMN")]
    pub primary_key: Option<String>,

    /// JSON file with insert options; flags take precedence
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Load everything in one transaction, committed at the end
    #[arg(long)]
    pub long_transaction: bool,

    /// Build and write batches on the same thread
    #[arg(long)]
    pub sequential: bool,

    /// Fail when the server silently skips rows
    #[arg(long)]
    pub error_on_missing_row: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub summary: InsertSummary,
    /// Committed rows in the target table afterwards.
    pub rows: usize,
    pub elapsed: Duration,
}

pub fn run(args: LoadArgs) -> ExitCode {
    match execute(args) {
        Ok(code) => code,
        Err(e) => {
            error!("[error] {e:#}");
            eprintln!("[load] {e:#}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: LoadArgs) -> CommandResult<ExitCode> {
    let report = load(&args)?;
    let s = &report.summary;

    println!("records: {}", s.records);
    println!("batches: {}", s.batches);
    println!("bytes:   {}", s.bytes);
    println!("rows:    {}", report.rows);
    println!("elapsed: {:.3?}", report.elapsed);
    Ok(ExitCode::SUCCESS)
}

pub fn insert_config(args: &LoadArgs) -> CommandResult<InsertConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid insert options in {}", path.display()))?
        }
        None => InsertConfig::default(),
    };

    if let Some(bytes) = args.table.batch_size {
        config = config.batch_size(bytes);
    }
    if args.long_transaction {
        config = config.long_transaction(true);
    }
    if args.sequential {
        config = config.concurrent(false);
    }
    if args.error_on_missing_row {
        config = config.error_on_missing_row(true);
    }
    Ok(config)
}

pub fn load(args: &LoadArgs) -> CommandResult<LoadReport> {
    let table = &args.table;
    let columns = parse_columns(&table.columns)?;
    let schema = input::schema(&table.table, &columns)?;
    let records = read_records(&table.input)?;
    let config = insert_config(args)?;
    info!("loading {} records with {config:?}", records.len());

    let db = MemDatabase::new();
    db.create_table(table_def(&table.table, &columns, args.primary_key.as_deref()))?;
    let mut conn = db.connect(table.format);

    let started = Instant::now();
    let summary = BulkInsert::new(schema, config)
        .insert_all(&mut conn, &records)
        .with_context(|| format!("loading {} into `{}`", table.input.display(), table.table))?;
    if !conn.autocommit() {
        conn.commit().context("committing the load")?;
        conn.set_autocommit(true)?;
    }

    Ok(LoadReport {
        summary,
        rows: db.row_count(&table.table).unwrap_or(0),
        elapsed: started.elapsed(),
    })
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
