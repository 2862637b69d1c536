use std::{
    io::{self, Write},
    process::ExitCode,
    sync::Arc,
};

use clap::Args;
use fleetload_engine::{Batch, ContentBuilder, header_sql};
use log::{debug, error};

use crate::commands::{CommandResult, TableArgs};
use crate::input::{self, parse_columns, read_records};

#[derive(Debug, Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub table: TableArgs,
}

pub fn run(args: RenderArgs) -> ExitCode {
    match execute(args) {
        Ok(code) => code,
        Err(e) => {
            error!("[error] {e:#}");
            eprintln!("[render] {e:#}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: RenderArgs) -> CommandResult<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let batches = render(&args.table, &mut out)?;
    out.flush()?;

    debug!("rendered {batches} batches");
    Ok(ExitCode::SUCCESS)
}

/// Write the bulk statement followed by every batch, each introduced by a
/// `--` comment line. Returns the number of batches.
pub fn render<W: Write>(args: &TableArgs, out: &mut W) -> CommandResult<usize> {
    let columns = parse_columns(&args.columns)?;
    let schema = Arc::new(input::schema(&args.table, &columns)?);
    let records = read_records(&args.input)?;
    let threshold = args.batch_size_or_default();

    writeln!(out, "{};", header_sql(args.format, &schema))?;

    let mut builder = ContentBuilder::new(schema, args.format);
    let mut batches = 0;
    for record in &records {
        builder.add(record)?;
        if builder.is_filled(threshold) {
            write_batch(out, builder.take_content())?;
            batches += 1;
        }
    }
    if !builder.is_empty() {
        write_batch(out, builder.take_content())?;
        batches += 1;
    }
    Ok(batches)
}

fn write_batch<W: Write>(out: &mut W, batch: Batch) -> io::Result<()> {
    writeln!(
        out,
        "-- batch {}: {} records, {} bytes",
        batch.seq(),
        batch.records(),
        batch.size()
    )?;
    out.write_all(batch.bytes())
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
