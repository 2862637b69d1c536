use std::process::ExitCode;

use clap::Parser;

mod commands;
mod input;

use commands::Command;
use fleetload_runtime::{PROGRAM_NAME, logging};

#[derive(Debug, Parser)]
#[command(
    name = PROGRAM_NAME,
    version,
    about = "Bulk loading through COPY and LOAD DATA payloads",
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

fn main() -> ExitCode {
    logging::init().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Render(args) => commands::render::run(args),
        Command::Load(args) => commands::load::run(args),
    }
}
