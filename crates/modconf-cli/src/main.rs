mod get;
mod plan;
mod project;
mod rebuild;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "modconf")]
#[command(about = "Merge plan builder and config resolver for modular Composer projects")]
#[command(version)]
struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the merge plan and write it if it changed
    Rebuild(rebuild::RebuildArgs),

    /// Resolve a config group and print it as JSON
    Get(get::GetArgs),

    /// List the groups and environments of the persisted merge plan
    Plan(plan::PlanArgs),
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp(None);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn run() -> Result<i32> {
    let args = Args::parse();
    init_logger(args.verbose);

    match args.command {
        Commands::Rebuild(rebuild_args) => rebuild::execute(rebuild_args),
        Commands::Get(get_args) => get::execute(get_args),
        Commands::Plan(plan_args) => plan::execute(plan_args),
    }
}

/// Status byte for a command result; codes outside `0..=255` report failure.
fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(exit_status(code)),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
