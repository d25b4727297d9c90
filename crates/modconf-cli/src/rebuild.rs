//! Rebuild command - write the merge plan of the project.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;

use modconf::RebuildStatus;

use crate::project::Project;

#[derive(Args, Debug)]
pub struct RebuildArgs {
    /// Working directory
    #[arg(short = 'd', long, default_value = ".")]
    pub working_dir: PathBuf,
}

pub fn execute(args: RebuildArgs) -> Result<i32> {
    let project = Project::open(&args.working_dir)?;
    let path = project.store().path().to_path_buf();

    let status = modconf::rebuild(&project.repository).context("Failed to build the merge plan")?;

    match status {
        RebuildStatus::Disabled => {
            println!("{} Merge plan building is disabled", style("!").yellow());
        }
        RebuildStatus::Unchanged => {
            println!("{} {} is up to date", style("✓").green(), path.display());
        }
        RebuildStatus::Written => {
            println!("{} Wrote {}", style("✓").green(), path.display());
        }
    }

    Ok(0)
}
