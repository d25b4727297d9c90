//! Plan command - summarize the persisted merge plan.

use anyhow::Result;
use clap::Args;
use console::style;
use std::path::PathBuf;

use crate::project::Project;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Working directory
    #[arg(short = 'd', long, default_value = ".")]
    pub working_dir: PathBuf,
}

pub fn execute(args: PlanArgs) -> Result<i32> {
    let project = Project::open(&args.working_dir)?;
    let plan = project.merge_plan()?;

    if let Some(root) = plan.root() {
        println!("{} {}", style("Root module:").bold(), root);
    }

    println!("{}", style("Modules:").bold());
    for (module, parent) in plan.modules() {
        match parent {
            Some(parent) => println!("  {} {}", style(module).green(), style(format!("(parent: {})", parent)).dim()),
            None => println!("  {}", style(module).green()),
        }
    }

    println!("{}", style("Environments:").bold());
    for environment in plan.environments() {
        println!("  {}", environment);
    }

    println!("{}", style("Groups:").bold());
    for group in plan.groups() {
        println!("  {}", style(group).cyan());
    }

    Ok(0)
}
