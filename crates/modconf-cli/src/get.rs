//! Get command - resolve one config group.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use modconf::{Config, ConfigPaths, JsonFragmentLoader, PackageRegistry, ResolverOptions, DEFAULT_ENVIRONMENT};

use crate::project::Project;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Group to resolve
    pub group: String,

    /// Module to resolve for (defaults to the root module)
    #[arg(short, long)]
    pub module: Option<String>,

    /// Environment to resolve for
    #[arg(short, long, default_value = DEFAULT_ENVIRONMENT)]
    pub env: String,

    /// Merge nested maps of these groups instead of replacing them
    #[arg(long, action = clap::ArgAction::Append)]
    pub recursive: Vec<String>,

    /// Let the first value of a key win in these groups
    #[arg(long, action = clap::ArgAction::Append)]
    pub reverse: Vec<String>,

    /// Working directory
    #[arg(short = 'd', long, default_value = ".")]
    pub working_dir: PathBuf,
}

pub fn execute(args: GetArgs) -> Result<i32> {
    let project = Project::open(&args.working_dir)?;
    let plan = project.merge_plan()?;
    let paths = ConfigPaths::new(
        project.repository.root().install_path.clone(),
        project.repository.vendor_dir().to_path_buf(),
    );
    let options = ResolverOptions::new()
        .with_recursive_groups(args.recursive)
        .with_reverse_groups(args.reverse);

    let config = Config::new(paths, plan, args.env.as_str(), JsonFragmentLoader, options)?;
    let tree = match &args.module {
        Some(module) => config.get_for(module, &args.group),
        None => config.get(&args.group),
    }
    .with_context(|| format!("Failed to resolve group \"{}\"", args.group))?;

    println!("{}", serde_json::to_string_pretty(&tree)?);
    Ok(0)
}
