//! Loading the project in a working directory.

use anyhow::{bail, Context, Result};
use std::path::Path;

use modconf::plan::merge_plan_path;
use modconf::{InstalledRepository, MergePlan, MergePlanStore, Options, PackageRegistry};

pub struct Project {
    pub repository: InstalledRepository,
    pub options: Options,
}

impl Project {
    pub fn open(working_dir: &Path) -> Result<Self> {
        let working_dir = working_dir
            .canonicalize()
            .context("Failed to resolve working directory")?;

        let repository = InstalledRepository::load(&working_dir)
            .with_context(|| format!("Failed to load packages from {}", working_dir.display()))?;
        let options = Options::root(&repository.root().extra)
            .context("Invalid config-plugin-options in composer.json")?;

        Ok(Self { repository, options })
    }

    pub fn store(&self) -> MergePlanStore {
        MergePlanStore::new(merge_plan_path(&self.repository, &self.options))
    }

    /// The persisted plan; fails when it was never built.
    pub fn merge_plan(&self) -> Result<MergePlan> {
        let store = self.store();
        match store.load().with_context(|| format!("Failed to read {}", store.path().display()))? {
            Some(plan) => Ok(plan),
            None => bail!(
                "Merge plan {} not found, run `modconf rebuild` first",
                store.path().display()
            ),
        }
    }
}
