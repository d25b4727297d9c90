//! Build-time half: turn the package graph into a persisted merge plan.

mod builder;
mod merge_plan;
mod store;

pub use builder::{merge_plan_path, MergePlanBuilder};
pub use merge_plan::{LayerEntries, MergePlan, PlanEntry};
pub use store::MergePlanStore;

use crate::error::Result;
use crate::repository::PackageRegistry;

/// What a rebuild did to the persisted plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildStatus {
    /// `build-merge-plan` is off for the root project.
    Disabled,
    /// The plan on disk already matched.
    Unchanged,
    /// The plan file was (re)written.
    Written,
}

/// Build the merge plan for `registry` and persist it next to the root `composer.json`.
pub fn rebuild<R: PackageRegistry + ?Sized>(registry: &R) -> Result<RebuildStatus> {
    let builder = MergePlanBuilder::new(registry)?;
    if !builder.options().build_merge_plan() {
        log::info!("Merge plan building is disabled");
        return Ok(RebuildStatus::Disabled);
    }

    let store = MergePlanStore::new(merge_plan_path(registry, builder.options()));
    let plan = builder.build()?;

    if store.write_if_changed(&plan)? {
        Ok(RebuildStatus::Written)
    } else {
        Ok(RebuildStatus::Unchanged)
    }
}
