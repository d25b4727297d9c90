pub mod config;
pub mod definitions;
pub mod error;
pub mod item;
pub mod loader;
pub mod merge;
pub mod module_graph;
pub mod options;
pub mod package;
pub mod package_config;
pub mod plan;
pub mod repository;
pub mod resolver;

pub use config::Config;
pub use definitions::Definitions;
pub use error::{ConfigError, LoadError, Result};
pub use item::ConfigItem;
pub use loader::{FragmentLoader, JsonFragmentLoader};
pub use merge::{MergeMode, Merger, Origin, ProvenanceIndex};
pub use module_graph::{ConfigMapBuilder, ModuleConfig, ModuleSource};
pub use options::{Options, DEFAULT_ENVIRONMENT, ROOT_PACKAGE_NAME, VENDOR_OVERRIDE_PACKAGE_NAME, VENDOR_PACKAGE_NAME};
pub use package::Package;
pub use package_config::PackageConfiguration;
pub use plan::{rebuild, MergePlan, MergePlanBuilder, MergePlanStore, PlanEntry, RebuildStatus};
pub use repository::{InstalledRepository, PackageRegistry};
pub use resolver::{ConfigPaths, ConfigResolver, GroupSource, LayeredItem, PlanSource, ResolverOptions};
