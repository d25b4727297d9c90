use std::cell::RefCell;
use std::collections::HashMap;

use crate::definitions::Definitions;
use crate::error::{ConfigError, Result};
use crate::loader::{FragmentLoader, JsonFragmentLoader};
use crate::plan::MergePlan;
use crate::resolver::{ConfigPaths, ConfigResolver, PlanSource, ResolverOptions};

/// Read access to the groups of a persisted merge plan for one environment.
///
/// Resolved groups are cached for the lifetime of the value.
pub struct Config<L: FragmentLoader = JsonFragmentLoader> {
    source: PlanSource,
    loader: L,
    options: ResolverOptions,
    cache: RefCell<HashMap<(String, String), Definitions>>,
}

impl<L: FragmentLoader> Config<L> {
    pub fn new(
        paths: ConfigPaths,
        plan: MergePlan,
        environment: impl Into<String>,
        loader: L,
        options: ResolverOptions,
    ) -> Result<Self> {
        let environment = environment.into();
        if !plan.has_environment(&environment) {
            return Err(ConfigError::UnknownEnvironment { environment });
        }

        Ok(Self {
            source: PlanSource::new(plan, paths, environment),
            loader,
            options,
            cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn environment(&self) -> &str {
        self.source.environment()
    }

    pub fn plan(&self) -> &MergePlan {
        self.source.plan()
    }

    pub fn root_module(&self) -> Result<&str> {
        self.source.plan().root().ok_or_else(|| ConfigError::InvalidOptions {
            message: "The merge plan has no root module".to_string(),
        })
    }

    /// `group` as seen by the root module.
    pub fn get(&self, group: &str) -> Result<Definitions> {
        let module = self.root_module()?.to_string();
        self.get_for(&module, group)
    }

    pub fn get_for(&self, module: &str, group: &str) -> Result<Definitions> {
        let key = (module.to_string(), group.to_string());
        if let Some(cached) = self.cache.borrow().get(&key) {
            return Ok(cached.clone());
        }

        let tree = ConfigResolver::new(&self.source, &self.loader, &self.options).resolve(module, group)?;
        self.cache.borrow_mut().insert(key, tree.clone());
        Ok(tree)
    }

    /// Whether any layer of any environment declares `group`.
    pub fn has(&self, group: &str) -> bool {
        self.source.plan().has_group(group)
    }
}
