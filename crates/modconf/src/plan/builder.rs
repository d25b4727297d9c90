use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::item::ConfigItem;
use crate::module_graph::{self, ConfigMapBuilder, ModuleConfig, ModuleSource};
use crate::options::{GroupDeclarations, Options, DEFAULT_ENVIRONMENT, ROOT_PACKAGE_NAME};
use crate::package_config::PackageConfiguration;
use crate::repository::{config_packages, PackageRegistry};

use super::{MergePlan, PlanEntry};

/// Walks the config map once and collects every file reference into a [`MergePlan`].
#[derive(Debug)]
pub struct MergePlanBuilder<'a, R: PackageRegistry + ?Sized> {
    registry: &'a R,
    options: Options,
    plan: MergePlan,
}

impl<'a, R: PackageRegistry + ?Sized> MergePlanBuilder<'a, R> {
    pub fn new(registry: &'a R) -> Result<Self> {
        let options = Options::root(&registry.root().extra)?;
        Ok(Self {
            registry,
            options,
            plan: MergePlan::new(),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn build(mut self) -> Result<MergePlan> {
        let packages = config_packages(self.registry);
        let config_map = ConfigMapBuilder::new(&self.options)?.build(&packages)?;

        if let Some(root) = self.options.module_root() {
            self.plan.set_root(root);
        }
        for (module, parent) in module_graph::parent_map(&config_map) {
            self.plan.add_module(module, parent);
        }

        for module_config in &config_map {
            match &module_config.source {
                ModuleSource::Package { package, config_directory } => {
                    self.add_package(module_config, package, config_directory.as_deref())?
                }
                ModuleSource::Path { path, config_directory } => {
                    self.add_local_module(module_config, path, config_directory.as_deref())?
                }
            }
        }

        Ok(self.plan)
    }

    fn add_package(
        &mut self,
        module_config: &ModuleConfig,
        name: &str,
        config_directory: Option<&str>,
    ) -> Result<()> {
        let package = self
            .registry
            .package(name)
            .ok_or_else(|| ConfigError::PackageNotInstalled {
                package: name.to_string(),
            })?;
        let options = package.options();
        let directory = match config_directory.unwrap_or(options.source_directory()) {
            "" => package.install_path.clone(),
            dir => package.install_path.join(dir),
        };

        log::debug!("Adding {} to layer \"{}\"", package.name, module_config.module);
        let configuration = PackageConfiguration::new(&package.config_declarations()?, directory)?;

        for (group, items) in configuration.groups() {
            for item in items {
                if item.is_variable() {
                    self.plan.add(
                        PlanEntry::new(&package.name, item.value()),
                        group,
                        &module_config.module,
                        DEFAULT_ENVIRONMENT,
                    );
                    continue;
                }

                let path = item.file_path();
                if item.is_optional() && !path.is_file() {
                    log::trace!("Skipping absent optional file {}", path.display());
                    continue;
                }

                let file = if module_config.is_vendor_override() {
                    package.relative_path_with_name(&path)
                } else {
                    package.relative_path(&path)
                };
                self.plan.add(
                    PlanEntry::new(&package.name, file).with_pattern(item.pattern().map(String::from)),
                    group,
                    &module_config.module,
                    DEFAULT_ENVIRONMENT,
                );
            }
        }

        Ok(())
    }

    fn add_local_module(
        &mut self,
        module_config: &ModuleConfig,
        path: &str,
        config_directory: Option<&str>,
    ) -> Result<()> {
        let root = self.registry.root();
        let prefix = join_non_empty([path, config_directory.unwrap_or_default()]);
        let directory = if prefix.is_empty() {
            root.install_path.clone()
        } else {
            root.install_path.join(&prefix)
        };

        let mut environments: Vec<(String, GroupDeclarations)> =
            vec![(DEFAULT_ENVIRONMENT.to_string(), root.config_declarations()?)];
        environments.extend(root.environment_declarations()?);

        for (environment, groups) in environments {
            if groups.is_empty() {
                self.plan.add_environment_without_configs(&environment);
                continue;
            }

            let configuration = PackageConfiguration::new(&groups, directory.clone())?;
            for (group, items) in configuration.groups() {
                let entries: Vec<PlanEntry> = items
                    .iter()
                    .filter_map(|item| local_entry(item, &prefix))
                    .collect();
                self.plan
                    .add_multiple(entries, group, &module_config.module, &environment);
            }
        }

        Ok(())
    }
}

fn local_entry(item: &ConfigItem, prefix: &str) -> Option<PlanEntry> {
    if item.is_variable() {
        return Some(PlanEntry::new(ROOT_PACKAGE_NAME, item.value()));
    }
    if item.is_optional() && !item.file_path().is_file() {
        log::trace!("Skipping absent optional file {}", item.file_path().display());
        return None;
    }
    Some(
        PlanEntry::new(ROOT_PACKAGE_NAME, join_non_empty([prefix, item.name()]))
            .with_pattern(item.pattern().map(|p| join_non_empty([prefix, p]))),
    )
}

fn join_non_empty<'s>(parts: impl IntoIterator<Item = &'s str>) -> String {
    parts
        .into_iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Location of the persisted plan for `registry`'s root project.
pub fn merge_plan_path<R: PackageRegistry + ?Sized>(registry: &R, options: &Options) -> PathBuf {
    registry.root().install_path.join(options.merge_plan_file())
}
