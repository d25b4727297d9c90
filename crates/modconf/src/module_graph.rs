//! Ordered module descriptors: vendor packages, vendor-override packages and
//! the modules the root project declares, lowest precedence first.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;

use crate::error::{ConfigError, Result};
use crate::options::{
    ModuleOptions, Options, VENDOR_OVERRIDE_PACKAGE_NAME, VENDOR_PACKAGE_NAME,
};
use crate::package::Package;

/// Where a module's configuration files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    /// A directory of the root project.
    Path {
        path: String,
        config_directory: Option<String>,
    },
    /// An installed package.
    Package {
        package: String,
        config_directory: Option<String>,
    },
}

/// One entry of the config map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleConfig {
    /// Layer key: `vendor`, `//` or a declared module id.
    pub module: String,
    pub source: ModuleSource,
    pub parent: Option<String>,
}

impl ModuleConfig {
    pub fn package(&self) -> Option<&str> {
        match &self.source {
            ModuleSource::Package { package, .. } => Some(package),
            ModuleSource::Path { .. } => None,
        }
    }

    pub fn is_vendor_override(&self) -> bool {
        self.module == VENDOR_OVERRIDE_PACKAGE_NAME
    }
}

/// Builds the config map from the root options and the discovered packages.
#[derive(Debug)]
pub struct ConfigMapBuilder<'a> {
    modules: &'a IndexMap<String, ModuleOptions>,
    root: &'a str,
    options: &'a Options,
}

impl<'a> ConfigMapBuilder<'a> {
    pub fn new(options: &'a Options) -> Result<Self> {
        let root = options.module_root().ok_or_else(|| ConfigError::InvalidOptions {
            message: "Module root name must be set".to_string(),
        })?;
        Ok(Self {
            modules: options.modules(),
            root,
            options,
        })
    }

    /// `packages` are the configuration packages in dependency order.
    pub fn build(&self, packages: &[&Package]) -> Result<Vec<ModuleConfig>> {
        let mut declared = Vec::with_capacity(self.modules.len());
        let mut excluded = HashSet::new();

        for (title, config) in self.modules {
            let config_directory = config.config_directory.clone();
            let source = match (&config.path, &config.package) {
                (Some(_), Some(_)) => {
                    return Err(ConfigError::ModuleHasBothSources { module: title.clone() })
                }
                (Some(path), None) => ModuleSource::Path {
                    path: path.clone(),
                    config_directory,
                },
                (None, Some(package)) => {
                    excluded.insert(package.to_lowercase());
                    ModuleSource::Package {
                        package: package.clone(),
                        config_directory,
                    }
                }
                (None, None) => {
                    return Err(ConfigError::ModuleHasNoSource { module: title.clone() })
                }
            };

            let parent = if title == self.root {
                VENDOR_PACKAGE_NAME.to_string()
            } else {
                config.parent.clone().unwrap_or_else(|| self.root.to_string())
            };

            declared.push(ModuleConfig {
                module: title.clone(),
                source,
                parent: Some(parent),
            });
        }

        self.validate_parents(&declared)?;

        let mut vendor = Vec::new();
        let mut vendor_override = Vec::new();
        for package in packages {
            let name = package.name.to_lowercase();
            if self.options.is_vendor_override(&package.name) {
                if excluded.contains(&name) {
                    return Err(ConfigError::PackageInBothLayers {
                        package: package.name.clone(),
                    });
                }
                vendor_override.push(implicit(package, VENDOR_OVERRIDE_PACKAGE_NAME));
            } else if !excluded.contains(&name) {
                vendor.push(implicit(package, VENDOR_PACKAGE_NAME));
            }
        }

        log::debug!(
            "Config map: {} vendor, {} vendor-override, {} module entries",
            vendor.len(),
            vendor_override.len(),
            declared.len()
        );

        Ok(vendor.into_iter().chain(vendor_override).chain(declared).collect())
    }

    fn validate_parents(&self, declared: &[ModuleConfig]) -> Result<()> {
        let parents = parent_map(declared);
        for config in declared {
            if let Some(parent) = &config.parent {
                if parent != VENDOR_PACKAGE_NAME && !parents.contains_key(parent) {
                    return Err(ConfigError::UnknownParentModule {
                        module: config.module.clone(),
                        parent: parent.clone(),
                    });
                }
            }
            lineage(&parents, &config.module)?;
        }
        Ok(())
    }
}

fn implicit(package: &Package, layer: &str) -> ModuleConfig {
    ModuleConfig {
        module: layer.to_string(),
        source: ModuleSource::Package {
            package: package.name.clone(),
            config_directory: None,
        },
        parent: None,
    }
}

/// `module -> parent` for the declared modules of a config map.
pub fn parent_map(configs: &[ModuleConfig]) -> BTreeMap<String, Option<String>> {
    configs
        .iter()
        .filter(|c| c.module != VENDOR_PACKAGE_NAME && c.module != VENDOR_OVERRIDE_PACKAGE_NAME)
        .map(|c| (c.module.clone(), c.parent.clone()))
        .collect()
}

/// Layers merged for `module`, lowest precedence first:
/// `vendor`, `//`, then the module's ancestors down to the module itself.
pub fn lineage(parents: &BTreeMap<String, Option<String>>, module: &str) -> Result<Vec<String>> {
    let mut chain: Vec<String> = Vec::new();
    let mut current = Some(module);

    while let Some(name) = current {
        if name == VENDOR_PACKAGE_NAME {
            break;
        }
        if chain.iter().any(|m| m == name) {
            return Err(ConfigError::ParentCycle {
                module: module.to_string(),
            });
        }
        let parent = parents.get(name).ok_or_else(|| ConfigError::UnknownModule {
            module: name.to_string(),
        })?;
        chain.push(name.to_string());
        current = parent.as_deref();
    }

    chain.push(VENDOR_OVERRIDE_PACKAGE_NAME.to_string());
    chain.push(VENDOR_PACKAGE_NAME.to_string());
    chain.reverse();
    Ok(chain)
}
