//! Package model: the subset of Composer package metadata the plugin needs.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::options::{self, GroupDeclarations, Options};

/// An installed package or the root project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Package {
    /// Package name (e.g., "vendor/package")
    pub name: String,

    /// Absolute directory the package is installed into
    pub install_path: PathBuf,

    /// Raw `extra` section
    pub extra: Value,

    /// Names of required packages
    pub require: Vec<String>,

    /// Names of dev-required packages (only followed for the root)
    pub require_dev: Vec<String>,
}

impl Package {
    pub fn new(name: impl Into<String>, install_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            install_path: install_path.into(),
            extra: Value::Object(Default::default()),
            require: Vec::new(),
            require_dev: Vec::new(),
        }
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = extra;
        self
    }

    pub fn with_require(mut self, require: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.require = require.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_require_dev(mut self, require: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.require_dev = require.into_iter().map(Into::into).collect();
        self
    }

    pub fn options(&self) -> Options {
        Options::from_extra(&self.extra)
    }

    /// Whether the package contributes configuration at all.
    pub fn declares_config(&self) -> bool {
        self.extra.get(options::EXTRA_CONFIG_FILE).is_some_and(Value::is_string)
            || self
                .extra
                .get(options::EXTRA_CONFIG)
                .is_some_and(|v| !is_empty_value(v))
    }

    /// Group declarations, read from `config-plugin-file` when set.
    pub fn config_declarations(&self) -> Result<GroupDeclarations> {
        if let Some(file) = self.extra.get(options::EXTRA_CONFIG_FILE).and_then(Value::as_str) {
            let path = self.install_path.join(file);
            log::trace!("Reading config declarations of {} from {}", self.name, path.display());
            let content = fs::read_to_string(&path).map_err(|e| ConfigError::InvalidOptions {
                message: format!("Failed to read {}: {}", path.display(), e),
            })?;
            let value: Value = serde_json::from_str(&content)?;
            return options::parse_groups(&value);
        }

        match self.extra.get(options::EXTRA_CONFIG) {
            Some(value) => options::parse_groups(value),
            None => Ok(GroupDeclarations::new()),
        }
    }

    /// Environment declarations of the root project.
    pub fn environment_declarations(&self) -> Result<indexmap::IndexMap<String, GroupDeclarations>> {
        match self.extra.get(options::EXTRA_ENVIRONMENTS) {
            Some(value) => options::parse_environments(value),
            None => Ok(Default::default()),
        }
    }

    /// Path of `absolute` relative to the install path, with `/` separators.
    pub fn relative_path(&self, absolute: &Path) -> String {
        let relative = pathdiff::diff_paths(absolute, &self.install_path)
            .unwrap_or_else(|| absolute.to_path_buf());
        to_slash(&relative)
    }

    /// Like [`Package::relative_path`], prefixed with the package name.
    pub fn relative_path_with_name(&self, absolute: &Path) -> String {
        format!("{}/{}", self.name, self.relative_path(absolute))
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

pub(crate) fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
