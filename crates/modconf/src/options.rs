//! Plugin options read from a package's `extra` section.
//!
//! Three keys of `extra` are understood:
//!
//! - `config-plugin`: `group -> token | [tokens]`
//! - `config-plugin-file`: path to a JSON file holding the same map
//! - `config-plugin-environments` (root only): `environment -> group -> tokens`
//!
//! and `config-plugin-options` carries the settings parsed into [`Options`].

use glob::Pattern;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ConfigError, Result};

pub const MERGE_PLAN_FILENAME: &str = ".merge-plan.json";
pub const DEFAULT_CONFIG_DIRECTORY: &str = "config";
pub const DEFAULT_VENDOR_DIRECTORY: &str = "vendor";
pub const DEFAULT_ENVIRONMENT: &str = "/";
pub const ROOT_PACKAGE_NAME: &str = "/";
pub const VENDOR_OVERRIDE_PACKAGE_NAME: &str = "//";
pub const VENDOR_PACKAGE_NAME: &str = "vendor";

pub const EXTRA_CONFIG: &str = "config-plugin";
pub const EXTRA_CONFIG_FILE: &str = "config-plugin-file";
pub const EXTRA_ENVIRONMENTS: &str = "config-plugin-environments";
pub const EXTRA_OPTIONS: &str = "config-plugin-options";

/// Ordered `group -> tokens` declarations of one package or environment.
pub type GroupDeclarations = IndexMap<String, Vec<String>>;

/// One entry of the root `modules` option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleOptions {
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub package: Option<String>,

    #[serde(default)]
    pub config_directory: Option<String>,

    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawOptions {
    #[serde(default)]
    modules: Option<IndexMap<String, ModuleOptions>>,
    #[serde(default)]
    module_root: Option<String>,
    #[serde(default)]
    build_merge_plan: Option<bool>,
    #[serde(default)]
    vendor_override_layer: Option<OneOrMany>,
    #[serde(default)]
    source_directory: Option<String>,
    #[serde(default)]
    merge_plan_file: Option<String>,
}

/// Parsed `config-plugin-options`.
#[derive(Debug, Clone)]
pub struct Options {
    build_merge_plan: bool,
    vendor_override_layer: Vec<String>,
    source_directory: String,
    merge_plan_file: String,
    modules: IndexMap<String, ModuleOptions>,
    module_root: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            build_merge_plan: true,
            vendor_override_layer: Vec::new(),
            source_directory: DEFAULT_CONFIG_DIRECTORY.to_string(),
            merge_plan_file: MERGE_PLAN_FILENAME.to_string(),
            modules: IndexMap::new(),
            module_root: None,
        }
    }
}

impl Options {
    /// Options of a dependency package. Missing or malformed sections fall back to defaults.
    pub fn from_extra(extra: &Value) -> Self {
        match extra.get(EXTRA_OPTIONS) {
            Some(value @ Value::Object(_)) => match serde_json::from_value::<RawOptions>(value.clone()) {
                Ok(raw) => Self::from_raw(raw),
                Err(e) => {
                    log::debug!("Ignoring malformed {}: {}", EXTRA_OPTIONS, e);
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }

    /// Options of the root project; `modules` and `module-root` are mandatory.
    pub fn root(extra: &Value) -> Result<Self> {
        let raw: RawOptions = match extra.get(EXTRA_OPTIONS) {
            Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
                .map_err(|e| invalid(format!("{}", e)))?,
            _ => RawOptions::default(),
        };

        if raw.modules.is_none() {
            return Err(invalid(
                "Module list must be set in the \"config-plugin-options\" section of the composer.json",
            ));
        }
        let Some(module_root) = raw.module_root.clone() else {
            return Err(invalid(
                "Module root name must be set in the \"config-plugin-options\" section of the composer.json",
            ));
        };

        let options = Self::from_raw(raw);
        if !options.modules.contains_key(&module_root) {
            return Err(ConfigError::RootModuleMissing { module: module_root });
        }

        Ok(options)
    }

    fn from_raw(raw: RawOptions) -> Self {
        let defaults = Self::default();
        Self {
            build_merge_plan: raw.build_merge_plan.unwrap_or(defaults.build_merge_plan),
            vendor_override_layer: raw.vendor_override_layer.map(Into::into).unwrap_or_default(),
            source_directory: raw
                .source_directory
                .map(|dir| normalize_path(&dir))
                .unwrap_or(defaults.source_directory),
            merge_plan_file: raw.merge_plan_file.unwrap_or(defaults.merge_plan_file),
            modules: raw.modules.unwrap_or_default(),
            module_root: raw.module_root,
        }
    }

    pub fn build_merge_plan(&self) -> bool {
        self.build_merge_plan
    }

    pub fn vendor_override_layer_packages(&self) -> &[String] {
        &self.vendor_override_layer
    }

    /// Whether `package` belongs to the vendor-override layer. Entries may use `*`.
    pub fn is_vendor_override(&self, package: &str) -> bool {
        self.vendor_override_layer.iter().any(|entry| {
            if entry.contains('*') {
                Pattern::new(entry).map(|p| p.matches(package)).unwrap_or(false)
            } else {
                entry == package
            }
        })
    }

    pub fn source_directory(&self) -> &str {
        &self.source_directory
    }

    pub fn merge_plan_file(&self) -> &str {
        &self.merge_plan_file
    }

    pub fn modules(&self) -> &IndexMap<String, ModuleOptions> {
        &self.modules
    }

    pub fn module_root(&self) -> Option<&str> {
        self.module_root.as_deref()
    }
}

/// Parse a `group -> token | [tokens]` map. `[]` is read as an empty map.
pub fn parse_groups(value: &Value) -> Result<GroupDeclarations> {
    match value {
        Value::Array(items) if items.is_empty() => Ok(GroupDeclarations::new()),
        Value::Null => Ok(GroupDeclarations::new()),
        _ => {
            let raw: IndexMap<String, OneOrMany> = serde_json::from_value(value.clone())
                .map_err(|e| invalid(format!("Invalid group declaration: {}", e)))?;
            Ok(raw.into_iter().map(|(group, files)| (group, files.into())).collect())
        }
    }
}

/// Parse `config-plugin-environments`.
pub fn parse_environments(value: &Value) -> Result<IndexMap<String, GroupDeclarations>> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(environment, groups)| Ok((environment.clone(), parse_groups(groups)?)))
            .collect(),
        Value::Null => Ok(IndexMap::new()),
        Value::Array(items) if items.is_empty() => Ok(IndexMap::new()),
        _ => Err(invalid("Environments must be a map of environment to groups")),
    }
}

fn normalize_path(value: &str) -> String {
    value.replace('\\', "/").trim_matches('/').to_string()
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidOptions {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_without_options() {
        let options = Options::from_extra(&json!({}));

        assert!(options.build_merge_plan());
        assert_eq!(options.source_directory(), "config");
        assert_eq!(options.merge_plan_file(), ".merge-plan.json");
        assert!(options.vendor_override_layer_packages().is_empty());
    }

    #[test]
    fn test_source_directory_is_normalized() {
        let options = Options::from_extra(&json!({
            "config-plugin-options": { "source-directory": "\\custom\\dir/" }
        }));

        assert_eq!(options.source_directory(), "custom/dir");
    }

    #[test]
    fn test_vendor_override_accepts_string_and_patterns() {
        let options = Options::from_extra(&json!({
            "config-plugin-options": { "vendor-override-layer": "test/over" }
        }));
        assert!(options.is_vendor_override("test/over"));
        assert!(!options.is_vendor_override("test/a"));

        let options = Options::from_extra(&json!({
            "config-plugin-options": { "vendor-override-layer": ["acme/*"] }
        }));
        assert!(options.is_vendor_override("acme/tools"));
        assert!(!options.is_vendor_override("test/over"));
    }

    #[test]
    fn test_root_requires_modules() {
        let err = Options::root(&json!({
            "config-plugin-options": { "module-root": "main" }
        }))
        .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidOptions { .. }));
    }

    #[test]
    fn test_root_requires_declared_root_module() {
        let err = Options::root(&json!({
            "config-plugin-options": {
                "modules": { "main": { "path": "" } },
                "module-root": "other"
            }
        }))
        .unwrap_err();

        assert!(matches!(err, ConfigError::RootModuleMissing { module } if module == "other"));
    }

    #[test]
    fn test_root_modules_keep_declaration_order() {
        let options = Options::root(&json!({
            "config-plugin-options": {
                "modules": {
                    "main": { "path": "" },
                    "blog": { "package": "acme/blog", "config-directory": "conf", "parent": "main" }
                },
                "module-root": "main",
                "build-merge-plan": false
            }
        }))
        .unwrap();

        let names: Vec<&str> = options.modules().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["main", "blog"]);
        assert_eq!(options.modules()["blog"].config_directory.as_deref(), Some("conf"));
        assert_eq!(options.module_root(), Some("main"));
        assert!(!options.build_merge_plan());
    }

    #[test]
    fn test_parse_groups() {
        let groups = parse_groups(&json!({
            "common": "common/*.json",
            "params": ["params.json", "?params-local.json"],
            "empty": []
        }))
        .unwrap();

        assert_eq!(groups["common"], vec!["common/*.json"]);
        assert_eq!(groups["params"], vec!["params.json", "?params-local.json"]);
        assert!(groups["empty"].is_empty());
        assert!(parse_groups(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_parse_environments() {
        let environments = parse_environments(&json!({
            "dev": { "params": "dev/params.json" },
            "prod": []
        }))
        .unwrap();

        assert_eq!(environments["dev"]["params"], vec!["dev/params.json"]);
        assert!(environments["prod"].is_empty());
    }
}
