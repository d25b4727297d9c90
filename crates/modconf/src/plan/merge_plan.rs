use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::module_graph;
use crate::options::DEFAULT_ENVIRONMENT;

/// One file (or `$group` reference) contributed to a plan bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Contributing package, or `/` for the root project.
    pub package: String,

    /// Relative file path or `$group` token.
    pub file: String,

    /// Wildcard token the file was expanded from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl PlanEntry {
    pub fn new(package: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            file: file.into(),
            pattern: None,
        }
    }

    pub fn with_pattern(mut self, pattern: Option<String>) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn is_variable(&self) -> bool {
        self.file.starts_with('$')
    }
}

/// `module layer -> entries`
pub type LayerEntries = BTreeMap<String, Vec<PlanEntry>>;

/// Frozen list of files to merge per group, environment and module layer.
///
/// Maps are key-sorted so the serialized form is stable; entry lists keep
/// insertion order since it defines merge precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<String>,

    #[serde(default)]
    modules: BTreeMap<String, Option<String>>,

    #[serde(default)]
    environments: BTreeSet<String>,

    #[serde(default)]
    groups: BTreeMap<String, BTreeMap<String, LayerEntries>>,
}

impl MergePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_root(&mut self, module: impl Into<String>) {
        self.root = Some(module.into());
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn add_module(&mut self, module: impl Into<String>, parent: Option<String>) {
        self.modules.insert(module.into(), parent);
    }

    pub fn modules(&self) -> &BTreeMap<String, Option<String>> {
        &self.modules
    }

    pub fn add(&mut self, entry: PlanEntry, group: &str, module: &str, environment: &str) {
        self.environments.insert(environment.to_string());
        self.groups
            .entry(group.to_string())
            .or_default()
            .entry(environment.to_string())
            .or_default()
            .entry(module.to_string())
            .or_default()
            .push(entry);
    }

    pub fn add_multiple(
        &mut self,
        entries: impl IntoIterator<Item = PlanEntry>,
        group: &str,
        module: &str,
        environment: &str,
    ) {
        let bucket = self
            .groups
            .entry(group.to_string())
            .or_default()
            .entry(environment.to_string())
            .or_default()
            .entry(module.to_string())
            .or_default();
        bucket.extend(entries);
        self.environments.insert(environment.to_string());
    }

    /// Record an environment that declares no files of its own.
    pub fn add_environment_without_configs(&mut self, environment: &str) {
        self.environments.insert(environment.to_string());
    }

    pub fn has_environment(&self, environment: &str) -> bool {
        environment == DEFAULT_ENVIRONMENT || self.environments.contains(environment)
    }

    pub fn environments(&self) -> impl Iterator<Item = &str> {
        self.environments.iter().map(String::as_str)
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn entries(&self, group: &str, environment: &str, module: &str) -> &[PlanEntry] {
        self.groups
            .get(group)
            .and_then(|envs| envs.get(environment))
            .and_then(|layers| layers.get(module))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Layers merged for `module`, lowest precedence first.
    pub fn lineage(&self, module: &str) -> Result<Vec<String>> {
        module_graph::lineage(&self.modules, module)
    }

    /// Canonical serialized form.
    pub fn to_json(&self) -> Result<String> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        Ok(content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}
