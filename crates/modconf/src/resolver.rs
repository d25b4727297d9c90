//! Runtime half: fold the files of a group into one definitions tree.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::definitions::Definitions;
use crate::error::{ConfigError, Result};
use crate::item::ConfigItem;
use crate::loader::FragmentLoader;
use crate::merge::{MergeMode, MergeSource, Merger, Origin, ProvenanceIndex};
use crate::options::{DEFAULT_ENVIRONMENT, DEFAULT_VENDOR_DIRECTORY, ROOT_PACKAGE_NAME, VENDOR_OVERRIDE_PACKAGE_NAME};
use crate::package_config::PackageConfiguration;
use crate::plan::{MergePlan, PlanEntry};

pub const DEFAULT_PARAMS_GROUP: &str = "params";

/// A config item together with the precedence layer it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayeredItem {
    pub item: ConfigItem,
    pub layer: String,
}

/// Where the items of a group come from.
pub trait GroupSource {
    /// Items of `group` for `module`, lowest precedence first.
    fn items(&self, module: &str, group: &str) -> Result<Vec<LayeredItem>>;
}

/// A single package resolved on its own; `module` names the package and is
/// its only layer.
impl GroupSource for PackageConfiguration {
    fn items(&self, module: &str, group: &str) -> Result<Vec<LayeredItem>> {
        Ok(self
            .group_files(group)
            .iter()
            .map(|item| LayeredItem {
                item: item.clone(),
                layer: module.to_string(),
            })
            .collect())
    }
}

/// Base directories plan entries are relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    root: PathBuf,
    vendor: PathBuf,
}

impl ConfigPaths {
    pub fn new(root: impl Into<PathBuf>, vendor: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            vendor: vendor.into(),
        }
    }

    /// Paths for a project using the default `vendor` directory.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let vendor = root.join(DEFAULT_VENDOR_DIRECTORY);
        Self { root, vendor }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn vendor(&self) -> &Path {
        &self.vendor
    }

    /// Directory the `file` of an entry found in `layer` is relative to.
    pub fn base_directory(&self, entry: &PlanEntry, layer: &str) -> PathBuf {
        if entry.package == ROOT_PACKAGE_NAME {
            self.root.clone()
        } else if layer == VENDOR_OVERRIDE_PACKAGE_NAME {
            self.vendor.clone()
        } else {
            self.vendor.join(&entry.package)
        }
    }
}

/// Items read from a persisted merge plan for one environment.
///
/// The default environment is merged across the whole lineage first, the
/// selected environment on top of it.
#[derive(Debug, Clone)]
pub struct PlanSource {
    plan: MergePlan,
    paths: ConfigPaths,
    environment: String,
}

impl PlanSource {
    pub fn new(plan: MergePlan, paths: ConfigPaths, environment: impl Into<String>) -> Self {
        Self {
            plan,
            paths,
            environment: environment.into(),
        }
    }

    pub fn plan(&self) -> &MergePlan {
        &self.plan
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    fn item(&self, entry: &PlanEntry, layer: &str) -> ConfigItem {
        let directory = self.paths.base_directory(entry, layer);
        match &entry.pattern {
            // Patterns are only unique per package.
            Some(pattern) => ConfigItem::expanded(
                entry.file.as_str(),
                directory,
                format!("{}:{}", entry.package, pattern),
            ),
            None => ConfigItem::new(entry.file.as_str(), directory),
        }
    }
}

impl GroupSource for PlanSource {
    fn items(&self, module: &str, group: &str) -> Result<Vec<LayeredItem>> {
        let lineage = self.plan.lineage(module)?;
        let mut environments = vec![DEFAULT_ENVIRONMENT];
        if self.environment != DEFAULT_ENVIRONMENT {
            environments.push(&self.environment);
        }

        let mut items = Vec::new();
        for environment in environments {
            for layer in &lineage {
                for entry in self.plan.entries(group, environment, layer) {
                    items.push(LayeredItem {
                        item: self.item(entry, layer),
                        layer: format!("{}@{}", layer, environment),
                    });
                }
            }
        }
        Ok(items)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    params_group: String,
    recursive_groups: BTreeSet<String>,
    reverse_groups: BTreeSet<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            params_group: DEFAULT_PARAMS_GROUP.to_string(),
            recursive_groups: BTreeSet::new(),
            reverse_groups: BTreeSet::new(),
        }
    }
}

impl ResolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params_group(mut self, group: impl Into<String>) -> Self {
        self.params_group = group.into();
        self
    }

    pub fn with_recursive_groups(mut self, groups: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.recursive_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn with_reverse_groups(mut self, groups: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.reverse_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn params_group(&self) -> &str {
        &self.params_group
    }

    pub fn mode(&self, group: &str) -> MergeMode {
        MergeMode {
            recursive: self.recursive_groups.contains(group),
            reverse: self.reverse_groups.contains(group),
        }
    }
}

/// Resolves groups of a [`GroupSource`], loading files with a [`FragmentLoader`].
///
/// Each call to [`resolve`](Self::resolve) is an independent pass with its
/// own cycle guard and params cache.
pub struct ConfigResolver<'a, S: GroupSource + ?Sized, L: FragmentLoader + ?Sized> {
    source: &'a S,
    loader: &'a L,
    options: &'a ResolverOptions,
}

impl<'a, S: GroupSource + ?Sized, L: FragmentLoader + ?Sized> ConfigResolver<'a, S, L> {
    pub fn new(source: &'a S, loader: &'a L, options: &'a ResolverOptions) -> Self {
        Self { source, loader, options }
    }

    pub fn resolve(&self, module: &str, group: &str) -> Result<Definitions> {
        let mut pass = Pass {
            source: self.source,
            loader: self.loader,
            options: self.options,
            building: HashSet::new(),
            params: HashMap::new(),
        };
        pass.resolve(module, group)
    }
}

struct Pass<'a, S: GroupSource + ?Sized, L: FragmentLoader + ?Sized> {
    source: &'a S,
    loader: &'a L,
    options: &'a ResolverOptions,
    building: HashSet<(String, String)>,
    params: HashMap<String, Definitions>,
}

impl<S: GroupSource + ?Sized, L: FragmentLoader + ?Sized> Pass<'_, S, L> {
    fn resolve(&mut self, module: &str, group: &str) -> Result<Definitions> {
        let key = (module.to_string(), group.to_string());
        if !self.building.insert(key.clone()) {
            return Err(ConfigError::CircularReference {
                module: module.to_string(),
                group: group.to_string(),
            });
        }

        let result = self.build(module, group);
        self.building.remove(&key);
        result
    }

    fn build(&mut self, module: &str, group: &str) -> Result<Definitions> {
        log::debug!("Resolving group \"{}\" of module \"{}\"", group, module);

        let params = self.params_scope(module)?;
        let mode = self.options.mode(group);
        let mut index = ProvenanceIndex::new();
        let mut result = Definitions::empty();

        for LayeredItem { item, layer } in self.source.items(module, group)? {
            if item.is_variable() {
                let referenced = self.resolve(module, item.name())?;
                let source = MergeSource {
                    group,
                    layer: &layer,
                    origin: None,
                };
                result = Merger::new(mode, source, &mut index).merge(result, referenced, &[])?;
                continue;
            }

            let path = item.file_path();
            if !path.is_file() {
                log::debug!("Skipping missing file {}", path.display());
                continue;
            }

            log::trace!("Merging {} into \"{}\" at layer {}", path.display(), group, layer);
            let tree = self.loader.load(&path, &params)?;
            let origin = Origin::new(path).with_pattern(item.pattern().map(String::from));
            let source = MergeSource {
                group,
                layer: &layer,
                origin: Some(&origin),
            };
            result = Merger::new(mode, source, &mut index).merge(result, tree, &[])?;
        }

        Ok(result)
    }

    /// Params visible to the fragments of `module`; empty while params itself is building.
    fn params_scope(&mut self, module: &str) -> Result<Definitions> {
        let params_group = self.options.params_group();
        if self
            .building
            .contains(&(module.to_string(), params_group.to_string()))
        {
            return Ok(Definitions::empty());
        }
        if let Some(params) = self.params.get(module) {
            return Ok(params.clone());
        }

        let params = self.resolve(module, params_group)?;
        self.params.insert(module.to_string(), params.clone());
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::loader::JsonFragmentLoader;
    use crate::options::GroupDeclarations;
    use serde_json::json;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    fn declarations(value: serde_json::Value) -> GroupDeclarations {
        crate::options::parse_groups(&value).unwrap()
    }

    fn write(dir: &TempDir, name: &str, value: serde_json::Value) {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, value.to_string()).unwrap();
    }

    fn resolve(dir: &TempDir, groups: serde_json::Value, group: &str) -> Result<Definitions> {
        let configuration = PackageConfiguration::new(&declarations(groups), dir.path()).unwrap();
        let options = ResolverOptions::default();
        ConfigResolver::new(&configuration, &JsonFragmentLoader, &options).resolve("test/a", group)
    }

    #[test]
    fn test_variable_then_own_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "common/a.json", json!({ "name": "a", "from_a": true }));
        write(&dir, "common/b.json", json!({ "name": "b" }));
        write(&dir, "web.json", json!({ "name": "web" }));

        let tree = resolve(
            &dir,
            json!({ "common": "common/*.json", "web": ["$common", "web.json"] }),
            "web",
        )
        .unwrap();

        assert_eq!(tree, Definitions::from(json!({ "name": "web", "from_a": true })));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let dir = TempDir::new().unwrap();
        let err = resolve(&dir, json!({ "web": ["$web"] }), "web").unwrap_err();
        assert!(matches!(err, ConfigError::CircularReference { ref group, .. } if group == "web"));
    }

    #[test]
    fn test_indirect_cycle() {
        let dir = TempDir::new().unwrap();
        let err = resolve(&dir, json!({ "a": ["$b"], "b": ["$a"] }), "a").unwrap_err();
        assert!(matches!(err, ConfigError::CircularReference { .. }));
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(&dir, "web.json", json!({ "a": 1 }));

        let tree = resolve(&dir, json!({ "web": ["missing.json", "web.json"] }), "web").unwrap();

        assert_eq!(tree, Definitions::from(json!({ "a": 1 })));
    }

    #[test]
    fn test_params_are_visible_to_fragments() {
        let dir = TempDir::new().unwrap();
        write(&dir, "params.json", json!({ "db": { "dsn": "sqlite" } }));
        write(&dir, "db.json", json!({ "dsn": "${params.db.dsn}" }));

        let tree = resolve(&dir, json!({ "params": "params.json", "db": "db.json" }), "db").unwrap();

        assert_eq!(tree, Definitions::from(json!({ "dsn": "sqlite" })));
    }

    #[test]
    fn test_params_cannot_see_itself() {
        let dir = TempDir::new().unwrap();
        write(&dir, "params.json", json!({ "self": "${params.self}" }));

        let err = resolve(&dir, json!({ "params": "params.json" }), "params").unwrap_err();

        assert!(matches!(err, ConfigError::Load(LoadError { .. })));
    }

    #[test]
    fn test_duplicate_in_same_layer() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.json", json!({ "key": "X" }));
        write(&dir, "b.json", json!({ "key": "Y" }));

        let err = resolve(&dir, json!({ "web": ["a.json", "b.json"] }), "web").unwrap_err();

        match err {
            ConfigError::DuplicateKey { key, files, .. } => {
                assert_eq!(key, "key");
                assert_eq!(files, [dir.path().join("a.json"), dir.path().join("b.json")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_recursive_group() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.json", json!({ "db": { "host": "a", "port": 1 } }));
        write(&dir, "b.json", json!({ "db": { "user": "b" } }));
        let configuration = PackageConfiguration::new(
            &declarations(json!({ "web": ["a.json", "b.json"] })),
            dir.path(),
        )
        .unwrap();
        let options = ResolverOptions::new().with_recursive_groups(["web"]);

        let tree = ConfigResolver::new(&configuration, &JsonFragmentLoader, &options)
            .resolve("test/a", "web")
            .unwrap();

        assert_eq!(tree, Definitions::from(json!({ "db": { "host": "a", "port": 1, "user": "b" } })));
    }

    struct CountingLoader {
        loads: RefCell<Vec<PathBuf>>,
    }

    impl FragmentLoader for CountingLoader {
        fn load(&self, path: &Path, params: &Definitions) -> std::result::Result<Definitions, LoadError> {
            self.loads.borrow_mut().push(path.to_path_buf());
            JsonFragmentLoader.load(path, params)
        }
    }

    #[test]
    fn test_params_resolved_once_per_pass() {
        let dir = TempDir::new().unwrap();
        write(&dir, "params.json", json!({ "a": 1 }));
        write(&dir, "common.json", json!({ "c": 1 }));
        write(&dir, "web.json", json!({ "w": 1 }));
        let configuration = PackageConfiguration::new(
            &declarations(json!({ "params": "params.json", "common": "common.json", "web": ["$common", "web.json"] })),
            dir.path(),
        )
        .unwrap();
        let loader = CountingLoader { loads: RefCell::new(Vec::new()) };
        let options = ResolverOptions::default();

        ConfigResolver::new(&configuration, &loader, &options)
            .resolve("test/a", "web")
            .unwrap();

        let params_loads = loader
            .loads
            .borrow()
            .iter()
            .filter(|p| p.ends_with("params.json"))
            .count();
        assert_eq!(params_loads, 1);
    }

    #[test]
    fn test_config_paths() {
        let paths = ConfigPaths::from_root("/app");

        assert_eq!(paths.base_directory(&PlanEntry::new("/", "config/web.json"), "main"), PathBuf::from("/app"));
        assert_eq!(
            paths.base_directory(&PlanEntry::new("test/over", "test/over/config/web.json"), "//"),
            PathBuf::from("/app/vendor")
        );
        assert_eq!(
            paths.base_directory(&PlanEntry::new("test/a", "config/web.json"), "vendor"),
            PathBuf::from("/app/vendor/test/a")
        );
    }

    #[test]
    fn test_plan_source_orders_default_environment_first() {
        let mut plan = MergePlan::new();
        plan.set_root("main");
        plan.add_module("main", Some("vendor".to_string()));
        plan.add(PlanEntry::new("/", "dev.json"), "web", "main", "dev");
        plan.add(PlanEntry::new("/", "web.json"), "web", "main", "/");
        plan.add(PlanEntry::new("test/a", "config/web.json"), "web", "vendor", "/");

        let source = PlanSource::new(plan, ConfigPaths::from_root("/app"), "dev");
        let layers: Vec<(String, String)> = source
            .items("main", "web")
            .unwrap()
            .into_iter()
            .map(|i| (i.layer, i.item.value().to_string()))
            .collect();

        assert_eq!(
            layers,
            vec![
                ("vendor@/".to_string(), "config/web.json".to_string()),
                ("main@/".to_string(), "web.json".to_string()),
                ("main@dev".to_string(), "dev.json".to_string()),
            ]
        );
    }
}
