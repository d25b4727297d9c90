//! Installed package registry (composer.json + vendor/composer/installed.json).

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::options::DEFAULT_VENDOR_DIRECTORY;
use crate::package::Package;

/// Source of package metadata for the root project and its dependencies.
pub trait PackageRegistry {
    /// The root project.
    fn root(&self) -> &Package;

    /// Look up an installed package by name.
    fn package(&self, name: &str) -> Option<&Package>;

    /// Every installed package, in no particular order.
    fn packages(&self) -> Vec<&Package>;

    /// Absolute vendor directory.
    fn vendor_dir(&self) -> &Path;
}

/// Packages installed into a project's vendor directory.
#[derive(Debug, Clone)]
pub struct InstalledRepository {
    root: Package,
    vendor_dir: PathBuf,
    packages: IndexMap<String, Package>,
}

#[derive(Debug, Default, Deserialize)]
struct RootJson {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    extra: Value,
    #[serde(default)]
    require: IndexMap<String, String>,
    #[serde(default, rename = "require-dev")]
    require_dev: IndexMap<String, String>,
    #[serde(default)]
    config: RootConfig,
}

#[derive(Debug, Default, Deserialize)]
struct RootConfig {
    #[serde(default, rename = "vendor-dir")]
    vendor_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InstalledJson {
    V2 { packages: Vec<InstalledPackage> },
    V1(Vec<InstalledPackage>),
}

#[derive(Debug, Deserialize)]
struct InstalledPackage {
    name: String,
    #[serde(default, rename = "install-path")]
    install_path: Option<String>,
    #[serde(default)]
    extra: Value,
    #[serde(default)]
    require: IndexMap<String, String>,
}

impl InstalledRepository {
    pub fn new(root: Package, vendor_dir: impl Into<PathBuf>) -> Self {
        Self {
            root,
            vendor_dir: vendor_dir.into(),
            packages: IndexMap::new(),
        }
    }

    pub fn add_package(&mut self, package: Package) {
        self.packages.insert(package.name.to_lowercase(), package);
    }

    /// Load the root `composer.json` and the installed packages of `working_dir`.
    pub fn load(working_dir: &Path) -> Result<Self> {
        log::debug!("Reading {}/composer.json", working_dir.display());
        let content = fs::read_to_string(working_dir.join("composer.json"))?;
        let json: RootJson = serde_json::from_str(&content)?;

        let vendor_dir = working_dir.join(
            json.config
                .vendor_dir
                .as_deref()
                .unwrap_or(DEFAULT_VENDOR_DIRECTORY),
        );

        let root = Package {
            name: json.name.unwrap_or_else(|| "__root__".to_string()),
            install_path: working_dir.to_path_buf(),
            extra: json.extra,
            require: json.require.into_keys().collect(),
            require_dev: json.require_dev.into_keys().collect(),
        };

        let mut repository = Self::new(root, vendor_dir);

        let installed_path = repository.installed_json_path();
        if !installed_path.exists() {
            log::debug!("No installed.json at {}", installed_path.display());
            return Ok(repository);
        }

        let content = fs::read_to_string(&installed_path)?;
        let installed = match serde_json::from_str::<InstalledJson>(&content)? {
            InstalledJson::V2 { packages } => packages,
            InstalledJson::V1(packages) => packages,
        };

        let composer_dir = repository.vendor_dir.join("composer");
        for entry in installed {
            let install_path = match entry.install_path {
                Some(path) => normalize(&composer_dir.join(path)),
                None => repository.vendor_dir.join(&entry.name),
            };
            let package = Package {
                name: entry.name,
                install_path,
                extra: entry.extra,
                require: entry.require.into_keys().collect(),
                require_dev: Vec::new(),
            };
            log::trace!("Installed package {} at {}", package.name, package.install_path.display());
            repository.add_package(package);
        }

        log::debug!("Loaded {} installed packages", repository.packages.len());
        Ok(repository)
    }

    pub fn installed_json_path(&self) -> PathBuf {
        self.vendor_dir.join("composer").join("installed.json")
    }
}

impl PackageRegistry for InstalledRepository {
    fn root(&self) -> &Package {
        &self.root
    }

    fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(&name.to_lowercase())
    }

    fn packages(&self) -> Vec<&Package> {
        self.packages.values().collect()
    }

    fn vendor_dir(&self) -> &Path {
        &self.vendor_dir
    }
}

/// Packages reachable from the root that declare configuration, ordered so that
/// every package comes after the packages it requires.
pub fn config_packages<R: PackageRegistry + ?Sized>(registry: &R) -> Vec<&Package> {
    let root = registry.root();
    let mut visited = HashSet::new();
    let mut ordered = Vec::new();

    for name in root.require.iter().chain(root.require_dev.iter()) {
        visit(registry, name, &mut visited, &mut ordered);
    }

    ordered.retain(|package| package.declares_config());
    ordered
}

fn visit<'a, R: PackageRegistry + ?Sized>(
    registry: &'a R,
    name: &str,
    visited: &mut HashSet<String>,
    ordered: &mut Vec<&'a Package>,
) {
    let key = name.to_lowercase();
    if !visited.insert(key) {
        return;
    }
    let Some(package) = registry.package(name) else {
        // Platform packages (php, ext-*) and missing optional dependencies
        return;
    };
    for dependency in &package.require {
        visit(registry, dependency, visited, ordered);
    }
    ordered.push(package);
}

/// Lexically collapse `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn config_package(name: &str) -> Package {
        Package::new(name, format!("/vendor/{}", name))
            .with_extra(json!({ "config-plugin": { "params": "params.json" } }))
    }

    #[test]
    fn test_config_packages_follow_dependency_order() {
        let root = Package::new("app/root", "/app").with_require(["test/a", "test/b"]);
        let mut registry = InstalledRepository::new(root, "/app/vendor");
        registry.add_package(config_package("test/a").with_require(["test/c"]));
        registry.add_package(config_package("test/b").with_require(["test/c", "php"]));
        registry.add_package(config_package("test/c"));

        let names: Vec<&str> = config_packages(&registry).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["test/c", "test/a", "test/b"]);
    }

    #[test]
    fn test_config_packages_skip_unreachable_and_plain_packages() {
        let root = Package::new("app/root", "/app")
            .with_require(["test/a", "test/plain"])
            .with_require_dev(["test/dev"]);
        let mut registry = InstalledRepository::new(root, "/app/vendor");
        registry.add_package(config_package("test/a"));
        registry.add_package(Package::new("test/plain", "/vendor/test/plain"));
        registry.add_package(config_package("test/dev"));
        registry.add_package(config_package("test/unrelated"));

        let names: Vec<&str> = config_packages(&registry).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["test/a", "test/dev"]);
    }

    #[test]
    fn test_config_packages_tolerate_cycles() {
        let root = Package::new("app/root", "/app").with_require(["test/a"]);
        let mut registry = InstalledRepository::new(root, "/app/vendor");
        registry.add_package(config_package("test/a").with_require(["test/b"]));
        registry.add_package(config_package("test/b").with_require(["test/a"]));

        let names: Vec<&str> = config_packages(&registry).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["test/b", "test/a"]);
    }

    #[test]
    fn test_load_installed_json_v2() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("composer.json"),
            r#"{ "name": "app/root", "require": { "test/a": "^1.0" }, "config": { "vendor-dir": "libs" } }"#,
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("libs/composer")).unwrap();
        fs::write(
            dir.path().join("libs/composer/installed.json"),
            r#"{ "packages": [
                { "name": "test/a", "install-path": "../test/a", "extra": { "config-plugin": { "params": "params.json" } } },
                { "name": "test/b" }
            ] }"#,
        )
        .unwrap();

        let registry = InstalledRepository::load(dir.path()).unwrap();

        assert_eq!(registry.root().name, "app/root");
        assert_eq!(registry.vendor_dir(), dir.path().join("libs"));
        let a = registry.package("test/a").unwrap();
        assert_eq!(a.install_path, dir.path().join("libs/test/a"));
        assert!(a.declares_config());
        let b = registry.package("TEST/B").unwrap();
        assert_eq!(b.install_path, dir.path().join("libs/test/b"));
    }

    #[test]
    fn test_load_without_installed_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("composer.json"), "{}").unwrap();

        let registry = InstalledRepository::load(dir.path()).unwrap();

        assert_eq!(registry.root().name, "__root__");
        assert!(registry.packages().is_empty());
    }
}
