#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub fn write_json(root: &Path, relative: &str, value: Value) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

/// Project with two vendor packages (`test/a` plain, `test/over` in the
/// vendor-override layer), a package-backed module `blog` (`test/b`) and
/// the root module `main` reading from `config/`.
pub fn modular_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write_json(
        root,
        "composer.json",
        json!({
            "name": "test/app",
            "require": { "test/a": "*", "test/over": "*", "test/b": "*" },
            "extra": {
                "config-plugin-options": {
                    "modules": {
                        "main": { "path": "", "config-directory": "config" },
                        "blog": { "package": "test/b" }
                    },
                    "module-root": "main",
                    "vendor-override-layer": "test/over"
                },
                "config-plugin": {
                    "params": ["params.json", "?params-local.json"],
                    "common": "common/*.json",
                    "web": ["$common", "web.json", "missing.json"]
                },
                "config-plugin-environments": {
                    "dev": { "web": "dev/web.json" },
                    "prod": []
                }
            }
        }),
    );

    write_json(
        root,
        "vendor/composer/installed.json",
        json!({
            "packages": [
                {
                    "name": "test/a",
                    "install-path": "../test/a",
                    "extra": { "config-plugin": { "params": "params.json", "web": "web.json" } }
                },
                {
                    "name": "test/over",
                    "install-path": "../test/over",
                    "require": { "test/a": "*" },
                    "extra": { "config-plugin": { "web": "web.json" } }
                },
                {
                    "name": "test/b",
                    "install-path": "../test/b",
                    "extra": { "config-plugin": { "web": "web.json" } }
                }
            ]
        }),
    );

    write_json(root, "vendor/test/a/config/params.json", json!({ "app": "vendor-app", "db": "sqlite" }));
    write_json(root, "vendor/test/a/config/web.json", json!({ "name": "vendor", "vendor_only": 1 }));
    write_json(root, "vendor/test/over/config/web.json", json!({ "name": "override", "theme": "dark" }));
    write_json(root, "vendor/test/b/config/web.json", json!({ "name": "blog", "posts": 10 }));

    write_json(root, "config/params.json", json!({ "app": "demo" }));
    write_json(root, "config/common/a.json", json!({ "name": "a", "from_a": true }));
    write_json(root, "config/common/b.json", json!({ "name": "b" }));
    write_json(root, "config/web.json", json!({ "name": "web", "db": "${params.db}" }));
    write_json(root, "config/dev/web.json", json!({ "debug": true }));

    dir
}

/// Root-only project declaring `groups` for a single module `main`.
pub fn single_module_project(groups: Value) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "composer.json",
        json!({
            "name": "test/app",
            "extra": {
                "config-plugin-options": {
                    "modules": { "main": { "path": "" } },
                    "module-root": "main"
                },
                "config-plugin": groups
            }
        }),
    );
    dir
}
