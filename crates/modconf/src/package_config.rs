//! Per-package group table with wildcard tokens already expanded.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::Result;
use crate::item::ConfigItem;
use crate::options::GroupDeclarations;
use crate::package::to_slash;

#[derive(Debug, Clone, Default)]
pub struct PackageConfiguration {
    directory: PathBuf,
    groups: IndexMap<String, Vec<ConfigItem>>,
}

impl PackageConfiguration {
    /// Build the table for the files under `directory`. Wildcards are matched
    /// against the filesystem right away; a pattern without matches drops out.
    pub fn new(declarations: &GroupDeclarations, directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        let mut groups = IndexMap::with_capacity(declarations.len());

        for (group, tokens) in declarations {
            let mut items = Vec::with_capacity(tokens.len());
            for token in tokens {
                let item = ConfigItem::new(token.as_str(), &directory);
                if item.is_variable() || !item.has_wildcard() {
                    items.push(item);
                    continue;
                }

                let matches = expand_wildcard(&item.file_path())?;
                if matches.is_empty() {
                    log::debug!("Pattern {} in group \"{}\" matched no files", token, group);
                }
                for path in matches {
                    let name = path
                        .strip_prefix(&directory)
                        .map(to_slash)
                        .unwrap_or_else(|_| to_slash(&path));
                    items.push(ConfigItem::expanded(name, &directory, item.name()));
                }
            }
            groups.insert(group.clone(), items);
        }

        Ok(Self { directory, groups })
    }

    /// Items of `group`; a group the package does not declare is empty.
    pub fn group_files(&self, group: &str) -> &[ConfigItem] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Declared groups in declaration order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[ConfigItem])> {
        self.groups.iter().map(|(group, items)| (group.as_str(), items.as_slice()))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// Files matching `pattern`, sorted.
pub(crate) fn expand_wildcard(pattern: &Path) -> Result<Vec<PathBuf>> {
    let pattern = pattern.to_string_lossy();
    let mut matches: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    matches.sort();
    Ok(matches)
}
