//! A single configuration token as declared in `config-plugin`.

use std::path::{Path, PathBuf};

const OPTIONAL_MARKER: char = '?';
const VARIABLE_MARKER: char = '$';
const WILDCARD: char = '*';

/// One entry of a group's file list.
///
/// The raw token may carry a marker: `?params-local.json` is optional,
/// `$common` refers to another group, `common/*.json` is a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigItem {
    value: String,
    directory: PathBuf,
    pattern: Option<String>,
}

impl ConfigItem {
    pub fn new(value: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            value: value.into(),
            directory: directory.into(),
            pattern: None,
        }
    }

    /// An item produced by expanding the wildcard token `pattern`.
    pub fn expanded(
        value: impl Into<String>,
        directory: impl Into<PathBuf>,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            value: value.into(),
            directory: directory.into(),
            pattern: Some(pattern.into()),
        }
    }

    pub fn is_optional(&self) -> bool {
        self.value.starts_with(OPTIONAL_MARKER)
    }

    pub fn is_variable(&self) -> bool {
        self.value.starts_with(VARIABLE_MARKER)
    }

    pub fn has_wildcard(&self) -> bool {
        self.value.contains(WILDCARD)
    }

    /// The token without its `?` or `$` marker.
    pub fn name(&self) -> &str {
        if self.is_optional() || self.is_variable() {
            &self.value[1..]
        } else {
            &self.value
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Wildcard token this item was expanded from, if any.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn file_path(&self) -> PathBuf {
        self.directory.join(self.name())
    }
}
