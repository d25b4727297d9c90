//! Deep merge of definitions trees with duplicate-key detection.
//!
//! List entries never overwrite each other: an incoming value whose index is
//! already taken by a different value is appended. Map keys are assigned,
//! recursing into nested trees when the merge is recursive. Terminal
//! assignments are recorded in a [`ProvenanceIndex`] so two files of the same
//! layer setting the same key path are reported instead of silently
//! overriding each other.

use std::collections::HashMap;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::definitions::Definitions;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeMode {
    /// Descend into nested maps and lists instead of replacing them.
    pub recursive: bool,
    /// Keep the first value seen for a key.
    pub reverse: bool,
}

/// File that set a key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub file: PathBuf,
    /// Wildcard token the file was expanded from; siblings of one pattern may override each other.
    pub pattern: Option<String>,
}

impl Origin {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            pattern: None,
        }
    }

    pub fn with_pattern(mut self, pattern: Option<String>) -> Self {
        self.pattern = pattern;
        self
    }

    fn conflicts_with(&self, other: &Origin) -> bool {
        self.file != other.file && (self.pattern.is_none() || self.pattern != other.pattern)
    }
}

/// `(layer, key path) -> origin` of every terminal assignment.
#[derive(Debug, Clone, Default)]
pub struct ProvenanceIndex {
    claims: HashMap<(String, Vec<String>), Origin>,
}

impl ProvenanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, layer: &str, key_path: &[String]) -> Option<&Origin> {
        self.claims.get(&(layer.to_string(), key_path.to_vec()))
    }

    pub fn record(&mut self, layer: &str, key_path: Vec<String>, origin: Origin) {
        self.claims.insert((layer.to_string(), key_path), origin);
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// Where an incoming tree comes from.
#[derive(Debug, Clone, Copy)]
pub struct MergeSource<'a> {
    pub group: &'a str,
    pub layer: &'a str,
    /// `None` for trees embedded through a `$group` reference.
    pub origin: Option<&'a Origin>,
}

pub struct Merger<'a> {
    mode: MergeMode,
    source: MergeSource<'a>,
    index: &'a mut ProvenanceIndex,
}

impl<'a> Merger<'a> {
    pub fn new(mode: MergeMode, source: MergeSource<'a>, index: &'a mut ProvenanceIndex) -> Self {
        Self { mode, source, index }
    }

    /// Merge `incoming` into `base`. `key_path` locates `base` inside the group.
    pub fn merge(
        &mut self,
        base: Definitions,
        incoming: Definitions,
        key_path: &[String],
    ) -> Result<Definitions> {
        if incoming.is_empty_tree() && base.is_tree() {
            return Ok(base);
        }
        let base = if base.is_empty_tree() && incoming.is_tree() {
            empty_like(&incoming)
        } else {
            base
        };

        match (base, incoming) {
            (Definitions::List(base), Definitions::List(incoming)) => {
                Ok(Definitions::List(merge_list(base, incoming)))
            }
            (Definitions::Map(base), Definitions::Map(incoming)) => {
                Ok(Definitions::Map(self.merge_map(base, incoming, key_path)?))
            }
            (base, incoming) => Err(ConfigError::ShapeMismatch {
                group: self.source.group.to_string(),
                base: base.kind(),
                incoming: incoming.kind(),
            }),
        }
    }

    fn merge_map(
        &mut self,
        mut result: IndexMap<String, Definitions>,
        incoming: IndexMap<String, Definitions>,
        key_path: &[String],
    ) -> Result<IndexMap<String, Definitions>> {
        for (key, value) in incoming {
            let mut full_key_path = key_path.to_vec();
            full_key_path.push(key.clone());

            if self.mode.recursive
                && value.is_tree()
                && result.get(&key).map_or(true, |existing| mergeable(existing, &value))
            {
                let existing = match result.get_mut(&key) {
                    Some(slot) => std::mem::take(slot),
                    None => empty_like(&value),
                };
                let merged = self.merge(existing, value, &full_key_path)?;
                result.insert(key, merged);
                continue;
            }

            let exists = result.contains_key(&key);

            if exists && !self.mode.reverse && result.get(&key) != Some(&value) {
                self.check_duplicate(&full_key_path)?;
            }

            if !self.mode.reverse || !exists {
                result.insert(key, value);
                if !self.mode.reverse {
                    if let Some(origin) = self.source.origin {
                        self.index.record(self.source.layer, full_key_path, origin.clone());
                    }
                }
            }
        }

        Ok(result)
    }

    fn check_duplicate(&self, key_path: &[String]) -> Result<()> {
        let Some(current) = self.source.origin else {
            return Ok(());
        };
        match self.index.claim(self.source.layer, key_path) {
            Some(claim) if claim.conflicts_with(current) => Err(ConfigError::DuplicateKey {
                group: self.source.group.to_string(),
                key: key_path.join("."),
                files: [claim.file.clone(), current.file.clone()],
            }),
            _ => Ok(()),
        }
    }
}

fn merge_list(mut result: Vec<Definitions>, incoming: Vec<Definitions>) -> Vec<Definitions> {
    for (index, value) in incoming.into_iter().enumerate() {
        match result.get(index) {
            Some(existing) if *existing == value => {}
            _ => result.push(value),
        }
    }
    result
}

fn mergeable(existing: &Definitions, incoming: &Definitions) -> bool {
    matches!(
        (existing, incoming),
        (Definitions::Map(_), Definitions::Map(_)) | (Definitions::List(_), Definitions::List(_))
    ) || existing.is_empty_tree()
}

fn empty_like(value: &Definitions) -> Definitions {
    match value {
        Definitions::List(_) => Definitions::List(Vec::new()),
        _ => Definitions::empty(),
    }
}
