//! Turning a fragment file into a definitions tree.

use std::fs;
use std::path::Path;

use crate::definitions::Definitions;
use crate::error::LoadError;

/// Loads one configuration fragment.
///
/// `params` is the resolved params group of the module being built, or an
/// empty tree while the params group itself is resolving.
pub trait FragmentLoader {
    fn load(&self, path: &Path, params: &Definitions) -> Result<Definitions, LoadError>;
}

/// Fragments written as JSON objects or arrays.
///
/// A string of the exact form `"${params.db.host}"` is replaced by the
/// value found at `db.host` in the params scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFragmentLoader;

impl JsonFragmentLoader {
    pub fn new() -> Self {
        Self
    }
}

impl FragmentLoader for JsonFragmentLoader {
    fn load(&self, path: &Path, params: &Definitions) -> Result<Definitions, LoadError> {
        let content = fs::read_to_string(path).map_err(|e| LoadError::new(path, e.to_string()))?;

        let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            let text = e.to_string();
            let message = text.split(" at line ").next().unwrap_or(&text).to_string();
            LoadError::new(path, message).at(e.line(), e.column())
        })?;

        if !value.is_object() && !value.is_array() {
            return Err(LoadError::new(path, "Fragment must be a JSON object or array"));
        }

        substitute(Definitions::from(value), params, path)
    }
}

fn substitute(value: Definitions, params: &Definitions, path: &Path) -> Result<Definitions, LoadError> {
    match value {
        Definitions::String(s) => match parameter_reference(&s) {
            Some(reference) => lookup(reference, params)
                .cloned()
                .ok_or_else(|| LoadError::new(path, format!("Undefined parameter \"{}\"", reference))),
            None => Ok(Definitions::String(s)),
        },
        Definitions::List(items) => items
            .into_iter()
            .map(|item| substitute(item, params, path))
            .collect::<Result<_, _>>()
            .map(Definitions::List),
        Definitions::Map(map) => map
            .into_iter()
            .map(|(key, item)| substitute(item, params, path).map(|item| (key, item)))
            .collect::<Result<_, _>>()
            .map(Definitions::Map),
        other => Ok(other),
    }
}

/// `${params.db.host}` -> `params.db.host`
fn parameter_reference(value: &str) -> Option<&str> {
    let inner = value.strip_prefix("${")?.strip_suffix('}')?;
    (inner == "params" || inner.starts_with("params.")).then_some(inner)
}

fn lookup<'p>(reference: &str, params: &'p Definitions) -> Option<&'p Definitions> {
    match reference.strip_prefix("params.") {
        Some(path) => params.get_path(path),
        None => Some(params),
    }
}
