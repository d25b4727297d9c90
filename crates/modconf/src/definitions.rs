//! Value tree produced by loading a configuration fragment.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Definitions {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Definitions>),
    Map(IndexMap<String, Definitions>),
}

impl Default for Definitions {
    fn default() -> Self {
        Definitions::Map(IndexMap::new())
    }
}

impl Definitions {
    /// An empty map, the neutral element of a group merge.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, Definitions::List(_) | Definitions::Map(_))
    }

    /// An empty list or map.
    pub fn is_empty_tree(&self) -> bool {
        match self {
            Definitions::List(items) => items.is_empty(),
            Definitions::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Definitions::Null => "null",
            Definitions::Bool(_) => "bool",
            Definitions::Int(_) => "int",
            Definitions::Float(_) => "float",
            Definitions::String(_) => "string",
            Definitions::List(_) => "list",
            Definitions::Map(_) => "map",
        }
    }

    pub fn get(&self, key: &str) -> Option<&Definitions> {
        match self {
            Definitions::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Follow a dotted path like `db.host`.
    pub fn get_path(&self, path: &str) -> Option<&Definitions> {
        path.split('.').try_fold(self, |node, key| match node {
            Definitions::Map(map) => map.get(key),
            Definitions::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Definitions::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Definitions>> {
        match self {
            Definitions::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Definitions::Null => Value::Null,
            Definitions::Bool(b) => Value::Bool(*b),
            Definitions::Int(i) => Value::from(*i),
            Definitions::Float(f) => Value::from(*f),
            Definitions::String(s) => Value::String(s.clone()),
            Definitions::List(items) => Value::Array(items.iter().map(Definitions::to_json).collect()),
            Definitions::Map(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<Value> for Definitions {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Definitions::Null,
            Value::Bool(b) => Definitions::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Definitions::Int(i),
                None => Definitions::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Definitions::String(s),
            Value::Array(items) => Definitions::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                Definitions::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for Definitions {
    fn from(value: &str) -> Self {
        Definitions::String(value.to_string())
    }
}

impl From<i64> for Definitions {
    fn from(value: i64) -> Self {
        Definitions::Int(value)
    }
}

impl Serialize for Definitions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
