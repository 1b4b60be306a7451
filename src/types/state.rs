//! Immutable state records.

use super::ids::StateId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The record shape every state carries.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// An immutable record with a process-unique identity.
///
/// Clones share both the fields and the identity. Deriving a new state
/// (through [`State::with`] or a mutator) always yields a fresh identity, so
/// identity equality means "the very same state", never "equal contents".
#[derive(Clone)]
pub struct State {
    id: StateId,
    fields: Arc<Record>,
}

impl State {
    pub fn new(fields: Record) -> Self {
        Self {
            id: StateId::fresh(),
            fields: Arc::new(fields),
        }
    }

    /// Builds a state from a JSON value, which must be an object.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(fields) => Some(Self::new(fields)),
            _ => None,
        }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(serde_json::Value::as_i64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(serde_json::Value::as_str)
    }

    /// A new state with one field replaced or added. `self` is untouched.
    pub fn with(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let mut fields = (*self.fields).clone();
        fields.insert(key.into(), value.into());
        Self::new(fields)
    }

    /// Whether both handles point at the very same state.
    pub fn same_as(&self, other: &State) -> bool {
        self.id == other.id
    }

    /// Fields present in `previous` but absent here.
    pub fn missing_from(&self, previous: &State) -> Vec<String> {
        previous
            .fields
            .keys()
            .filter(|key| !self.fields.contains_key(*key))
            .cloned()
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object((*self.fields).clone())
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other) || self.fields == other.fields
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("id", &self.id)
            .field("fields", &self.fields)
            .finish()
    }
}

impl Serialize for State {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let fields = Record::deserialize(deserializer)?;
        Ok(Self::new(fields))
    }
}

impl From<Record> for State {
    fn from(fields: Record) -> Self {
        Self::new(fields)
    }
}
