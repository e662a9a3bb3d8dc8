// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-node persistence documents.
//!
//! A node document is an open-ended JSON object. Nodes read the fields they
//! know and ignore the rest; a field that is absent keeps the node's default,
//! and a field that is present but malformed keeps the default and records a
//! warning instead of failing the load.

use crate::codec::LoadWarning;
use crate::node::NodeId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Key/value document holding one node's persisted state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeDocument {
    fields: Map<String, Value>,
}

impl NodeDocument {
    /// Type name key
    pub const TYPE: &'static str = "type";
    /// Node ID key
    pub const ID: &'static str = "id";
    /// Node type version key
    pub const VERSION: &'static str = "version";
    /// Display name key
    pub const NAME: &'static str = "name";
    /// Canvas position key
    pub const POSITION: &'static str = "position";
    /// Enabled flag key
    pub const ENABLED: &'static str = "enabled";

    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Unwrap into a JSON object value
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Raw field access
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Whether a field is present
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Set a field
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    /// Set a field from any serializable value
    pub fn set_serialized<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value),
            Err(e) => tracing::warn!("Failed to serialize field '{}': {}", key, e),
        }
    }

    /// Node type name, if present and a string
    pub fn type_name(&self) -> Option<&str> {
        self.get(Self::TYPE).and_then(Value::as_str)
    }

    /// Node ID field: `None` when absent, `Some(Err)` when malformed
    pub fn node_id(&self) -> Option<Result<NodeId, String>> {
        self.get(Self::ID).map(|value| {
            value
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .map(NodeId)
                .ok_or_else(|| format!("invalid node id {value}"))
        })
    }

    /// Read a field into `target`.
    ///
    /// Leaves `target` untouched when the field is absent, or when it is
    /// malformed, in which case a warning is added to `status`.
    pub fn read<T: DeserializeOwned>(
        &self,
        key: &str,
        target: &mut T,
        node: NodeId,
        status: &mut LoadStatus,
    ) {
        let Some(value) = self.get(key) else {
            return;
        };
        match T::deserialize(value) {
            Ok(parsed) => *target = parsed,
            Err(e) => status.malformed(node, key, e),
        }
    }

    /// Read a field through a custom conversion, with the same fallback rules
    /// as [`NodeDocument::read`]
    pub fn read_with<T>(
        &self,
        key: &str,
        target: &mut T,
        node: NodeId,
        status: &mut LoadStatus,
        convert: impl FnOnce(&Value) -> Option<T>,
    ) {
        let Some(value) = self.get(key) else {
            return;
        };
        match convert(value) {
            Some(parsed) => *target = parsed,
            None => status.malformed(node, key, format!("unexpected value {value}")),
        }
    }
}

/// Recoverable problems collected while loading
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadStatus {
    /// Warnings in the order they were found
    pub warnings: Vec<LoadWarning>,
}

impl LoadStatus {
    /// Record a malformed field
    pub fn malformed(&mut self, node: NodeId, field: &str, reason: impl fmt::Display) {
        self.warnings.push(LoadWarning::MalformedField {
            node,
            field: field.to_string(),
            reason: reason.to_string(),
        });
    }

    /// Record any warning
    pub fn push(&mut self, warning: LoadWarning) {
        self.warnings.push(warning);
    }

    /// Whether nothing was recorded
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Node ID translation table used when saving or merging graphs.
///
/// IDs without an entry translate to themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdRemap {
    map: HashMap<NodeId, NodeId>,
}

impl IdRemap {
    /// Create an empty (identity) table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a translation
    pub fn insert(&mut self, from: NodeId, to: NodeId) {
        self.map.insert(from, to);
    }

    /// Translate an ID
    pub fn resolve(&self, id: NodeId) -> NodeId {
        self.map.get(&id).copied().unwrap_or(id)
    }

    /// Whether `id` has an explicit translation
    pub fn contains(&self, id: NodeId) -> bool {
        self.map.contains_key(&id)
    }

    /// Number of explicit translations
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table is the identity
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over explicit translations
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.map.iter().map(|(from, to)| (*from, *to))
    }
}
