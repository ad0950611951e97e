//! Documents, identifiers and update payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::DEFAULT_IDENTITY_FIELD;

/// Prefix marking update operators such as `$set`.
const OPERATOR_PREFIX: char = '$';

/// Stable identity of a document, compared by its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create an identifier from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Decode an identifier from a stored JSON value.
    ///
    /// Strings and numbers are used as-is. Populated references (embedded
    /// documents) contribute their `_id`. Returns `None` for null, booleans
    /// and values with no usable identity.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null | Value::Bool(_) | Value::Array(_) => None,
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            Value::Object(map) => map.get(DEFAULT_IDENTITY_FIELD).and_then(Self::from_json),
        }
    }

    /// The identifier's string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Encode as a JSON value.
    pub fn to_json(&self) -> Value {
        Value::String(self.0.clone())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A schema-less document: a JSON object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value. Returns `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Set a field, builder style.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Set a field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Remove a field, returning its old value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Get a top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Collect every value reachable through a dotted path.
    ///
    /// Arrays along the path are traversed element-wise, so `items.product`
    /// yields the `product` of every subdocument in `items`.
    pub fn values_at(&self, path: &str) -> Vec<&Value> {
        let mut segments = path.split('.');
        let mut out = Vec::new();
        if let Some(first) = segments.next() {
            if let Some(value) = self.0.get(first) {
                let rest: Vec<&str> = segments.collect();
                collect_path(value, &rest, &mut out);
            }
        }
        out
    }

    /// Read the document's identity.
    pub fn id(&self, identity_field: &str) -> Option<DocumentId> {
        self.0.get(identity_field).and_then(DocumentId::from_json)
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the underlying map.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Consume into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn collect_path<'a>(value: &'a Value, rest: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, tail)) = rest.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Object(map) => {
            if let Some(next) = map.get(*head) {
                collect_path(next, tail, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_path(item, rest, out);
            }
        }
        _ => {}
    }
}

/// The proposed changes of an update operation.
///
/// Plain top-level keys and the contents of `$set` are assignments. Keys of
/// `$unset` are removals. Other operators are carried through untouched and
/// never contribute assignments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdatePayload(Map<String, Value>);

impl UpdatePayload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value. Returns `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Add a `$set` assignment.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let set = self
            .0
            .entry("$set")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = set {
            map.insert(field.into(), value.into());
        }
        self
    }

    /// Add an `$unset` removal.
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        let unset = self
            .0
            .entry("$unset")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = unset {
            map.insert(field.into(), Value::String(String::new()));
        }
        self
    }

    /// Every field assigned by this payload, with its proposed value.
    ///
    /// `$set` wins over a plain key of the same name.
    pub fn assignments(&self) -> Map<String, Value> {
        let mut assigned: Map<String, Value> = self
            .0
            .iter()
            .filter(|(key, _)| !key.starts_with(OPERATOR_PREFIX))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if let Some(Value::Object(set)) = self.0.get("$set") {
            assigned.extend(set.iter().map(|(key, value)| (key.clone(), value.clone())));
        }
        assigned
    }

    /// Fields removed by this payload.
    pub fn removals(&self) -> Vec<String> {
        match self.0.get("$unset") {
            Some(Value::Object(unset)) => unset.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Check if the payload assigns a field.
    pub fn assigns(&self, field: &str) -> bool {
        let plain = !field.starts_with(OPERATOR_PREFIX) && self.0.contains_key(field);
        let set = matches!(self.0.get("$set"), Some(Value::Object(set)) if set.contains_key(field));
        plain || set
    }

    /// Apply assignments and removals to a document.
    pub fn apply(&self, document: &mut Document) {
        for (field, value) in self.assignments() {
            document.set(field, value);
        }
        for field in self.removals() {
            document.remove(&field);
        }
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}
