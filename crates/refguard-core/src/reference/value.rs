//! Reference values read from documents and payloads.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::DocumentId;

/// The identifiers held by one reference field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "ids")]
pub enum ReferenceValue {
    /// Missing or null. Always valid.
    Absent,
    /// One identifier.
    Single(DocumentId),
    /// An ordered sequence of identifiers, possibly with duplicates.
    Many(Vec<DocumentId>),
    /// A value no identifier can be read from. Never valid.
    Malformed(Value),
}

impl ReferenceValue {
    /// Decode a stored field value.
    ///
    /// Null elements inside an array are skipped. Any other element that is
    /// not an identifier makes the whole value malformed.
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => ReferenceValue::Absent,
            Some(Value::Array(items)) => {
                let mut ids = Vec::with_capacity(items.len());
                for item in items.iter().filter(|item| !item.is_null()) {
                    match DocumentId::from_json(item) {
                        Some(id) => ids.push(id),
                        None => return ReferenceValue::Malformed(Value::Array(items.clone())),
                    }
                }
                ReferenceValue::Many(ids)
            }
            Some(other) => match DocumentId::from_json(other) {
                Some(id) => ReferenceValue::Single(id),
                None => ReferenceValue::Malformed(other.clone()),
            },
        }
    }

    /// Check if there is no value to validate.
    pub fn is_absent(&self) -> bool {
        matches!(self, ReferenceValue::Absent)
    }

    /// Distinct identifiers in first-seen order.
    pub fn unique_ids(&self) -> Vec<DocumentId> {
        match self {
            ReferenceValue::Absent | ReferenceValue::Malformed(_) => Vec::new(),
            ReferenceValue::Single(id) => vec![id.clone()],
            ReferenceValue::Many(ids) => {
                let mut seen = HashSet::with_capacity(ids.len());
                ids.iter()
                    .filter(|id| seen.insert(id.as_str()))
                    .cloned()
                    .collect()
            }
        }
    }
}

impl fmt::Display for ReferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceValue::Absent => f.write_str("null"),
            ReferenceValue::Single(id) => write!(f, "{}", id),
            ReferenceValue::Many(ids) => {
                f.write_str("[")?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", id)?;
                }
                f.write_str("]")
            }
            ReferenceValue::Malformed(raw) => write!(f, "{}", raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_shapes() {
        assert_eq!(ReferenceValue::from_json(None), ReferenceValue::Absent);
        assert_eq!(ReferenceValue::from_json(Some(&json!(null))), ReferenceValue::Absent);
        assert_eq!(
            ReferenceValue::from_json(Some(&json!("u1"))),
            ReferenceValue::Single("u1".into())
        );
        assert_eq!(
            ReferenceValue::from_json(Some(&json!(["a", null, "b"]))),
            ReferenceValue::Many(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            ReferenceValue::from_json(Some(&json!([]))),
            ReferenceValue::Many(Vec::new())
        );
    }

    #[test]
    fn test_undecodable_values_are_malformed() {
        let orphan_object = json!({"bogus": 1});
        assert_eq!(
            ReferenceValue::from_json(Some(&orphan_object)),
            ReferenceValue::Malformed(orphan_object.clone())
        );
        assert_eq!(
            ReferenceValue::from_json(Some(&json!(true))),
            ReferenceValue::Malformed(json!(true))
        );

        let mixed = json!(["a", {"bogus": 1}, ["ghost"]]);
        let value = ReferenceValue::from_json(Some(&mixed));
        assert_eq!(value, ReferenceValue::Malformed(mixed));
        assert!(!value.is_absent());
        assert!(value.unique_ids().is_empty());

        // Subdocuments carrying an identity still decode.
        assert_eq!(
            ReferenceValue::from_json(Some(&json!([{"_id": "a"}, "b"]))),
            ReferenceValue::Many(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_unique_ids_collapse_duplicates() {
        let value = ReferenceValue::Many(vec!["A".into(), "A".into(), "B".into()]);
        assert_eq!(value.unique_ids(), vec![DocumentId::from("A"), DocumentId::from("B")]);
        assert!(ReferenceValue::Absent.unique_ids().is_empty());
    }

    #[test]
    fn test_display() {
        let value = ReferenceValue::Many(vec!["A".into(), "C".into()]);
        assert_eq!(value.to_string(), "[A, C]");
        assert_eq!(ReferenceValue::Single("u1".into()).to_string(), "u1");
        assert_eq!(ReferenceValue::Absent.to_string(), "null");
        assert_eq!(
            ReferenceValue::Malformed(json!({"bogus": 1})).to_string(),
            r#"{"bogus":1}"#
        );
    }
}
