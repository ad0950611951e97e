//! Query filters and their in-process evaluation.
//!
//! Stores that cannot push a [`Filter`] down to a native query language can
//! evaluate it directly with [`Filter::matches`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Document, DocumentId};

/// A query filter over document fields.
///
/// Field names may be dotted paths. Comparing against an array-valued field
/// matches when any element matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Match every document.
    All,
    /// Field equals value.
    Eq {
        /// Field path.
        field: String,
        /// Value to compare against.
        value: Value,
    },
    /// Field equals one of the values.
    In {
        /// Field path.
        field: String,
        /// Candidate values.
        values: Vec<Value>,
    },
    /// Every sub-filter matches.
    And(Vec<Filter>),
    /// At least one sub-filter matches.
    Or(Vec<Filter>),
}

impl Filter {
    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Match one document by identity.
    pub fn by_id(identity_field: &str, id: &DocumentId) -> Self {
        Self::eq(identity_field, id.to_json())
    }

    /// Match any document whose identity is in `ids`.
    pub fn ids_in(identity_field: &str, ids: &[DocumentId]) -> Self {
        Filter::In {
            field: identity_field.to_string(),
            values: ids.iter().map(DocumentId::to_json).collect(),
        }
    }

    /// Match any document where at least one of `fields` equals `id`.
    pub fn any_field_equals(fields: &[String], id: &DocumentId) -> Self {
        Filter::Or(fields.iter().map(|f| Self::eq(f.as_str(), id.to_json())).collect())
    }

    /// Evaluate the filter against a document.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => {
                field_matches(document, field, |candidate| values_equal(candidate, value))
            }
            Filter::In { field, values } => field_matches(document, field, |candidate| {
                values.iter().any(|v| values_equal(candidate, v))
            }),
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(document)),
        }
    }
}

fn field_matches(document: &Document, field: &str, pred: impl Fn(&Value) -> bool) -> bool {
    document.values_at(field).into_iter().any(|value| match value {
        Value::Array(items) => pred(value) || items.iter().any(&pred),
        _ => pred(value),
    })
}

/// Compare two stored values.
///
/// Scalars compare by identity string form, so `42` equals `"42"`. A
/// populated reference compares equal to its `_id`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Array(_), _)
        | (_, Value::Array(_))
        | (Value::Object(_), Value::Object(_))
        | (Value::Bool(_), _)
        | (_, Value::Bool(_)) => a == b,
        _ => match (DocumentId::from_json(a), DocumentId::from_json(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post() -> Document {
        Document::from_value(json!({
            "_id": "p1",
            "author": "u1",
            "tags": ["t1", "t2"],
            "items": [{"product": "x1"}, {"product": "x2"}],
            "views": 7,
            "published": true,
        }))
        .unwrap()
    }

    #[test]
    fn test_eq_scalar() {
        assert!(Filter::eq("author", "u1").matches(&post()));
        assert!(!Filter::eq("author", "u2").matches(&post()));
        assert!(!Filter::eq("missing", "u1").matches(&post()));
    }

    #[test]
    fn test_eq_matches_array_elements() {
        assert!(Filter::eq("tags", "t2").matches(&post()));
        assert!(Filter::eq("items.product", "x1").matches(&post()));
        assert!(!Filter::eq("items.product", "x3").matches(&post()));
    }

    #[test]
    fn test_numbers_compare_by_string_form() {
        assert!(Filter::eq("views", "7").matches(&post()));
    }

    #[test]
    fn test_booleans_compare_directly() {
        assert!(Filter::eq("published", true).matches(&post()));
        assert!(!Filter::eq("published", false).matches(&post()));
        assert!(!Filter::eq("published", "true").matches(&post()));
    }

    #[test]
    fn test_in_and_id_filters() {
        let ids = vec![DocumentId::from("p0"), DocumentId::from("p1")];
        assert!(Filter::ids_in("_id", &ids).matches(&post()));
        assert!(Filter::by_id("_id", &DocumentId::from("p1")).matches(&post()));
        assert!(!Filter::by_id("_id", &DocumentId::from("p2")).matches(&post()));
    }

    #[test]
    fn test_any_field_equals() {
        let fields = vec!["author".to_string(), "editor".to_string()];
        assert!(Filter::any_field_equals(&fields, &DocumentId::from("u1")).matches(&post()));
        assert!(!Filter::any_field_equals(&fields, &DocumentId::from("u9")).matches(&post()));
        assert!(!Filter::any_field_equals(&[], &DocumentId::from("u1")).matches(&post()));
    }

    #[test]
    fn test_and_or() {
        let both = Filter::And(vec![Filter::eq("author", "u1"), Filter::eq("tags", "t1")]);
        assert!(both.matches(&post()));

        let either = Filter::Or(vec![Filter::eq("author", "nobody"), Filter::eq("tags", "t1")]);
        assert!(either.matches(&post()));
        assert!(Filter::All.matches(&post()));
    }
}
