use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::domain::FieldDefinition;

use super::document::SubDocument;

/// Visibility of every declared field for one sub-document, in schema order.
pub type FieldVisibility = IndexMap<String, bool>;

/// Evaluates each field's `if` clause against the document's current values. Fields without
/// a clause are always visible.
pub fn evaluate_conditions(schema: &[FieldDefinition], doc: &SubDocument) -> FieldVisibility {
    schema
        .iter()
        .map(|field| {
            let visible = field
                .condition
                .as_ref()
                .is_none_or(|condition| condition_holds(condition, doc));
            (field.name.clone(), visible)
        })
        .collect()
}

fn condition_holds(condition: &Map<String, Value>, doc: &SubDocument) -> bool {
    condition.iter().all(|(key, expected)| {
        if key == "$or" {
            return match expected {
                Value::Array(branches) => branches.iter().any(|branch| match branch {
                    Value::Object(inner) => condition_holds(inner, doc),
                    _ => false,
                }),
                _ => false,
            };
        }
        value_matches(doc.get_path(key), expected)
    })
}

fn value_matches(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual, expected) {
        (None | Some(Value::Null), Value::Null) => true,
        (Some(Value::Array(items)), expected) if !expected.is_array() => items.contains(expected),
        (Some(actual), expected) => actual == expected,
        (None, Value::Bool(false)) => true,
        (None, _) => false,
    }
}
