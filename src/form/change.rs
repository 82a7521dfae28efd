use serde_json::Value;

use crate::domain::{FieldDefinition, FieldType};

use super::document::SubDocument;

/// True when any declared field differs between the two documents. Undeclared keys
/// (ids, meta stamps, editor bookkeeping) never count as a change.
pub fn detect_doc_change(schema: &[FieldDefinition], a: &SubDocument, b: &SubDocument) -> bool {
    schema
        .iter()
        .any(|field| detect_field_change(field, a.get(&field.name), b.get(&field.name)))
}

pub fn detect_field_change(field: &FieldDefinition, a: Option<&Value>, b: Option<&Value>) -> bool {
    let a = a.filter(|value| !value.is_null());
    let b = b.filter(|value| !value.is_null());
    match (a, b) {
        (None, None) => false,
        (Some(a), Some(b)) if field.field_type == FieldType::Relationship => {
            relationship_key(a) != relationship_key(b)
        }
        (Some(a), Some(b)) => a != b,
        _ => true,
    }
}

// Related documents are compared by id and per-relationship fields only; the populated
// copies carry volatile data.
fn relationship_key(value: &Value) -> Vec<(Option<&Value>, Option<&Value>)> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| (item.get("_id"), item.get("_fields")))
            .collect(),
        other => vec![(other.get("_id"), other.get("_fields"))],
    }
}
