use serde_json::Map;

use crate::domain::FieldDefinition;

use super::document::SubDocument;

/// Builds a fresh sub-document from the declared defaults. Fields without a `def` are left
/// unset; the caller assigns the id.
pub fn new_instance(schema: &[FieldDefinition]) -> SubDocument {
    let mut fields = Map::new();
    for field in schema {
        if let Some(def) = &field.def {
            fields.insert(field.name.clone(), def.clone());
        }
    }
    SubDocument::from_fields(fields)
}
