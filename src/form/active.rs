use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::domain::FieldDefinition;

use super::{
    conditions::{FieldVisibility, evaluate_conditions},
    document::{ItemId, SubDocument},
};

/// The single sub-document checked out for editing.
///
/// `form_state` is a private copy: edits only reach the working set when the item is
/// flushed on switch-away or submit.
#[derive(Debug, Clone)]
pub struct ActiveItem {
    form_state: SubDocument,
    reported_errors: bool,
    field_errors: IndexMap<String, String>,
    visibility: FieldVisibility,
}

impl ActiveItem {
    pub(crate) fn open(doc: SubDocument, schema: &[FieldDefinition]) -> Self {
        let visibility = evaluate_conditions(schema, &doc);
        Self {
            form_state: doc,
            reported_errors: false,
            field_errors: IndexMap::new(),
            visibility,
        }
    }

    pub fn id(&self) -> &ItemId {
        self.form_state.id()
    }

    pub fn form_state(&self) -> &SubDocument {
        &self.form_state
    }

    /// Union of what the form layer reported and what schema validation found.
    pub fn has_errors(&self) -> bool {
        self.reported_errors || !self.field_errors.is_empty()
    }

    pub fn field_errors(&self) -> &IndexMap<String, String> {
        &self.field_errors
    }

    pub fn visibility(&self) -> &FieldVisibility {
        &self.visibility
    }

    pub fn is_visible(&self, field: &str) -> bool {
        self.visibility.get(field).copied().unwrap_or(true)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.form_state.get(name)
    }

    pub(crate) fn replace(
        &mut self,
        fields: Map<String, Value>,
        has_errors: bool,
        schema: &[FieldDefinition],
    ) {
        self.form_state = self.form_state.with_fields(fields);
        self.reported_errors = has_errors;
        self.refresh_conditions(schema);
    }

    pub(crate) fn set_reported_errors(&mut self, has_errors: bool) {
        self.reported_errors = has_errors;
    }

    pub(crate) fn set_field_errors(&mut self, errors: IndexMap<String, String>) {
        self.field_errors = errors;
    }

    pub(crate) fn refresh_conditions(&mut self, schema: &[FieldDefinition]) {
        self.visibility = evaluate_conditions(schema, &self.form_state);
    }
}
