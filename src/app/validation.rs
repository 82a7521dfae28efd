use indexmap::IndexMap;
use jsonschema::{Validator, validator_for};
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::{
    domain::{CountConstraints, FieldDefinition, FieldType},
    form::{FieldVisibility, SubDocument},
};

pub const REQUIRED_MESSAGE: &str = "required";

/// Item-count violations for the current working set length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountState {
    pub min_error: bool,
    pub max_error: bool,
}

impl CountState {
    pub fn evaluate(len: usize, constraints: &CountConstraints) -> Self {
        Self {
            min_error: len < constraints.min,
            max_error: constraints.max.is_some_and(|max| len > max),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.min_error || self.max_error
    }
}

/// Field-level checks for a single sub-document, compiled once per session from the
/// item schema.
pub struct ItemValidator {
    schema: Vec<FieldDefinition>,
    validator: Option<Validator>,
}

impl std::fmt::Debug for ItemValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemValidator")
            .field("fields", &self.schema.len())
            .field("compiled", &self.validator.is_some())
            .finish()
    }
}

impl ItemValidator {
    pub fn new(schema: &[FieldDefinition]) -> Self {
        let document = item_json_schema(schema);
        let validator = match validator_for(&document) {
            Ok(validator) => Some(validator),
            Err(err) => {
                warn!(error = %err, "item schema did not compile; only required checks apply");
                None
            }
        };
        Self {
            schema: schema.to_vec(),
            validator,
        }
    }

    /// Returns one message per failing visible field, in schema order. Hidden fields are
    /// skipped entirely.
    pub fn check(&self, doc: &SubDocument, visibility: &FieldVisibility) -> IndexMap<String, String> {
        let mut errors = IndexMap::new();
        let mut instance = Map::new();
        for field in &self.schema {
            if !visibility.get(&field.name).copied().unwrap_or(true) {
                continue;
            }
            match doc.get(&field.name) {
                value if is_blank(value) => {
                    if field.required {
                        errors.insert(field.name.clone(), REQUIRED_MESSAGE.to_string());
                    }
                }
                Some(value) => {
                    instance.insert(field.name.clone(), value.clone());
                }
                None => {}
            }
        }

        let Some(validator) = &self.validator else {
            return errors;
        };
        let instance = Value::Object(instance);
        for error in validator.iter_errors(&instance) {
            let pointer = error.instance_path.to_string();
            let Some(name) = pointer.trim_start_matches('/').split('/').next() else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            errors
                .entry(name.to_string())
                .or_insert_with(|| error.to_string());
        }
        reorder_like_schema(errors, &self.schema)
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn reorder_like_schema(
    mut errors: IndexMap<String, String>,
    schema: &[FieldDefinition],
) -> IndexMap<String, String> {
    let mut ordered = IndexMap::with_capacity(errors.len());
    for field in schema {
        if let Some(message) = errors.shift_remove(&field.name) {
            ordered.insert(field.name.clone(), message);
        }
    }
    ordered.extend(errors);
    ordered
}

/// JSON Schema for one sub-document. Required-ness is checked separately so that
/// hidden fields can be skipped.
pub fn item_json_schema(schema: &[FieldDefinition]) -> Value {
    let mut properties = Map::new();
    for field in schema {
        properties.insert(field.name.clone(), field_fragment(field));
    }
    json!({
        "type": "object",
        "properties": properties,
    })
}

fn field_fragment(field: &FieldDefinition) -> Value {
    let mut fragment = Map::new();
    let kind = field.field_type;
    if kind.is_textual() {
        fragment.insert("type".into(), json!("string"));
        if let Some(min) = field.min {
            fragment.insert("minLength".into(), json!(min.max(0.0) as u64));
        }
        if let Some(max) = field.max {
            fragment.insert("maxLength".into(), json!(max.max(0.0) as u64));
        }
        return Value::Object(fragment);
    }
    match kind {
        FieldType::Integer | FieldType::Float | FieldType::Range => {
            let ty = if kind == FieldType::Integer { "integer" } else { "number" };
            fragment.insert("type".into(), json!(ty));
            if let Some(min) = field.min {
                fragment.insert("minimum".into(), json!(min));
            }
            if let Some(max) = field.max {
                fragment.insert("maximum".into(), json!(max));
            }
        }
        FieldType::Boolean => {
            fragment.insert("type".into(), json!("boolean"));
        }
        FieldType::Select | FieldType::Radio => {
            if let Some(values) = field.choices.as_ref().and_then(|c| c.static_values()) {
                fragment.insert("enum".into(), Value::Array(values));
            }
        }
        FieldType::Checkboxes => {
            fragment.insert("type".into(), json!("array"));
            if let Some(values) = field.choices.as_ref().and_then(|c| c.static_values()) {
                fragment.insert("items".into(), json!({ "enum": values }));
            }
        }
        FieldType::Array | FieldType::Relationship => {
            fragment.insert("type".into(), json!("array"));
            if let Some(min) = field.min {
                fragment.insert("minItems".into(), json!(min.max(0.0) as u64));
            }
            if let Some(max) = field.max {
                fragment.insert("maxItems".into(), json!(max.max(0.0) as u64));
            }
        }
        FieldType::Object | FieldType::Area | FieldType::Attachment | FieldType::Oembed => {
            fragment.insert("type".into(), json!("object"));
        }
        _ => {}
    }
    Value::Object(fragment)
}
