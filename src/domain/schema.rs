use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::form::SubDocument;

/// Field types the item editor knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    Slug,
    Email,
    Url,
    Password,
    Color,
    Date,
    Time,
    DateAndTime,
    Integer,
    Float,
    Range,
    Boolean,
    Checkboxes,
    Select,
    Radio,
    Array,
    Object,
    Relationship,
    Area,
    Attachment,
    Oembed,
    #[serde(other)]
    Unknown,
}

impl FieldType {
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            FieldType::String
                | FieldType::Slug
                | FieldType::Email
                | FieldType::Url
                | FieldType::Password
                | FieldType::Color
                | FieldType::Date
                | FieldType::Time
                | FieldType::DateAndTime
        )
    }
}

/// A selectable option for `select`, `radio` and `checkboxes` fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Choice {
    pub value: Value,
    #[serde(default)]
    pub label: Option<String>,
}

/// Choices are either listed inline or resolved on demand by a named server method.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ChoicesSpec {
    Static(Vec<Choice>),
    Method(String),
}

impl ChoicesSpec {
    pub fn static_values(&self) -> Option<Vec<Value>> {
        match self {
            ChoicesSpec::Static(choices) => {
                Some(choices.iter().map(|choice| choice.value.clone()).collect())
            }
            ChoicesSpec::Method(_) => None,
        }
    }
}

/// One declared field of a sub-document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, rename = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub def: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub choices: Option<ChoicesSpec>,
    #[serde(default, rename = "if")]
    pub condition: Option<Map<String, Value>>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            id: None,
            label: None,
            def: None,
            required: false,
            min: None,
            max: None,
            choices: None,
            condition: None,
        }
    }

    pub fn with_default(mut self, def: Value) -> Self {
        self.def = Some(def);
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_choices(mut self, choices: ChoicesSpec) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn with_condition(mut self, condition: Map<String, Value>) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn is_renderable(&self) -> bool {
        self.field_type != FieldType::Unknown
    }
}

/// The repeatable field being edited.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayField {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub min: Option<usize>,
    #[serde(default)]
    pub max: Option<usize>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub title_field: Option<String>,
    #[serde(default)]
    pub scoped_array_name: Option<String>,
    #[serde(default)]
    pub schema: Vec<FieldDefinition>,
}

impl ArrayField {
    pub fn constraints(&self) -> CountConstraints {
        CountConstraints::from_field(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountConstraints {
    pub min: usize,
    pub max: Option<usize>,
}

impl CountConstraints {
    /// An explicit non-zero `min` wins; otherwise `required` implies one item.
    pub fn from_field(field: &ArrayField) -> Self {
        let min = match field.min {
            Some(min) if min > 0 => min,
            _ if field.required => 1,
            _ => 0,
        };
        Self {
            min,
            max: field.max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerFieldError {
    pub path: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl ServerFieldError {
    /// Splits `"<itemId>.<fieldName>"`; a path without a dot names the item only.
    pub fn target(&self) -> (&str, Option<&str>) {
        match self.path.split_once('.') {
            Some((id, field)) => (id, Some(field.split('.').next().unwrap_or(field))),
            None => (self.path.as_str(), None),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerErrorData {
    #[serde(default)]
    pub errors: Vec<ServerFieldError>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub data: Option<ServerErrorData>,
}

impl ServerError {
    pub fn errors(&self) -> &[ServerFieldError] {
        self.data
            .as_ref()
            .map(|data| data.errors.as_slice())
            .unwrap_or(&[])
    }
}

/// Everything a host hands over when opening an array edit session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInput {
    #[serde(default)]
    pub items: Vec<SubDocument>,
    pub field: ArrayField,
    #[serde(default)]
    pub input_schema: Vec<FieldDefinition>,
    #[serde(default)]
    pub server_error: Option<ServerError>,
    #[serde(default)]
    pub meta: IndexMap<String, Value>,
}

impl SessionInput {
    pub fn new(field: ArrayField, items: Vec<SubDocument>) -> Self {
        Self {
            items,
            field,
            ..Self::default()
        }
    }

    pub fn with_input_schema(mut self, schema: Vec<FieldDefinition>) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn with_server_error(mut self, error: ServerError) -> Self {
        self.server_error = Some(error);
        self
    }

    pub fn with_meta(mut self, meta: IndexMap<String, Value>) -> Self {
        self.meta = meta;
        self
    }

    /// `inputSchema` wins over the field's own schema; unknown field types are dropped.
    pub fn item_schema(&self) -> Vec<FieldDefinition> {
        let source = if self.input_schema.is_empty() {
            &self.field.schema
        } else {
            &self.input_schema
        };
        source
            .iter()
            .filter(|field| field.is_renderable())
            .cloned()
            .collect()
    }
}
