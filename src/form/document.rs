use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Stable identity of a sub-document. Generated once and never regenerated while the item exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Reserved key the id is serialized under; never stored among the plain fields.
const ID_KEY: &str = "_id";

/// One element of the repeatable field: an id plus opaque named field values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubDocument {
    #[serde(rename = "_id", default)]
    id: ItemId,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl SubDocument {
    pub fn new(id: impl Into<ItemId>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields: without_id(fields),
        }
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self::new(ItemId::default(), fields)
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Sets a plain field. The id key is reserved and writes to it are ignored.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        let name = name.into();
        if name == ID_KEY {
            return None;
        }
        self.fields.insert(name, value)
    }

    /// Dotted lookup into nested objects, e.g. `"meta.title"`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.fields.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Same identity, new field values. An `_id` among `fields` is dropped.
    pub(crate) fn with_fields(&self, fields: Map<String, Value>) -> Self {
        Self::new(self.id.clone(), fields)
    }

    pub(crate) fn assign_id(&mut self, id: ItemId) {
        self.id = id;
    }

    /// Gives the document a fresh id if it arrived without one.
    pub(crate) fn ensure_id(&mut self) -> bool {
        if self.id.is_empty() {
            self.id = ItemId::generate();
            return true;
        }
        false
    }

    pub(crate) fn stamp(&mut self, meta_type: &str, scoped_array_name: Option<&str>) {
        self.fields
            .insert("metaType".to_string(), Value::String(meta_type.to_string()));
        match scoped_array_name {
            Some(name) => {
                self.fields
                    .insert("scopedArrayName".to_string(), Value::String(name.to_string()));
            }
            None => {
                self.fields.remove("scopedArrayName");
            }
        }
    }
}

fn without_id(mut fields: Map<String, Value>) -> Map<String, Value> {
    fields.remove(ID_KEY);
    fields
}
