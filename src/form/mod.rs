mod active;
mod change;
mod conditions;
mod defaults;
mod document;
mod error;
mod working_set;

pub use active::ActiveItem;
pub use change::{detect_doc_change, detect_field_change};
pub use conditions::{FieldVisibility, evaluate_conditions};
pub use defaults::new_instance;
pub use document::{ItemId, SubDocument};
pub use error::SessionError;
pub use working_set::{ReorderReport, WorkingSet};
