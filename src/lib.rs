#![deny(rust_2018_idioms)]

//! Edit-session controller for repeatable ("array") schema fields.
//!
//! An [`ArraySession`] owns a working copy of the item list, keeps one item open for
//! editing at a time, validates item counts and per-item fields, detects unsaved
//! changes and finally emits the finalized list or a cancellation.

mod app;
mod domain;
mod form;
mod io;

pub use app::{
    ArraySession, ChoiceSource, CountState, CountSummary, DEFAULT_META_TYPE, FormRenderer,
    ItemValidator, LabeledItem, Notifier, NotifyKind, NotifyOptions, NullHost, PendingSelect,
    REQUIRED_MESSAGE, RESOLVE_ERRORS_KEY, SelectStep, SessionEvent, SessionOptions,
    SessionPhase, item_json_schema,
};
pub use domain::{
    ArrayField, Choice, ChoicesSpec, CountConstraints, FieldDefinition, FieldType, ServerError,
    ServerErrorData, ServerFieldError, SessionInput, parse_session_input,
};
pub use form::{
    ActiveItem, FieldVisibility, ItemId, ReorderReport, SessionError, SubDocument, WorkingSet,
    detect_doc_change, detect_field_change, evaluate_conditions, new_instance,
};
pub use io::{
    DocumentFormat, OutputDestination, OutputOptions, emit, event_value, parse_document_str,
    session_input_from_str,
};

pub mod prelude {
    pub use super::{
        ArraySession, FormRenderer, ItemId, Notifier, NullHost, SessionEvent, SessionInput,
        SessionOptions, SubDocument,
    };
}
