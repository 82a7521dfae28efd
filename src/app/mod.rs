mod host;
mod labels;
mod options;
mod session;
mod validation;

pub use host::{ChoiceSource, FormRenderer, Notifier, NotifyKind, NotifyOptions, NullHost};
pub use labels::{CountSummary, LabeledItem};
pub use options::{DEFAULT_META_TYPE, RESOLVE_ERRORS_KEY, SessionOptions};
pub use session::{ArraySession, PendingSelect, SelectStep, SessionEvent, SessionPhase};
pub use validation::{CountState, ItemValidator, REQUIRED_MESSAGE, item_json_schema};
