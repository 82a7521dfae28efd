use anyhow::Result;

use crate::{domain::Choice, form::ActiveItem};

/// The detail form that renders the active item.
pub trait FormRenderer {
    /// Yields one render tick. The session calls this between closing one item and opening
    /// the next, and after triggering field validation.
    fn next_tick(&mut self) {}

    /// Asks the form to surface field errors for `item`. `Some(flag)` replaces the error
    /// flag last reported through `update_active_item`; `None` keeps it.
    fn validate_fields(&mut self, _item: &ActiveItem) -> Option<bool> {
        None
    }

    fn scroll_field_into_view(&mut self, _field: &str) {}
}

/// Fire-and-forget user notifications.
pub trait Notifier {
    fn notify(&mut self, message_key: &str, options: &NotifyOptions);
}

/// Resolves choices for select fields whose options come from a server method.
pub trait ChoiceSource {
    fn fetch_choices(&mut self, field_id: &str) -> Result<Vec<Choice>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Info,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOptions {
    pub kind: NotifyKind,
    pub icon: Option<String>,
    pub dismiss: bool,
}

impl NotifyOptions {
    pub fn warning() -> Self {
        Self {
            kind: NotifyKind::Warning,
            icon: Some("alert-circle-icon".to_string()),
            dismiss: true,
        }
    }
}

/// A host that renders nothing and drops notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl FormRenderer for NullHost {}

impl Notifier for NullHost {
    fn notify(&mut self, _message_key: &str, _options: &NotifyOptions) {}
}
