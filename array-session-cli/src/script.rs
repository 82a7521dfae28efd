use array_session::{ArraySession, FormRenderer, ItemId, Notifier, NotifyOptions, SessionError};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

/// One recorded UI action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Action {
    Select {
        id: String,
    },
    Add,
    Update {
        fields: Map<String, Value>,
        #[serde(default, rename = "hasErrors")]
        has_errors: bool,
    },
    Reorder {
        ids: Vec<String>,
    },
    Remove {
        id: String,
    },
    Move {
        id: String,
        delta: isize,
    },
    Submit,
    Close {
        #[serde(default)]
        discard: bool,
    },
}

/// Host used for replays: ticks are free, warnings are logged and counted.
#[derive(Debug, Default)]
pub struct ReplayHost {
    pub warnings: Vec<String>,
}

impl FormRenderer for ReplayHost {
    fn scroll_field_into_view(&mut self, field: &str) {
        info!(field, "scroll field into view");
    }
}

impl Notifier for ReplayHost {
    fn notify(&mut self, message_key: &str, _options: &NotifyOptions) {
        warn!(message = message_key, "notification");
        self.warnings.push(message_key.to_string());
    }
}

/// Applies `actions` in order, stopping early once the session finishes.
pub fn replay<H: FormRenderer + Notifier>(
    session: &mut ArraySession<H>,
    actions: &[Action],
) -> Result<usize, SessionError> {
    let mut applied = 0;
    for action in actions {
        if session.outcome().is_some() {
            warn!(remaining = actions.len() - applied, "session finished; ignoring remaining actions");
            break;
        }
        apply(session, action)?;
        applied += 1;
    }
    Ok(applied)
}

fn apply<H: FormRenderer + Notifier>(
    session: &mut ArraySession<H>,
    action: &Action,
) -> Result<(), SessionError> {
    match action {
        Action::Select { id } => {
            session.select(&ItemId::from(id.as_str()))?;
        }
        Action::Add => {
            session.add()?;
        }
        Action::Update { fields, has_errors } => {
            session.update_active_item(fields.clone(), *has_errors)?;
        }
        Action::Reorder { ids } => {
            let ordered: Vec<ItemId> = ids.iter().map(|id| ItemId::from(id.as_str())).collect();
            session.reorder_or_insert(&ordered)?;
        }
        Action::Remove { id } => {
            session.remove(&ItemId::from(id.as_str()))?;
        }
        Action::Move { id, delta } => {
            session.move_item(&ItemId::from(id.as_str()), *delta)?;
        }
        Action::Submit => {
            session.submit()?;
        }
        Action::Close { discard } => {
            session.request_close(|| *discard)?;
        }
    }
    Ok(())
}

/// Summary of a session that the script left open.
pub fn pending_summary<H>(session: &ArraySession<H>) -> Value
where
    H: FormRenderer + Notifier,
{
    serde_json::json!({
        "event": "pending",
        "active": session.active_id().map(ItemId::as_str),
        "modified": session.is_modified(),
        "valid": session.is_session_valid(),
        "items": session.working_set().to_vec(),
    })
}
