use super::document::ItemId;

/// Misuse of the session API. Validation failures are never reported this way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NoActiveItem,
    UnknownItem(ItemId),
    SessionClosed,
    UnexpectedBarrier { expected: Option<ItemId>, found: ItemId },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NoActiveItem => write!(f, "no item is open for editing"),
            SessionError::UnknownItem(id) => write!(f, "no item with id {id} in the working set"),
            SessionError::SessionClosed => write!(f, "the edit session has already finished"),
            SessionError::UnexpectedBarrier { expected, found } => match expected {
                Some(expected) => {
                    write!(f, "switch to {found} completed while switching to {expected}")
                }
                None => write!(f, "switch to {found} completed with no switch in progress"),
            },
        }
    }
}

impl std::error::Error for SessionError {}
