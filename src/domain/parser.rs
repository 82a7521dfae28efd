use anyhow::{Context, Result};
use serde_json::Value;

use super::schema::SessionInput;

/// Parse an inbound session document into a `SessionInput`.
pub fn parse_session_input(value: &Value) -> Result<SessionInput> {
    serde_json::from_value::<SessionInput>(value.clone())
        .context("failed to read array session input")
}
