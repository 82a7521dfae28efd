mod parser;
mod schema;

pub use parser::parse_session_input;
pub use schema::{
    ArrayField, Choice, ChoicesSpec, CountConstraints, FieldDefinition, FieldType, ServerError,
    ServerErrorData, ServerFieldError, SessionInput,
};
