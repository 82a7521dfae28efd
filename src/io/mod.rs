mod format;
mod input;
mod output;

pub use format::DocumentFormat;
pub use input::{parse_document_str, session_input_from_str};
pub use output::{OutputDestination, OutputOptions, emit, event_value};
