pub mod body_resolver;
pub mod common;
pub mod date_index;
pub mod parser;

// Re-export commonly used items
pub use common::{BodyPart, ParsedMessage, PartPayload, RawMessage};
pub use parser::parse_message;
