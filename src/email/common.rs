/// Common structures shared by the mail pipeline stages
use chrono::{DateTime, Utc};

/// Message as returned by the IMAP server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// IMAP sequence number
    pub id: u32,
    pub content: Vec<u8>,
}

impl RawMessage {
    pub fn new(id: u32, content: impl Into<Vec<u8>>) -> Self {
        RawMessage {
            id,
            content: content.into(),
        }
    }
}

/// Message after MIME parsing, with its date normalized to UTC
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    pub id: u32,
    pub sent_at: DateTime<Utc>,
    pub subject: Option<String>,
    pub parts: Vec<BodyPart>,
}

/// One leaf part of a message, in original order
#[derive(Debug, Clone, PartialEq)]
pub struct BodyPart {
    /// Lower-case "type/subtype"
    pub content_type: String,
    /// Lower-case disposition type ("inline", "attachment"), if declared
    pub disposition: Option<String>,
    pub charset: Option<String>,
    pub payload: PartPayload,
}

impl BodyPart {
    pub fn is_attachment(&self) -> bool {
        self.disposition.as_deref() == Some("attachment")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartPayload {
    /// Text already converted to UTF-8 by the MIME parser; bytes the
    /// charset could not map show up as U+FFFD
    Text(String),
    /// Transfer-decoded bytes, declared charset not yet applied
    Binary(Vec<u8>),
}
