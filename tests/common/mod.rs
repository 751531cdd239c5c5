#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

use codewatch::email::RawMessage;
use codewatch::error::MailError;
use codewatch::imap_client::MailSource;

/// Serves a fixed set of messages, or a fixed failure.
pub struct StaticSource {
    pub messages: Vec<RawMessage>,
    pub fail: bool,
}

impl StaticSource {
    pub fn new(messages: Vec<RawMessage>) -> Self {
        StaticSource { messages, fail: false }
    }

    pub fn failing() -> Self {
        StaticSource {
            messages: Vec::new(),
            fail: true,
        }
    }
}

impl MailSource for StaticSource {
    fn fetch_candidates<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawMessage>, MailError>> + Send + 'a>> {
        Box::pin(async move {
            if self.fail {
                Err(MailError::Connection("connection reset by peer".to_string()))
            } else {
                Ok(self.messages.clone())
            }
        })
    }
}

/// Single-part HTML notification sent at `sent_at`.
pub fn html_message(id: u32, sent_at: DateTime<Utc>, html: &str) -> RawMessage {
    let content = format!(
        "From: Netflix <info@account.netflix.com>\r\n\
         Subject: Your temporary access code\r\n\
         Date: {}\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: text/html; charset=UTF-8\r\n\
         \r\n\
         {}\r\n",
        sent_at.to_rfc2822(),
        html
    );
    RawMessage::new(id, content)
}

pub fn fixture(id: u32, name: &str) -> RawMessage {
    let path = format!("data_test/{}", name);
    let content = std::fs::read(&path).unwrap_or_else(|e| panic!("Failed to read test email file {}: {}", path, e));
    RawMessage::new(id, content)
}
