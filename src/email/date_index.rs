use chrono::{DateTime, Duration, Utc};
use log::debug;

use super::common::ParsedMessage;

/// Default recency window for candidate messages.
pub fn default_max_age() -> Duration {
    Duration::days(7)
}

/// Sorts newest first. The sort is stable: equal dates keep fetch order.
pub fn order(mut messages: Vec<ParsedMessage>) -> Vec<ParsedMessage> {
    messages.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
    messages
}

/// Keeps messages strictly younger than `now - max_age`.
pub fn windowed(messages: Vec<ParsedMessage>, now: DateTime<Utc>, max_age: Duration) -> Vec<ParsedMessage> {
    let cutoff = now - max_age;

    messages
        .into_iter()
        .filter(|message| {
            let recent = message.sent_at > cutoff;
            if !recent {
                debug!("Skipping message {} from {}, older than {}", message.id, message.sent_at, cutoff);
            }
            recent
        })
        .collect()
}
