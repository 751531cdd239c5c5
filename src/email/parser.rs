use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;
use mail_parser::{MessageParser, MimeHeaders, PartType};

use super::common::{BodyPart, ParsedMessage, PartPayload, RawMessage};
use crate::error::DateParseError;

/// Parses a raw message into its date, subject and leaf body parts.
///
/// Fails only when no usable date can be found: such a message cannot be
/// placed in the recency window and is skipped by the caller.
pub fn parse_message(raw: &RawMessage) -> Result<ParsedMessage, DateParseError> {
    let message = MessageParser::default()
        .parse(raw.content.as_slice())
        .ok_or(DateParseError::Unparseable(raw.id))?;

    // mail-parser guesses at malformed dates, so the header is read strictly here
    let sent_at = parse_date_header(raw)?;

    let mut parts = Vec::new();
    for part in &message.parts {
        let (payload, fallback_type) = match &part.body {
            PartType::Text(text) => (PartPayload::Text(text.to_string()), "text/plain"),
            PartType::Html(html) => (PartPayload::Text(html.to_string()), "text/html"),
            PartType::Binary(bytes) | PartType::InlineBinary(bytes) => {
                (PartPayload::Binary(bytes.to_vec()), "application/octet-stream")
            }
            PartType::Message(_) | PartType::Multipart(_) => continue,
        };

        let content_type = part
            .content_type()
            .map(|ct| match ct.subtype() {
                Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
                None => ct.ctype().to_string(),
            })
            .unwrap_or_else(|| fallback_type.to_string())
            .to_lowercase();

        let charset = part
            .content_type()
            .and_then(|ct| ct.attribute("charset"))
            .map(|c| c.to_string());

        let disposition = part
            .content_disposition()
            .map(|cd| cd.ctype().to_lowercase());

        parts.push(BodyPart {
            content_type,
            disposition,
            charset,
            payload,
        });
    }

    debug!("Message {} parsed: date={}, {} body part(s)", raw.id, sent_at, parts.len());

    Ok(ParsedMessage {
        id: raw.id,
        sent_at,
        subject: message.subject().map(|s| s.to_string()),
        parts,
    })
}

/// Layouts accepted when the Date header carries no zone; read as UTC.
const ZONELESS_DATE_FORMATS: [&str; 4] = [
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%a, %d %b %Y %H:%M",
    "%d %b %Y %H:%M",
];

fn parse_date_header(raw: &RawMessage) -> Result<DateTime<Utc>, DateParseError> {
    let content = String::from_utf8_lossy(&raw.content);
    let value = find_date_header(&content).ok_or(DateParseError::Missing(raw.id))?;

    parse_date_value(&value).ok_or_else(|| DateParseError::Invalid {
        id: raw.id,
        value: value.clone(),
    })
}

/// Value of the first Date header, with folded lines joined.
fn find_date_header(content: &str) -> Option<String> {
    let mut lines = content.lines().peekable();

    while let Some(line) = lines.next() {
        if line.is_empty() {
            break; // End of headers
        }

        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.eq_ignore_ascii_case("date") {
            continue;
        }

        let mut value = value.trim().to_string();
        while let Some(next) = lines.next_if(|l| l.starts_with(' ') || l.starts_with('\t')) {
            value.push(' ');
            value.push_str(next.trim());
        }
        return Some(value);
    }

    None
}

fn parse_date_value(value: &str) -> Option<DateTime<Utc>> {
    // Drop a trailing comment such as "(UTC)"
    let value = match value.find('(') {
        Some(index) => value[..index].trim(),
        None => value.trim(),
    };

    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }

    ZONELESS_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}
