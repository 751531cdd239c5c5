use log::{debug, warn};

use super::common::{BodyPart, ParsedMessage, PartPayload};
use crate::error::DecodeError;

/// Picks the single text body used for field extraction.
///
/// Attachments are skipped. The first `text/html` part wins outright;
/// without one, the first `text/plain` part is used. Parts that fail to
/// decode are treated as absent.
pub fn resolve(message: &ParsedMessage) -> Option<String> {
    let mut plain_body: Option<String> = None;

    for (index, part) in message.parts.iter().enumerate() {
        if part.is_attachment() {
            debug!("Message {}: part {} is an attachment, skipped", message.id, index);
            continue;
        }

        let is_html = match part.content_type.as_str() {
            "text/html" => true,
            "text/plain" => false,
            _ => continue,
        };

        if !is_html && plain_body.is_some() {
            continue;
        }

        let text = match decode_part(part) {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => continue,
            Err(e) => {
                warn!("Message {}: part {} ({}) not decoded: {}", message.id, index, part.content_type, e);
                continue;
            }
        };

        if is_html {
            return Some(text);
        }
        plain_body = Some(text);
    }

    if plain_body.is_none() {
        debug!("Message {}: no inline text or HTML body", message.id);
    }
    plain_body
}

/// Applies the declared charset (UTF-8 when absent) to a part payload.
pub fn decode_part(part: &BodyPart) -> Result<String, DecodeError> {
    match &part.payload {
        // The MIME parser substitutes U+FFFD for bytes the charset cannot map
        PartPayload::Text(text) if text.contains(char::REPLACEMENT_CHARACTER) => Err(DecodeError::Malformed {
            charset: part.charset.as_deref().unwrap_or("utf-8").trim().to_lowercase(),
            reason: "bytes not valid in the declared charset".to_string(),
        }),
        PartPayload::Text(text) => Ok(text.clone()),
        PartPayload::Binary(bytes) => decode_bytes(bytes, part.charset.as_deref()),
    }
}

fn decode_bytes(bytes: &[u8], charset: Option<&str>) -> Result<String, DecodeError> {
    let label = charset.unwrap_or("utf-8").trim().to_lowercase();

    match label.as_str() {
        "utf-8" | "utf8" | "us-ascii" | "ascii" => {
            String::from_utf8(bytes.to_vec()).map_err(|e| DecodeError::Malformed {
                charset: label.clone(),
                reason: e.to_string(),
            })
        }
        // Latin-1 maps every byte to the code point of the same value
        "iso-8859-1" | "latin1" | "latin-1" => Ok(bytes.iter().map(|&b| b as char).collect()),
        _ => Err(DecodeError::UnsupportedCharset(label)),
    }
}
