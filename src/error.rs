//! Error types for codewatch.

/// Mail-session errors. Any of these aborts the current run.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("IMAP authentication failed: {0}")]
    Auth(String),

    #[error("IMAP server returned an error status: {0}")]
    Protocol(String),

    #[error("IMAP connection failed: {0}")]
    Connection(String),
}

impl MailError {
    /// Whether opening a new session could succeed after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MailError::Connection(_))
    }
}

impl From<async_imap::error::Error> for MailError {
    fn from(err: async_imap::error::Error) -> Self {
        use async_imap::error::Error;

        match err {
            Error::Io(e) => MailError::Connection(e.to_string()),
            Error::ConnectionLost => MailError::Connection("connection lost".to_string()),
            Error::Bad(msg) | Error::No(msg) => MailError::Protocol(msg),
            other => MailError::Protocol(other.to_string()),
        }
    }
}

/// A single body part could not be turned into text.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported charset '{0}'")]
    UnsupportedCharset(String),

    #[error("payload is not valid {charset}: {reason}")]
    Malformed { charset: String, reason: String },
}

/// A message carried no usable Date header.
#[derive(Debug, thiserror::Error)]
pub enum DateParseError {
    #[error("message {0} has no Date header")]
    Missing(u32),

    #[error("message {id} has an unparseable Date header: {value}")]
    Invalid { id: u32, value: String },

    #[error("message {0} could not be parsed as MIME")]
    Unparseable(u32),
}

/// Delivery to the chat sink failed.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Telegram request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Telegram API rejected {method}: {reason}")]
    Api { method: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connection_errors_are_retryable() {
        assert!(MailError::Connection("reset".into()).is_retryable());
        assert!(!MailError::Auth("bad password".into()).is_retryable());
        assert!(!MailError::Protocol("NO".into()).is_retryable());
    }

    #[test]
    fn imap_status_errors_map_to_protocol() {
        let err: MailError = async_imap::error::Error::No("SEARCH failed".into()).into();
        assert!(matches!(err, MailError::Protocol(ref m) if m == "SEARCH failed"));

        let err: MailError = async_imap::error::Error::ConnectionLost.into();
        assert!(matches!(err, MailError::Connection(_)));
    }
}
