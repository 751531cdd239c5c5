use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use super::extractor::{self, EmailType, ExtractionRules};
use crate::config::UNKNOWN_PROFILE_NAME;
use crate::email::{body_resolver, date_index, parse_message, ParsedMessage, RawMessage};
use crate::error::MailError;
use crate::imap_client::MailSource;
use crate::locale::Language;

/// One notification ready to be relayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailInfo {
    pub profile_name: String,
    pub link: String,
    pub time_ago: String,
    #[serde(rename = "type")]
    pub kind: EmailType,
    pub sent_at: DateTime<Utc>,
}

/// Fetch, order, window, resolve and extract, in that order.
pub struct EmailInfoPipeline<S: MailSource> {
    source: S,
    rules: ExtractionRules,
    language: Language,
}

impl<S: MailSource> EmailInfoPipeline<S> {
    pub fn new(source: S, rules: ExtractionRules, language: Language) -> Self {
        EmailInfoPipeline {
            source,
            rules,
            language,
        }
    }

    /// Runs one scan against the mailbox.
    ///
    /// Mail-session failures abort the run; anything wrong with a single
    /// message only drops that message.
    pub async fn run(
        &self,
        now: DateTime<Utc>,
        window: Duration,
        profile_filter: Option<&str>,
    ) -> Result<Vec<EmailInfo>, MailError> {
        let raw_messages = self.source.fetch_candidates().await?;
        Ok(self.process_messages(raw_messages, now, window, profile_filter))
    }

    /// The pure part of a run: same input and `now`, same output.
    pub fn process_messages(
        &self,
        raw_messages: Vec<RawMessage>,
        now: DateTime<Utc>,
        window: Duration,
        profile_filter: Option<&str>,
    ) -> Vec<EmailInfo> {
        let candidates = raw_messages.len();

        let parsed: Vec<ParsedMessage> = raw_messages
            .iter()
            .filter_map(|raw| match parse_message(raw) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("Skipping message: {}", e);
                    None
                }
            })
            .collect();

        let recent = date_index::windowed(date_index::order(parsed), now, window);
        debug!("{} of {} candidate(s) inside the recency window", recent.len(), candidates);

        let filter = profile_filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| f.to_lowercase());

        let infos: Vec<EmailInfo> = recent
            .iter()
            .filter_map(|message| self.build_email_info(message, now))
            .filter(|info| match &filter {
                Some(filter) => info.profile_name.to_lowercase().contains(filter.as_str()),
                None => true,
            })
            .collect();

        info!("Processed {} recent email(s) out of {} candidate(s)", infos.len(), candidates);
        infos
    }

    fn build_email_info(&self, message: &ParsedMessage, now: DateTime<Utc>) -> Option<EmailInfo> {
        let Some(body) = body_resolver::resolve(message) else {
            debug!("Message {} has no usable body", message.id);
            return None;
        };

        let Some(fields) = extractor::extract(&body, &self.rules) else {
            debug!("Message {} has no recognised action link", message.id);
            return None;
        };

        let info = EmailInfo {
            profile_name: fields
                .profile_name
                .unwrap_or_else(|| UNKNOWN_PROFILE_NAME.to_string()),
            link: fields.link,
            time_ago: self.language.time_ago(now - message.sent_at),
            kind: fields.kind,
            sent_at: message.sent_at,
        };
        debug!("Processed email {}: {:?}", message.id, info);
        Some(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingSource {
        calls: AtomicUsize,
    }

    impl MailSource for FailingSource {
        fn fetch_candidates<'a>(
            &'a self,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<RawMessage>, MailError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(MailError::Auth("invalid credentials".to_string())) })
        }
    }

    #[test]
    fn test_mail_errors_abort_the_run() {
        let pipeline = EmailInfoPipeline::new(
            FailingSource {
                calls: AtomicUsize::new(0),
            },
            ExtractionRules::default(),
            Language::English,
        );

        let result = tokio_test::block_on(pipeline.run(Utc::now(), Duration::days(7), None));

        assert!(matches!(result, Err(MailError::Auth(_))));
        assert_eq!(pipeline.source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unparseable_dates_do_not_abort_the_batch() {
        let pipeline = EmailInfoPipeline::new(
            FailingSource {
                calls: AtomicUsize::new(0),
            },
            ExtractionRules::default(),
            Language::English,
        );
        let now = Utc::now();
        let good = format!(
            "Date: {}\r\nContent-Type: text/html\r\n\r\n<a href=\"https://x/ok\">Get Code</a>\r\n",
            (now - Duration::minutes(3)).to_rfc2822()
        );
        let raw = vec![
            RawMessage::new(1, "Date: not a date\r\nContent-Type: text/html\r\n\r\n<a href=\"https://x/bad\">Get Code</a>\r\n"),
            RawMessage::new(2, good),
        ];

        let infos = pipeline.process_messages(raw, now, Duration::days(7), None);

        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].link, "https://x/ok");
        assert_eq!(infos[0].profile_name, "Unknown");
        assert_eq!(infos[0].time_ago, "3 minutes ago");
    }

    #[test]
    fn test_email_info_json_shape() {
        let info = EmailInfo {
            profile_name: "Maria".to_string(),
            link: "https://x/code".to_string(),
            time_ago: "10 minutes ago".to_string(),
            kind: EmailType::TemporaryAccess,
            sent_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["profile_name"], "Maria");
        assert_eq!(json["type"], "Temporary Access");
        assert_eq!(json["time_ago"], "10 minutes ago");
    }
}
