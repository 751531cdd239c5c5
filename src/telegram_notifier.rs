use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::TelegramConfig;
use crate::error::NotifyError;
use crate::locale::Language;
use crate::notice::EmailInfo;

/// Seconds Telegram holds a getUpdates request open when idle.
pub const LONG_POLL_TIMEOUT_SECS: u64 = 30;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Telegram Bot API client: receives updates and relays EmailInfo records.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Self {
        Self::with_api_base(config, TELEGRAM_API_BASE)
    }

    /// Talks to a Bot API server other than the public one.
    pub fn with_api_base(config: &TelegramConfig, api_base: impl Into<String>) -> Self {
        info!("Initialising Telegram notifier");
        TelegramNotifier {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, NotifyError> {
        // The URL embeds the bot token, keep it out of error messages
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.without_url()))?;

        let api: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| NotifyError::Transport(e.without_url()))?;

        match (api.ok, api.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(NotifyError::Api {
                method: method.to_string(),
                reason: api.description.unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }

    /// Long-polls for new messages, starting at `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, NotifyError> {
        let body = json!({
            "offset": offset,
            "timeout": LONG_POLL_TIMEOUT_SECS,
            "allowed_updates": ["message"],
        });
        self.call("getUpdates", &body).await
    }

    /// Sends a plain text reply.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        let body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        self.call::<Value>("sendMessage", &body).await?;
        debug!("Message sent to chat {}", chat_id);
        Ok(())
    }

    /// Sends one record as an HTML message with an inline link button.
    pub async fn send_email_info(&self, chat_id: i64, email_info: &EmailInfo, language: Language) -> Result<(), NotifyError> {
        let body = render_email_info(chat_id, email_info, language);
        self.call::<Value>("sendMessage", &body).await?;
        info!("✅ {} for '{}' sent to chat {}", email_info.kind, email_info.profile_name, chat_id);
        Ok(())
    }
}

/// Builds the sendMessage payload for one record.
pub fn render_email_info(chat_id: i64, email_info: &EmailInfo, language: Language) -> Value {
    let text = format!(
        "👤 <b>{}:</b> {}\n📄 <b>{}:</b> {}\n⏰ <b>{}:</b> {}",
        language.profile_label(),
        html_escape::encode_text(&email_info.profile_name),
        language.type_label(),
        email_info.kind,
        language.time_label(),
        html_escape::encode_text(&email_info.time_ago),
    );

    json!({
        "chat_id": chat_id,
        "text": text,
        "parse_mode": "HTML",
        "reply_markup": {
            "inline_keyboard": [[{
                "text": language.button_label(),
                "url": email_info.link,
            }]]
        }
    })
}
