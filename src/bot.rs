//! Telegram front end: long-polls the Bot API and drives one
//! conversation per chat.

use chrono::{Duration, Utc};
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::conversation::{Action, Conversation, ConversationSettings, Input, RunOutcome};
use crate::imap_client::MailSource;
use crate::notice::EmailInfoPipeline;
use crate::telegram_notifier::TelegramNotifier;

pub struct TelegramBot<S: MailSource + 'static> {
    notifier: Arc<TelegramNotifier>,
    pipeline: Arc<EmailInfoPipeline<S>>,
    settings: ConversationSettings,
    window: Duration,
    conversations: Mutex<HashMap<i64, Conversation>>,
}

impl<S: MailSource + 'static> TelegramBot<S> {
    pub fn new(
        notifier: Arc<TelegramNotifier>,
        pipeline: Arc<EmailInfoPipeline<S>>,
        settings: ConversationSettings,
        window: Duration,
    ) -> Self {
        TelegramBot {
            notifier,
            pipeline,
            settings,
            window,
            conversations: Mutex::new(HashMap::new()),
        }
    }

    /// Polls for updates until the task is dropped.
    pub async fn run(self: Arc<Self>) {
        let mut offset: i64 = 0;
        info!("🤖 Telegram bot listening for messages...");

        loop {
            let updates = match self.notifier.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!("Telegram poll error: {}", e);
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);

                let Some(message) = update.message else {
                    continue;
                };
                let Some(text) = message.text else {
                    continue;
                };

                let input = Input::from_message(&text);
                self.handle_input(message.chat.id, input).await;
            }
        }
    }

    async fn transition(&self, chat_id: i64, input: Input) -> Vec<Action> {
        let mut conversations = self.conversations.lock().await;
        let conversation = conversations.entry(chat_id).or_default();
        let actions = conversation.handle(input, &self.settings);
        log::debug!("Chat {} is now {:?}", chat_id, conversation.state());
        actions
    }

    async fn handle_input(self: &Arc<Self>, chat_id: i64, input: Input) {
        for action in self.transition(chat_id, input).await {
            match action {
                Action::StartRun { profile } => {
                    // Scans run off the polling task so other chats stay responsive
                    tokio::spawn(Arc::clone(self).run_scan(chat_id, profile));
                }
                other => self.deliver(chat_id, other).await,
            }
        }
    }

    async fn run_scan(self: Arc<Self>, chat_id: i64, profile: String) {
        info!("🔍 Scan requested by chat {} for profile '{}'", chat_id, profile);

        let outcome = match self.pipeline.run(Utc::now(), self.window, Some(profile.as_str())).await {
            Ok(infos) => RunOutcome::Found(infos),
            Err(e) => {
                error!("❌ Scan for chat {} failed: {}", chat_id, e);
                RunOutcome::Failed
            }
        };

        for action in self.transition(chat_id, Input::RunFinished(outcome)).await {
            self.deliver(chat_id, action).await;
        }
    }

    /// Performs one reply or notification; failures are only logged.
    async fn deliver(&self, chat_id: i64, action: Action) {
        let result = match &action {
            Action::Reply(text) => self.notifier.send_message(chat_id, text).await,
            Action::Notify(email_info) => {
                self.notifier
                    .send_email_info(chat_id, email_info, self.settings.language)
                    .await
            }
            Action::StartRun { .. } => {
                warn!("Unexpected scan request for chat {} ignored", chat_id);
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("Failed to send message via Telegram to chat {}: {}", chat_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelegramConfig;
    use crate::conversation::ConversationState;
    use crate::email::RawMessage;
    use crate::error::MailError;
    use crate::locale::Language;
    use crate::notice::ExtractionRules;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::future::Future;
    use std::pin::Pin;

    const CHAT_ID: i64 = 42;

    struct Inbox(Vec<RawMessage>);

    impl MailSource for Inbox {
        fn fetch_candidates<'a>(
            &'a self,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<RawMessage>, MailError>> + Send + 'a>> {
            Box::pin(async move { Ok(self.0.clone()) })
        }
    }

    /// Minimal Bot API: records every sendMessage body, optionally
    /// rejecting the first one.
    struct FakeTelegram {
        sent: Mutex<Vec<Value>>,
        reject_first: bool,
    }

    impl FakeTelegram {
        async fn texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .await
                .iter()
                .map(|body| body["text"].as_str().unwrap_or_default().to_string())
                .collect()
        }
    }

    async fn send_message(State(api): State<Arc<FakeTelegram>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let mut sent = api.sent.lock().await;
        sent.push(body);
        if api.reject_first && sent.len() == 1 {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"ok": false, "description": "Bad Request: chat not found"})),
            );
        }
        (StatusCode::OK, Json(json!({"ok": true, "result": {"message_id": sent.len()}})))
    }

    async fn fake_telegram(reject_first: bool) -> (String, Arc<FakeTelegram>) {
        let api = Arc::new(FakeTelegram {
            sent: Mutex::new(Vec::new()),
            reject_first,
        });
        let app = Router::new()
            .route("/bottest-token/sendMessage", post(send_message))
            .with_state(Arc::clone(&api));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), api)
    }

    fn notice(id: u32, minutes_ago: i64, name: &str) -> RawMessage {
        RawMessage::new(
            id,
            format!(
                "Date: {}\r\nContent-Type: text/html; charset=utf-8\r\n\r\n\
                 <p>Requested by {} today</p><a href=\"https://x/{}\">Get Code</a>\r\n",
                (Utc::now() - Duration::minutes(minutes_ago)).to_rfc2822(),
                name,
                id
            ),
        )
    }

    fn bot(api_base: &str, messages: Vec<RawMessage>) -> Arc<TelegramBot<Inbox>> {
        let config = TelegramConfig {
            bot_token: "test-token".to_string(),
            language: Language::English,
            access_password: None,
            notify_chat_id: None,
        };
        Arc::new(TelegramBot::new(
            Arc::new(TelegramNotifier::with_api_base(&config, api_base)),
            Arc::new(EmailInfoPipeline::new(
                Inbox(messages),
                ExtractionRules::default(),
                Language::English,
            )),
            ConversationSettings::default(),
            Duration::hours(168),
        ))
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_block_later_records() {
        let (base, api) = fake_telegram(true).await;
        let bot = bot(&base, vec![notice(1, 5, "Maria"), notice(2, 10, "Marianne")]);
        bot.transition(CHAT_ID, Input::Start).await;
        bot.transition(CHAT_ID, Input::Text("mari".to_string())).await;

        Arc::clone(&bot).run_scan(CHAT_ID, "mari".to_string()).await;

        let texts = api.texts().await;
        assert_eq!(texts.len(), 3);
        assert!(texts[0].contains("Maria") && !texts[0].contains("Marianne"));
        assert!(texts[1].contains("Marianne"));
        assert_eq!(texts[2], "✅ Done. Type /start to check again.");

        let conversations = bot.conversations.lock().await;
        assert_eq!(conversations[&CHAT_ID].state(), &ConversationState::Done);
    }

    #[tokio::test]
    async fn test_profile_name_starts_a_background_scan() {
        let (base, api) = fake_telegram(false).await;
        let bot = bot(&base, vec![notice(1, 5, "Maria"), notice(2, 6, "John")]);

        bot.handle_input(CHAT_ID, Input::Start).await;
        bot.handle_input(CHAT_ID, Input::Text("Maria".to_string())).await;

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while api.sent.lock().await.len() < 4 {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("scan results were not delivered");

        let texts = api.texts().await;
        assert_eq!(texts.len(), 4);
        assert_eq!(texts[0], "👤 Please enter the profile name:");
        assert_eq!(texts[1], "🔍 Checking codes and links for Maria...");
        assert!(texts[2].contains("Maria"));
        assert_eq!(texts[3], "✅ Done. Type /start to check again.");

        let sent = api.sent.lock().await;
        assert_eq!(sent[2]["chat_id"], CHAT_ID);
        assert_eq!(sent[2]["reply_markup"]["inline_keyboard"][0][0]["url"], "https://x/1");
    }

    #[tokio::test]
    async fn test_empty_scan_replies_once() {
        let (base, api) = fake_telegram(false).await;
        let bot = bot(&base, Vec::new());
        bot.transition(CHAT_ID, Input::Start).await;
        bot.transition(CHAT_ID, Input::Text("Maria".to_string())).await;

        Arc::clone(&bot).run_scan(CHAT_ID, "Maria".to_string()).await;

        assert_eq!(api.texts().await, vec!["❌ No codes or links available.".to_string()]);
    }
}
