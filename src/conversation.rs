//! Chat conversation state machine.
//!
//! `/start` asks for the password (when one is configured) and then for a
//! profile name; the name triggers a scan whose outcome ends the
//! conversation. The machine only decides what to say and when to scan;
//! the bot performs the side effects.

use crate::locale::Language;
use crate::notice::EmailInfo;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingPassword,
    AwaitingProfileName,
    Running { profile: String },
    Done,
}

/// What the user (or a finished scan) fed into the conversation
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Start,
    Text(String),
    /// Any command other than /start
    OtherCommand,
    RunFinished(RunOutcome),
}

impl Input {
    /// Classifies a raw chat message.
    pub fn from_message(text: &str) -> Self {
        let text = text.trim();
        match text.strip_prefix('/') {
            Some(command) => {
                let name = command.split_whitespace().next().unwrap_or("");
                // "/start@SomeBot" in group chats
                let name = name.split('@').next().unwrap_or("");
                if name.eq_ignore_ascii_case("start") {
                    Input::Start
                } else {
                    Input::OtherCommand
                }
            }
            None => Input::Text(text.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Found(Vec<EmailInfo>),
    Failed,
}

/// Side effects requested by a transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Reply(String),
    Notify(EmailInfo),
    StartRun { profile: String },
}

#[derive(Debug, Clone, Default)]
pub struct ConversationSettings {
    pub language: Language,
    pub access_password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    state: ConversationState,
}

impl Conversation {
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn handle(&mut self, input: Input, settings: &ConversationSettings) -> Vec<Action> {
        let lang = settings.language;
        let state = std::mem::take(&mut self.state);

        let (next, actions) = match (state, input) {
            (ConversationState::Running { .. }, Input::RunFinished(outcome)) => {
                (ConversationState::Done, Self::report(outcome, lang))
            }
            (running @ ConversationState::Running { .. }, Input::Start | Input::Text(_)) => {
                (running, vec![Action::Reply(lang.still_checking().to_string())])
            }
            (_, Input::Start) => match settings.access_password {
                Some(_) => (
                    ConversationState::AwaitingPassword,
                    vec![Action::Reply(lang.password_prompt().to_string())],
                ),
                None => (
                    ConversationState::AwaitingProfileName,
                    vec![Action::Reply(lang.profile_prompt().to_string())],
                ),
            },
            (ConversationState::AwaitingPassword, Input::Text(text)) => {
                if settings.access_password.as_deref() == Some(text.as_str()) {
                    (
                        ConversationState::AwaitingProfileName,
                        vec![Action::Reply(lang.profile_prompt().to_string())],
                    )
                } else {
                    (
                        ConversationState::AwaitingPassword,
                        vec![Action::Reply(lang.wrong_password().to_string())],
                    )
                }
            }
            (ConversationState::AwaitingProfileName, Input::Text(profile)) => {
                if profile.is_empty() {
                    (
                        ConversationState::AwaitingProfileName,
                        vec![Action::Reply(lang.profile_prompt().to_string())],
                    )
                } else {
                    let actions = vec![
                        Action::Reply(lang.checking(&profile)),
                        Action::StartRun {
                            profile: profile.clone(),
                        },
                    ];
                    (ConversationState::Running { profile }, actions)
                }
            }
            (state @ (ConversationState::Idle | ConversationState::Done), Input::Text(_)) => {
                (state, vec![Action::Reply(lang.start_hint().to_string())])
            }
            // Stray scan results and unknown commands change nothing
            (state, _) => (state, Vec::new()),
        };

        self.state = next;
        actions
    }

    fn report(outcome: RunOutcome, lang: Language) -> Vec<Action> {
        match outcome {
            RunOutcome::Found(infos) if infos.is_empty() => {
                vec![Action::Reply(lang.nothing_found().to_string())]
            }
            RunOutcome::Found(infos) => {
                let mut actions: Vec<Action> = infos.into_iter().map(Action::Notify).collect();
                actions.push(Action::Reply(lang.finished().to_string()));
                actions
            }
            RunOutcome::Failed => vec![Action::Reply(lang.run_failed().to_string())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::EmailType;
    use chrono::Utc;

    fn open() -> ConversationSettings {
        ConversationSettings::default()
    }

    fn guarded() -> ConversationSettings {
        ConversationSettings {
            language: Language::English,
            access_password: Some("123".to_string()),
        }
    }

    fn info(name: &str) -> EmailInfo {
        EmailInfo {
            profile_name: name.to_string(),
            link: "https://x/code".to_string(),
            time_ago: "1 minutes ago".to_string(),
            kind: EmailType::TemporaryAccess,
            sent_at: Utc::now(),
        }
    }

    #[test]
    fn test_input_classification() {
        assert_eq!(Input::from_message("/start"), Input::Start);
        assert_eq!(Input::from_message(" /start@CodeBot "), Input::Start);
        assert_eq!(Input::from_message("/help"), Input::OtherCommand);
        assert_eq!(Input::from_message(" Maria "), Input::Text("Maria".to_string()));
    }

    #[test]
    fn test_happy_path() {
        let settings = open();
        let mut conv = Conversation::default();

        let actions = conv.handle(Input::Start, &settings);
        assert_eq!(conv.state(), &ConversationState::AwaitingProfileName);
        assert_eq!(actions, vec![Action::Reply("👤 Please enter the profile name:".to_string())]);

        let actions = conv.handle(Input::Text("Maria".to_string()), &settings);
        assert_eq!(
            conv.state(),
            &ConversationState::Running {
                profile: "Maria".to_string()
            }
        );
        assert_eq!(actions[1], Action::StartRun { profile: "Maria".to_string() });

        let actions = conv.handle(Input::RunFinished(RunOutcome::Found(vec![info("Maria")])), &settings);
        assert_eq!(conv.state(), &ConversationState::Done);
        assert_eq!(actions.len(), 2);
        assert!(matches!(&actions[0], Action::Notify(info) if info.profile_name == "Maria"));
        assert_eq!(actions[1], Action::Reply("✅ Done. Type /start to check again.".to_string()));
    }

    #[test]
    fn test_password_gate() {
        let settings = guarded();
        let mut conv = Conversation::default();

        conv.handle(Input::Start, &settings);
        assert_eq!(conv.state(), &ConversationState::AwaitingPassword);

        let actions = conv.handle(Input::Text("wrong".to_string()), &settings);
        assert_eq!(conv.state(), &ConversationState::AwaitingPassword);
        assert_eq!(actions, vec![Action::Reply("❌ Incorrect password. Please try again.".to_string())]);

        conv.handle(Input::Text("123".to_string()), &settings);
        assert_eq!(conv.state(), &ConversationState::AwaitingProfileName);
    }

    #[test]
    fn test_running_ignores_new_requests() {
        let settings = open();
        let mut conv = Conversation::default();
        conv.handle(Input::Start, &settings);
        conv.handle(Input::Text("Maria".to_string()), &settings);

        for input in [Input::Start, Input::Text("John".to_string())] {
            let actions = conv.handle(input, &settings);
            assert_eq!(actions, vec![Action::Reply("⏳ Still checking, please wait...".to_string())]);
        }
        assert!(matches!(conv.state(), ConversationState::Running { profile } if profile == "Maria"));
    }

    #[test]
    fn test_empty_and_failed_runs() {
        let settings = open();
        let mut conv = Conversation::default();
        conv.handle(Input::Start, &settings);
        conv.handle(Input::Text("Maria".to_string()), &settings);
        let actions = conv.handle(Input::RunFinished(RunOutcome::Found(Vec::new())), &settings);
        assert_eq!(actions, vec![Action::Reply("❌ No codes or links available.".to_string())]);

        conv.handle(Input::Start, &settings);
        conv.handle(Input::Text("Maria".to_string()), &settings);
        let actions = conv.handle(Input::RunFinished(RunOutcome::Failed), &settings);
        assert_eq!(conv.state(), &ConversationState::Done);
        assert_eq!(actions, vec![Action::Reply("⚠️ An error occurred while checking emails.".to_string())]);
    }

    #[test]
    fn test_idle_and_done_hint_start() {
        let settings = open();
        let mut conv = Conversation::default();

        let actions = conv.handle(Input::Text("hello".to_string()), &settings);
        assert_eq!(conv.state(), &ConversationState::Idle);
        assert_eq!(actions, vec![Action::Reply("Type /start to check for codes.".to_string())]);

        assert!(conv.handle(Input::OtherCommand, &settings).is_empty());
        assert!(conv
            .handle(Input::RunFinished(RunOutcome::Failed), &settings)
            .is_empty());
    }

    #[test]
    fn test_empty_profile_name_reprompts() {
        let settings = open();
        let mut conv = Conversation::default();
        conv.handle(Input::Start, &settings);

        conv.handle(Input::Text(String::new()), &settings);
        assert_eq!(conv.state(), &ConversationState::AwaitingProfileName);
    }
}
