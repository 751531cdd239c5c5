use anyhow::Result;
use log::warn;
use std::time::Duration;

use crate::locale::Language;
use crate::notice::{EmailType, LinkText};

/// Fixed IMAP endpoint; other providers are not supported.
pub const IMAP_SERVER: &str = "imap.gmail.com";
pub const IMAP_PORT: u16 = 993;
pub const MAILBOX: &str = "INBOX";

/// Label used when a message carries no "Requested by" line.
pub const UNKNOWN_PROFILE_NAME: &str = "Unknown";

/// Phrases that introduce the requesting profile name.
pub const DEFAULT_PROFILE_TRIGGERS: [&str; 2] = ["Requested by", "Demande effectuée par"];

pub const DEFAULT_ACCESS_CODE_LINK_TEXTS: [&str; 2] = ["Get Code", "Récupérer le code"];
pub const DEFAULT_HOUSEHOLD_LINK_TEXTS: [&str; 2] = ["Yes, This Was Me", "Confirm Update"];

#[derive(Debug, Clone)]
pub struct Config {
    pub mail: MailConfig,
    pub telegram: TelegramConfig,
    pub extraction: ExtractionConfig,
    pub http_bind: String,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
    pub connect_attempts: u32,
}

impl MailConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub language: Language,
    pub access_password: Option<String>,
    pub notify_chat_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub recency_window_hours: i64,
    pub access_code_link_texts: Vec<String>,
    pub household_link_texts: Vec<String>,
}

impl ExtractionConfig {
    pub fn recency_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.recency_window_hours)
    }

    /// Recognised anchor texts, access-code entries first.
    pub fn link_texts(&self) -> Vec<LinkText> {
        let access = self
            .access_code_link_texts
            .iter()
            .map(|text| LinkText::new(text, EmailType::TemporaryAccess));
        let household = self
            .household_link_texts
            .iter()
            .map(|text| LinkText::new(text, EmailType::HouseholdUpdate));
        access.chain(household).collect()
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            recency_window_hours: 7 * 24,
            access_code_link_texts: DEFAULT_ACCESS_CODE_LINK_TEXTS.iter().map(|s| s.to_string()).collect(),
            household_link_texts: DEFAULT_HOUSEHOLD_LINK_TEXTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub schedule_times: Vec<String>, // Format: "HH:MM" (e.g., ["09:00", "21:00"])
}

impl Config {
    pub fn new() -> Result<Self> {
        Self::check_required_env_vars()?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} must be set", key))
        };
        let defaults = ExtractionConfig::default();

        Ok(Config {
            mail: MailConfig {
                server: IMAP_SERVER.to_string(),
                port: IMAP_PORT,
                username: required("EMAIL_USER")?,
                password: required("EMAIL_PASS")?,
                timeout_secs: parse_or(&lookup, "MAIL_TIMEOUT_SECS", 30),
                connect_attempts: parse_or::<_, u32>(&lookup, "MAIL_CONNECT_ATTEMPTS", 3).max(1),
            },
            telegram: TelegramConfig {
                bot_token: required("TELEGRAM_TOKEN")?,
                language: lookup("BOT_LANGUAGE")
                    .map(|code| {
                        Language::from_code(&code).unwrap_or_else(|| {
                            warn!("BOT_LANGUAGE '{}' not supported, falling back to English", code);
                            Language::English
                        })
                    })
                    .unwrap_or_default(),
                access_password: lookup("BOT_ACCESS_PASSWORD").filter(|p| !p.is_empty()),
                notify_chat_id: lookup("TELEGRAM_NOTIFY_CHAT_ID").and_then(|v| match v.trim().parse() {
                    Ok(id) => Some(id),
                    Err(_) => {
                        warn!("TELEGRAM_NOTIFY_CHAT_ID '{}' is not a chat id - ignored", v);
                        None
                    }
                }),
            },
            extraction: ExtractionConfig {
                recency_window_hours: parse_or(&lookup, "RECENCY_WINDOW_HOURS", defaults.recency_window_hours),
                access_code_link_texts: lookup("ACCESS_CODE_LINK_TEXTS")
                    .map(|v| split_link_texts(&v))
                    .unwrap_or(defaults.access_code_link_texts),
                household_link_texts: lookup("HOUSEHOLD_LINK_TEXTS")
                    .map(|v| split_link_texts(&v))
                    .unwrap_or(defaults.household_link_texts),
            },
            http_bind: lookup("HTTP_BIND").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            scheduler: SchedulerConfig {
                enabled: parse_or(&lookup, "SCHEDULER_ENABLED", false),
                schedule_times: lookup("SCHEDULER_TIMES")
                    .unwrap_or_else(|| "09:00".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
        })
    }

    fn check_required_env_vars() -> Result<()> {
        let required_vars = ["EMAIL_USER", "EMAIL_PASS", "TELEGRAM_TOKEN"];

        let missing_vars: Vec<&str> = required_vars
            .iter()
            .copied()
            .filter(|var| std::env::var(var).map(|v| v.is_empty()).unwrap_or(true))
            .collect();

        if !missing_vars.is_empty() {
            anyhow::bail!(
                "Missing environment variables: {}\n\
                 \n\
                 💡 Solutions:\n\
                 1. Create a .env file next to the binary:\n\
                    EMAIL_USER=you@gmail.com\n\
                    EMAIL_PASS=app-password\n\
                    TELEGRAM_TOKEN=123456:ABC...\n\
                 \n\
                 2. Or export them manually before running codewatch",
                missing_vars.join(", ")
            );
        }

        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Debug,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{}='{}' is invalid, using default {:?}", key, raw, default);
            default
        }),
        None => default,
    }
}

// '|' separates entries because link texts may contain commas.
fn split_link_texts(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
