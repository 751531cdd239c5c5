// Library exports for codewatch crate
// This allows tests and the binary to use the modules

pub mod bot;
pub mod config;
pub mod conversation;
pub mod email;
pub mod error;
pub mod http_server;
pub mod imap_client;
pub mod locale;
pub mod telegram_notifier;

// Access-code and household-update extraction
pub mod notice;
