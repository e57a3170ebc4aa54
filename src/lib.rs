//! Jarvis Bot: a Telegram bot that sends SMS, starts voice calls and answers
//! questions with an AI fallback.

pub mod activity_log;
pub mod ai;
pub mod commands;
pub mod config;
pub mod intent;
pub mod persist;
pub mod preferences;
pub mod router;
pub mod sms;
pub mod telegram_log;
pub mod translate;

pub use config::Config;
pub use router::{CommandRouter, IncomingText};
