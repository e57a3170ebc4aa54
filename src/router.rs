//! Routes commands and free text to the integrations and formats replies.
//!
//! Every path ends in a reply string. Log and preference write failures are
//! reported through `tracing` and never change what the user sees.

use std::sync::LazyLock;

use regex::Regex;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::activity_log::{ActivityLog, RequestLogEntry, SuggestionLogEntry, UsageStats};
use crate::ai::AiResponder;
use crate::commands::Command;
use crate::config::Config;
use crate::intent::{classify, Intent};
use crate::preferences::{self, PreferenceStore, DEFAULT_LANGUAGE, SUPPORTED_LANGUAGES};
use crate::sms::{mask_phone, OutboundMessage, SendOutcome, SmsGateway};
use crate::translate::Translator;

/// Phrases that suggest the AI could not fully answer.
static HEDGING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:don|can)['’]t\b").expect("hedging pattern is valid"));

pub const HELP_TEXT: &str = "🤖 Jarvis Bot commands

/start - welcome message
/help - this command reference
/health - which integrations are configured

📱 Messaging
/sms <phone> <message> [--provider textbelt|twilio]
    Send an SMS. Example: /sms +1234567890 Hello World
/call <phone> [message]
    Start a voice call that reads your message aloud.
    The number must start with +, e.g. /call +1234567890 Dinner is ready

🌐 Language
/setlang - list supported languages
/setlang <code> - set your language, e.g. /setlang es

🧠 AI
/ai <question> - ask anything
Or just type a message and I'll do my best to help.

📊 /stats - usage statistics";

const WELCOME_TEXT: &str = "Welcome to Jarvis Bot!

I can send SMS messages, start voice calls and answer your questions.

Commands:
/sms <number> <message>
/call <number> [message]
/setlang [code]
/ai <question>
/help - all commands";

/// A text message as seen by the router.
#[derive(Debug, Clone)]
pub struct IncomingText {
    pub user_id: i64,
    pub username: String,
    pub text: String,
}

pub struct CommandRouter<P> {
    sms: SmsGateway,
    ai: AiResponder,
    translator: Translator,
    preferences: Mutex<P>,
    activity: ActivityLog,
}

impl<P: PreferenceStore> CommandRouter<P> {
    pub fn new(
        sms: SmsGateway,
        ai: AiResponder,
        translator: Translator,
        preferences: P,
        activity: ActivityLog,
    ) -> Self {
        Self {
            sms,
            ai,
            translator,
            preferences: Mutex::new(preferences),
            activity,
        }
    }

    pub fn from_config(config: &Config, preferences: P) -> Self {
        let http = reqwest::Client::new();
        Self::new(
            SmsGateway::from_config(config, http.clone()),
            AiResponder::from_config(config, http.clone()),
            Translator::new(http, config.translate_url.clone()),
            preferences,
            ActivityLog::new(config.request_log_path(), config.suggestion_log_path()),
        )
    }

    pub async fn handle(&self, msg: &IncomingText) -> String {
        match Command::parse(&msg.text) {
            None => self.handle_free_text(msg).await,
            Some(Err(usage)) => usage.to_string(),
            Some(Ok(command)) => self.run(command, msg).await,
        }
    }

    async fn run(&self, command: Command, msg: &IncomingText) -> String {
        match command {
            Command::Start => {
                let lang = self.language_of(msg.user_id).await;
                self.translator.translate(WELCOME_TEXT, &lang).await
            }
            Command::Help => HELP_TEXT.to_string(),
            Command::Health => self.health_report(),
            Command::Sms {
                recipient,
                body,
                provider,
            } => self.send_sms(recipient, body, provider.as_deref()).await,
            Command::Call { phone, message } => self.place_call(&phone, message.as_deref()).await,
            Command::SetLang(None) => self.list_languages(msg.user_id).await,
            Command::SetLang(Some(code)) => self.set_language(msg.user_id, &code).await,
            Command::Ai(question) => {
                let response = self.ai.get_response(&question).await;
                self.record(msg, &question, classify(&question), &response, true);
                response
            }
            Command::Stats => format_stats(&self.activity.stats()),
        }
    }

    async fn handle_free_text(&self, msg: &IncomingText) -> String {
        let intent = classify(&msg.text);
        info!("💬 {} ({}): intent {intent}", msg.username, msg.user_id);

        let (response, from_ai) = if intent.has_canned_reply() {
            (canned_reply(intent).to_string(), false)
        } else {
            (self.ai.get_response(&msg.text).await, true)
        };

        self.record(msg, &msg.text, intent, &response, from_ai);
        response
    }

    /// Log the exchange. Failures are logged and otherwise ignored.
    fn record(&self, msg: &IncomingText, question: &str, intent: Intent, response: &str, from_ai: bool) {
        let timestamp = chrono::Utc::now().to_rfc3339();

        let entry = RequestLogEntry {
            timestamp: timestamp.clone(),
            user_id: msg.user_id.to_string(),
            username: msg.username.clone(),
            message: question.to_string(),
            detected_intent: intent.as_str().to_string(),
            response: response.to_string(),
        };
        if let Err(e) = self.activity.append_request(entry) {
            warn!("Failed to write request log: {e}");
        }

        if from_ai && is_hedging(response) {
            let entry = SuggestionLogEntry {
                timestamp,
                user_id: msg.user_id.to_string(),
                message: question.to_string(),
                suggestion: format!("Consider adding direct support for: {question}"),
            };
            if let Err(e) = self.activity.append_suggestion(entry) {
                warn!("Failed to write suggestion log: {e}");
            }
        }
    }

    async fn send_sms(&self, recipient: String, body: String, provider: Option<&str>) -> String {
        let kind = match provider {
            Some(name) => match self.sms.provider(name) {
                Ok(provider) => provider.kind(),
                Err(e) => return format!("❌ {e}"),
            },
            None => self.sms.default_kind(),
        };

        let outbound = OutboundMessage {
            recipient,
            body,
            provider: kind,
        };
        info!(
            "SMS to {} via {}",
            mask_phone(&outbound.recipient),
            kind.display_name()
        );
        let outcome = self.sms.send(&outbound).await;

        match outcome.failure {
            None => {
                let mut reply = format!("✅ SMS sent successfully via {}!", kind.display_name());
                append_details(&mut reply, &outcome);
                reply
            }
            Some(failure) => format!("❌ Failed to send SMS via {}: {failure}", kind.display_name()),
        }
    }

    async fn place_call(&self, phone: &str, message: Option<&str>) -> String {
        let outcome = self.sms.twilio().place_call(phone, message).await;
        match outcome.failure {
            None => {
                let mut reply = format!("📞 Call to {phone} started!");
                if let Some(ref id) = outcome.message_id {
                    reply.push_str(&format!("\n🆔 Call ID: {id}"));
                }
                reply
            }
            Some(failure) => format!("❌ Failed to start call: {failure}"),
        }
    }

    async fn language_of(&self, user_id: i64) -> String {
        self.preferences
            .lock()
            .await
            .language(&user_id.to_string())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
    }

    async fn list_languages(&self, user_id: i64) -> String {
        let current = self.language_of(user_id).await;
        let mut reply = String::from("🌐 Supported languages:\n");
        for (code, name) in SUPPORTED_LANGUAGES {
            reply.push_str(&format!("{code} - {name}\n"));
        }
        reply.push_str(&format!(
            "\nYour current language: {current}\nUsage: /setlang <code>"
        ));
        reply
    }

    async fn set_language(&self, user_id: i64, code: &str) -> String {
        let Some(name) = preferences::language_name(code) else {
            return format!(
                "❌ Invalid language code '{code}'. Send /setlang to see the supported codes."
            );
        };

        {
            let mut store = self.preferences.lock().await;
            if let Err(e) = store.set_language(&user_id.to_string(), code) {
                warn!("Failed to persist language preference: {e}");
            }
        }
        info!("🌐 User {user_id} language set to {code}");

        let confirmation = format!("✅ Language set to {name} ({code}).");
        self.translator.translate(&confirmation, code).await
    }

    fn health_report(&self) -> String {
        let textbelt = self.sms.textbelt();
        let lines = [
            (true, "Telegram bot".to_string()),
            (
                true,
                if textbelt.uses_demo_key() {
                    "Textbelt SMS (demo key, 1 free SMS per day)".to_string()
                } else {
                    "Textbelt SMS".to_string()
                },
            ),
            (self.sms.twilio().is_configured(), "Twilio SMS and voice calls".to_string()),
            (self.ai.has_primary(), "OpenAI (primary AI)".to_string()),
            (self.ai.has_secondary(), "OpenRouter (backup AI)".to_string()),
            (self.translator.is_configured(), "Translation".to_string()),
        ];

        let mut reply = String::from("🩺 Health check\n");
        for (ok, label) in lines {
            let mark = if ok { "✅" } else { "❌" };
            reply.push_str(&format!("\n{mark} {label}"));
        }
        reply.push_str(&format!(
            "\n\nDefault SMS provider: {}",
            self.sms.default_kind().display_name()
        ));
        reply
    }
}

fn append_details(reply: &mut String, outcome: &SendOutcome) {
    if let Some(ref id) = outcome.message_id {
        reply.push_str(&format!("\n🆔 Message ID: {id}"));
    }
    if let Some(quota) = outcome.quota_remaining {
        reply.push_str(&format!("\n📊 Quota remaining: {quota}"));
    }
}

fn canned_reply(intent: Intent) -> &'static str {
    match intent {
        Intent::Sms => {
            "📱 To send an SMS, use:\n/sms <phone_number> <message>\nExample: /sms +1234567890 Hello World"
        }
        Intent::Call => {
            "📞 To start a voice call, use:\n/call <phone_number> [message]\nExample: /call +1234567890 Dinner is ready"
        }
        Intent::SetLang => "🌐 To change your language, use /setlang <code>. Send /setlang to see all codes.",
        _ => "👋 Hi! I'm Jarvis. Send /help to see everything I can do.",
    }
}

pub fn is_hedging(response: &str) -> bool {
    HEDGING.is_match(response)
}

pub fn format_stats(stats: &UsageStats) -> String {
    let mut reply = format!(
        "📊 Bot statistics\n\nTotal requests: {}\nSuggestions logged: {}",
        stats.total_requests, stats.total_suggestions
    );
    if !stats.by_intent.is_empty() {
        reply.push_str("\n\nRequests by intent:");
        for (intent, count) in &stats.by_intent {
            reply.push_str(&format!("\n• {intent}: {count}"));
        }
    }
    reply
}
