//! SMS providers behind one `send(phone, body)` surface.
//!
//! The provider set is closed: Textbelt and Twilio. Every failure a provider
//! can hit, including transport errors and timeouts, comes back as a
//! [`SendOutcome`].

pub mod textbelt;
pub mod twilio;

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use crate::config::Config;

pub use textbelt::TextbeltClient;
pub use twilio::TwilioClient;

/// Per-request timeout for SMS and voice providers.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Which backend an outbound message goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Textbelt,
    Twilio,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Textbelt, ProviderKind::Twilio];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Textbelt => "textbelt",
            ProviderKind::Twilio => "twilio",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Textbelt => "Textbelt",
            ProviderKind::Twilio => "Twilio",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| UnknownProvider { name: s.to_string() })
    }
}

/// A provider name that does not match any known backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider {
    pub name: String,
}

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let choices: Vec<&str> = ProviderKind::ALL.iter().map(|k| k.as_str()).collect();
        write!(
            f,
            "unknown SMS provider '{}'. Valid choices: {}",
            self.name,
            choices.join(", ")
        )
    }
}

impl std::error::Error for UnknownProvider {}

/// One `/sms` invocation, resolved to a concrete provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub recipient: String,
    pub body: String,
    pub provider: ProviderKind,
}

/// Why a send did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    /// Missing or invalid credentials. No request was made.
    Configuration(String),
    /// The provider did not answer within [`SEND_TIMEOUT`].
    Timeout,
    /// Connection failure or unexpected HTTP status.
    Transport(String),
    /// The provider understood the request and declined it.
    Rejected(String),
}

impl fmt::Display for SendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendFailure::Configuration(msg) => write!(f, "{msg}"),
            SendFailure::Timeout => write!(
                f,
                "request timed out after {}s, please try again later",
                SEND_TIMEOUT.as_secs()
            ),
            SendFailure::Transport(msg) => write!(f, "failed to reach provider: {msg}"),
            SendFailure::Rejected(msg) => write!(f, "{msg}"),
        }
    }
}

impl SendFailure {
    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            SendFailure::Timeout
        } else {
            SendFailure::Transport(err.to_string())
        }
    }
}

/// Normalized result of an outbound send, independent of the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOutcome {
    pub message_id: Option<String>,
    pub quota_remaining: Option<i64>,
    pub failure: Option<SendFailure>,
}

impl SendOutcome {
    pub fn delivered(message_id: Option<String>, quota_remaining: Option<i64>) -> Self {
        Self {
            message_id,
            quota_remaining,
            failure: None,
        }
    }

    pub fn failed(failure: SendFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    /// Human-readable failure reason, if any.
    pub fn error_text(&self) -> Option<String> {
        self.failure.as_ref().map(|f| f.to_string())
    }
}

/// A concrete SMS backend.
#[derive(Clone)]
pub enum SmsProvider {
    Textbelt(TextbeltClient),
    Twilio(TwilioClient),
}

impl SmsProvider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            SmsProvider::Textbelt(_) => ProviderKind::Textbelt,
            SmsProvider::Twilio(_) => ProviderKind::Twilio,
        }
    }

    pub async fn send(&self, phone: &str, body: &str) -> SendOutcome {
        match self {
            SmsProvider::Textbelt(client) => client.send(phone, body).await,
            SmsProvider::Twilio(client) => client.send_sms(phone, body).await,
        }
    }
}

/// Builds providers by name.
#[derive(Clone)]
pub struct SmsGateway {
    textbelt: TextbeltClient,
    twilio: TwilioClient,
    default_kind: ProviderKind,
}

impl SmsGateway {
    pub fn new(textbelt: TextbeltClient, twilio: TwilioClient, default_kind: ProviderKind) -> Self {
        Self {
            textbelt,
            twilio,
            default_kind,
        }
    }

    pub fn from_config(config: &Config, http: reqwest::Client) -> Self {
        Self::new(
            TextbeltClient::new(http.clone(), config.textbelt_url.clone(), config.textbelt_key.clone()),
            TwilioClient::new(http, config.twilio.clone()),
            config.default_provider,
        )
    }

    pub fn textbelt(&self) -> &TextbeltClient {
        &self.textbelt
    }

    pub fn twilio(&self) -> &TwilioClient {
        &self.twilio
    }

    pub fn default_kind(&self) -> ProviderKind {
        self.default_kind
    }

    /// Resolve a provider name (case-insensitive).
    pub fn provider(&self, name: &str) -> Result<SmsProvider, UnknownProvider> {
        let kind = name.parse::<ProviderKind>()?;
        Ok(self.get(kind))
    }

    pub fn get(&self, kind: ProviderKind) -> SmsProvider {
        match kind {
            ProviderKind::Textbelt => SmsProvider::Textbelt(self.textbelt.clone()),
            ProviderKind::Twilio => SmsProvider::Twilio(self.twilio.clone()),
        }
    }

    pub async fn send(&self, message: &OutboundMessage) -> SendOutcome {
        self.get(message.provider)
            .send(&message.recipient, &message.body)
            .await
    }
}

/// Mask a phone number for logs: keep the first four characters.
pub fn mask_phone(phone: &str) -> String {
    let prefix: String = phone.chars().take(4).collect();
    format!("{prefix}****")
}

static PHONE_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d\-]{5,}").expect("phone pattern is valid"));

/// Masks every phone-number-like run (six or more digits, optional leading
/// `+`, dashes allowed) anywhere in `text`.
pub fn mask_phones_in(text: &str) -> String {
    PHONE_LIKE
        .replace_all(text, |caps: &regex::Captures<'_>| mask_phone(&caps[0]))
        .into_owned()
}
