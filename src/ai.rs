//! AI question answering with a provider fallback chain.
//!
//! OpenAI first, OpenRouter second, then a static summary of the bot's
//! commands. Each step runs at most once per question.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const AI_TIMEOUT: Duration = Duration::from_secs(10);

pub const SYSTEM_PROMPT: &str = "You are Jarvis, a helpful assistant living inside a Telegram bot. \
Besides answering questions, the bot can send SMS messages (/sms), start voice calls (/call), \
change the reply language (/setlang), answer questions (/ai) and show usage statistics (/stats). \
When a user asks for one of those actions, tell them which command to use. \
Keep answers short and friendly.";

/// Returned when no AI provider is configured or all of them failed.
pub const FALLBACK_RESPONSE: &str = "🤖 I can't reach my AI brain right now, but here is what I can do:

/sms <phone> <message> [--provider textbelt|twilio] - send an SMS
/call <phone> [message] - start a voice call
/setlang [code] - choose your language
/ai <question> - ask me anything
/stats - usage statistics
/help - full command reference";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug)]
pub enum Error {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Api(e) => write!(f, "API error: {e}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for Error {}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct CompletionClient {
    name: &'static str,
    api_key: String,
    url: String,
    model: String,
    http: reqwest::Client,
}

impl CompletionClient {
    pub fn openai(http: reqwest::Client, api_key: String) -> Self {
        Self {
            name: "OpenAI",
            api_key,
            url: OPENAI_URL.to_string(),
            model: "gpt-3.5-turbo".to_string(),
            http,
        }
    }

    pub fn openrouter(http: reqwest::Client, api_key: String) -> Self {
        Self {
            name: "OpenRouter",
            api_key,
            url: OPENROUTER_URL.to_string(),
            model: "openai/gpt-3.5-turbo".to_string(),
            http,
        }
    }

    /// Overrides the endpoint (for testing with wiremock).
    pub fn with_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn complete(&self, messages: &[(Role, &str)], max_tokens: u32) -> Result<String, Error> {
        let request = ApiRequest {
            model: &self.model,
            max_tokens,
            messages: messages
                .iter()
                .map(|(role, content)| ApiMessage {
                    role: role.as_str(),
                    content: *content,
                })
                .collect(),
        };

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .timeout(AI_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        // Only a plain 200 counts as an answer
        if response.status() != reqwest::StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(Error::Empty)
    }
}

/// Answers free-form questions; never fails.
#[derive(Clone)]
pub struct AiResponder {
    primary: Option<CompletionClient>,
    secondary: Option<CompletionClient>,
}

impl AiResponder {
    pub fn new(primary: Option<CompletionClient>, secondary: Option<CompletionClient>) -> Self {
        Self { primary, secondary }
    }

    pub fn from_config(config: &Config, http: reqwest::Client) -> Self {
        Self::new(
            config
                .openai_api_key
                .clone()
                .map(|key| CompletionClient::openai(http.clone(), key)),
            config
                .openrouter_api_key
                .clone()
                .map(|key| CompletionClient::openrouter(http, key)),
        )
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    pub async fn get_response(&self, question: &str) -> String {
        let messages = [(Role::System, SYSTEM_PROMPT), (Role::User, question)];

        for client in [&self.primary, &self.secondary].into_iter().flatten() {
            match client.complete(&messages, 500).await {
                Ok(answer) => {
                    info!("🤖 {} answered ({} chars)", client.name(), answer.len());
                    return answer;
                }
                Err(e) => warn!("{} failed: {e}", client.name()),
            }
        }

        info!("No AI provider answered, using static fallback");
        FALLBACK_RESPONSE.to_string()
    }
}
