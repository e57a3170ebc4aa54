//! UI string translation through a LibreTranslate-compatible endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::preferences::DEFAULT_LANGUAGE;

const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[derive(Clone)]
pub struct Translator {
    http: reqwest::Client,
    url: Option<String>,
}

impl Translator {
    pub fn new(http: reqwest::Client, url: Option<String>) -> Self {
        Self { http, url }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Translate English `text` into `target`. Any problem yields `text` unchanged.
    pub async fn translate(&self, text: &str, target: &str) -> String {
        let Some(url) = self.url.as_deref() else {
            return text.to_string();
        };
        if target == DEFAULT_LANGUAGE {
            return text.to_string();
        }

        match self.request(url, text, target).await {
            Ok(translated) => {
                debug!("Translated {} chars to {target}", text.len());
                translated
            }
            Err(e) => {
                warn!("Translation to {target} failed: {e}");
                text.to_string()
            }
        }
    }

    async fn request(&self, url: &str, text: &str, target: &str) -> Result<String, String> {
        let response = self
            .http
            .post(url)
            .timeout(TRANSLATE_TIMEOUT)
            .json(&TranslateRequest {
                q: text,
                source: DEFAULT_LANGUAGE,
                target,
                format: "text",
            })
            .send()
            .await
            .map_err(|e| format!("HTTP error: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API error {status}: {body}"));
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {e}"))?;
        Ok(parsed.translated_text)
    }
}
