//! Textbelt free-tier text gateway.

use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use super::{mask_phone, SendFailure, SendOutcome, SEND_TIMEOUT};

#[derive(Clone)]
pub struct TextbeltClient {
    http: reqwest::Client,
    url: String,
    key: String,
    timeout: Duration,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TextbeltResponse {
    success: bool,
    error: Option<String>,
    quota_remaining: Option<i64>,
    /// Usually a string, but older deployments answer with a number.
    text_id: Option<serde_json::Value>,
}

impl TextbeltClient {
    pub fn new(http: reqwest::Client, url: String, key: String) -> Self {
        Self {
            http,
            url,
            key,
            timeout: SEND_TIMEOUT,
        }
    }

    pub fn uses_demo_key(&self) -> bool {
        self.key == crate::config::TEXTBELT_DEMO_KEY
    }

    #[cfg(test)]
    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn send(&self, phone: &str, message: &str) -> SendOutcome {
        info!("📤 Textbelt: sending SMS to {}", mask_phone(phone));

        let response = match self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .form(&[("phone", phone), ("message", message), ("key", self.key.as_str())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("Textbelt request failed: {e}");
                return SendOutcome::failed(SendFailure::from_reqwest(&e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Textbelt returned HTTP {status}");
            return SendOutcome::failed(SendFailure::Transport(format!("HTTP {status}")));
        }

        let body: TextbeltResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!("Textbelt response unreadable: {e}");
                return SendOutcome::failed(SendFailure::from_reqwest(&e));
            }
        };
        info!("Textbelt response: {:?}", body);

        if !body.success {
            let reason = body.error.unwrap_or_else(|| "Unknown error".to_string());
            warn!("Textbelt rejected SMS: {reason}");
            return SendOutcome::failed(SendFailure::Rejected(reason));
        }

        let message_id = body.text_id.and_then(|id| match id {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        SendOutcome::delivered(message_id, body.quota_remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> TextbeltClient {
        TextbeltClient::new(
            reqwest::Client::new(),
            format!("{}/text", server.uri()),
            "test-key".into(),
        )
    }

    #[tokio::test]
    async fn test_success_carries_quota_and_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/text"))
            .and(body_string_contains("key=test-key"))
            .and(body_string_contains("phone=%2B15551234567"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "quotaRemaining": 39,
                "textId": "12345"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server).send("+15551234567", "Hello").await;
        assert!(outcome.success());
        assert_eq!(outcome.message_id.as_deref(), Some("12345"));
        assert_eq!(outcome.quota_remaining, Some(39));
    }

    #[tokio::test]
    async fn test_numeric_text_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "textId": 777
            })))
            .mount(&server)
            .await;

        let outcome = client(&server).send("+15551234567", "Hello").await;
        assert_eq!(outcome.message_id.as_deref(), Some("777"));
        assert_eq!(outcome.quota_remaining, None);
    }

    #[tokio::test]
    async fn test_rejection_surfaces_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "error": "Out of quota"
            })))
            .mount(&server)
            .await;

        let outcome = client(&server).send("+15551234567", "Hello").await;
        assert_eq!(
            outcome.failure,
            Some(SendFailure::Rejected("Out of quota".into()))
        );
    }

    #[tokio::test]
    async fn test_rejection_without_error_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false
            })))
            .mount(&server)
            .await;

        let outcome = client(&server).send("+15551234567", "Hello").await;
        assert_eq!(outcome.error_text().as_deref(), Some("Unknown error"));
    }

    #[tokio::test]
    async fn test_non_2xx_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let outcome = client(&server).send("+15551234567", "Hello").await;
        match outcome.failure {
            Some(SendFailure::Transport(text)) => assert!(text.contains("503")),
            other => panic!("expected transport failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_reported_as_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let outcome = client(&server)
            .with_timeout(Duration::from_millis(200))
            .send("+15551234567", "Hello")
            .await;
        assert_eq!(outcome.failure, Some(SendFailure::Timeout));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_failure() {
        let client = TextbeltClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/text".into(),
            "k".into(),
        );
        let outcome = client.send("+15551234567", "Hello").await;
        assert!(matches!(outcome.failure, Some(SendFailure::Transport(_))));
    }
}
