//! Twilio carrier API: SMS and voice calls.
//!
//! Both endpoints answer `201 Created` on success. Any other status is a
//! failure; Twilio's JSON error body carries a `message` field we surface.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{info, warn};

use super::{mask_phone, SendFailure, SendOutcome, SEND_TIMEOUT};
use crate::config::TwilioCredentials;

const TWILIO_API_URL: &str = "https://api.twilio.com";

pub const CREDENTIALS_MISSING: &str = "Twilio credentials not configured properly";

/// Spoken when `/call` is given no message.
pub const DEFAULT_CALL_MESSAGE: &str = "Hello! This is a call from Jarvis Bot.";

#[derive(Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    credentials: TwilioCredentials,
    base_url: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct CreatedResource {
    sid: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl TwilioClient {
    pub fn new(http: reqwest::Client, credentials: TwilioCredentials) -> Self {
        Self {
            http,
            credentials,
            base_url: TWILIO_API_URL.to_string(),
            timeout: SEND_TIMEOUT,
        }
    }

    /// Overrides the API host (for testing with wiremock).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.complete().is_some()
    }

    pub async fn send_sms(&self, phone: &str, body: &str) -> SendOutcome {
        info!("📤 Twilio: sending SMS to {}", mask_phone(phone));
        self.create("Messages.json", &[("To", phone), ("Body", body)])
            .await
    }

    /// Start a voice call that reads `message` aloud.
    pub async fn place_call(&self, phone: &str, message: Option<&str>) -> SendOutcome {
        info!("📞 Twilio: calling {}", mask_phone(phone));
        let twiml = build_twiml(message.unwrap_or(DEFAULT_CALL_MESSAGE));
        self.create("Calls.json", &[("To", phone), ("Twiml", twiml.as_str())])
            .await
    }

    async fn create(&self, resource: &str, fields: &[(&str, &str)]) -> SendOutcome {
        let Some((sid, token, from)) = self.credentials.complete() else {
            warn!("Twilio request skipped: credentials missing");
            return SendOutcome::failed(SendFailure::Configuration(CREDENTIALS_MISSING.to_string()));
        };

        let url = format!("{}/2010-04-01/Accounts/{}/{}", self.base_url, sid, resource);
        let mut form: Vec<(&str, &str)> = fields.to_vec();
        form.push(("From", from));

        let response = match self
            .http
            .post(&url)
            .basic_auth(sid, Some(token))
            .timeout(self.timeout)
            .form(&form)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("Twilio request failed: {e}");
                return SendOutcome::failed(SendFailure::from_reqwest(&e));
            }
        };

        let status = response.status();
        if status == StatusCode::CREATED {
            let sid = match response.json::<CreatedResource>().await {
                Ok(created) => created.sid,
                Err(e) => {
                    warn!("Twilio accepted the request but the body was unreadable: {e}");
                    None
                }
            };
            info!("Twilio created {resource} resource {:?}", sid);
            return SendOutcome::delivered(sid, None);
        }

        let text = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        warn!("Twilio rejected request ({status}): {reason}");
        SendOutcome::failed(SendFailure::Rejected(reason))
    }
}

/// Escape text for inclusion in XML element content.
fn xml_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

/// TwiML document that speaks `message` once.
pub fn build_twiml(message: &str) -> String {
    format!(
        r#"<Response><Say voice="alice">{}</Say></Response>"#,
        xml_escape(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{basic_auth, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> TwilioCredentials {
        TwilioCredentials {
            account_sid: Some("AC123".into()),
            auth_token: Some("secret".into()),
            phone_number: Some("+15550000000".into()),
        }
    }

    fn client(server: &MockServer) -> TwilioClient {
        TwilioClient::new(reqwest::Client::new(), credentials()).with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let partial = TwilioCredentials {
            auth_token: None,
            ..credentials()
        };
        let client =
            TwilioClient::new(reqwest::Client::new(), partial).with_base_url(server.uri());

        let outcome = client.send_sms("+15551234567", "Hello").await;
        assert_eq!(
            outcome.failure,
            Some(SendFailure::Configuration(CREDENTIALS_MISSING.into()))
        );
        assert!(outcome.error_text().unwrap().contains("credentials not configured properly"));

        let outcome = client.place_call("+15551234567", None).await;
        assert!(matches!(outcome.failure, Some(SendFailure::Configuration(_))));
    }

    #[tokio::test]
    async fn test_blank_credentials_fail_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let blank = TwilioCredentials {
            account_sid: Some(String::new()),
            phone_number: Some("   ".into()),
            ..credentials()
        };
        let client = TwilioClient::new(reqwest::Client::new(), blank).with_base_url(server.uri());
        assert!(!client.is_configured());

        let outcome = client.send_sms("+15551234567", "Hello").await;
        assert_eq!(
            outcome.failure,
            Some(SendFailure::Configuration(CREDENTIALS_MISSING.into()))
        );
        let outcome = client.place_call("+15551234567", Some("hi")).await;
        assert!(matches!(outcome.failure, Some(SendFailure::Configuration(_))));
    }

    #[tokio::test]
    async fn test_sms_created() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(basic_auth("AC123", "secret"))
            .and(body_string_contains("From=%2B15550000000"))
            .and(body_string_contains("Body=Hello"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"sid": "SM42"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server).send_sms("+15551234567", "Hello").await;
        assert!(outcome.success());
        assert_eq!(outcome.message_id.as_deref(), Some("SM42"));
    }

    #[tokio::test]
    async fn test_200_is_not_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"sid": "SM42"})),
            )
            .mount(&server)
            .await;

        let outcome = client(&server).send_sms("+15551234567", "Hello").await;
        assert!(!outcome.success());
        assert_eq!(outcome.error_text().as_deref(), Some("HTTP 200"));
    }

    #[tokio::test]
    async fn test_error_body_message_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 21211,
                "message": "The 'To' number is not a valid phone number."
            })))
            .mount(&server)
            .await;

        let outcome = client(&server).send_sms("+1", "Hello").await;
        assert_eq!(
            outcome.failure,
            Some(SendFailure::Rejected(
                "The 'To' number is not a valid phone number.".into()
            ))
        );
    }

    #[tokio::test]
    async fn test_unparseable_error_body_falls_back_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let outcome = client(&server).send_sms("+15551234567", "Hello").await;
        assert_eq!(outcome.error_text().as_deref(), Some("HTTP 500"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let outcome = client(&server)
            .with_timeout(Duration::from_millis(200))
            .send_sms("+15551234567", "Hello")
            .await;
        assert_eq!(outcome.failure, Some(SendFailure::Timeout));
    }

    #[tokio::test]
    async fn test_call_posts_escaped_twiml() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Calls.json"))
            .and(body_string_contains("Twiml="))
            .and(body_string_contains("%26lt%3B"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"sid": "CA7"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server)
            .place_call("+15551234567", Some("<Hangup/>"))
            .await;
        assert_eq!(outcome.message_id.as_deref(), Some("CA7"));
    }

    #[test]
    fn test_twiml_escapes_markup() {
        assert_eq!(
            build_twiml(r#"Tom & "Jerry" <Play>x</Play>"#),
            r#"<Response><Say voice="alice">Tom &amp; &quot;Jerry&quot; &lt;Play&gt;x&lt;/Play&gt;</Say></Response>"#
        );
    }

    #[test]
    fn test_twiml_default_message() {
        assert!(build_twiml(DEFAULT_CALL_MESSAGE).contains("Jarvis Bot"));
    }
}
