use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use teloxide::types::ChatId;

use crate::sms::ProviderKind;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

/// Textbelt's public demo key (one free message per day).
pub const TEXTBELT_DEMO_KEY: &str = "textbelt";
pub const TEXTBELT_URL: &str = "https://textbelt.com/text";

/// On-disk config. Every field is optional; environment variables win.
#[derive(Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    telegram_bot_token: Option<String>,
    textbelt_key: Option<String>,
    textbelt_url: Option<String>,
    twilio_account_sid: Option<String>,
    twilio_auth_token: Option<String>,
    twilio_phone_number: Option<String>,
    openai_api_key: Option<String>,
    openrouter_api_key: Option<String>,
    /// LibreTranslate-compatible endpoint, e.g. "https://libretranslate.com/translate".
    translate_url: Option<String>,
    /// Provider used by /sms when no --provider flag is given.
    sms_provider: Option<String>,
    /// Directory for state files (logs, preferences). Defaults to current directory.
    data_dir: Option<String>,
    log_chat_id: Option<i64>,
}

/// Twilio account credentials. All three are needed for any Twilio call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TwilioCredentials {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub phone_number: Option<String>,
}

impl TwilioCredentials {
    /// Returns `(sid, token, from)` only when every credential is present and
    /// non-blank.
    pub fn complete(&self) -> Option<(&str, &str, &str)> {
        fn filled(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.trim().is_empty())
        }
        Some((
            filled(&self.account_sid)?,
            filled(&self.auth_token)?,
            filled(&self.phone_number)?,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub textbelt_key: String,
    pub textbelt_url: String,
    pub twilio: TwilioCredentials,
    pub openai_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub translate_url: Option<String>,
    pub default_provider: ProviderKind,
    /// Directory for state files (logs, preferences).
    pub data_dir: PathBuf,
    pub log_chat_id: Option<ChatId>,
}

impl Config {
    /// Load config from an optional JSON file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => read_file(path)?,
            None => ConfigFile::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    fn resolve<F>(file: ConfigFile, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset, so `FOO=` in a shell disables a feature
        let pick = |key: &str, fallback: Option<String>| {
            env(key)
                .or(fallback)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_bot_token = pick("TELEGRAM_BOT_TOKEN", file.telegram_bot_token)
            .ok_or_else(|| ConfigError::Validation("telegram_bot_token is required".into()))?;
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }

        let default_provider = match pick("SMS_PROVIDER", file.sms_provider) {
            Some(name) => name
                .parse::<ProviderKind>()
                .map_err(|e| ConfigError::Validation(e.to_string()))?,
            None => ProviderKind::Textbelt,
        };

        let log_chat_id = match env("LOG_CHAT_ID").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(raw.trim().parse::<i64>().map_err(|_| {
                ConfigError::Validation(format!("LOG_CHAT_ID must be a numeric chat id, got '{raw}'"))
            })?),
            None => file.log_chat_id,
        };

        Ok(Self {
            telegram_bot_token,
            textbelt_key: pick("TEXTBELT_KEY", file.textbelt_key)
                .unwrap_or_else(|| TEXTBELT_DEMO_KEY.to_string()),
            textbelt_url: pick("TEXTBELT_URL", file.textbelt_url)
                .unwrap_or_else(|| TEXTBELT_URL.to_string()),
            twilio: TwilioCredentials {
                account_sid: pick("TWILIO_ACCOUNT_SID", file.twilio_account_sid),
                auth_token: pick("TWILIO_AUTH_TOKEN", file.twilio_auth_token),
                phone_number: pick("TWILIO_PHONE_NUMBER", file.twilio_phone_number),
            },
            openai_api_key: pick("OPENAI_API_KEY", file.openai_api_key),
            openrouter_api_key: pick("OPENROUTER_API_KEY", file.openrouter_api_key),
            translate_url: pick("TRANSLATE_URL", file.translate_url),
            default_provider,
            data_dir: pick("JARVIS_DATA_DIR", file.data_dir)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            log_chat_id: log_chat_id.map(ChatId),
        })
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join("user_languages.json")
    }

    pub fn request_log_path(&self) -> PathBuf {
        self.data_dir.join("requests_log.json")
    }

    pub fn suggestion_log_path(&self) -> PathBuf {
        self.data_dir.join("suggestions_log.json")
    }
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadFile { path: path.to_path_buf(), source: e })?;
    serde_json::from_str(&content)
        .map_err(|e| ConfigError::ParseJson { path: path.to_path_buf(), source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TOKEN: &str = "123456789:ABCdefGHIjklMNOpqrsTUVwxyz";

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn resolve_with(file: ConfigFile, vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::resolve(file, |key| vars.get(key).cloned())
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_env_only_config() {
        let config = resolve_with(ConfigFile::default(), &[("TELEGRAM_BOT_TOKEN", TOKEN)])
            .expect("should load");
        assert_eq!(config.telegram_bot_token, TOKEN);
        assert_eq!(config.textbelt_key, TEXTBELT_DEMO_KEY);
        assert_eq!(config.textbelt_url, TEXTBELT_URL);
        assert_eq!(config.default_provider, ProviderKind::Textbelt);
        assert!(config.twilio.complete().is_none());
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.data_dir, PathBuf::from("."));
    }

    #[test]
    fn test_blank_twilio_credential_is_incomplete() {
        let full = TwilioCredentials {
            account_sid: Some("AC123".into()),
            auth_token: Some("secret".into()),
            phone_number: Some("+15550000000".into()),
        };
        assert_eq!(full.complete(), Some(("AC123", "secret", "+15550000000")));

        let blank_token = TwilioCredentials {
            auth_token: Some(" ".into()),
            ..full.clone()
        };
        assert!(blank_token.complete().is_none());
        let empty_sid = TwilioCredentials {
            account_sid: Some(String::new()),
            ..full
        };
        assert!(empty_sid.complete().is_none());
    }

    #[test]
    fn test_missing_token() {
        let err = assert_err(resolve_with(ConfigFile::default(), &[]));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let err = assert_err(resolve_with(
            ConfigFile::default(),
            &[("TELEGRAM_BOT_TOKEN", "invalid_token_no_colon")],
        ));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_empty_secret() {
        let err = assert_err(resolve_with(
            ConfigFile::default(),
            &[("TELEGRAM_BOT_TOKEN", "123456789:")],
        ));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_config(&format!(
            r#"{{
                "telegram_bot_token": "{TOKEN}",
                "openai_api_key": "from-file",
                "twilio_account_sid": "AC123",
                "twilio_auth_token": "secret",
                "twilio_phone_number": "+15550000000"
            }}"#
        ));
        let parsed = read_file(file.path()).unwrap();
        let config = resolve_with(parsed, &[("OPENAI_API_KEY", "from-env")]).unwrap();
        assert_eq!(config.openai_api_key.as_deref(), Some("from-env"));
        assert_eq!(
            config.twilio.complete(),
            Some(("AC123", "secret", "+15550000000"))
        );
    }

    #[test]
    fn test_empty_env_value_counts_as_unset() {
        let config = resolve_with(
            ConfigFile::default(),
            &[("TELEGRAM_BOT_TOKEN", TOKEN), ("OPENAI_API_KEY", "  ")],
        )
        .unwrap();
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn test_partial_twilio_credentials_are_incomplete() {
        let config = resolve_with(
            ConfigFile::default(),
            &[("TELEGRAM_BOT_TOKEN", TOKEN), ("TWILIO_ACCOUNT_SID", "AC123")],
        )
        .unwrap();
        assert!(config.twilio.complete().is_none());
    }

    #[test]
    fn test_provider_name_is_case_insensitive() {
        let config = resolve_with(
            ConfigFile::default(),
            &[("TELEGRAM_BOT_TOKEN", TOKEN), ("SMS_PROVIDER", "TWILIO")],
        )
        .unwrap();
        assert_eq!(config.default_provider, ProviderKind::Twilio);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = assert_err(resolve_with(
            ConfigFile::default(),
            &[("TELEGRAM_BOT_TOKEN", TOKEN), ("SMS_PROVIDER", "carrier-pigeon")],
        ));
        assert!(err.to_string().contains("textbelt"));
        assert!(err.to_string().contains("twilio"));
    }

    #[test]
    fn test_invalid_log_chat_id() {
        let err = assert_err(resolve_with(
            ConfigFile::default(),
            &[("TELEGRAM_BOT_TOKEN", TOKEN), ("LOG_CHAT_ID", "general")],
        ));
        assert!(err.to_string().contains("LOG_CHAT_ID"));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load(Some(Path::new("/nonexistent/path/config.json"))));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(Some(file.path())));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }

    #[test]
    fn test_state_paths_live_in_data_dir() {
        let config = resolve_with(
            ConfigFile::default(),
            &[("TELEGRAM_BOT_TOKEN", TOKEN), ("JARVIS_DATA_DIR", "/var/lib/jarvis")],
        )
        .unwrap();
        assert_eq!(
            config.request_log_path(),
            PathBuf::from("/var/lib/jarvis/requests_log.json")
        );
        assert_eq!(
            config.preferences_path(),
            PathBuf::from("/var/lib/jarvis/user_languages.json")
        );
    }
}
