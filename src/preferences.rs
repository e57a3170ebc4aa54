//! Per-user language preferences.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::persist::{self, PersistenceError};

/// Language codes accepted by `/setlang`, with display names.
pub const SUPPORTED_LANGUAGES: [(&str, &str); 20] = [
    ("en", "English"),
    ("es", "Español"),
    ("fr", "Français"),
    ("de", "Deutsch"),
    ("it", "Italiano"),
    ("pt", "Português"),
    ("ru", "Русский"),
    ("zh", "中文"),
    ("ja", "日本語"),
    ("ko", "한국어"),
    ("ar", "العربية"),
    ("hi", "हिन्दी"),
    ("bn", "বাংলা"),
    ("tr", "Türkçe"),
    ("nl", "Nederlands"),
    ("pl", "Polski"),
    ("uk", "Українська"),
    ("vi", "Tiếng Việt"),
    ("id", "Bahasa Indonesia"),
    ("sw", "Kiswahili"),
];

pub const DEFAULT_LANGUAGE: &str = "en";

pub fn is_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == code)
}

pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Storage for user → language code.
pub trait PreferenceStore: Send {
    fn language(&self, user_id: &str) -> Option<String>;

    /// Store a code. Callers validate against [`SUPPORTED_LANGUAGES`] first.
    fn set_language(&mut self, user_id: &str, code: &str) -> Result<(), PersistenceError>;
}

/// Preferences mirrored to a JSON object on disk.
///
/// Loaded once; the whole map is rewritten after every change. There is no
/// locking, so two processes sharing the file race.
pub struct JsonPreferenceStore {
    path: PathBuf,
    languages: HashMap<String, String>,
}

impl JsonPreferenceStore {
    pub fn load(path: &Path) -> Self {
        let languages: HashMap<String, String> = persist::load_or_default(path);
        info!("Loaded {} language preference(s) from {:?}", languages.len(), path);
        Self {
            path: path.to_path_buf(),
            languages,
        }
    }

    pub fn save(&self) -> Result<(), PersistenceError> {
        persist::save_pretty(&self.path, &self.languages)
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn language(&self, user_id: &str) -> Option<String> {
        self.languages.get(user_id).cloned()
    }

    fn set_language(&mut self, user_id: &str, code: &str) -> Result<(), PersistenceError> {
        self.languages.insert(user_id.to_string(), code.to_string());
        self.save()
    }
}

/// In-memory store, nothing touches disk.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    languages: HashMap<String, String>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn language(&self, user_id: &str) -> Option<String> {
        self.languages.get(user_id).cloned()
    }

    fn set_language(&mut self, user_id: &str, code: &str) -> Result<(), PersistenceError> {
        self.languages.insert(user_id.to_string(), code.to_string());
        Ok(())
    }
}
