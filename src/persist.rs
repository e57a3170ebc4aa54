//! Whole-file JSON persistence shared by the preference store and the logs.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A state file could not be written.
#[derive(Debug)]
pub enum PersistenceError {
    Serialize(serde_json::Error),
    Write { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialize(e) => write!(f, "failed to serialize: {e}"),
            Self::Write { path, source } => {
                write!(f, "failed to write '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialize(e) => Some(e),
            Self::Write { source, .. } => Some(source),
        }
    }
}

/// Read a JSON file, treating a missing or corrupt file as `T::default()`.
pub fn load_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            warn!("Failed to read {:?}, starting empty: {e}", path);
            return T::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!("Corrupt JSON in {:?}, starting empty: {e}", path);
            T::default()
        }
    }
}

/// Rewrite a file with pretty-printed JSON. Non-ASCII text is kept as is.
pub fn save_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let json = serde_json::to_string_pretty(value).map_err(PersistenceError::Serialize)?;
    std::fs::write(path, json).map_err(|e| PersistenceError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}
