//! Request and suggestion logs kept as JSON arrays on disk.
//!
//! Every append reads the whole array, pushes one entry and rewrites the file.
//! Two overlapping appends can drop one of the entries. There is no locking.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::persist::{self, PersistenceError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLogEntry {
    pub timestamp: String,
    pub user_id: String,
    pub username: String,
    pub message: String,
    pub detected_intent: String,
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionLogEntry {
    pub timestamp: String,
    pub user_id: String,
    pub message: String,
    pub suggestion: String,
}

/// Aggregates shown by `/stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageStats {
    pub total_requests: usize,
    pub total_suggestions: usize,
    /// Sorted by count descending; equal counts keep first-seen order.
    pub by_intent: Vec<(String, usize)>,
}

pub struct ActivityLog {
    requests_path: PathBuf,
    suggestions_path: PathBuf,
}

impl ActivityLog {
    pub fn new(requests_path: PathBuf, suggestions_path: PathBuf) -> Self {
        Self {
            requests_path,
            suggestions_path,
        }
    }

    pub fn requests(&self) -> Vec<RequestLogEntry> {
        persist::load_or_default(&self.requests_path)
    }

    pub fn suggestions(&self) -> Vec<SuggestionLogEntry> {
        persist::load_or_default(&self.suggestions_path)
    }

    pub fn append_request(&self, entry: RequestLogEntry) -> Result<(), PersistenceError> {
        append(&self.requests_path, entry)
    }

    pub fn append_suggestion(&self, entry: SuggestionLogEntry) -> Result<(), PersistenceError> {
        append(&self.suggestions_path, entry)
    }

    pub fn stats(&self) -> UsageStats {
        let requests = self.requests();

        let mut by_intent: Vec<(String, usize)> = Vec::new();
        for entry in &requests {
            match by_intent.iter_mut().find(|(intent, _)| *intent == entry.detected_intent) {
                Some((_, count)) => *count += 1,
                None => by_intent.push((entry.detected_intent.clone(), 1)),
            }
        }
        // sort_by is stable, so ties stay in first-seen order
        by_intent.sort_by(|a, b| b.1.cmp(&a.1));

        UsageStats {
            total_requests: requests.len(),
            total_suggestions: self.suggestions().len(),
            by_intent,
        }
    }
}

fn append<T>(path: &Path, entry: T) -> Result<(), PersistenceError>
where
    T: Serialize + serde::de::DeserializeOwned,
{
    let mut entries: Vec<T> = persist::load_or_default(path);
    entries.push(entry);
    persist::save_pretty(path, &entries)
}
