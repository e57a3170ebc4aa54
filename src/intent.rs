//! Keyword intent classifier for free-text messages.
//!
//! Plain substring containment over a lower-cased copy of the input. The first
//! intent in [`INTENT_TRIGGERS`] with a matching trigger wins.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Sms,
    Call,
    SetLang,
    Start,
    Help,
    GeneralQuestion,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Sms => "sms",
            Intent::Call => "call",
            Intent::SetLang => "setlang",
            Intent::Start => "start",
            Intent::Help => "help",
            Intent::GeneralQuestion => "general_question",
        }
    }

    /// Intents answered with a canned pointer to the matching command.
    pub fn has_canned_reply(&self) -> bool {
        matches!(self, Intent::Sms | Intent::Call | Intent::SetLang | Intent::Start)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration order is match priority.
pub const INTENT_TRIGGERS: &[(Intent, &[&str])] = &[
    (
        Intent::Sms,
        &["send sms", "send an sms", "send a text", "text message", "sms to"],
    ),
    (
        Intent::Call,
        &["make a call", "call someone", "phone call", "voice call", "call to"],
    ),
    (
        Intent::SetLang,
        &["change language", "set language", "switch language", "language settings"],
    ),
    (
        Intent::Start,
        &["get started", "hello", "hi there", "how do i start"],
    ),
    (
        Intent::Help,
        &["help", "what can you do", "commands", "how to use"],
    ),
];

pub fn classify(text: &str) -> Intent {
    let lowered = text.to_lowercase();
    INTENT_TRIGGERS
        .iter()
        .find(|(_, triggers)| triggers.iter().any(|t| lowered.contains(t)))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::GeneralQuestion)
}
