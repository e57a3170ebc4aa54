//! Slash-command parsing.
//!
//! Commands are case-sensitive, arguments are whitespace-separated, and a
//! trailing `@botname` on the command (as Telegram sends in groups) is ignored.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Health,
    Sms {
        recipient: String,
        body: String,
        /// Raw `--provider` value, resolved later.
        provider: Option<String>,
    },
    Call {
        phone: String,
        message: Option<String>,
    },
    SetLang(Option<String>),
    Ai(String),
    Stats,
}

/// Malformed command input. Display text is the reply shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    Sms,
    MissingProviderName,
    Call,
    CallPhoneFormat,
    Ai,
    Unknown(String),
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageError::Sms => write!(
                f,
                "Usage: /sms <phone_number> <message> [--provider textbelt|twilio]\n\
                 Example: /sms +1234567890 Hello World"
            ),
            UsageError::MissingProviderName => {
                write!(f, "--provider needs a name: textbelt or twilio")
            }
            UsageError::Call => write!(
                f,
                "Usage: /call <phone_number> [message]\nExample: /call +1234567890 Your order is ready"
            ),
            UsageError::CallPhoneFormat => write!(
                f,
                "❌ Phone number must be in international format starting with +, e.g. +1234567890"
            ),
            UsageError::Ai => write!(f, "Usage: /ai <question>\nExample: /ai What is the speed of light?"),
            UsageError::Unknown(name) => {
                write!(f, "Unknown command /{name}. Send /help to see what I can do.")
            }
        }
    }
}

impl std::error::Error for UsageError {}

impl Command {
    /// Parse a message. `None` means the text is not a command.
    pub fn parse(text: &str) -> Option<Result<Command, UsageError>> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;

        let mut parts = rest.split_whitespace();
        let head = parts.next().unwrap_or_default();
        let name = head.split('@').next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let command = match name {
            "start" => Ok(Command::Start),
            "help" => Ok(Command::Help),
            "health" => Ok(Command::Health),
            "stats" => Ok(Command::Stats),
            "sms" => parse_sms(&args),
            "call" => parse_call(&args),
            "setlang" => Ok(Command::SetLang(args.first().map(|c| c.to_string()))),
            "ai" if args.is_empty() => Err(UsageError::Ai),
            "ai" => Ok(Command::Ai(args.join(" "))),
            other => Err(UsageError::Unknown(other.to_string())),
        };
        Some(command)
    }
}

fn parse_sms(args: &[&str]) -> Result<Command, UsageError> {
    let mut provider = None;
    let mut rest = Vec::with_capacity(args.len());

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "--provider" {
            let name = iter.next().ok_or(UsageError::MissingProviderName)?;
            provider = Some(name.to_string());
        } else {
            rest.push(*arg);
        }
    }

    match rest.split_first() {
        Some((recipient, body)) if !body.is_empty() => Ok(Command::Sms {
            recipient: recipient.to_string(),
            body: body.join(" "),
            provider,
        }),
        _ => Err(UsageError::Sms),
    }
}

fn parse_call(args: &[&str]) -> Result<Command, UsageError> {
    let (phone, message) = args.split_first().ok_or(UsageError::Call)?;
    if !phone.starts_with('+') {
        return Err(UsageError::CallPhoneFormat);
    }
    Ok(Command::Call {
        phone: phone.to_string(),
        message: (!message.is_empty()).then(|| message.join(" ")),
    })
}
