//! Assistant backend API: wire types and the `Backend` trait.
//!
//! Every network-issuing component talks to the backend through `Backend`,
//! so the app can be driven against a fake in tests. `client::HttpBackend`
//! is the reqwest implementation.

pub mod client;

use std::fmt;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use client::HttpBackend;

/// Errors from a single backend call. All of them are connectivity errors
/// from the user's point of view; callers decide whether to surface them.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request could not be sent or timed out.
    #[error("request failed: {0}")]
    Transport(String),
    /// Backend answered with a non-success HTTP status.
    #[error("backend returned status {0}")]
    Status(u16),
    /// Response body was not the expected JSON.
    #[error("invalid response: {0}")]
    Decode(String),
    /// Well-formed response with `success: false`.
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    /// Reminder id that cannot name a single reminder route. Never sent.
    #[error("invalid reminder id: {0}")]
    InvalidId(String),
}

/// Common trait for backend access (dyn-compatible).
pub trait Backend: Send + Sync {
    /// `GET /health`.
    fn health(&self) -> BoxFuture<'_, Result<HealthStatus, ApiError>>;

    /// `POST /process` with `{ "command": ... }`.
    fn process(&self, command: &str) -> BoxFuture<'_, Result<CommandReply, ApiError>>;

    /// `GET /history`, oldest entry first.
    fn history(&self) -> BoxFuture<'_, Result<Vec<HistoryEntry>, ApiError>>;

    /// `DELETE /history`.
    fn clear_history(&self) -> BoxFuture<'_, Result<(), ApiError>>;

    /// `POST /speak`: the backend speaks `text` on its own audio device.
    fn speak(&self, text: &str) -> BoxFuture<'_, Result<(), ApiError>>;

    /// `POST /listen`: the backend records one phrase on its microphone
    /// and runs it as a command.
    fn listen(&self, options: ListenOptions) -> BoxFuture<'_, Result<ListenReply, ApiError>>;

    /// `GET /reminders`.
    fn list_reminders(&self) -> BoxFuture<'_, Result<Vec<Reminder>, ApiError>>;

    /// `DELETE /reminders/{id}`. The id travels as one path segment.
    fn delete_reminder(&self, id: &ReminderId) -> BoxFuture<'_, Result<(), ApiError>>;

    /// `DELETE /reminders/clear`.
    fn clear_reminders(&self) -> BoxFuture<'_, Result<(), ApiError>>;

    /// `GET /trigger_popup`. `Some` when a reminder fired since the last call.
    fn check_due_reminder(&self) -> BoxFuture<'_, Result<Option<ReminderAlert>, ApiError>>;
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

/// Opaque reminder identifier. The backend sends integers; strings are
/// accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReminderId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ReminderId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl ReminderId {
    /// Text ids that would address another reminder route, or be folded
    /// away by URL normalisation, if used as the path segment.
    const RESERVED: [&'static str; 3] = ["clear", ".", ".."];

    /// The path segment for `DELETE /reminders/{id}`, or `None` when the id
    /// cannot name a single reminder.
    pub fn path_segment(&self) -> Option<String> {
        match self {
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) if s.is_empty() || Self::RESERVED.contains(&s.as_str()) => None,
            Self::Text(s) => Some(s.clone()),
        }
    }

    /// Parse user input: digits become a numeric id, anything else is kept
    /// as text.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed.parse::<i64>() {
            Ok(n) => Self::Number(n),
            Err(_) => Self::Text(trimmed.to_string()),
        })
    }
}

/// A reminder as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    /// Due-time display label, e.g. "05:00 PM 18-Oct".
    pub time: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemindersResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A due-reminder signal from `/trigger_popup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderAlert {
    pub message: String,
    pub id: Option<ReminderId>,
    pub time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TriggerResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub id: Option<ReminderId>,
    #[serde(default)]
    pub time: Option<String>,
}

impl TriggerResponse {
    /// A response only counts as a signal when it carries a message.
    pub fn into_alert(self) -> Option<ReminderAlert> {
        let message = self.message?;
        if message.trim().is_empty() {
            return None;
        }
        Some(ReminderAlert {
            message,
            id: self.id,
            time: self.time,
        })
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Response from `/process`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CommandReply {
    pub fn ok(response: &str) -> Self {
        Self {
            success: true,
            response: Some(response.to_string()),
            error: None,
        }
    }

    pub fn failed(error: Option<&str>) -> Self {
        Self {
            success: false,
            response: None,
            error: error.map(str::to_string),
        }
    }
}

/// One entry of the backend's conversation log: either the user's command
/// or the assistant's reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub you: Option<String>,
    #[serde(default)]
    pub assistant: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Pair each command with the reply that follows it. A command with no
/// reply yet, or a reply with no command, is skipped.
pub fn pair_history(entries: &[HistoryEntry]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut pending: Option<&str> = None;
    for entry in entries {
        if let Some(you) = entry.you.as_deref() {
            pending = Some(you);
        }
        if let Some(reply) = entry.assistant.as_deref() {
            if let Some(command) = pending.take() {
                pairs.push((command.to_string(), reply.to_string()));
            }
        }
    }
    pairs
}

/// Body of `POST /listen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListenOptions {
    /// Seconds to wait for speech to begin.
    pub timeout: u64,
    /// Longest phrase in seconds.
    pub phrase_time_limit: u64,
}

/// Response from `/listen`. Failures arrive with a 400 or 500 status and
/// an `error` string, which is kept rather than turned into a status error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListenReply {
    #[serde(default)]
    pub success: bool,
    /// What the backend heard.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AckResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Parsed `/health` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub server: Option<String>,
    pub reminders_active: Option<u64>,
    /// False when the backend reports its microphone as unavailable.
    pub microphone_available: bool,
}

impl HealthStatus {
    /// Interpret a health payload. The microphone flag may live under
    /// `components.microphone`, at top level as `microphone`, or as
    /// `speech_input_available`; any one reporting unavailable wins.
    pub fn from_value(value: &Value) -> Self {
        let nested = value.get("components").and_then(|c| c.get("microphone"));
        let top = value.get("microphone");
        let speech_input = value.get("speech_input_available");

        let unavailable = [nested, top].into_iter().flatten().any(reports_unavailable)
            || matches!(speech_input, Some(Value::Bool(false)));

        Self {
            server: value
                .get("server")
                .or_else(|| value.get("status"))
                .and_then(Value::as_str)
                .map(str::to_string),
            reminders_active: value.get("reminders_active").and_then(Value::as_u64),
            microphone_available: !unavailable,
        }
    }
}

fn reports_unavailable(value: &Value) -> bool {
    match value {
        Value::Bool(ok) => !ok,
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "unavailable" | "not available" | "error" | "offline"
        ),
        _ => false,
    }
}
