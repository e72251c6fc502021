//! Human-readable front end for an interactive terminal.
//!
//! Plain lines are submitted as commands; a leading `/` selects an action.

use std::io::{self, Write};

use super::{Severity, UiCommand, UiEvent, View};
use crate::api::ReminderId;

const HELP: &str = "commands: /voice, /reminders, /delete <id>, /clear-reminders, /clear, /quit";

/// Parse one line typed into the terminal.
pub fn parse_terminal_line(line: &str) -> Result<UiCommand, String> {
    let trimmed = line.trim();
    let Some(action) = trimmed.strip_prefix('/') else {
        return Ok(UiCommand::Submit {
            text: trimmed.to_string(),
        });
    };

    let mut parts = action.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next().unwrap_or_default().trim();

    match name.as_str() {
        "voice" | "listen" => Ok(UiCommand::StartListening {}),
        "reminders" | "refresh" => Ok(UiCommand::RefreshReminders {}),
        "delete" | "del" => ReminderId::parse(arg)
            .filter(|id| id.path_segment().is_some())
            .map(|id| UiCommand::DeleteReminder { id })
            .ok_or_else(|| "Usage: /delete <id>".to_string()),
        "clear-reminders" => Ok(UiCommand::ClearReminders {}),
        "clear" => Ok(UiCommand::ClearHistory {}),
        "ping" => Ok(UiCommand::Ping {}),
        "quit" | "exit" => Ok(UiCommand::Stop {}),
        _ => Err(format!("Unknown action /{} ({})", name, HELP)),
    }
}

/// Format an event as a terminal line, or `None` for events the terminal
/// does not display.
pub fn format_event(event: &UiEvent) -> Option<String> {
    let line = match event {
        UiEvent::Starting {} => "Starting assistant client...".to_string(),
        UiEvent::Ready {} => format!("Ready. Type a command, or {}", HELP),
        UiEvent::Connection { label, .. } => format!("[status] {}", label),
        UiEvent::UserTurn { text } => format!("you> {}", text),
        UiEvent::AssistantTurn { text, error: false } => format!("assistant> {}", text),
        UiEvent::AssistantTurn { text, error: true } => format!("assistant (error)> {}", text),
        UiEvent::Busy { active: true } => "...".to_string(),
        UiEvent::Listening { active } => {
            if *active {
                "[listening] speak now".to_string()
            } else {
                "[listening] stopped".to_string()
            }
        }
        UiEvent::Toast { message, severity } => format!("{} {}", toast_marker(*severity), message),
        UiEvent::Popup { message, time, .. } => match time {
            Some(t) => format!("*** REMINDER ({}) *** {}", t, message),
            None => format!("*** REMINDER *** {}", message),
        },
        UiEvent::Reminders { rows } => {
            let mut out = String::from("reminders:");
            for row in rows {
                out.push_str(&format!("\n  [{}] {}  {}  (/delete {})", row.id, row.time, row.text, row.id));
            }
            out
        }
        UiEvent::RemindersEmpty { placeholder } => format!("reminders: {}", placeholder),
        UiEvent::Stats {
            messages,
            voice,
            reminders,
        } => format!("[stats] messages={} voice={} reminders={}", messages, voice, reminders),
        UiEvent::Hint { text } => format!("[hint] {}", text),
        UiEvent::ConversationCleared {} => "-- conversation cleared --".to_string(),
        UiEvent::Pong {} => "pong".to_string(),
        UiEvent::Stopping {} => "Goodbye.".to_string(),
        UiEvent::Busy { active: false }
        | UiEvent::ToastHidden {}
        | UiEvent::PopupDismissed { .. }
        | UiEvent::Speaking { .. } => return None,
    };
    Some(line)
}

fn toast_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "[i]",
        Severity::Success => "[ok]",
        Severity::Warning => "[!]",
        Severity::Error => "[x]",
    }
}

/// Prints events as plain lines on stdout.
#[derive(Debug, Default)]
pub struct TerminalView;

impl View for TerminalView {
    fn show(&self, event: &UiEvent) {
        if let Some(line) = format_event(event) {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let _ = writeln!(handle, "{}", line);
            let _ = handle.flush();
        }
    }
}
