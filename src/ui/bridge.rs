//! UI bridge: stdin reader and stdout JSON-line view.
//!
//! A blocking stdin reader thread parses each line into a `UiInput` and
//! forwards it through an mpsc channel to the dispatch loop. Lines that do
//! not parse are forwarded too, so the loop can raise a toast for them.

use std::io::{self, BufRead, Write};

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::{terminal, UiCommand, UiEvent, UiInput, View};
use crate::config::UiMode;

/// Writes every event as one JSON line on stdout.
#[derive(Debug, Default)]
pub struct JsonLineView;

impl View for JsonLineView {
    fn show(&self, event: &UiEvent) {
        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(e) => {
                error!("Failed to serialize event: {}", e);
                return;
            }
        };
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        // Write/flush errors are ignored: the pipe may be closed.
        let _ = writeln!(handle, "{}", json);
        let _ = handle.flush();
    }
}

/// Normalize incoming JSON: if it has a `"type"` field but no `"command"`
/// field, rename `"type"` to `"command"` so serde can deserialize it.
fn normalize_command_json(input: &str) -> String {
    if let Ok(mut obj) = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(input) {
        if !obj.contains_key("command") {
            if let Some(type_val) = obj.remove("type") {
                obj.insert("command".to_string(), type_val);
                if let Ok(json) = serde_json::to_string(&obj) {
                    return json;
                }
            }
        }
    }
    input.to_string()
}

/// Parse one JSON command line.
pub fn parse_json_command(line: &str) -> Result<UiCommand, String> {
    let normalized = normalize_command_json(line);
    serde_json::from_str::<UiCommand>(&normalized).map_err(|e| format!("Invalid JSON command: {}", e))
}

/// Parse one input line according to the front-end mode.
pub fn parse_input_line(line: &str, mode: UiMode) -> Result<UiCommand, String> {
    match mode {
        UiMode::Json => parse_json_command(line),
        UiMode::Terminal => terminal::parse_terminal_line(line),
    }
}

/// Spawn a blocking thread that reads lines from stdin and forwards them
/// through the returned channel. The thread exits when stdin is closed or
/// the receiver is dropped.
pub fn spawn_stdin_reader(mode: UiMode) -> mpsc::UnboundedReceiver<UiInput> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let stdin = io::stdin();
        forward_lines(stdin.lock(), mode, &tx);
        debug!("stdin reader thread exiting");
    });

    rx
}

/// Parse every line of `reader` and send it on. Blank lines are skipped in
/// JSON mode.
fn forward_lines(reader: impl BufRead, mode: UiMode, tx: &mpsc::UnboundedSender<UiInput>) {
    for line in reader.lines() {
        let text = match line {
            Ok(text) => text,
            Err(e) => {
                error!("stdin read error: {}", e);
                break;
            }
        };
        let trimmed = text.trim();
        if trimmed.is_empty() && mode == UiMode::Json {
            continue;
        }
        let input = match parse_input_line(trimmed, mode) {
            Ok(cmd) => {
                debug!(?cmd, "Received UI command");
                UiInput::Command(cmd)
            }
            Err(message) => {
                warn!(input = %trimmed, "{}", message);
                UiInput::Invalid(message)
            }
        };
        if tx.send(input).is_err() {
            break;
        }
    }
}
