//! Host speech command: `say` on macOS, PowerShell System.Speech on
//! Windows, `espeak` elsewhere. Any other program that takes the text as
//! its last argument can be configured instead.

use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::SpeechSink;

pub struct SystemSpeech {
    program: String,
    voice: Option<String>,
    current: Mutex<Option<Child>>,
}

impl SystemSpeech {
    /// Use the platform's default speech program.
    pub fn new(voice: Option<&str>) -> Self {
        Self::with_program(default_program(), voice)
    }

    pub fn with_program(program: &str, voice: Option<&str>) -> Self {
        Self {
            program: program.to_string(),
            voice: voice.map(str::to_string),
            current: Mutex::new(None),
        }
    }

    fn build_command(&self, text: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        if self.program.eq_ignore_ascii_case("powershell") {
            let script = format!(
                "Add-Type -AssemblyName System.Speech; \
                 (New-Object System.Speech.Synthesis.SpeechSynthesizer).Speak('{}')",
                text.replace('\'', "''")
            );
            cmd.args(["-NoProfile", "-Command", script.as_str()]);
        } else {
            if let Some(voice) = &self.voice {
                cmd.arg("-v").arg(voice);
            }
            cmd.arg(text);
        }
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        cmd
    }
}

fn default_program() -> &'static str {
    if cfg!(target_os = "macos") {
        "say"
    } else if cfg!(target_os = "windows") {
        "powershell"
    } else {
        "espeak"
    }
}

fn kill_child(child: &mut Child) {
    if let Ok(None) = child.try_wait() {
        let _ = child.kill();
    }
    let _ = child.wait();
}

impl SpeechSink for SystemSpeech {
    fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut previous) = current.take() {
            kill_child(&mut previous);
        }
        match self.build_command(text).spawn() {
            Ok(child) => {
                debug!(pid = child.id(), text_len = text.len(), "Speaking via {}", self.program);
                *current = Some(child);
            }
            Err(e) => warn!("Failed to start {}: {}", self.program, e),
        }
    }

    fn stop(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut child) = current.take() {
            kill_child(&mut child);
        }
    }

    fn name(&self) -> String {
        match &self.voice {
            Some(v) => format!("System ({}, {})", self.program, v),
            None => format!("System ({})", self.program),
        }
    }
}

impl Drop for SystemSpeech {
    fn drop(&mut self) {
        self.stop();
    }
}
