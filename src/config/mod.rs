//! Configuration reading and data directory paths.

pub mod paths;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use paths::get_data_dir;

/// Backend address used when `client_config.json` does not override it.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

// Loop cadences. Fixed for the life of the process.
pub const HEALTH_INTERVAL: Duration = Duration::from_secs(30);
pub const REMINDER_SYNC_INTERVAL: Duration = Duration::from_secs(5);
pub const ALERT_POLL_INTERVAL: Duration = Duration::from_secs(4);
pub const HINT_INTERVAL: Duration = Duration::from_secs(8);
pub const TOAST_DURATION: Duration = Duration::from_secs(3);
pub const POPUP_DURATION: Duration = Duration::from_secs(10);
pub const REMINDER_NUDGE_DELAY: Duration = Duration::from_secs(1);

/// Which front end renders UI events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiMode {
    /// JSON lines on stdin/stdout for an external shell process.
    Json,
    /// Human-readable lines for an interactive terminal.
    #[default]
    Terminal,
}

/// Top-level client_config.json shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub ui: UiMode,
    pub voice: VoiceConfig,
    pub speech: SpeechConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 15,
            ui: UiMode::default(),
            voice: VoiceConfig::default(),
            speech: SpeechConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Speech recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoiceConfig {
    /// One of "none", "backend", "openai-cloud", "custom-cloud".
    pub stt_adapter: String,
    pub stt_api_key: Option<String>,
    pub stt_endpoint: Option<String>,
    pub input_device: Option<String>,
    /// Seconds to wait for speech to start.
    pub listen_timeout_secs: u64,
    /// Maximum length of one phrase.
    pub phrase_time_limit_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_adapter: "none".to_string(),
            stt_api_key: None,
            stt_endpoint: None,
            input_device: None,
            listen_timeout_secs: 5,
            phrase_time_limit_secs: 10,
        }
    }
}

/// Speech output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeechConfig {
    /// One of "none", "system", "backend", "openai-tts".
    pub tts_adapter: String,
    /// Program used by the "system" adapter instead of the platform default.
    pub tts_command: Option<String>,
    pub tts_voice: Option<String>,
    pub tts_api_key: Option<String>,
    pub tts_volume: Option<f32>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            tts_adapter: "system".to_string(),
            tts_command: None,
            tts_voice: None,
            tts_api_key: None,
            tts_volume: None,
        }
    }
}

/// Read client_config.json from the data directory.
pub fn read_client_config() -> ClientConfig {
    read_client_config_from(&get_config_path())
}

/// Read a client config from an explicit path, falling back to defaults.
pub fn read_client_config_from(path: &Path) -> ClientConfig {
    read_json_file(path).unwrap_or_default()
}

/// Path to client_config.json.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("client_config.json")
}

/// Generic helper: read a JSON file and deserialize it.
fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(val) => Some(val),
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        },
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to read {}: {}", path.display(), e);
            }
            None
        }
    }
}
