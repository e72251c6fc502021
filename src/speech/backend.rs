//! Speech on the assistant server via `POST /speak`.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::warn;

use super::SpeechSink;
use crate::api::Backend;

/// Hands each utterance to the backend. The server plays it on its own
/// device and cannot be interrupted; `stop` only drops a request that has
/// not been sent yet.
pub struct BackendSpeech {
    api: Arc<dyn Backend>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl BackendSpeech {
    pub fn new(api: Arc<dyn Backend>) -> Self {
        Self {
            api,
            pending: Mutex::new(None),
        }
    }
}

impl SpeechSink for BackendSpeech {
    fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.stop();
        let api = Arc::clone(&self.api);
        let text = text.to_string();
        let handle = tokio::spawn(async move {
            if let Err(e) = api.speak(&text).await {
                warn!("Backend speech failed: {}", e);
            }
        });
        *self.pending.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    fn stop(&self) {
        if let Some(task) = self.pending.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
    }

    fn name(&self) -> String {
        "Assistant server".to_string()
    }
}
