//! reqwest implementation of the `Backend` trait.

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::{Method, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{
    AckResponse, ApiError, Backend, CommandReply, HealthStatus, HistoryEntry, HistoryResponse,
    ListenOptions, ListenReply, Reminder, ReminderAlert, ReminderId, RemindersResponse,
    TriggerResponse,
};

/// HTTP client for the assistant backend.
#[derive(Clone)]
pub struct HttpBackend {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Build a client whose every request is bounded by `timeout`. An
    /// expired request surfaces as `ApiError::Transport`.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        Self::with_client(base_url, client)
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| anyhow::anyhow!("Invalid API base URL {:?}: {}", base_url, e))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL {:?} cannot carry a path", base_url.as_str());
        }
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Base URL with `segments` appended, each percent-encoded as a single
    /// path segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send_unchecked(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
    ) -> Result<Response, ApiError> {
        let url = self.endpoint(segments);
        debug!(%method, path = url.path(), "Backend request");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        req.send().await.map_err(|e| ApiError::Transport(e.to_string()))
    }

    async fn send(&self, method: Method, segments: &[&str], body: Option<Value>) -> Result<Response, ApiError> {
        let resp = self.send_unchecked(method, segments, body).await?;
        if !resp.status().is_success() {
            return Err(ApiError::Status(resp.status().as_u16()));
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let resp = self.send(method, segments, body).await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

impl Backend for HttpBackend {
    fn health(&self) -> BoxFuture<'_, Result<HealthStatus, ApiError>> {
        Box::pin(async move {
            let value: Value = self.send_json(Method::GET, &["health"], None).await?;
            Ok(HealthStatus::from_value(&value))
        })
    }

    fn process(&self, command: &str) -> BoxFuture<'_, Result<CommandReply, ApiError>> {
        let body = json!({ "command": command });
        Box::pin(async move { self.send_json(Method::POST, &["process"], Some(body)).await })
    }

    fn history(&self) -> BoxFuture<'_, Result<Vec<HistoryEntry>, ApiError>> {
        Box::pin(async move {
            let resp: HistoryResponse = self.send_json(Method::GET, &["history"], None).await?;
            if !resp.success {
                return Err(ApiError::Rejected(
                    resp.error.unwrap_or_else(|| "history unavailable".to_string()),
                ));
            }
            Ok(resp.history)
        })
    }

    fn clear_history(&self) -> BoxFuture<'_, Result<(), ApiError>> {
        Box::pin(async move {
            self.send(Method::DELETE, &["history"], None).await?;
            Ok(())
        })
    }

    fn speak(&self, text: &str) -> BoxFuture<'_, Result<(), ApiError>> {
        let body = json!({ "text": text });
        Box::pin(async move {
            let ack: AckResponse = self.send_json(Method::POST, &["speak"], Some(body)).await?;
            if !ack.success {
                return Err(ApiError::Rejected(
                    ack.error.unwrap_or_else(|| "speech refused".to_string()),
                ));
            }
            Ok(())
        })
    }

    fn listen(&self, options: ListenOptions) -> BoxFuture<'_, Result<ListenReply, ApiError>> {
        Box::pin(async move {
            let body = json!(options);
            let resp = self.send_unchecked(Method::POST, &["listen"], Some(body)).await?;
            let status = resp.status();
            match decode::<ListenReply>(resp).await {
                Ok(reply) if status.is_success() || reply.error.is_some() => Ok(reply),
                Ok(_) => Err(ApiError::Status(status.as_u16())),
                Err(e) if status.is_success() => Err(e),
                Err(_) => Err(ApiError::Status(status.as_u16())),
            }
        })
    }

    fn list_reminders(&self) -> BoxFuture<'_, Result<Vec<Reminder>, ApiError>> {
        Box::pin(async move {
            let list: RemindersResponse = self.send_json(Method::GET, &["reminders"], None).await?;
            if !list.success {
                return Err(ApiError::Rejected(
                    list.error.unwrap_or_else(|| "reminder list unavailable".to_string()),
                ));
            }
            Ok(list.reminders)
        })
    }

    fn delete_reminder(&self, id: &ReminderId) -> BoxFuture<'_, Result<(), ApiError>> {
        let segment = id.path_segment();
        let id = id.to_string();
        Box::pin(async move {
            let Some(segment) = segment else {
                warn!(%id, "Refusing to delete reminder with a reserved id");
                return Err(ApiError::InvalidId(id));
            };
            self.send(Method::DELETE, &["reminders", segment.as_str()], None).await?;
            Ok(())
        })
    }

    fn clear_reminders(&self) -> BoxFuture<'_, Result<(), ApiError>> {
        Box::pin(async move {
            self.send(Method::DELETE, &["reminders", "clear"], None).await?;
            Ok(())
        })
    }

    fn check_due_reminder(&self) -> BoxFuture<'_, Result<Option<ReminderAlert>, ApiError>> {
        Box::pin(async move {
            let resp: TriggerResponse = self.send_json(Method::GET, &["trigger_popup"], None).await?;
            Ok(resp.into_alert())
        })
    }
}
