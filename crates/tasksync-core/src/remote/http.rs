use crate::config::RemoteConfig;
use crate::error::RemoteWriteFault;
use crate::models::Task;
use crate::remote::{RemoteStore, RemoteTask};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Remote store reached over HTTP.
///
/// Documents live at `{base}/api/tasks/{id}`; `PUT` upserts, `DELETE` removes.
pub struct HttpRemote {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemote {
    pub fn new(base_url: &str, auth_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    /// Build from the `[remote]` config section. `None` when no URL is configured.
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>> {
        match config.url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => Ok(Some(Self::new(
                url,
                config.auth_token.clone(),
                Duration::from_secs(config.timeout_seconds),
            )?)),
            None => Ok(None),
        }
    }

    fn task_url(&self, id: &str) -> String {
        format!("{}/api/tasks/{}", self.base_url, urlencoding::encode(id))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Cheap reachability check against `{base}/api/health`
    pub async fn probe(&self) -> bool {
        let url = format!("{}/api/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("health probe to {url} failed: {e}");
                false
            }
        }
    }
}

fn check_status(resp: Response) -> Result<(), RemoteWriteFault> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteWriteFault::PermissionDenied),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Err(RemoteWriteFault::Timeout),
        other => Err(RemoteWriteFault::Rejected {
            status: other.as_u16(),
        }),
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn put(&self, task: &Task) -> Result<(), RemoteWriteFault> {
        let body = RemoteTask::from(task);
        let resp = self
            .authorize(self.client.put(self.task_url(&task.id)))
            .json(&body)
            .send()
            .await?;
        check_status(resp)
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteWriteFault> {
        let resp = self
            .authorize(self.client.delete(self.task_url(id)))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND || resp.status() == StatusCode::GONE {
            return Ok(());
        }
        check_status(resp)
    }
}
