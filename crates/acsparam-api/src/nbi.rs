// Async client for the ACS northbound interface (NBI).
//
// Only task submission is covered:
//   POST {base}/devices/{device_id}/tasks[?connection_request][&timeout=ms]

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;

/// HTTP basic credentials for an NBI behind an authenticating proxy.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: SecretString,
}

/// How the ACS should treat a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOptions {
    /// Ask the ACS to issue a connection request so the task runs now.
    pub connection_request: bool,
    /// How long the ACS waits for the device before answering `202`.
    pub timeout: Option<Duration>,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            connection_request: true,
            timeout: Some(Duration::from_millis(3000)),
        }
    }
}

/// What the NBI reported for a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// The device was reachable and the task ran (`200`).
    Completed,
    /// The task was saved and will run on the device's next session (`202`).
    Queued,
}

/// Async client for the NBI task endpoint.
#[derive(Debug, Clone)]
pub struct NbiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<BasicAuth>,
}

impl NbiClient {
    /// Build from a base URL and transport config.
    pub fn new(
        base_url: &str,
        transport: &TransportConfig,
        credentials: Option<BasicAuth>,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::CannotBeABase(base_url.to_string()));
        }
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, credentials: Option<BasicAuth>) -> Self {
        Self {
            http,
            base_url,
            credentials,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/devices/{device_id}/tasks`, with the id percent-encoded as
    /// a single path segment.
    fn tasks_url(&self, device_id: &str, options: &TaskOptions) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::CannotBeABase(self.base_url.to_string()))?
            .pop_if_empty()
            .push("devices")
            .push(device_id)
            .push("tasks");

        if options.connection_request || options.timeout.is_some() {
            let mut query = url.query_pairs_mut();
            if options.connection_request {
                query.append_key_only("connection_request");
            }
            if let Some(timeout) = options.timeout {
                query.append_pair("timeout", &timeout.as_millis().to_string());
            }
        }

        Ok(url)
    }

    /// Submit one task for `device_id`.
    pub async fn post_task<B: Serialize + Sync>(
        &self,
        device_id: &str,
        body: &B,
        options: &TaskOptions,
    ) -> Result<TaskStatus, Error> {
        let url = self.tasks_url(device_id, options)?;
        debug!("POST {url}");

        let mut request = self.http.post(url).json(body);
        if let Some(ref auth) = self.credentials {
            request = request.basic_auth(&auth.username, Some(auth.password.expose_secret()));
        }

        let resp = request.send().await?;
        let status = resp.status();

        match status {
            reqwest::StatusCode::OK => Ok(TaskStatus::Completed),
            reqwest::StatusCode::ACCEPTED => Ok(TaskStatus::Queued),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(Error::Authentication {
                    message: format!("NBI returned {status}"),
                })
            }
            reqwest::StatusCode::NOT_FOUND => Err(Error::DeviceNotFound {
                device_id: device_id.to_owned(),
            }),
            _ => {
                let raw = resp.text().await.unwrap_or_default();
                let message = if raw.trim().is_empty() {
                    status.to_string()
                } else {
                    raw.trim().to_owned()
                };
                Err(Error::Nbi {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}
