//! REST client for a hosted backing service.
//!
//! Provides type-safe methods for:
//! - Incident listing, lookup and submission
//! - Technician listing
//! - Coordinator chat
//! - Change detection by polling the collection version

use anyhow::{bail, Context};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, instrument, warn};
use url::Url;

use super::{Backend, ChangeSubscription, IncidentChange};
use crate::config::Settings;
use crate::domain::{ChatMessage, DashboardStats, Incident, NewIncident, Technician};
use crate::error::BackendError;

const CHANGE_FEED_CAPACITY: usize = 16;

/// Client for the backing service.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    token: Option<String>,
    retry_max_elapsed: Duration,
    poll_interval: Option<Duration>,
}

/// Error body returned by the service.
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(alias = "error")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct VersionBody {
    version: u64,
}

impl HttpBackend {
    /// Create a new backing service client.
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        timeout: Duration,
        retry_max_elapsed: Duration,
        poll_interval: Option<Duration>,
    ) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url).context("Invalid backing service URL")?;
        if base_url.cannot_be_a_base() {
            bail!("Backing service URL cannot be used as a base: {}", base_url);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(base_url = %base_url, "Backing service client initialized");

        Ok(Self {
            client,
            base_url,
            token: token.map(str::to_string),
            retry_max_elapsed,
            poll_interval,
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings
            .backend_url
            .as_deref()
            .context("BACKEND_URL must be set when BACKEND_MODE=http")?;

        Self::new(
            base_url,
            settings.backend_token.as_deref(),
            Duration::from_secs(settings.backend_timeout_seconds),
            Duration::from_secs(settings.backend_retry_max_elapsed_seconds),
            settings.backend_poll_interval(),
        )
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, BackendError> {
        let status = response.status();

        if status.is_success() {
            return response.json::<R>().await.map_err(|e| {
                error!(error = %e, "Failed to parse backing service response");
                BackendError::Decode(e.to_string())
            });
        }

        let message = response
            .json::<ServiceErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| format!("backing service error: {}", status));

        if status.is_server_error() {
            error!(status = %status, message = %message, "Backing service error");
        }

        Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch_json<R: DeserializeOwned>(&self, url: Url) -> Result<R, BackendError> {
        debug!(url = %url, "Backing service request");

        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Backing service request failed");
                BackendError::from(e)
            })?;

        Self::decode(response).await
    }

    /// GET with exponential backoff on transient failures.
    async fn get_json<R: DeserializeOwned>(&self, url: Url) -> Result<R, BackendError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(self.retry_max_elapsed))
            .build();

        let url = &url;
        backoff::future::retry(policy, || async move {
            self.fetch_json(url.clone()).await.map_err(|e| {
                if e.is_transient() {
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await
    }

    async fn post_json<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: Url,
        body: &T,
    ) -> Result<R, BackendError> {
        debug!(url = %url, "Backing service request");

        let response = self
            .authorized(self.client.post(url))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Backing service request failed");
                BackendError::from(e)
            })?;

        Self::decode(response).await
    }

    async fn poll_versions(self, tx: broadcast::Sender<IncidentChange>, every: Duration) {
        let url = self.endpoint(&["incidents", "version"]);
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_seen: Option<u64> = None;

        loop {
            ticker.tick().await;

            match self.fetch_json::<VersionBody>(url.clone()).await {
                Ok(body) => {
                    let changed = last_seen.is_some_and(|prev| prev != body.version);
                    last_seen = Some(body.version);
                    if changed && tx.send(IncidentChange::Unspecified).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Change poll failed"),
            }
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    #[instrument(skip(self))]
    async fn list_incidents(&self) -> Result<Vec<Incident>, BackendError> {
        self.get_json(self.endpoint(&["incidents"])).await
    }

    #[instrument(skip(self))]
    async fn get_incident(&self, id: &str) -> Result<Option<Incident>, BackendError> {
        match self.get_json(self.endpoint(&["incidents", id])).await {
            Ok(incident) => Ok(Some(incident)),
            Err(BackendError::Rejected { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, incident), fields(title = %incident.title))]
    async fn submit_incident(&self, incident: &NewIncident) -> Result<Incident, BackendError> {
        self.post_json(self.endpoint(&["incidents"]), incident).await
    }

    async fn list_technicians(&self) -> Result<Vec<Technician>, BackendError> {
        self.get_json(self.endpoint(&["technicians"])).await
    }

    #[instrument(skip(self, message, history), fields(history_len = history.len()))]
    async fn chat_with_agent(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<String, BackendError> {
        #[derive(Serialize)]
        struct Request<'a> {
            message: &'a str,
            history: &'a [ChatMessage],
        }

        #[derive(Deserialize)]
        struct Reply {
            reply: String,
        }

        let reply: Reply = self
            .post_json(self.endpoint(&["agent", "chat"]), &Request { message, history })
            .await?;

        Ok(reply.reply)
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, BackendError> {
        let (incidents, technicians) =
            futures::try_join!(self.list_incidents(), self.list_technicians())?;
        Ok(DashboardStats::compute(&incidents, &technicians))
    }

    fn subscribe_incident_changes(&self) -> Option<ChangeSubscription> {
        let every = self.poll_interval?;
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime; change polling disabled");
                return None;
            }
        };

        let (tx, rx) = broadcast::channel(CHANGE_FEED_CAPACITY);
        let producer = runtime.spawn(self.clone().poll_versions(tx, every));
        Some(ChangeSubscription::with_producer(rx, producer))
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.endpoint(&["health"]))
            .timeout(Duration::from_secs(5))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::Rejected {
                status: status.as_u16(),
                message: "backing service unhealthy".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpBackend {
        HttpBackend::new(
            base,
            None,
            Duration::from_secs(1),
            Duration::from_millis(10),
            None,
        )
        .unwrap()
    }

    #[test]
    fn endpoints_extend_the_base_path() {
        let backend = client("http://svc.local/api");
        assert_eq!(
            backend.endpoint(&["incidents", "INC001"]).as_str(),
            "http://svc.local/api/incidents/INC001"
        );

        let trailing = client("http://svc.local/api/");
        assert_eq!(
            trailing.endpoint(&["technicians"]).as_str(),
            "http://svc.local/api/technicians"
        );
    }

    #[test]
    fn ids_are_escaped_as_one_segment() {
        let backend = client("http://svc.local");
        assert_eq!(
            backend.endpoint(&["incidents", "a/b"]).as_str(),
            "http://svc.local/incidents/a%2Fb"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(HttpBackend::new("not a url", None, Duration::from_secs(1), Duration::ZERO, None).is_err());
        assert!(HttpBackend::new("mailto:ops@example.com", None, Duration::from_secs(1), Duration::ZERO, None).is_err());
    }

    #[test]
    fn no_subscription_without_poll_interval() {
        assert!(client("http://svc.local").subscribe_incident_changes().is_none());
    }
}
