//! Backing service boundary.
//!
//! The store only talks to a [`Backend`]. Two implementations exist: an
//! in-memory mock with simulated latency and a REST client for a hosted
//! backend-as-a-service.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::config::{BackendMode, Settings};
use crate::domain::{ChatMessage, DashboardStats, Incident, NewIncident, Technician};
use crate::error::BackendError;
use crate::responder::CannedResponder;

pub use http::HttpBackend;
pub use mock::{MockBackend, MockLatency};

pub type SharedBackend = Arc<dyn Backend>;

#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_incidents(&self) -> Result<Vec<Incident>, BackendError>;

    async fn get_incident(&self, id: &str) -> Result<Option<Incident>, BackendError>;

    /// The service fills in id, status, assignment, SOP steps and timestamps.
    async fn submit_incident(&self, incident: &NewIncident) -> Result<Incident, BackendError>;

    async fn list_technicians(&self) -> Result<Vec<Technician>, BackendError>;

    async fn chat_with_agent(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<String, BackendError>;

    async fn dashboard_stats(&self) -> Result<DashboardStats, BackendError>;

    /// `None` when the service cannot signal changes. Dropping the
    /// subscription unsubscribes.
    fn subscribe_incident_changes(&self) -> Option<ChangeSubscription> {
        None
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// What changed in the durable incident collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncidentChange {
    Created(String),
    Updated(String),
    /// Something changed but the service did not say what.
    Unspecified,
}

/// Receiving end of a change feed.
pub struct ChangeSubscription {
    rx: broadcast::Receiver<IncidentChange>,
    _producer: Option<AbortOnDrop>,
}

impl ChangeSubscription {
    pub fn new(rx: broadcast::Receiver<IncidentChange>) -> Self {
        Self { rx, _producer: None }
    }

    /// Subscription whose events come from a dedicated task; the task is
    /// aborted when the subscription is dropped.
    pub fn with_producer(rx: broadcast::Receiver<IncidentChange>, producer: JoinHandle<()>) -> Self {
        Self {
            rx,
            _producer: Some(AbortOnDrop(producer)),
        }
    }

    /// Next change, or `None` once the feed is closed.
    pub async fn recv(&mut self) -> Option<IncidentChange> {
        match self.rx.recv().await {
            Ok(change) => Some(change),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Change feed lagged");
                Some(IncidentChange::Unspecified)
            }
            Err(RecvError::Closed) => None,
        }
    }
}

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Build the configured backend.
pub fn from_settings(settings: &Settings) -> anyhow::Result<SharedBackend> {
    match settings.backend_mode {
        BackendMode::Mock => {
            let latency = if settings.mock_latency {
                MockLatency::reference()
            } else {
                MockLatency::none()
            };
            tracing::info!(?latency, "Using mock backing service");
            Ok(Arc::new(MockBackend::seeded(
                latency,
                Arc::new(CannedResponder::default()),
            )))
        }
        BackendMode::Http => Ok(Arc::new(HttpBackend::from_settings(settings)?)),
    }
}
