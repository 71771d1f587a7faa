//! Session-scoped incident store.
//!
//! Holds an eventually-consistent mirror of the incident collection plus the
//! coordinator chat transcript. The backing service owns the durable copy;
//! the list here is a cache that is replaced wholesale on every refresh.
//!
//! Refreshes may overlap. Each completion replaces the whole list, so the
//! last response to resolve wins, even if it was requested first. An
//! optimistic [`IncidentStore::add_incident`] can therefore vanish when an
//! older in-flight refresh lands after it, and reappear on the next change
//! notification.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::SharedBackend;
use crate::domain::{ChatMessage, Incident, NewIncident};
use crate::error::StoreError;

pub struct IncidentStore {
    backend: SharedBackend,
    incidents: RwLock<Vec<Incident>>,
    chat: RwLock<Vec<ChatMessage>>,
    loading: AtomicBool,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl IncidentStore {
    /// Loading until the first refresh completes.
    pub fn new(backend: SharedBackend) -> Arc<Self> {
        Arc::new(Self {
            backend,
            incidents: RwLock::new(Vec::new()),
            chat: RwLock::new(Vec::new()),
            loading: AtomicBool::new(true),
            listener: Mutex::new(None),
        })
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    /// Subscribe to change notifications, then load the collection once.
    pub async fn start(self: &Arc<Self>) {
        self.subscribe();
        self.refresh().await;
    }

    /// [`IncidentStore::start`] on a spawned task, so callers can serve the
    /// (still loading) store right away.
    pub fn start_in_background(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            store.start().await;
            info!(incidents = store.len(), "Initial incident load finished");
        })
    }

    /// Release the change subscription. The cached data stays readable.
    pub fn dispose(&self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
            info!("Incident change subscription released");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn subscribe(self: &Arc<Self>) {
        let mut listener = self.listener.lock();
        if listener.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let Some(mut changes) = self.backend.subscribe_incident_changes() else {
            debug!("Backing service offers no change notifications");
            return;
        };

        // Weak so a dropped store ends the listener
        let weak = Arc::downgrade(self);
        *listener = Some(tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                let Some(store) = weak.upgrade() else {
                    break;
                };
                debug!(?change, "Incident collection changed, reloading");
                store.refresh().await;
            }
            debug!("Incident change feed closed");
        }));
        info!("Subscribed to incident changes");
    }

    /// Reload the full collection. Failures are logged and the previous
    /// list is kept.
    pub async fn refresh(&self) {
        let _loading = LoadingGuard::begin(&self.loading);

        match self.backend.list_incidents().await {
            Ok(incidents) => {
                let count = incidents.len();
                *self.incidents.write() = incidents;
                debug!(count, "Incidents refreshed");
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch incidents");
            }
        }
    }

    /// Optimistic local insert at the front of the list.
    pub fn add_incident(&self, incident: Incident) {
        debug!(incident_id = %incident.id, "Incident added locally");
        self.incidents.write().insert(0, incident);
    }

    /// Submit through the backing service, then insert the result locally.
    ///
    /// The request is borrowed so a caller can retry it unchanged.
    pub async fn submit_incident(&self, request: &NewIncident) -> Result<Incident, StoreError> {
        request.validate().map_err(StoreError::InvalidIncident)?;

        let incident = self
            .backend
            .submit_incident(request)
            .await
            .map_err(|e| {
                warn!(error = %e, title = %request.title, "Incident submission failed");
                e
            })?;

        self.add_incident(incident.clone());
        info!(incident_id = %incident.id, "Incident submitted");
        Ok(incident)
    }

    pub fn add_chat_message(&self, message: ChatMessage) {
        self.chat.write().push(message);
    }

    pub fn clear_chat(&self) {
        self.chat.write().clear();
    }

    /// Send a user message and append the coordinator's reply.
    ///
    /// The service sees the transcript as it was before this message. When
    /// the service fails the user message stays in the transcript.
    pub async fn send_chat(&self, text: &str) -> Result<ChatMessage, StoreError> {
        if text.trim().is_empty() {
            return Err(StoreError::EmptyMessage);
        }

        let history = self.chat_history();
        self.add_chat_message(ChatMessage::user(text));

        let reply = self
            .backend
            .chat_with_agent(text, &history)
            .await
            .map_err(|e| {
                warn!(error = %e, "Chat request failed");
                e
            })?;

        let message = ChatMessage::assistant(reply);
        self.add_chat_message(message.clone());
        Ok(message)
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.incidents.read().clone()
    }

    pub fn incident(&self, id: &str) -> Option<Incident> {
        self.incidents.read().iter().find(|i| i.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.incidents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.read().is_empty()
    }

    pub fn chat_history(&self) -> Vec<ChatMessage> {
        self.chat.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }
}

/// Clears the loading flag when a refresh ends, including when the refresh
/// future is dropped before the backend answers.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn begin(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Drop for IncidentStore {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get_mut().take() {
            handle.abort();
        }
    }
}
