//! HTTP backend against a fake backing service on an ephemeral port.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use incident_desk::{
    backend::{mock, Backend, HttpBackend, IncidentChange},
    domain::{ChatMessage, Incident, IncidentStatus, NewIncident, Priority},
    error::BackendError,
    store::IncidentStore,
};

const SERVICE_TOKEN: &str = "svc-token";

#[derive(Default)]
struct FakeService {
    incidents: Mutex<Vec<Incident>>,
    version: AtomicU64,
    /// Number of upcoming list calls that answer 503
    failing_lists: AtomicUsize,
    list_calls: AtomicUsize,
}

type Shared = Arc<FakeService>;

impl FakeService {
    fn seeded() -> Shared {
        let service = FakeService::default();
        *service.incidents.lock() = mock::seed_incidents();
        Arc::new(service)
    }

    fn push(&self, incident: Incident) {
        self.incidents.lock().insert(0, incident);
        self.version.fetch_add(1, Ordering::SeqCst);
    }
}

async fn list(State(svc): State<Shared>) -> Response {
    svc.list_calls.fetch_add(1, Ordering::SeqCst);
    let failing = svc
        .failing_lists
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "message": "warming up" })),
        )
            .into_response();
    }
    Json(svc.incidents.lock().clone()).into_response()
}

async fn version(State(svc): State<Shared>) -> Json<Value> {
    Json(json!({ "version": svc.version.load(Ordering::SeqCst) }))
}

async fn find(State(svc): State<Shared>, Path(id): Path<String>) -> Response {
    match svc.incidents.lock().iter().find(|i| i.id == id) {
        Some(incident) => Json(incident.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "no such incident" }))).into_response(),
    }
}

async fn create(State(svc): State<Shared>, headers: HeaderMap, Json(req): Json<NewIncident>) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", SERVICE_TOKEN));
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "missing token" }))).into_response();
    }

    let now = Utc::now();
    let incident = Incident {
        id: format!("INC{:03}", svc.incidents.lock().len() + 1),
        title: req.title,
        description: req.description,
        location: req.location,
        category: req.category,
        priority: req.priority,
        status: IncidentStatus::Open,
        assigned_technician: None,
        assignment_reason: None,
        required_skill: None,
        sop_steps: None,
        created_by: None,
        created_at: now,
        updated_at: now,
    };
    svc.push(incident.clone());
    (StatusCode::CREATED, Json(incident)).into_response()
}

async fn chat(Json(body): Json<Value>) -> Json<Value> {
    let message = body["message"].as_str().unwrap_or_default();
    let prior = body["history"].as_array().map_or(0, Vec::len);
    Json(json!({ "reply": format!("echo: {} ({} prior)", message, prior) }))
}

async fn spawn_service(svc: Shared) -> String {
    let app = Router::new()
        .route("/api/incidents", get(list).post(create))
        .route("/api/incidents/version", get(version))
        .route("/api/incidents/:id", get(find))
        .route("/api/technicians", get(|| async { Json(mock::seed_technicians()) }))
        .route("/api/agent/chat", post(chat))
        .route("/api/health", get(|| async { StatusCode::OK }))
        .with_state(svc);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/api", addr)
}

fn client(base: &str, token: Option<&str>, poll: Option<Duration>) -> HttpBackend {
    HttpBackend::new(base, token, Duration::from_secs(5), Duration::from_secs(5), poll).unwrap()
}

fn leak() -> NewIncident {
    serde_json::from_value(json!({
        "title": "Leak",
        "location": "Plant A",
        "category": "mechanical",
        "priority": "high"
    }))
    .unwrap()
}

#[tokio::test]
async fn reads_incidents_and_technicians() {
    let base = spawn_service(FakeService::seeded()).await;
    let backend = client(&base, None, None);

    let incidents = backend.list_incidents().await.unwrap();
    assert_eq!(incidents.len(), 3);
    assert_eq!(incidents[0].id, "INC001");

    let technicians = backend.list_technicians().await.unwrap();
    assert_eq!(technicians.len(), 5);

    backend.health_check().await.unwrap();
}

#[tokio::test]
async fn missing_incident_is_none() {
    let base = spawn_service(FakeService::seeded()).await;
    let backend = client(&base, None, None);

    let found = backend.get_incident("INC002").await.unwrap();
    assert_eq!(found.map(|i| i.title), Some("Power Outage in Server Room".to_string()));

    assert!(backend.get_incident("INC999").await.unwrap().is_none());
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let svc = FakeService::seeded();
    svc.failing_lists.store(1, Ordering::SeqCst);
    let base = spawn_service(svc.clone()).await;

    let incidents = client(&base, None, None).list_incidents().await.unwrap();

    assert_eq!(incidents.len(), 3);
    assert_eq!(svc.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn submissions_carry_the_service_token() {
    let svc = FakeService::seeded();
    let base = spawn_service(svc.clone()).await;

    let anonymous = client(&base, None, None).submit_incident(&leak()).await;
    match anonymous {
        Err(BackendError::Rejected { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "missing token");
        }
        other => panic!("expected rejection, got {:?}", other),
    }

    let created = client(&base, Some(SERVICE_TOKEN), None)
        .submit_incident(&leak())
        .await
        .unwrap();
    assert_eq!(created.id, "INC004");
    assert_eq!(created.priority, Priority::High);
    assert_eq!(svc.incidents.lock().len(), 4);
}

#[tokio::test]
async fn chat_sends_the_history() {
    let base = spawn_service(FakeService::seeded()).await;
    let backend = client(&base, None, None);

    let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
    let reply = backend.chat_with_agent("status?", &history).await.unwrap();

    assert_eq!(reply, "echo: status? (2 prior)");
}

#[tokio::test]
async fn stats_are_derived_from_both_lists() {
    let base = spawn_service(FakeService::seeded()).await;

    let stats = client(&base, None, None).dashboard_stats().await.unwrap();

    assert_eq!(stats.total_incidents, 3);
    assert_eq!(stats.available_technicians, 3);
}

#[tokio::test]
async fn version_bumps_are_reported_as_changes() {
    let svc = FakeService::seeded();
    let base = spawn_service(svc.clone()).await;
    let backend = client(&base, None, Some(Duration::from_millis(20)));

    let mut changes = backend.subscribe_incident_changes().unwrap();
    // Let the first poll record the baseline version
    tokio::time::sleep(Duration::from_millis(100)).await;
    svc.version.fetch_add(1, Ordering::SeqCst);

    let change = tokio::time::timeout(Duration::from_secs(2), changes.recv())
        .await
        .unwrap();
    assert_eq!(change, Some(IncidentChange::Unspecified));
}

#[tokio::test]
async fn store_follows_remote_changes() {
    let svc = FakeService::seeded();
    let base = spawn_service(svc.clone()).await;
    let backend = Arc::new(client(&base, Some(SERVICE_TOKEN), Some(Duration::from_millis(20))));

    let store = IncidentStore::new(backend);
    store.start().await;
    assert_eq!(store.len(), 3);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let mut remote = mock::seed_incidents().remove(0);
    remote.id = "INC010".to_string();
    remote.title = "Filed elsewhere".to_string();
    svc.push(remote);

    tokio::time::timeout(Duration::from_secs(2), async {
        while store.incident("INC010").is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(store.incidents()[0].id, "INC010");

    store.dispose();
}
