//! In-memory backing service with simulated latency.
//!
//! Seeded with the demo incidents and technicians. Every write broadcasts an
//! [`IncidentChange`] so subscribed stores reload.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{Backend, ChangeSubscription, IncidentChange};
use crate::domain::{
    format_incident_id, Availability, Category, ChatMessage, DashboardStats, Incident,
    IncidentStatus, NewIncident, Priority, Technician,
};
use crate::error::BackendError;
use crate::responder::ResponderStrategy;

const CHANGE_FEED_CAPACITY: usize = 64;

/// Generic procedure attached to every new incident.
pub const DEFAULT_SOP_STEPS: [&str; 5] = [
    "Initial assessment and safety check",
    "Identify root cause using diagnostic tools",
    "Apply standard troubleshooting procedures",
    "Implement solution or escalate if needed",
    "Verify resolution and document findings",
];

/// Artificial delay per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockLatency {
    pub submit: Duration,
    pub list: Duration,
    pub get: Duration,
    pub technicians: Duration,
    pub chat: Duration,
    pub stats: Duration,
}

impl MockLatency {
    /// Delays of the demo dashboard.
    pub fn reference() -> Self {
        Self {
            submit: Duration::from_millis(2000),
            list: Duration::from_millis(500),
            get: Duration::from_millis(300),
            technicians: Duration::from_millis(300),
            chat: Duration::from_millis(1500),
            stats: Duration::from_millis(400),
        }
    }

    pub fn none() -> Self {
        Self {
            submit: Duration::ZERO,
            list: Duration::ZERO,
            get: Duration::ZERO,
            technicians: Duration::ZERO,
            chat: Duration::ZERO,
            stats: Duration::ZERO,
        }
    }
}

pub struct MockBackend {
    incidents: RwLock<Vec<Incident>>,
    technicians: Vec<Technician>,
    latency: MockLatency,
    responder: Arc<dyn ResponderStrategy>,
    changes: broadcast::Sender<IncidentChange>,
}

impl MockBackend {
    pub fn new(
        incidents: Vec<Incident>,
        technicians: Vec<Technician>,
        latency: MockLatency,
        responder: Arc<dyn ResponderStrategy>,
    ) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            incidents: RwLock::new(incidents),
            technicians,
            latency,
            responder,
            changes,
        }
    }

    /// Backend holding the demo data set.
    pub fn seeded(latency: MockLatency, responder: Arc<dyn ResponderStrategy>) -> Self {
        Self::new(seed_incidents(), seed_technicians(), latency, responder)
    }

    /// Change an incident's status as another actor would, notifying
    /// subscribers. Returns `false` when the id is unknown.
    pub fn update_status(&self, id: &str, status: IncidentStatus) -> bool {
        let updated = {
            let mut incidents = self.incidents.write();
            match incidents.iter_mut().find(|i| i.id == id) {
                Some(incident) => {
                    incident.status = status;
                    incident.updated_at = Utc::now();
                    true
                }
                None => false,
            }
        };

        if updated {
            info!(incident_id = id, status = %status, "Incident status changed");
            self.notify(IncidentChange::Updated(id.to_string()));
        }
        updated
    }

    fn notify(&self, change: IncidentChange) {
        // No receivers is fine; nobody is listening yet.
        let _ = self.changes.send(change);
    }

    fn pick_technician(&self, category: Category) -> Option<(&Technician, String)> {
        let available = || self.technicians.iter().filter(|t| t.is_available());

        if let Some(tech) = available().find(|t| t.skill == category.as_str()) {
            return Some((
                tech,
                format!(
                    "AI-selected: available technician with {} expertise",
                    category
                ),
            ));
        }

        available().next().map(|tech| {
            (
                tech,
                "AI-selected based on skill match and availability".to_string(),
            )
        })
    }
}

async fn simulate(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_incidents(&self) -> Result<Vec<Incident>, BackendError> {
        simulate(self.latency.list).await;
        Ok(self.incidents.read().clone())
    }

    async fn get_incident(&self, id: &str) -> Result<Option<Incident>, BackendError> {
        simulate(self.latency.get).await;
        Ok(self.incidents.read().iter().find(|i| i.id == id).cloned())
    }

    async fn submit_incident(&self, req: &NewIncident) -> Result<Incident, BackendError> {
        simulate(self.latency.submit).await;

        let (assigned_technician, assignment_reason) = match self.pick_technician(req.category) {
            Some((tech, reason)) => (Some(tech.name.clone()), Some(reason)),
            None => (None, None),
        };

        let incident = {
            let mut incidents = self.incidents.write();
            let next_seq = incidents
                .iter()
                .filter_map(Incident::sequence_number)
                .max()
                .unwrap_or(0)
                + 1;
            let now = Utc::now();

            let incident = Incident {
                id: format_incident_id(next_seq),
                title: req.title.clone(),
                description: req.description.clone(),
                location: req.location.clone(),
                category: req.category,
                priority: req.priority,
                status: IncidentStatus::Open,
                assigned_technician,
                assignment_reason,
                required_skill: Some(req.category.as_str().to_string()),
                sop_steps: Some(DEFAULT_SOP_STEPS.iter().map(|s| s.to_string()).collect()),
                created_by: None,
                created_at: now,
                updated_at: now,
            };
            incidents.insert(0, incident.clone());
            incident
        };

        info!(incident_id = %incident.id, priority = %incident.priority, "Incident submitted");
        self.notify(IncidentChange::Created(incident.id.clone()));
        Ok(incident)
    }

    async fn list_technicians(&self) -> Result<Vec<Technician>, BackendError> {
        simulate(self.latency.technicians).await;
        Ok(self.technicians.clone())
    }

    async fn chat_with_agent(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<String, BackendError> {
        simulate(self.latency.chat).await;
        let reply = self.responder.respond(message, history).await;
        debug!(history_len = history.len(), "Coordinator replied");
        Ok(reply)
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, BackendError> {
        simulate(self.latency.stats).await;
        let incidents = self.incidents.read();
        Ok(DashboardStats::compute(&incidents, &self.technicians))
    }

    fn subscribe_incident_changes(&self) -> Option<ChangeSubscription> {
        Some(ChangeSubscription::new(self.changes.subscribe()))
    }
}

fn steps(items: &[&str]) -> Option<Vec<String>> {
    Some(items.iter().map(|s| s.to_string()).collect())
}

pub fn seed_incidents() -> Vec<Incident> {
    let now = Utc::now();
    vec![
        Incident {
            id: "INC001".to_string(),
            title: "Network Router Malfunction".to_string(),
            description: "Main router in Plant A experiencing intermittent connectivity".to_string(),
            location: "Plant A".to_string(),
            category: Category::Networking,
            priority: Priority::High,
            status: IncidentStatus::InProgress,
            assigned_technician: Some("Simran Patel".to_string()),
            assignment_reason: Some(
                "Expert in networking with router configuration experience".to_string(),
            ),
            required_skill: Some("networking".to_string()),
            sop_steps: steps(&[
                "Verify physical connections and LED status",
                "Check router logs for error messages",
                "Test network connectivity with diagnostic tools",
                "Apply firmware updates if available",
                "Replace router if hardware failure detected",
            ]),
            created_by: None,
            created_at: now - ChronoDuration::hours(2),
            updated_at: now,
        },
        Incident {
            id: "INC002".to_string(),
            title: "Power Outage in Server Room".to_string(),
            description: "Backup generator failed to start during power outage".to_string(),
            location: "HQ Server Room".to_string(),
            category: Category::Electrical,
            priority: Priority::High,
            status: IncidentStatus::Open,
            assigned_technician: Some("Arun Kumar".to_string()),
            assignment_reason: Some("Specialized in electrical systems and backup power".to_string()),
            required_skill: Some("electrical".to_string()),
            sop_steps: steps(&[
                "Ensure safety protocols are followed",
                "Check generator fuel levels",
                "Test generator battery and connections",
                "Inspect automatic transfer switch",
                "Perform manual start test",
            ]),
            created_by: None,
            created_at: now - ChronoDuration::hours(4),
            updated_at: now,
        },
        Incident {
            id: "INC003".to_string(),
            title: "HVAC System Failure".to_string(),
            description: "Air conditioning not cooling in Plant B data center".to_string(),
            location: "Plant B".to_string(),
            category: Category::Mechanical,
            priority: Priority::Medium,
            status: IncidentStatus::Open,
            assigned_technician: Some("Rohan Das".to_string()),
            assignment_reason: Some("Experienced in HVAC maintenance and repair".to_string()),
            required_skill: Some("mechanical".to_string()),
            sop_steps: steps(&[
                "Check thermostat settings and sensors",
                "Inspect air filters and replace if needed",
                "Verify refrigerant levels",
                "Test compressor functionality",
                "Check electrical connections to HVAC unit",
            ]),
            created_by: None,
            created_at: now - ChronoDuration::hours(6),
            updated_at: now,
        },
    ]
}

pub fn seed_technicians() -> Vec<Technician> {
    let tech = |id: &str, name: &str, skill: &str, availability| Technician {
        id: id.to_string(),
        name: name.to_string(),
        skill: skill.to_string(),
        availability,
    };

    vec![
        tech("1", "Arun Kumar", "electrical", Availability::Available),
        tech("2", "Simran Patel", "networking", Availability::Busy),
        tech("3", "Rohan Das", "mechanical", Availability::Available),
        tech("4", "Aisha Khan", "security", Availability::Available),
        tech("5", "Vikram Singh", "IT support", Availability::Busy),
    ]
}
