//! Dashboard aggregates
//!
//! Stats are never stored; they are recomputed from the current incident
//! and technician collections on every request.

use serde::{Deserialize, Serialize};

use super::incidents::{Incident, IncidentStatus, Priority};
use super::technicians::Technician;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_incidents: usize,
    pub high_priority_incidents: usize,
    pub available_technicians: usize,
    /// Display string, e.g. `"2.5 hrs"`
    pub avg_resolution_time: String,
}

impl DashboardStats {
    pub fn compute(incidents: &[Incident], technicians: &[Technician]) -> Self {
        Self {
            total_incidents: incidents.len(),
            high_priority_incidents: incidents
                .iter()
                .filter(|i| i.priority == Priority::High)
                .count(),
            available_technicians: technicians.iter().filter(|t| t.is_available()).count(),
            avg_resolution_time: average_resolution(incidents),
        }
    }
}

fn average_resolution(incidents: &[Incident]) -> String {
    let durations: Vec<i64> = incidents
        .iter()
        .filter(|i| i.status == IncidentStatus::Closed)
        .map(|i| (i.updated_at - i.created_at).num_seconds().max(0))
        .collect();

    if durations.is_empty() {
        return "N/A".to_string();
    }

    let mean_secs = durations.iter().sum::<i64>() as f64 / durations.len() as f64;
    format!("{:.1} hrs", mean_secs / 3600.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::incidents::Category;
    use crate::domain::technicians::Availability;
    use chrono::{Duration, Utc};

    fn incident(id: &str, priority: Priority, status: IncidentStatus, hours: i64) -> Incident {
        let created = Utc::now() - Duration::hours(hours);
        Incident {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            location: String::new(),
            category: Category::Other,
            priority,
            status,
            assigned_technician: None,
            assignment_reason: None,
            required_skill: None,
            sop_steps: None,
            created_by: None,
            created_at: created,
            updated_at: created + Duration::hours(hours),
        }
    }

    #[test]
    fn counts_and_average() {
        let incidents = vec![
            incident("INC001", Priority::High, IncidentStatus::Closed, 2),
            incident("INC002", Priority::High, IncidentStatus::Open, 1),
            incident("INC003", Priority::Low, IncidentStatus::Closed, 3),
        ];
        let technicians = vec![
            Technician {
                id: "1".into(),
                name: "A".into(),
                skill: "electrical".into(),
                availability: Availability::Available,
            },
            Technician {
                id: "2".into(),
                name: "B".into(),
                skill: "networking".into(),
                availability: Availability::Busy,
            },
        ];

        let stats = DashboardStats::compute(&incidents, &technicians);
        assert_eq!(stats.total_incidents, 3);
        assert_eq!(stats.high_priority_incidents, 2);
        assert_eq!(stats.available_technicians, 1);
        assert_eq!(stats.avg_resolution_time, "2.5 hrs");
    }

    #[test]
    fn no_closed_incidents() {
        let incidents = vec![incident("INC001", Priority::Low, IncidentStatus::Open, 1)];
        let stats = DashboardStats::compute(&incidents, &[]);
        assert_eq!(stats.avg_resolution_time, "N/A");
    }
}
