//! Incident domain types
//!
//! Incidents are reported problems that need technician action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Incident category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    #[serde(rename = "electrical")]
    Electrical,
    #[serde(rename = "networking")]
    Networking,
    #[serde(rename = "mechanical")]
    Mechanical,
    #[serde(rename = "security")]
    Security,
    #[serde(rename = "IT support")]
    ItSupport,
    #[serde(rename = "other")]
    Other,
}

impl Default for Category {
    fn default() -> Self {
        Self::Other
    }
}

impl Category {
    pub const ALL: [Category; 6] = [
        Self::Electrical,
        Self::Networking,
        Self::Mechanical,
        Self::Security,
        Self::ItSupport,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electrical => "electrical",
            Self::Networking => "networking",
            Self::Mechanical => "mechanical",
            Self::Security => "security",
            Self::ItSupport => "IT support",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// Incident priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("unknown priority '{}'", s)),
        }
    }
}

/// Incident status
///
/// Any status may replace any other; no transitions are enforced here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum IncidentStatus {
    Open,
    InProgress,
    Closed,
}

impl Default for IncidentStatus {
    fn default() -> Self {
        Self::Open
    }
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incident entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// `INC###` identifier assigned by the backing service
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub category: Category,
    pub priority: Priority,
    pub status: IncidentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_technician: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_skill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sop_steps: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    /// Numeric part of an `INC###` id, if the id follows that format.
    pub fn sequence_number(&self) -> Option<u32> {
        self.id.strip_prefix("INC")?.parse().ok()
    }
}

/// Format a sequence number as an incident id (`INC001`).
pub fn format_incident_id(seq: u32) -> String {
    format!("INC{:03}", seq)
}

/// Request DTO for submitting an incident
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewIncident {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
}

impl NewIncident {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_uses_display_strings_on_the_wire() {
        let json = serde_json::to_string(&Category::ItSupport).unwrap();
        assert_eq!(json, "\"IT support\"");

        let parsed: Category = serde_json::from_str("\"networking\"").unwrap();
        assert_eq!(parsed, Category::Networking);
    }

    #[test]
    fn status_is_kebab_case() {
        let json = serde_json::to_string(&IncidentStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }

    #[test]
    fn parses_filter_values() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("it support".parse::<Category>().unwrap(), Category::ItSupport);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn sequence_number_from_id() {
        assert_eq!(format_incident_id(7), "INC007");
        assert_eq!(format_incident_id(1234), "INC1234");

        let now = Utc::now();
        let incident = Incident {
            id: "INC042".to_string(),
            title: "t".to_string(),
            description: String::new(),
            location: String::new(),
            category: Category::Other,
            priority: Priority::Low,
            status: IncidentStatus::Open,
            assigned_technician: None,
            assignment_reason: None,
            required_skill: None,
            sop_steps: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(incident.sequence_number(), Some(42));
    }

    #[test]
    fn new_incident_defaults_and_validation() {
        let req: NewIncident = serde_json::from_str(r#"{"title":"Leak"}"#).unwrap();
        assert_eq!(req.category, Category::Other);
        assert_eq!(req.priority, Priority::Medium);
        assert!(req.validate().is_ok());

        let blank = NewIncident {
            title: "   ".to_string(),
            ..req
        };
        assert!(blank.validate().is_err());
    }
}
