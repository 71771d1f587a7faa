//! Technician domain types

use serde::{Deserialize, Serialize};

/// Technician availability
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Busy,
}

/// Technician entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Technician {
    pub id: String,
    pub name: String,
    /// Free-form skill, usually matching an incident category
    pub skill: String,
    pub availability: Availability,
}

impl Technician {
    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }
}
