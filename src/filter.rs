//! Incident history filtering.
//!
//! A pure view over the store's list: the input is never mutated and the
//! relative order (most recent first) is preserved.

use serde::Deserialize;

use crate::domain::{Category, Incident, Priority};
use crate::error::ApiError;

/// Either every value or one exact value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T: PartialEq> Selection<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == value,
        }
    }
}

impl<T: std::str::FromStr<Err = String>> Selection<T> {
    /// `None`, an empty string or `"all"` select everything.
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::All),
            Some(s) if s.eq_ignore_ascii_case("all") => Ok(Self::All),
            Some(s) => s.parse().map(Self::Only),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Case-insensitive substring of the title or the id
    pub search: String,
    pub priority: Selection<Priority>,
    pub category: Selection<Category>,
}

impl HistoryFilter {
    pub fn matches(&self, incident: &Incident) -> bool {
        self.matches_search(incident)
            && self.priority.matches(&incident.priority)
            && self.category.matches(&incident.category)
    }

    fn matches_search(&self, incident: &Incident) -> bool {
        let needle = self.search.to_lowercase();
        needle.is_empty()
            || incident.title.to_lowercase().contains(&needle)
            || incident.id.to_lowercase().contains(&needle)
    }

    pub fn apply(&self, incidents: &[Incident]) -> Vec<Incident> {
        incidents
            .iter()
            .filter(|incident| self.matches(incident))
            .cloned()
            .collect()
    }
}

/// Raw query-string form of a [`HistoryFilter`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl TryFrom<HistoryQuery> for HistoryFilter {
    type Error = ApiError;

    fn try_from(query: HistoryQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            search: query.search.unwrap_or_default(),
            priority: Selection::parse(query.priority.as_deref()).map_err(ApiError::BadRequest)?,
            category: Selection::parse(query.category.as_deref()).map_err(ApiError::BadRequest)?,
        })
    }
}
