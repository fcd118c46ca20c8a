use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Workload status reported by a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusName {
    Active,
    Blocked,
}

impl std::fmt::Display for StatusName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusName::Active => write!(f, "active"),
            StatusName::Blocked => write!(f, "blocked"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStatus {
    pub name: StatusName,
    #[serde(default)]
    pub message: String,
}

impl UnitStatus {
    pub fn active() -> Self {
        Self {
            name: StatusName::Active,
            message: String::new(),
        }
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self {
            name: StatusName::Blocked,
            message: message.into(),
        }
    }
}

/// A status as persisted, with the time it was set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitStatusRecord {
    pub unit: String,
    pub status: UnitStatus,
    pub updated_at: DateTime<Utc>,
}
