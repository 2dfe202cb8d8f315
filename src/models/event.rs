use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::utils::time::datetime_ddmmyyyy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventState {
    Open,
    Closed,
    Settled,
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventState::Open => write!(f, "OPEN"),
            EventState::Closed => write!(f, "CLOSED"),
            EventState::Settled => write!(f, "SETTLED"),
        }
    }
}

/// A real-world event that one or more binary markets trade on. The trading
/// engine only ever reads the identifier and lifecycle state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub state: EventState,
    #[serde(serialize_with = "datetime_ddmmyyyy::serialize")]
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(title: String, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            state: EventState::Open,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: String,
}
