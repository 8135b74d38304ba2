// Legacy domain aggregates
//
// These mirror the JSON written by file-based releases: PascalCase keys, GUID
// identifiers (nil means "not assigned") and a `$type` discriminator on
// polymorphic entries. Unknown keys are ignored so older files still load.

pub mod dashboard;
pub mod project;
pub mod team;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use dashboard::{Dashboard, DashboardButton};
pub use project::{EventType, Project, ProjectDescription, TimelineEvent};
pub use team::{Player, Team};

/// A score value that dashboards and score event types refer to by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Score {
    #[serde(rename = "ID", default)]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub points: i32,
}

/// A penalty card (yellow card, red card...) referred to by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PenaltyCard {
    #[serde(rename = "ID", default)]
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
}

/// Returns `id` unless it is nil, in which case a fresh identifier is generated.
pub fn id_or_new(id: Uuid) -> Uuid {
    if id.is_nil() {
        Uuid::new_v4()
    } else {
        id
    }
}
