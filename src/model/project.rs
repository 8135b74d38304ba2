// Project aggregate: one analysed match

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Dashboard, PenaltyCard, Score, Team};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Project {
    #[serde(rename = "ID", default)]
    pub id: Uuid,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub description: ProjectDescription,
    pub local_team_template: Team,
    pub visitor_team_template: Team,
    pub dashboard: Dashboard,
    #[serde(default)]
    pub event_types: Vec<EventType>,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum EventType {
    #[serde(rename = "AnalysisEventType")]
    Analysis(AnalysisEventType),
    #[serde(rename = "ScoreEventType")]
    Score(ScoreEventType),
    #[serde(rename = "PenaltyCardEventType")]
    PenaltyCard(PenaltyCardEventType),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalysisEventType {
    #[serde(rename = "ID", default)]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScoreEventType {
    #[serde(rename = "ID", default)]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PenaltyCardEventType {
    #[serde(rename = "ID", default)]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub penalty_card: PenaltyCard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimelineEvent {
    #[serde(rename = "ID", default)]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    /// Name of the event type
    #[serde(default)]
    pub event_type: String,
    /// Team ids this event is tagged with
    #[serde(default)]
    pub teams: Vec<Uuid>,
    #[serde(default)]
    pub players: Vec<Uuid>,
    /// Start position in milliseconds
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub stop: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl EventType {
    pub fn id(&self) -> Uuid {
        match self {
            EventType::Analysis(e) => e.id,
            EventType::Score(e) => e.id,
            EventType::PenaltyCard(e) => e.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EventType::Analysis(e) => &e.name,
            EventType::Score(e) => &e.name,
            EventType::PenaltyCard(e) => &e.name,
        }
    }
}

impl Project {
    /// Human readable title used in progress messages and listings.
    pub fn title(&self) -> String {
        if let Some(title) = self.description.title.as_deref().filter(|t| !t.is_empty()) {
            return title.to_string();
        }
        let local = self
            .description
            .local_name
            .as_deref()
            .unwrap_or(&self.local_team_template.name);
        let visitor = self
            .description
            .visitor_name
            .as_deref()
            .unwrap_or(&self.visitor_team_template.name);
        format!("{} vs {}", local, visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_PROJECT: &str = r#"{
        "ID": "6a2f1f1c-1b7e-4c55-9a51-0d4f5a1b2c3d",
        "Version": 0,
        "Description": {"Competition": "League", "LocalName": "Eagles", "VisitorName": "Hawks",
                        "MatchDate": "2023-05-01T18:00:00Z"},
        "LocalTeamTemplate": {"ID": "11111111-1111-1111-1111-111111111111", "Name": "Eagles",
                              "List": [{"Name": "Ann", "Number": 9}]},
        "VisitorTeamTemplate": {"Name": "Hawks"},
        "Dashboard": {"Name": "Football", "List": []},
        "EventTypes": [
            {"$type": "AnalysisEventType", "Name": "Shot"},
            {"$type": "ScoreEventType", "Name": "Goal", "Score": {"Name": "Goal", "Points": 1}}
        ],
        "Timeline": [
            {"Name": "Shot 1", "EventType": "Shot",
             "Teams": ["11111111-1111-1111-1111-111111111111"], "Start": 1000, "Stop": 5000}
        ]
    }"#;

    #[test]
    fn test_parse_legacy_project() {
        let project: Project = serde_json::from_str(LEGACY_PROJECT).unwrap();
        assert_eq!(project.local_team_template.players.len(), 1);
        assert!(project.visitor_team_template.id.is_nil());
        assert_eq!(project.event_types[1].name(), "Goal");
        assert_eq!(project.timeline[0].stop, 5000);
        assert!(project.description.match_date.is_some());
    }

    #[test]
    fn test_title_falls_back_to_team_names() {
        let mut project: Project = serde_json::from_str(LEGACY_PROJECT).unwrap();
        assert_eq!(project.title(), "Eagles vs Hawks");

        project.description.title = Some("Final".to_string());
        assert_eq!(project.title(), "Final");
    }
}
