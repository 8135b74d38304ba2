// Dashboard templates (analysis button layouts)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PenaltyCard, Score};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dashboard {
    #[serde(rename = "ID", default)]
    pub id: Uuid,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub game_periods: Vec<String>,
    #[serde(rename = "List", default)]
    pub buttons: Vec<DashboardButton>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum DashboardButton {
    #[serde(rename = "AnalysisEventButton")]
    Analysis(AnalysisEventButton),
    #[serde(rename = "ScoreButton")]
    Score(ScoreButton),
    #[serde(rename = "PenaltyCardButton")]
    PenaltyCard(PenaltyCardButton),
    #[serde(rename = "TagButton")]
    Tag(TagButton),
    #[serde(rename = "TimerButton")]
    Timer(TimerButton),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalysisEventButton {
    #[serde(default)]
    pub name: String,
    /// Name of the event type this button creates
    #[serde(default)]
    pub event_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScoreButton {
    #[serde(default)]
    pub name: String,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PenaltyCardButton {
    #[serde(default)]
    pub name: String,
    pub penalty_card: PenaltyCard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagButton {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimerButton {
    #[serde(default)]
    pub name: String,
}

impl Dashboard {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            version: 0,
            name: name.into(),
            game_periods: vec!["1".to_string(), "2".to_string()],
            buttons: Vec::new(),
        }
    }

    pub fn scores(&self) -> impl Iterator<Item = &Score> {
        self.buttons.iter().filter_map(|b| match b {
            DashboardButton::Score(s) => Some(&s.score),
            _ => None,
        })
    }

    pub fn penalty_cards(&self) -> impl Iterator<Item = &PenaltyCard> {
        self.buttons.iter().filter_map(|b| match b {
            DashboardButton::PenaltyCard(p) => Some(&p.penalty_card),
            _ => None,
        })
    }
}
