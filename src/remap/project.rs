// Project remapping: rewrites every foreign key of a loaded project

use std::collections::HashMap;
use uuid::Uuid;

use crate::constants::PROJECT_VERSION;
use crate::error::Result;
use crate::model::{id_or_new, EventType, Project};

use super::{migrate_dashboard, migrate_team, IdMaps};

/// Rewrite teams, dashboard, scores and penalty cards of `project` using the
/// run-wide maps. Team names must already be registered for the whole legacy
/// database before this runs.
pub fn migrate_project(project: &mut Project, maps: &IdMaps) -> Result<()> {
    let mut team_ids: HashMap<Uuid, Uuid> = HashMap::new();

    for team in [&mut project.local_team_template, &mut project.visitor_team_template] {
        let old_id = migrate_team(team, &maps.teams)?;
        if !old_id.is_nil() {
            team_ids.insert(old_id, team.id);
        }
    }

    migrate_dashboard(&mut project.dashboard, &maps.scores, &maps.penalties)?;
    project.dashboard.id = maps
        .dashboards
        .register(&project.dashboard.name, project.dashboard.id);

    for event_type in &mut project.event_types {
        match event_type {
            EventType::Analysis(e) => e.id = id_or_new(e.id),
            EventType::Score(e) => {
                e.id = id_or_new(e.id);
                e.score.id = maps.scores.resolve(&e.score.name);
            }
            EventType::PenaltyCard(e) => {
                e.id = id_or_new(e.id);
                e.penalty_card.id = maps.penalties.resolve(&e.penalty_card.name);
            }
        }
    }

    for event in &mut project.timeline {
        event.id = id_or_new(event.id);
        for team in &mut event.teams {
            if let Some(new_id) = team_ids.get(team) {
                *team = *new_id;
            }
        }
    }

    project.id = id_or_new(project.id);
    project.version = PROJECT_VERSION;
    Ok(())
}
