// Team template remapping

use crate::constants::TEAM_VERSION;
use crate::error::{MigrationError, Result};
use crate::model::{id_or_new, Team};

use super::NameToIdMap;

/// Give `team` the run-wide id for its name and fill missing player ids.
/// Returns the id the team had before remapping.
pub fn migrate_team(team: &mut Team, teams: &NameToIdMap) -> Result<uuid::Uuid> {
    if team.name.trim().is_empty() {
        return Err(MigrationError::Remap("Team has no name".to_string()));
    }

    let old_id = team.id;
    team.id = teams.register(&team.name, id_or_new(team.id));

    for player in &mut team.players {
        player.id = id_or_new(player.id);
    }

    team.version = TEAM_VERSION;
    Ok(old_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Player;
    use uuid::Uuid;

    #[test]
    fn test_known_name_takes_registered_id() {
        let teams = NameToIdMap::new();
        let registered = Uuid::new_v4();
        teams.register("Eagles", registered);

        let mut team = Team::new("Eagles");
        let old = migrate_team(&mut team, &teams).unwrap();

        assert_ne!(old, registered);
        assert_eq!(team.id, registered);
        assert_eq!(team.version, TEAM_VERSION);
    }

    #[test]
    fn test_nil_ids_are_filled() {
        let teams = NameToIdMap::new();
        let mut team = Team::new("Hawks");
        team.id = Uuid::nil();
        team.players.push(Player {
            id: Uuid::nil(),
            name: "Bo".to_string(),
            last_name: None,
            number: 4,
            position: None,
        });

        migrate_team(&mut team, &teams).unwrap();

        assert!(!team.id.is_nil());
        assert!(!team.players[0].id.is_nil());
        assert_eq!(teams.get("Hawks"), Some(team.id));
    }

    #[test]
    fn test_unnamed_team_fails() {
        let teams = NameToIdMap::new();
        let mut team = Team::new("  ");
        assert!(matches!(
            migrate_team(&mut team, &teams),
            Err(MigrationError::Remap(_))
        ));
    }
}
