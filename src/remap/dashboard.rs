// Dashboard template remapping

use crate::constants::DASHBOARD_VERSION;
use crate::error::{MigrationError, Result};
use crate::model::{id_or_new, Dashboard, DashboardButton};

use super::NameToIdMap;

/// Point every score and penalty card of `dashboard` at the run-wide id for
/// its name.
pub fn migrate_dashboard(
    dashboard: &mut Dashboard,
    scores: &NameToIdMap,
    penalties: &NameToIdMap,
) -> Result<()> {
    if dashboard.name.trim().is_empty() {
        return Err(MigrationError::Remap("Dashboard has no name".to_string()));
    }

    for button in &mut dashboard.buttons {
        match button {
            DashboardButton::Score(b) => b.score.id = scores.resolve(&b.score.name),
            DashboardButton::PenaltyCard(b) => {
                b.penalty_card.id = penalties.resolve(&b.penalty_card.name)
            }
            _ => {}
        }
    }

    dashboard.id = id_or_new(dashboard.id);
    dashboard.version = DASHBOARD_VERSION;
    Ok(())
}
