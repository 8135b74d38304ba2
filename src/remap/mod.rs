// Name -> identifier resolution shared by every aggregate of one migration run

pub mod dashboard;
pub mod project;
pub mod team;

use dashmap::DashMap;
use uuid::Uuid;

pub use dashboard::migrate_dashboard;
pub use project::migrate_project;
pub use team::migrate_team;

/// Thread-safe name -> id table. The first id stored for a name wins; later
/// registrations of the same name get the existing id back.
#[derive(Debug, Default)]
pub struct NameToIdMap {
    entries: DashMap<String, Uuid>,
}

impl NameToIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, allocating a fresh one if the name was never seen.
    pub fn resolve(&self, name: &str) -> Uuid {
        *self
            .entries
            .entry(name.to_string())
            .or_insert_with(Uuid::new_v4)
    }

    /// Store `id` for `name` unless the name is already known.
    /// Returns the id the name resolves to afterwards.
    pub fn register(&self, name: &str, id: Uuid) -> Uuid {
        *self.entries.entry(name.to_string()).or_insert(id)
    }

    pub fn get(&self, name: &str) -> Option<Uuid> {
        self.entries.get(name).map(|e| *e.value())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The four tables of a run. Created once per `DatabaseMigration` and passed
/// by reference into every phase.
#[derive(Debug, Default)]
pub struct IdMaps {
    pub scores: NameToIdMap,
    pub penalties: NameToIdMap,
    pub teams: NameToIdMap,
    pub dashboards: NameToIdMap,
}

impl IdMaps {
    pub fn new() -> Self {
        Self::default()
    }
}
