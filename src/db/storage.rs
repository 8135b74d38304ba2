// Document storage: one SQLite file per logical database

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    COMPACT_AFTER_DAYS, DB_MAJOR_VERSION, DB_MINOR_VERSION, DOC_TYPE_DASHBOARD, DOC_TYPE_PROJECT,
    DOC_TYPE_TEAM,
};
use crate::error::{MigrationError, Result};
use crate::hash::compute_document_hash;
use crate::model::{Dashboard, Project, Team};

use super::migrations;

/// An aggregate that can be stored as a single document.
pub trait Document: Serialize + DeserializeOwned {
    const DOC_TYPE: &'static str;

    fn id(&self) -> Uuid;

    /// Name used for lookups by name
    fn name(&self) -> String;
}

impl Document for Project {
    const DOC_TYPE: &'static str = DOC_TYPE_PROJECT;

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> String {
        self.title()
    }
}

impl Document for Team {
    const DOC_TYPE: &'static str = DOC_TYPE_TEAM;

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

impl Document for Dashboard {
    const DOC_TYPE: &'static str = DOC_TYPE_DASHBOARD;

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub name: String,
    pub version_major: u32,
    pub version_minor: u32,
    pub last_backup: DateTime<Utc>,
    pub last_cleanup: DateTime<Utc>,
}

pub struct Storage {
    name: String,
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

impl Storage {
    /// Open or create the store file at `path`.
    pub fn open(path: &Path, name: &str) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode so readers do not block the migration writer
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;

        Self::init(conn, name, Some(path.to_path_buf()))
    }

    /// In-memory store, used by tests and dry runs.
    pub fn open_in_memory(name: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, name, None)
    }

    fn init(conn: Connection, name: &str, path: Option<PathBuf>) -> Result<Self> {
        migrations::run_migrations(&conn)?;

        let storage = Self {
            name: name.to_string(),
            path,
            conn: Mutex::new(conn),
        };
        let info = storage.fetch_info()?;
        storage.compact_if_stale(&info)?;
        Ok(storage)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| MigrationError::Other(format!("Storage {} lock poisoned", self.name)))
    }

    /// Load the info row, creating it on first open.
    fn fetch_info(&self) -> Result<StorageInfo> {
        if let Some(info) = self.info()? {
            return Ok(info);
        }

        let now = Utc::now();
        let info = StorageInfo {
            name: self.name.clone(),
            version_major: DB_MAJOR_VERSION,
            version_minor: DB_MINOR_VERSION,
            last_backup: now,
            last_cleanup: now,
        };
        self.conn()?.execute(
            "INSERT INTO storage_info (id, name, version_major, version_minor, last_backup, last_cleanup)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                info.name,
                info.version_major,
                info.version_minor,
                info.last_backup.to_rfc3339(),
                info.last_cleanup.to_rfc3339(),
            ],
        )?;
        Ok(info)
    }

    pub fn info(&self) -> Result<Option<StorageInfo>> {
        let row = self.conn()?.query_row(
            "SELECT name, version_major, version_minor, last_backup, last_cleanup
             FROM storage_info WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        ).optional()?;

        let Some((name, version_major, version_minor, last_backup, last_cleanup)) = row else {
            return Ok(None);
        };

        Ok(Some(StorageInfo {
            name,
            version_major,
            version_minor,
            last_backup: parse_timestamp(&last_backup)?,
            last_cleanup: parse_timestamp(&last_cleanup)?,
        }))
    }

    fn compact_if_stale(&self, info: &StorageInfo) -> Result<()> {
        if (Utc::now() - info.last_cleanup).num_days() <= COMPACT_AFTER_DAYS {
            return Ok(());
        }

        log::info!("Compacting store {}", self.name);
        let conn = self.conn()?;
        conn.execute_batch("VACUUM;")?;
        conn.execute(
            "UPDATE storage_info SET last_cleanup = ?1 WHERE id = 1",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Insert or update a document. Returns `false` when the stored content
    /// already has the same digest and nothing was written.
    pub fn store<T: Document>(&self, doc: &T) -> Result<bool> {
        let content = serde_json::to_string(doc)?;
        let content_hash = compute_document_hash(content.as_bytes());

        let changed = self.conn()?.execute(
            "INSERT INTO documents (id, doc_type, name, content, content_hash)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                doc_type = excluded.doc_type,
                name = excluded.name,
                content = excluded.content,
                content_hash = excluded.content_hash,
                updated_at = datetime('now')
             WHERE documents.content_hash != excluded.content_hash",
            params![doc.id().to_string(), T::DOC_TYPE, doc.name(), content, content_hash],
        )?;
        Ok(changed > 0)
    }

    pub fn store_project(&self, project: &Project) -> Result<bool> {
        log::debug!("Storing project {} in {}", project.id, self.name);
        self.store(project)
    }

    pub fn retrieve<T: Document>(&self, id: Uuid) -> Result<Option<T>> {
        let content: Option<String> = self.conn()?.query_row(
            "SELECT content FROM documents WHERE id = ?1 AND doc_type = ?2",
            params![id.to_string(), T::DOC_TYPE],
            |row| row.get(0),
        ).optional()?;

        match content {
            Some(c) => Ok(Some(serde_json::from_str(&c)?)),
            None => Ok(None),
        }
    }

    pub fn retrieve_all<T: Document>(&self) -> Result<Vec<T>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT content FROM documents WHERE doc_type = ?1 ORDER BY name, id"
        )?;

        let contents = stmt.query_map(params![T::DOC_TYPE], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        contents
            .iter()
            .map(|c| serde_json::from_str(c).map_err(MigrationError::from))
            .collect()
    }

    pub fn find_by_name<T: Document>(&self, name: &str) -> Result<Option<T>> {
        let content: Option<String> = self.conn()?.query_row(
            "SELECT content FROM documents WHERE doc_type = ?1 AND name = ?2
             ORDER BY created_at, id LIMIT 1",
            params![T::DOC_TYPE, name],
            |row| row.get(0),
        ).optional()?;

        match content {
            Some(c) => Ok(Some(serde_json::from_str(&c)?)),
            None => Ok(None),
        }
    }

    pub fn count<T: Document>(&self) -> Result<i64> {
        let count = self.conn()?.query_row(
            "SELECT COUNT(*) FROM documents WHERE doc_type = ?1",
            params![T::DOC_TYPE],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn delete<T: Document>(&self, id: Uuid) -> Result<bool> {
        let deleted = self.conn()?.execute(
            "DELETE FROM documents WHERE id = ?1 AND doc_type = ?2",
            params![id.to_string(), T::DOC_TYPE],
        )?;
        Ok(deleted > 0)
    }

    /// (name, id) of every team referenced by stored projects, oldest first.
    pub fn team_references(&self) -> Result<Vec<(String, Uuid)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT content FROM documents WHERE doc_type = ?1 ORDER BY created_at, id"
        )?;
        let contents = stmt.query_map(params![DOC_TYPE_PROJECT], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut refs = Vec::new();
        for content in contents {
            let project: Project = serde_json::from_str(&content)?;
            for team in [project.local_team_template, project.visitor_team_template] {
                if !team.id.is_nil() {
                    refs.push((team.name, team.id));
                }
            }
        }
        Ok(refs)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MigrationError::Other(format!("Invalid timestamp {:?}: {}", value, e)))
}
