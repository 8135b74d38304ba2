// Document store schema migrations
// Migrations are forward-only. Never edit or delete a migration after it ships.

use rusqlite::Connection;

use crate::error::{MigrationError, Result};

/// All migrations in order. Each migration is a SQL string.
const MIGRATIONS: &[&str] = &[
    // Migration 1: Documents and storage info
    r#"
    -- One row per stored aggregate, content addressed by its BLAKE3 digest
    CREATE TABLE documents (
        id TEXT PRIMARY KEY NOT NULL,
        doc_type TEXT NOT NULL,
        name TEXT NOT NULL DEFAULT '',
        content TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    -- Single-row store metadata
    CREATE TABLE storage_info (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        name TEXT NOT NULL,
        version_major INTEGER NOT NULL,
        version_minor INTEGER NOT NULL,
        last_backup TEXT NOT NULL,
        last_cleanup TEXT NOT NULL
    );

    CREATE INDEX idx_documents_type ON documents(doc_type);
    CREATE INDEX idx_documents_type_name ON documents(doc_type, name);
    CREATE INDEX idx_documents_hash ON documents(content_hash);
    "#,
];

/// Get current schema version from database
fn get_schema_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row(
        "PRAGMA user_version",
        [],
        |row| row.get(0)
    )?;
    Ok(version)
}

/// Run all pending migrations (crash-safe)
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    let target_version = MIGRATIONS.len() as u32;

    // Refuse to open a store created by a newer build
    if current_version > target_version {
        return Err(MigrationError::SchemaTooNew {
            found: current_version,
            supported: target_version,
        });
    }

    if current_version == target_version {
        return Ok(());
    }

    // Apply pending migrations one-by-one, each in its own transaction
    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as u32;
        if migration_version <= current_version {
            continue;
        }

        conn.execute_batch(&format!(
            "BEGIN;\n{}\nPRAGMA user_version = {};\nCOMMIT;",
            migration, migration_version
        ))?;

        log::debug!("Applied store migration {}", migration_version);
    }

    Ok(())
}
