// src/storage/schema.rs — Schema + migrations

use rusqlite::{params, Connection};
use tracing::info;

/// A database migration with version, name, and SQL statements.
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub up: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "sessions",
        up: include_str!("migrations/001_sessions.up.sql"),
    },
    Migration {
        version: 2,
        name: "cut_number",
        up: include_str!("migrations/002_cut_number.up.sql"),
    },
];

/// Highest version this build knows about.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let mut current_version = schema_version(conn)?;

    if current_version == 0 {
        if let Some(detected) = detect_unversioned_schema(conn)? {
            baseline(conn, detected)?;
            current_version = detected;
        }
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        info!(
            "Applying migration {}: {}",
            migration.version, migration.name
        );

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.up)?;
        tx.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
    }

    Ok(())
}

pub fn schema_version(conn: &Connection) -> anyhow::Result<u32> {
    let version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;
    Ok(version)
}

/// Column names of `table`, empty when the table does not exist.
pub fn table_columns(conn: &Connection, table: &str) -> anyhow::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let rows = stmt.query_map(params![table], |row| row.get::<_, String>(0))?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}

/// A `sessions` table created before version tracking existed. Its columns
/// tell which migrations it already has.
fn detect_unversioned_schema(conn: &Connection) -> anyhow::Result<Option<u32>> {
    let columns = table_columns(conn, "sessions")?;
    if columns.is_empty() {
        return Ok(None);
    }
    let version = if columns.iter().any(|c| c == "cut_number") {
        2
    } else {
        1
    };
    Ok(Some(version))
}

fn baseline(conn: &Connection, version: u32) -> anyhow::Result<()> {
    info!("Found unversioned sessions table, baselining at version {version}");

    let tx = conn.unchecked_transaction()?;
    // Migration 1 is all IF NOT EXISTS; rerunning it adds any missing index.
    tx.execute_batch(MIGRATIONS[0].up)?;
    for migration in MIGRATIONS.iter().filter(|m| m.version <= version) {
        tx.execute(
            "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
    }
    tx.commit()?;
    Ok(())
}
