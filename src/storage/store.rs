// src/storage/store.rs — SQLite operations on session records

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::upstream::Session;

const SESSION_COLUMNS: &str = "session_id, owner_id, owner_name, stream_token, started_at_ms,
     title, duration_ms, playback_url, playback_backup_url, cut_number";

/// Low-level SQLite operations. Not shared directly; see `StoreHandle`.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Insert the session unless its id is already stored.
    ///
    /// Returns whether a row was written. A duplicate is not an error.
    pub fn upsert(&self, session: &Session) -> anyhow::Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO sessions (session_id, owner_id, owner_name, stream_token,
             started_at_ms, title, duration_ms, playback_url, playback_backup_url, cut_number)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                session.session_id,
                session.owner_id,
                session.owner_name,
                session.stream_token,
                session.started_at_ms,
                session.title,
                session.duration_ms,
                session.playback_url,
                session.playback_backup_url,
                session.cut_number
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Set the duration if it is still zero. Returns whether it changed.
    pub fn update_duration(&self, session_id: &str, duration_ms: i64) -> anyhow::Result<bool> {
        if duration_ms == 0 {
            return Ok(false);
        }
        let changed = self.conn.execute(
            "UPDATE sessions SET duration_ms = ?1 WHERE session_id = ?2 AND duration_ms = 0",
            params![duration_ms, session_id],
        )?;
        Ok(changed > 0)
    }

    /// Set the cut number if it is still zero. Returns whether it changed.
    pub fn update_cut_number(&self, session_id: &str, cut_number: i64) -> anyhow::Result<bool> {
        if cut_number == 0 {
            return Ok(false);
        }
        let changed = self.conn.execute(
            "UPDATE sessions SET cut_number = ?1 WHERE session_id = ?2 AND cut_number = 0",
            params![cut_number, session_id],
        )?;
        Ok(changed > 0)
    }

    /// Fill both recording URLs, only if both are still empty.
    pub fn update_playback(
        &self,
        session_id: &str,
        playback_url: &str,
        playback_backup_url: &str,
    ) -> anyhow::Result<bool> {
        if playback_url.is_empty() || playback_backup_url.is_empty() {
            return Ok(false);
        }
        let changed = self.conn.execute(
            "UPDATE sessions SET playback_url = ?1, playback_backup_url = ?2
             WHERE session_id = ?3 AND playback_url = '' AND playback_backup_url = ''",
            params![playback_url, playback_backup_url, session_id],
        )?;
        Ok(changed > 0)
    }

    /// Sessions of one owner, newest first. A negative limit means no limit.
    pub fn list_by_owner(&self, owner_id: i64, limit: i64) -> anyhow::Result<Vec<Session>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE owner_id = ?1
             ORDER BY started_at_ms DESC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        // SQLite treats any negative LIMIT as unbounded
        let rows = stmt.query_map(params![owner_id, limit.max(-1)], session_from_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn get(&self, session_id: &str) -> anyhow::Result<Option<Session>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = ?1");
        let session = self
            .conn
            .query_row(&sql, params![session_id], session_from_row)
            .optional()?;
        Ok(session)
    }

    pub fn exists(&self, session_id: &str) -> anyhow::Result<bool> {
        let found: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE session_id = ?1)",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    pub fn count(&self) -> anyhow::Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        session_id: row.get(0)?,
        owner_id: row.get(1)?,
        owner_name: row.get(2)?,
        stream_token: row.get(3)?,
        started_at_ms: row.get(4)?,
        title: row.get(5)?,
        duration_ms: row.get(6)?,
        playback_url: row.get(7)?,
        playback_backup_url: row.get(8)?,
        cut_number: row.get(9)?,
    })
}
