//! Session record store.
//!
//! One SQLite table of historical sessions. Writes happen at session
//! create/end only, so a plain mutex around the connection is plenty; the
//! poll loop never blocks on it mid-tick.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

/// Lifecycle status of a recorded session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Ended,
    Crashed,
    /// Was `active` when the bridge went down; recovered on startup.
    Lost,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
            SessionStatus::Crashed => "crashed",
            SessionStatus::Lost => "lost",
        }
    }

    fn from_str(value: &str) -> Self {
        match value {
            "active" => SessionStatus::Active,
            "crashed" => SessionStatus::Crashed,
            "lost" => SessionStatus::Lost,
            _ => SessionStatus::Ended,
        }
    }
}

/// One row of the sessions table.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: i64,
    pub project: String,
    pub project_path: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub exit_code: Option<i64>,
    pub status: SessionStatus,
}

pub struct SessionStore {
    conn: Mutex<Connection>,
}

impl SessionStore {
    /// Open (creating parent directories and the schema as needed).
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id           TEXT PRIMARY KEY,
                user_id      INTEGER NOT NULL,
                project      TEXT NOT NULL,
                project_path TEXT NOT NULL,
                started_at   TEXT NOT NULL,
                ended_at     TEXT,
                exit_code    INTEGER,
                status       TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id, started_at);",
        )?;
        Ok(SessionStore {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id           TEXT PRIMARY KEY,
                user_id      INTEGER NOT NULL,
                project      TEXT NOT NULL,
                project_path TEXT NOT NULL,
                started_at   TEXT NOT NULL,
                ended_at     TEXT,
                exit_code    INTEGER,
                status       TEXT NOT NULL
            );",
        )?;
        Ok(SessionStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn create(&self, id: &str, user_id: i64, project: &str, project_path: &str) -> Result<()> {
        let conn = self.conn.lock().expect("sessions db poisoned");
        conn.execute(
            "INSERT INTO sessions (id, user_id, project, project_path, started_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                user_id,
                project,
                project_path,
                chrono::Utc::now().to_rfc3339(),
                SessionStatus::Active.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn end_with_status(
        &self,
        id: &str,
        status: SessionStatus,
        exit_code: Option<i64>,
    ) -> Result<()> {
        let conn = self.conn.lock().expect("sessions db poisoned");
        conn.execute(
            "UPDATE sessions SET status = ?2, ended_at = ?3, exit_code = ?4 WHERE id = ?1",
            params![
                id,
                status.as_str(),
                chrono::Utc::now().to_rfc3339(),
                exit_code,
            ],
        )?;
        Ok(())
    }

    pub fn list_by_user(&self, user_id: i64, limit: usize) -> Result<Vec<SessionRecord>> {
        let conn = self.conn.lock().expect("sessions db poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, user_id, project, project_path, started_at, ended_at, exit_code, status
             FROM sessions WHERE user_id = ?1 ORDER BY started_at DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok(SessionRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                project: row.get(2)?,
                project_path: row.get(3)?,
                started_at: row.get(4)?,
                ended_at: row.get(5)?,
                exit_code: row.get(6)?,
                status: SessionStatus::from_str(&row.get::<_, String>(7)?),
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Startup recovery: anything still `active` belonged to a previous
    /// process and its PTY is gone.
    pub fn mark_active_as_lost(&self) -> Result<usize> {
        let conn = self.conn.lock().expect("sessions db poisoned");
        let changed = conn.execute(
            "UPDATE sessions SET status = ?1, ended_at = ?2 WHERE status = ?3",
            params![
                SessionStatus::Lost.as_str(),
                chrono::Utc::now().to_rfc3339(),
                SessionStatus::Active.as_str(),
            ],
        )?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_list() {
        let store = SessionStore::open_in_memory().unwrap();
        store.create("s1", 42, "alpha", "/proj/alpha").unwrap();
        store.create("s2", 42, "beta", "/proj/beta").unwrap();
        store.create("s3", 99, "gamma", "/proj/gamma").unwrap();

        let sessions = store.list_by_user(42, 10).unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions.iter().all(|s| s.status == SessionStatus::Active));
        assert!(sessions.iter().all(|s| s.user_id == 42));
    }

    #[test]
    fn test_end_with_status_records_exit() {
        let store = SessionStore::open_in_memory().unwrap();
        store.create("s1", 42, "alpha", "/proj/alpha").unwrap();
        store
            .end_with_status("s1", SessionStatus::Crashed, Some(137))
            .unwrap();

        let sessions = store.list_by_user(42, 10).unwrap();
        assert_eq!(sessions[0].status, SessionStatus::Crashed);
        assert_eq!(sessions[0].exit_code, Some(137));
        assert!(sessions[0].ended_at.is_some());
    }

    #[test]
    fn test_mark_active_as_lost() {
        let store = SessionStore::open_in_memory().unwrap();
        store.create("s1", 42, "alpha", "/proj/alpha").unwrap();
        store.create("s2", 42, "beta", "/proj/beta").unwrap();
        store
            .end_with_status("s2", SessionStatus::Ended, Some(0))
            .unwrap();

        assert_eq!(store.mark_active_as_lost().unwrap(), 1);
        let sessions = store.list_by_user(42, 10).unwrap();
        let s1 = sessions.iter().find(|s| s.id == "s1").unwrap();
        assert_eq!(s1.status, SessionStatus::Lost);
        let s2 = sessions.iter().find(|s| s.id == "s2").unwrap();
        assert_eq!(s2.status, SessionStatus::Ended);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/sessions.db");
        let store = SessionStore::open(&path).unwrap();
        store.create("s1", 1, "p", "/p").unwrap();
        assert!(path.exists());
    }
}
