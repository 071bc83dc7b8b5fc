use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::{StrokeStore, UserSnapshot};
use crate::attempt::{Attempt, NewAttempt};
use crate::error::Result;
use crate::geometry::Point;
use crate::progress::{CharacterProgress, MasteryScale, UserId, UserProgress};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    character_id INTEGER NOT NULL,
    stroke_index INTEGER NOT NULL,
    path TEXT NOT NULL,
    score REAL NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_attempts_user ON attempts(user_id);

CREATE TABLE IF NOT EXISTS character_progress (
    user_id INTEGER NOT NULL,
    character_id INTEGER NOT NULL,
    attempts INTEGER NOT NULL,
    avg_score REAL NOT NULL,
    mastery REAL NOT NULL,
    last_stroke INTEGER NOT NULL,
    PRIMARY KEY (user_id, character_id)
);
"#;

/// SQLite-backed store.
///
/// The connection sits behind a mutex and each submission runs in a single
/// transaction, so the attempt row and the progress row commit together.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    scale: MasteryScale,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P, scale: MasteryScale) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!(path = %path.display(), "opening sqlite store");
        Self::with_connection(Connection::open(path)?, scale)
    }

    pub fn open_in_memory(scale: MasteryScale) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, scale)
    }

    fn with_connection(conn: Connection, scale: MasteryScale) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            scale,
        })
    }

    // A panic mid-transaction rolls the transaction back on drop, so the
    // connection is consistent even when the lock is poisoned.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn attempt_from_row(row: &Row<'_>) -> rusqlite::Result<Attempt> {
    let path_json: String = row.get(4)?;
    let path: Vec<Point> = serde_json::from_str(&path_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Attempt {
        id: row.get(0)?,
        user_id: row.get(1)?,
        character_id: row.get(2)?,
        stroke_index: row.get(3)?,
        path,
        score: row.get(5)?,
        created_at: row.get::<_, DateTime<Utc>>(6)?,
    })
}

fn progress_from_row(row: &Row<'_>) -> rusqlite::Result<CharacterProgress> {
    Ok(CharacterProgress {
        character_id: row.get(0)?,
        attempts: row.get(1)?,
        avg_score: row.get(2)?,
        mastery: row.get(3)?,
        last_stroke: row.get(4)?,
    })
}

impl StrokeStore for SqliteStore {
    fn record_attempt(&self, attempt: NewAttempt) -> Result<Attempt> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let created_at = Utc::now();
        let path_json = serde_json::to_string(&attempt.path)?;

        tx.execute(
            r#"
            INSERT INTO attempts
            (user_id, character_id, stroke_index, path, score, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                attempt.user_id,
                attempt.character_id,
                attempt.stroke_index,
                path_json,
                attempt.score,
                created_at,
            ],
        )?;
        let id = tx.last_insert_rowid();

        let existing = tx
            .query_row(
                r#"
                SELECT character_id, attempts, avg_score, mastery, last_stroke
                FROM character_progress
                WHERE user_id = ?1 AND character_id = ?2
                "#,
                params![attempt.user_id, attempt.character_id],
                progress_from_row,
            )
            .optional()?;

        let progress = match existing {
            Some(mut p) => {
                p.record(attempt.stroke_index, attempt.score, self.scale);
                p
            }
            None => CharacterProgress::first(
                attempt.character_id,
                attempt.stroke_index,
                attempt.score,
                self.scale,
            ),
        };

        tx.execute(
            r#"
            INSERT OR REPLACE INTO character_progress
            (user_id, character_id, attempts, avg_score, mastery, last_stroke)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                attempt.user_id,
                progress.character_id,
                progress.attempts,
                progress.avg_score,
                progress.mastery,
                progress.last_stroke,
            ],
        )?;
        tx.commit()?;

        debug!(
            id,
            user_id = attempt.user_id,
            character_id = attempt.character_id,
            attempts = progress.attempts,
            "recorded attempt"
        );

        Ok(Attempt::from_new(id, attempt, created_at))
    }

    fn attempts_by_user(&self, user_id: UserId) -> Result<Vec<Attempt>> {
        load_attempts(&self.lock(), user_id)
    }

    fn user_progress(&self, user_id: UserId) -> Result<UserProgress> {
        load_progress(&self.lock(), user_id)
    }

    fn user_snapshot(&self, user_id: UserId) -> Result<UserSnapshot> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let snapshot = UserSnapshot {
            progress: load_progress(&tx, user_id)?,
            attempts: load_attempts(&tx, user_id)?,
        };
        tx.commit()?;
        Ok(snapshot)
    }
}

fn load_attempts(conn: &Connection, user_id: UserId) -> Result<Vec<Attempt>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, user_id, character_id, stroke_index, path, score, created_at
        FROM attempts
        WHERE user_id = ?1
        ORDER BY id ASC
        "#,
    )?;

    let rows = stmt.query_map([user_id], attempt_from_row)?;
    let mut attempts = Vec::new();
    for attempt in rows {
        attempts.push(attempt?);
    }
    Ok(attempts)
}

fn load_progress(conn: &Connection, user_id: UserId) -> Result<UserProgress> {
    let mut stmt = conn.prepare(
        r#"
        SELECT character_id, attempts, avg_score, mastery, last_stroke
        FROM character_progress
        WHERE user_id = ?1
        "#,
    )?;

    let rows = stmt.query_map([user_id], progress_from_row)?;
    let mut progress = UserProgress::default();
    for row in rows {
        let p = row?;
        progress.0.insert(p.character_id, p);
    }
    Ok(progress)
}
