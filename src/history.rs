use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use time_humanize::HumanTime;
use tracing::{debug, info};

use crate::corpus::{BookRecord, LengthMode};
use crate::metrics::{consistency, SessionMetricSample};
use crate::session::SessionResult;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to write history export: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to prepare history directory: {0}")]
    Io(#[from] std::io::Error),
}

/// One finished session as stored in the history database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub finished_at: DateTime<Local>,
    pub book_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub mode: LengthMode,
    pub speed: u32,
    pub accuracy: u32,
    pub error_count: usize,
    pub characters_typed: usize,
    pub elapsed_seconds: f64,
    pub consistency: f64,
}

impl HistoryEntry {
    /// "3 hours ago" style age relative to `now`
    pub fn age(&self, now: DateTime<Local>) -> String {
        let secs = now.signed_duration_since(self.finished_at).num_seconds().max(0);
        HumanTime::from_seconds(-secs).to_string()
    }
}

/// Fixed-width UTC text so that ordering by the column is chronological
fn stored_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    at.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Database of finished typing sessions
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open (or create) the database file, creating parent directories
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened history database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, HistoryError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                finished_at TEXT NOT NULL,
                book_id TEXT,
                title TEXT,
                author TEXT,
                mode TEXT NOT NULL,
                speed INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                error_count INTEGER NOT NULL,
                characters_typed INTEGER NOT NULL,
                elapsed_seconds REAL NOT NULL,
                consistency REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS session_samples (
                session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                seq INTEGER NOT NULL,
                elapsed_seconds REAL NOT NULL,
                speed INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                PRIMARY KEY (session_id, seq)
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_finished_at ON sessions(finished_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_mode ON sessions(mode);
            "#,
        )?;

        Ok(Self { conn })
    }

    /// Store a finished session and its samples, returning the new row id
    pub fn record<Tz: TimeZone>(
        &mut self,
        result: &SessionResult,
        book: Option<&BookRecord>,
        mode: LengthMode,
        finished_at: DateTime<Tz>,
    ) -> Result<i64, HistoryError> {
        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO sessions
            (finished_at, book_id, title, author, mode, speed, accuracy,
             error_count, characters_typed, elapsed_seconds, consistency)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                stored_timestamp(&finished_at),
                book.map(|b| b.book_id.as_str()),
                book.map(|b| b.title.as_str()),
                book.map(|b| b.author.as_str()),
                mode.to_string(),
                result.speed,
                result.accuracy,
                result.error_count as i64,
                result.characters_typed as i64,
                result.elapsed_seconds,
                consistency(&result.samples),
            ],
        )?;
        let id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO session_samples (session_id, seq, elapsed_seconds, speed, accuracy)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for (seq, sample) in result.samples.iter().enumerate() {
                stmt.execute(params![
                    id,
                    seq as i64,
                    sample.elapsed_seconds,
                    sample.speed,
                    sample.accuracy
                ])?;
            }
        }

        tx.commit()?;
        info!(id, speed = result.speed, %mode, "Recorded session in history");
        Ok(id)
    }

    /// Most recent sessions first
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, HistoryError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, finished_at, book_id, title, author, mode, speed, accuracy,
                   error_count, characters_typed, elapsed_seconds, consistency
            FROM sessions
            ORDER BY finished_at DESC, id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let finished_at: String = row.get(1)?;
            let finished_at = DateTime::parse_from_rfc3339(&finished_at)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?
                .with_timezone(&Local);

            let mode: String = row.get(5)?;
            let mode = LengthMode::from_name(&mode).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    format!("unknown length mode {mode:?}").into(),
                )
            })?;

            Ok(HistoryEntry {
                id: row.get(0)?,
                finished_at,
                book_id: row.get(2)?,
                title: row.get(3)?,
                author: row.get(4)?,
                mode,
                speed: row.get(6)?,
                accuracy: row.get(7)?,
                error_count: row.get::<_, i64>(8)? as usize,
                characters_typed: row.get::<_, i64>(9)? as usize,
                elapsed_seconds: row.get(10)?,
                consistency: row.get(11)?,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }

    pub fn samples(&self, session_id: i64) -> Result<Vec<SessionMetricSample>, HistoryError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT elapsed_seconds, speed, accuracy
            FROM session_samples
            WHERE session_id = ?1
            ORDER BY seq
            "#,
        )?;

        let rows = stmt.query_map([session_id], |row| {
            Ok(SessionMetricSample {
                elapsed_seconds: row.get(0)?,
                speed: row.get(1)?,
                accuracy: row.get(2)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Personal best speed for a mode, if any session was recorded in it
    pub fn best_speed(&self, mode: LengthMode) -> Result<Option<u32>, HistoryError> {
        let best = self
            .conn
            .query_row(
                "SELECT MAX(speed) FROM sessions WHERE mode = ?1",
                [mode.to_string()],
                |row| row.get::<_, Option<u32>>(0),
            )
            .optional()?
            .flatten();
        Ok(best)
    }

    pub fn count(&self) -> Result<usize, HistoryError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Write every session, oldest first, as CSV with a header row
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize, HistoryError> {
        let mut entries = self.recent(usize::MAX >> 1)?;
        entries.reverse();

        let mut csv = csv::Writer::from_writer(writer);
        for entry in &entries {
            csv.serialize(entry)?;
        }
        csv.flush()?;
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::record::fixtures::book;
    use chrono::{Duration, FixedOffset};

    fn result(speed: u32, accuracy: u32) -> SessionResult {
        SessionResult {
            speed,
            accuracy,
            error_count: 1,
            elapsed_seconds: 12.5,
            characters_typed: 40,
            samples: vec![
                SessionMetricSample {
                    elapsed_seconds: 0.0,
                    speed: 20,
                    accuracy: 100,
                },
                SessionMetricSample {
                    elapsed_seconds: 6.0,
                    speed: 40,
                    accuracy: 95,
                },
            ],
        }
    }

    fn at(hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_record_and_read_back() {
        let mut db = HistoryDb::open_in_memory().unwrap();
        let pride = book("pride", &["s"], &[], &[]);

        let id = db
            .record(&result(42, 97), Some(&pride), LengthMode::Short, at(9))
            .unwrap();

        let entries = db.recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.id, id);
        assert_eq!(entry.book_id.as_deref(), Some("pride"));
        assert_eq!(entry.title.as_deref(), Some("Title pride"));
        assert_eq!(entry.mode, LengthMode::Short);
        assert_eq!(entry.speed, 42);
        assert_eq!(entry.accuracy, 97);
        assert_eq!(entry.characters_typed, 40);
        assert_eq!(entry.consistency, 10.0);
        assert_eq!(entry.finished_at, at(9));

        let samples = db.samples(id).unwrap();
        assert_eq!(samples, result(42, 97).samples);
    }

    #[test]
    fn test_custom_quote_has_no_book() {
        let mut db = HistoryDb::open_in_memory().unwrap();
        db.record(&result(30, 90), None, LengthMode::Medium, at(9))
            .unwrap();
        let entry = &db.recent(1).unwrap()[0];
        assert_eq!(entry.book_id, None);
        assert_eq!(entry.mode, LengthMode::Medium);
    }

    #[test]
    fn test_recent_is_newest_first_and_limited() {
        let mut db = HistoryDb::open_in_memory().unwrap();
        for (hour, speed) in [(8, 10), (10, 30), (9, 20)] {
            db.record(&result(speed, 100), None, LengthMode::Short, at(hour))
                .unwrap();
        }

        let speeds: Vec<u32> = db.recent(2).unwrap().iter().map(|e| e.speed).collect();
        assert_eq!(speeds, [30, 20]);
        assert_eq!(db.count().unwrap(), 3);
    }

    #[test]
    fn test_recent_orders_by_instant_across_offset_change() {
        let mut db = HistoryDb::open_in_memory().unwrap();
        // the clock falls back an hour between these two sessions
        let before = FixedOffset::west_opt(4 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 11, 3, 1, 30, 0)
            .unwrap();
        let after = FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 11, 3, 1, 10, 0)
            .unwrap();
        db.record(&result(10, 100), None, LengthMode::Short, before)
            .unwrap();
        db.record(&result(20, 100), None, LengthMode::Short, after)
            .unwrap();

        let entries = db.recent(2).unwrap();
        let speeds: Vec<u32> = entries.iter().map(|e| e.speed).collect();
        assert_eq!(speeds, [20, 10]);
        assert_eq!(entries[0].finished_at, after);
    }

    #[test]
    fn test_stored_timestamp_is_fixed_width_utc() {
        let local = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
            .unwrap();
        assert_eq!(stored_timestamp(&local), "2024-03-01T07:00:00.000000Z");
    }

    #[test]
    fn test_best_speed_per_mode() {
        let mut db = HistoryDb::open_in_memory().unwrap();
        assert_eq!(db.best_speed(LengthMode::Short).unwrap(), None);

        db.record(&result(55, 100), None, LengthMode::Short, at(8))
            .unwrap();
        db.record(&result(61, 100), None, LengthMode::Short, at(9))
            .unwrap();
        db.record(&result(90, 100), None, LengthMode::Long, at(10))
            .unwrap();

        assert_eq!(db.best_speed(LengthMode::Short).unwrap(), Some(61));
        assert_eq!(db.best_speed(LengthMode::Long).unwrap(), Some(90));
        assert_eq!(db.best_speed(LengthMode::Medium).unwrap(), None);
    }

    #[test]
    fn test_export_csv_writes_header_and_rows() {
        let mut db = HistoryDb::open_in_memory().unwrap();
        db.record(&result(10, 100), None, LengthMode::Short, at(8))
            .unwrap();
        db.record(&result(20, 100), None, LengthMode::Long, at(9))
            .unwrap();

        let mut out = Vec::new();
        let written = db.export_csv(&mut out).unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("id,finished_at,book_id"));
        assert!(lines.next().unwrap().contains(",short,10,"));
        assert!(lines.next().unwrap().contains(",long,20,"));
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.db");

        {
            let mut db = HistoryDb::open(&path).unwrap();
            db.record(&result(33, 99), None, LengthMode::Short, at(8))
                .unwrap();
        }

        let db = HistoryDb::open(&path).unwrap();
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn test_entry_age_is_humanized() {
        let mut db = HistoryDb::open_in_memory().unwrap();
        db.record(&result(33, 99), None, LengthMode::Short, at(8))
            .unwrap();
        let entry = &db.recent(1).unwrap()[0];
        let age = entry.age(at(8) + Duration::hours(3));
        assert!(age.contains("3 hours"), "unexpected age {age:?}");
    }
}
