use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection};
use tokio::sync::oneshot;

mod migrations;

use migrations::run_migrations;

use crate::models::{
    LoggedIssue, PerformanceType, SessionHistory, SessionRecord, SessionStatus, SkillLevel,
};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

fn status_from_str(value: &str) -> Result<SessionStatus> {
    match value {
        "Recording" => Ok(SessionStatus::Recording),
        "Completed" => Ok(SessionStatus::Completed),
        "Cancelled" => Ok(SessionStatus::Cancelled),
        _ => Err(anyhow!("unknown session status '{value}'")),
    }
}

fn performance_from_str(value: &str) -> Result<PerformanceType> {
    PerformanceType::parse(value).ok_or_else(|| anyhow!("unknown performance type '{value}'"))
}

fn skill_from_str(value: &str) -> Result<SkillLevel> {
    SkillLevel::parse(value).ok_or_else(|| anyhow!("unknown skill level '{value}'"))
}

/// Handle to the storage worker. One dedicated thread owns the SQLite
/// connection; async callers queue closures and await the reply.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("artemis-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn insert_session(&self, session: &SessionRecord) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, started_at, stopped_at, status, performance_type, skill_level,
                                       overall_score, technique_score, timing_score, expression_score,
                                       issue_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    record.id,
                    record.started_at.to_rfc3339(),
                    record.stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    record.performance_type.as_str(),
                    record.skill_level.as_str(),
                    record.overall_score,
                    record.technique_score,
                    record.timing_score,
                    record.expression_score,
                    to_i64(record.issue_count)?,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert session")?;
            Ok(())
        })
        .await
    }

    /// Write the final status and scores for a session at stop/cancel time.
    pub async fn finalize_session(&self, session: &SessionRecord) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     stopped_at = ?2,
                     overall_score = ?3,
                     technique_score = ?4,
                     timing_score = ?5,
                     expression_score = ?6,
                     issue_count = ?7,
                     updated_at = ?8
                 WHERE id = ?9",
                params![
                    record.status.as_str(),
                    record.stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.overall_score,
                    record.technique_score,
                    record.timing_score,
                    record.expression_score,
                    to_i64(record.issue_count)?,
                    record.updated_at.to_rfc3339(),
                    record.id,
                ],
            )
            .with_context(|| "failed to finalize session")?;
            Ok(())
        })
        .await
    }

    /// Persist a session's issue log (newest first, as logged).
    pub async fn insert_issues(&self, session_id: &str, issues: &[LoggedIssue]) -> Result<()> {
        let session_id = session_id.to_string();
        let issues = issues.to_vec();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open issue insert transaction")?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO technique_issues (session_id, category, severity, description, correction, observed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for logged in &issues {
                    stmt.execute(params![
                        session_id,
                        logged.issue.category,
                        logged.issue.severity.as_str(),
                        logged.issue.description,
                        logged.issue.correction,
                        logged.observed_at.to_rfc3339(),
                    ])?;
                }
            }
            tx.commit().context("failed to commit issue insert")?;
            Ok(())
        })
        .await
    }

    /// Completed sessions for the dashboard and coach report, oldest first
    /// so trend analysis reads left to right.
    pub async fn recent_history(&self, limit: u32) -> Result<Vec<SessionHistory>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, started_at, performance_type, overall_score,
                        technique_score, timing_score, expression_score
                 FROM sessions
                 WHERE status = 'Completed'
                 ORDER BY started_at DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut history = Vec::new();
            while let Some(row) = rows.next()? {
                let started_at = parse_datetime(&row.get::<_, String>(1)?)?;
                history.push(SessionHistory {
                    id: row.get(0)?,
                    date: started_at.format("%b %d").to_string(),
                    performance_type: performance_from_str(&row.get::<_, String>(2)?)?,
                    score: row.get(3)?,
                    technique: row.get(4)?,
                    timing: row.get(5)?,
                    expression: row.get(6)?,
                });
            }

            history.reverse();
            Ok(history)
        })
        .await
    }

    /// Sessions left in Recording state by a previous crash, most recent
    /// first, so startup can mark them cancelled.
    pub async fn get_dangling_sessions(&self) -> Result<Vec<SessionRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, started_at, stopped_at, status, performance_type, skill_level,
                        overall_score, technique_score, timing_score, expression_score,
                        issue_count, created_at, updated_at
                 FROM sessions
                 WHERE status = 'Recording'
                 ORDER BY started_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(SessionRecord {
                    id: row.get(0)?,
                    started_at: parse_datetime(&row.get::<_, String>(1)?)?,
                    stopped_at: row
                        .get::<_, Option<String>>(2)?
                        .map(|s| parse_datetime(&s))
                        .transpose()?,
                    status: status_from_str(&row.get::<_, String>(3)?)?,
                    performance_type: performance_from_str(&row.get::<_, String>(4)?)?,
                    skill_level: skill_from_str(&row.get::<_, String>(5)?)?,
                    overall_score: row.get(6)?,
                    technique_score: row.get(7)?,
                    timing_score: row.get(8)?,
                    expression_score: row.get(9)?,
                    issue_count: to_u64(row.get::<_, i64>(10)?, "issue_count")?,
                    created_at: parse_datetime(&row.get::<_, String>(11)?)?,
                    updated_at: parse_datetime(&row.get::<_, String>(12)?)?,
                });
            }

            Ok(sessions)
        })
        .await
    }

    /// Mark crash-orphaned Recording rows as cancelled.
    pub async fn cancel_dangling_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE sessions
                 SET status = 'Cancelled', stopped_at = ?1, updated_at = ?1
                 WHERE status = 'Recording'",
                params![now.to_rfc3339()],
            )?;
            Ok(updated)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Severity, TechniqueIssue};

    fn temp_db() -> Database {
        let path = std::env::temp_dir()
            .join("artemis-tests")
            .join(format!("{}.sqlite3", uuid::Uuid::new_v4()));
        Database::new(path).unwrap()
    }

    fn record(id: &str, started_at: DateTime<Utc>, score: f64) -> SessionRecord {
        SessionRecord {
            id: id.to_string(),
            started_at,
            stopped_at: Some(started_at),
            status: SessionStatus::Completed,
            performance_type: PerformanceType::Ballet,
            skill_level: SkillLevel::Intermediate,
            overall_score: score,
            technique_score: score,
            timing_score: score,
            expression_score: score,
            issue_count: 0,
            created_at: started_at,
            updated_at: started_at,
        }
    }

    #[test]
    fn integer_conversions_are_checked() {
        assert_eq!(to_i64(42).unwrap(), 42);
        assert!(to_i64(u64::MAX).is_err());
        assert_eq!(to_u64(42, "issue_count").unwrap(), 42);
        assert!(to_u64(-1, "issue_count").is_err());
    }

    #[tokio::test]
    async fn history_returns_completed_sessions_oldest_first() {
        let db = temp_db();
        let base = Utc::now();

        for (i, score) in [6.0, 6.5, 7.0].iter().enumerate() {
            let started = base + chrono::Duration::minutes(i as i64);
            let mut rec = record(&format!("s{i}"), started, 0.0);
            rec.status = SessionStatus::Recording;
            rec.stopped_at = None;
            db.insert_session(&rec).await.unwrap();

            let mut fin = record(&format!("s{i}"), started, *score);
            fin.stopped_at = Some(started + chrono::Duration::minutes(10));
            db.finalize_session(&fin).await.unwrap();
        }

        // A dangling Recording session must not appear in history.
        let mut dangling = record("dangling", base + chrono::Duration::hours(1), 0.0);
        dangling.status = SessionStatus::Recording;
        dangling.stopped_at = None;
        db.insert_session(&dangling).await.unwrap();

        let history = db.recent_history(10).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].score, 6.0);
        assert_eq!(history[2].score, 7.0);

        let orphans = db.get_dangling_sessions().await.unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id, "dangling");

        let cancelled = db.cancel_dangling_sessions(Utc::now()).await.unwrap();
        assert_eq!(cancelled, 1);
        assert!(db.get_dangling_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn issues_persist_for_a_session() {
        let db = temp_db();
        let now = Utc::now();
        db.insert_session(&record("s1", now, 7.0)).await.unwrap();

        let issues = vec![LoggedIssue {
            issue: TechniqueIssue {
                category: "Posture".to_string(),
                severity: Severity::High,
                description: "Shoulders uneven".to_string(),
                correction: "Level shoulders".to_string(),
                visual_marker: None,
            },
            observed_at: now,
        }];
        db.insert_issues("s1", &issues).await.unwrap();

        let count: i64 = db
            .execute(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM technique_issues WHERE session_id = 's1'",
                    [],
                    |row| row.get(0),
                )
                .map_err(Into::into)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
