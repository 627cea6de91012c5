// SQLite result store
//
// One connection behind a mutex; every statement runs on the blocking pool.

use super::ResultRepository;
use crate::error::PersistenceError;
use crate::results::{Run, RunInput, RunSummary, StageClearTime};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Default database file, relative to the working directory
pub const DEFAULT_DB_PATH: &str = "data/runcoach.db";

/// Database location
#[derive(Debug, Clone)]
pub enum DbLocation {
    /// DEFAULT_DB_PATH
    Default,
    /// Configured file path
    Custom(PathBuf),
    /// Private in-memory database, gone when the store is dropped
    InMemory,
}

impl DbLocation {
    /// File path backing this location, if any
    pub fn path(&self) -> Option<PathBuf> {
        match self {
            DbLocation::Default => Some(PathBuf::from(DEFAULT_DB_PATH)),
            DbLocation::Custom(path) => Some(path.clone()),
            DbLocation::InMemory => None,
        }
    }
}

/// SQLite-backed result store
pub struct ResultsDb {
    conn: Arc<Mutex<Connection>>,
    location: DbLocation,
}

impl ResultsDb {
    /// Open or create the database and make sure the schema exists
    pub async fn open(location: DbLocation) -> Result<Self> {
        let db_path = location.path();

        if let Some(parent) = db_path.as_ref().and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        match &db_path {
            Some(path) => info!("Opening results database at: {}", path.display()),
            None => info!("Opening in-memory results database"),
        }

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = match &db_path {
                Some(path) => {
                    let conn =
                        Connection::open(path).context("Failed to open SQLite database")?;
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                        row.get::<_, String>(0)
                    })
                    .context("Failed to enable WAL mode")?;
                    conn
                }
                None => Connection::open_in_memory()
                    .context("Failed to open in-memory SQLite database")?,
            };

            conn.pragma_update(None, "foreign_keys", "ON")
                .context("Failed to enable foreign keys")?;

            Ok(conn)
        })
        .await??;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            location,
        };

        db.initialize_schema().await?;

        Ok(db)
    }

    async fn initialize_schema(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS results (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    created_at DATETIME NOT NULL,
                    player_name TEXT NOT NULL,
                    total_time REAL NOT NULL,
                    deaths INTEGER NOT NULL,
                    total_energy REAL NOT NULL,
                    analysis TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS stage_clear_times (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    result_id INTEGER NOT NULL,
                    stage_name TEXT NOT NULL,
                    clear_time REAL NOT NULL,
                    FOREIGN KEY(result_id) REFERENCES results(id) ON DELETE CASCADE
                );
                CREATE INDEX IF NOT EXISTS idx_stage_clear_times_result
                    ON stage_clear_times(result_id);",
            )
            .context("Failed to create results schema")?;
            Ok(())
        })
        .await?;

        info!("Results database schema ready");
        Ok(())
    }

    /// Execute a closure against the connection on the blocking pool
    pub async fn execute<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await?
    }

    pub fn location(&self) -> &DbLocation {
        &self.location
    }
}

/// Load runs (all, or the single run `only_id`) with their stage entries.
fn load_runs(conn: &Connection, only_id: Option<i64>) -> Result<Vec<Run>> {
    let mut stmt = conn.prepare(
        "SELECT id, created_at, player_name, total_time, deaths, total_energy, analysis
         FROM results
         WHERE ?1 IS NULL OR id = ?1
         ORDER BY id",
    )?;
    let mut runs = stmt
        .query_map(params![only_id], |row| {
            Ok(Run {
                id: row.get(0)?,
                created_at: row.get(1)?,
                player_name: row.get(2)?,
                total_time: row.get(3)?,
                deaths: row.get(4)?,
                total_energy: row.get(5)?,
                analysis: row.get(6)?,
                stage_clear_times: Vec::new(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read results")?;

    let mut stmt = conn.prepare(
        "SELECT id, result_id, stage_name, clear_time
         FROM stage_clear_times
         WHERE ?1 IS NULL OR result_id = ?1
         ORDER BY result_id, id",
    )?;
    let stages = stmt
        .query_map(params![only_id], |row| {
            Ok(StageClearTime {
                id: row.get(0)?,
                result_id: row.get(1)?,
                stage_name: row.get(2)?,
                clear_time: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read stage clear times")?;

    let mut by_result: HashMap<i64, Vec<StageClearTime>> = HashMap::new();
    for stage in stages {
        by_result.entry(stage.result_id).or_default().push(stage);
    }
    for run in &mut runs {
        run.stage_clear_times = by_result.remove(&run.id).unwrap_or_default();
    }

    Ok(runs)
}

fn load_summaries(conn: &Connection) -> Result<Vec<RunSummary>> {
    let mut stmt = conn.prepare(
        "SELECT player_name, total_time, deaths, total_energy FROM results ORDER BY id",
    )?;
    let summaries = stmt
        .query_map([], |row| {
            Ok(RunSummary {
                player_name: row.get(0)?,
                total_time: row.get(1)?,
                deaths: row.get(2)?,
                total_energy: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read result summaries")?;
    Ok(summaries)
}

/// Insert the run row and its stage rows in one transaction, then read the
/// stored run back.
fn insert_run(conn: &Connection, run: &RunInput, analysis: &str) -> Result<Run> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to begin transaction")?;

    tx.execute(
        "INSERT INTO results (created_at, player_name, total_time, deaths, total_energy, analysis)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            Utc::now(),
            run.player_name,
            run.total_time,
            run.deaths,
            run.total_energy,
            analysis
        ],
    )
    .context("Failed to insert result row")?;
    let result_id = tx.last_insert_rowid();

    {
        let mut stmt = tx.prepare(
            "INSERT INTO stage_clear_times (result_id, stage_name, clear_time)
             VALUES (?1, ?2, ?3)",
        )?;
        for stage in &run.stage_clear_times {
            stmt.execute(params![result_id, stage.stage_name, stage.clear_time])
                .with_context(|| format!("Failed to insert stage '{}'", stage.stage_name))?;
        }
    }

    tx.commit().context("Failed to commit result")?;
    debug!(
        "Stored result {} with {} stages",
        result_id,
        run.stage_clear_times.len()
    );

    load_runs(conn, Some(result_id))?
        .into_iter()
        .next()
        .with_context(|| format!("Result {} missing after commit", result_id))
}

#[async_trait]
impl ResultRepository for ResultsDb {
    async fn load_all_with_stages(&self) -> Result<Vec<Run>, PersistenceError> {
        Ok(self.execute(|conn| load_runs(conn, None)).await?)
    }

    async fn load_summaries(&self) -> Result<Vec<RunSummary>, PersistenceError> {
        Ok(self.execute(load_summaries).await?)
    }

    async fn create(&self, run: &RunInput, analysis: &str) -> Result<Run, PersistenceError> {
        let run = run.clone();
        let analysis = analysis.to_string();
        Ok(self
            .execute(move |conn| insert_run(conn, &run, &analysis))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::fixtures::run_input;
    use tempfile::tempdir;

    fn count(conn: &Connection, table: &str) -> Result<i64> {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })?)
    }

    #[tokio::test]
    async fn test_db_creation() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("results.db");

        let db = ResultsDb::open(DbLocation::Custom(db_path.clone()))
            .await
            .unwrap();
        assert!(db_path.exists());
        assert_eq!(db.location().path(), Some(db_path.clone()));

        let tables = db
            .execute(|conn| {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table'
                     AND name IN ('results', 'stage_clear_times')",
                    [],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[tokio::test]
    async fn test_empty_store_loads_nothing() {
        let db = ResultsDb::open(DbLocation::InMemory).await.unwrap();
        assert!(db.load_all_with_stages().await.unwrap().is_empty());
        assert!(db.load_summaries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_returns_stored_run() {
        let db = ResultsDb::open(DbLocation::InMemory).await.unwrap();
        let input = run_input("alice", 3, 42.0);

        let stored = db.create(&input, "Nice pace.").await.unwrap();

        assert!(stored.id > 0);
        assert_eq!(stored.player_name, "alice");
        assert_eq!(stored.deaths, 3);
        assert_eq!(stored.analysis, "Nice pace.");
        assert_eq!(stored.stage_clear_times.len(), 6);
        assert_eq!(stored.stage_clear_times[0].stage_name, "Stage 1");
        assert_eq!(stored.stage_clear_times[5].clear_time, 250.5);
        assert!(stored.stage_clear_times.iter().all(|s| s.result_id == stored.id));

        let loaded = db.load_all_with_stages().await.unwrap();
        assert_eq!(loaded, vec![stored]);
    }

    #[tokio::test]
    async fn test_runs_keep_their_own_stages() {
        let db = ResultsDb::open(DbLocation::InMemory).await.unwrap();
        let first = db.create(&run_input("alice", 1, 10.0), "a").await.unwrap();
        let mut second_input = run_input("bob", 2, 20.0);
        second_input.stage_clear_times[0].clear_time = 99.0;
        let second = db.create(&second_input, "b").await.unwrap();

        assert_ne!(first.id, second.id);
        let loaded = db.load_all_with_stages().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, first.id);
        assert_eq!(loaded[1].stage_clear_times[0].clear_time, 99.0);
        assert!(loaded[1]
            .stage_clear_times
            .iter()
            .all(|s| s.result_id == second.id));

        let summaries = db.load_summaries().await.unwrap();
        assert_eq!(summaries[0], RunSummary::from(&first));
        assert_eq!(summaries[1], RunSummary::from(&second));
    }

    #[tokio::test]
    async fn test_failed_stage_insert_rolls_back_run() {
        let db = ResultsDb::open(DbLocation::InMemory).await.unwrap();
        db.execute(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_stage_4 BEFORE INSERT ON stage_clear_times
                 WHEN NEW.stage_name = 'Stage 4'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let err = db.create(&run_input("alice", 1, 1.0), "text").await.unwrap_err();
        assert!(err.to_string().contains("Stage 4"), "got {}", err);

        let (results, stages) = db
            .execute(|conn| Ok((count(conn, "results")?, count(conn, "stage_clear_times")?)))
            .await
            .unwrap();
        assert_eq!(results, 0);
        assert_eq!(stages, 0);
    }

    #[tokio::test]
    async fn test_reopen_keeps_history() {
        let temp_dir = tempdir().unwrap();
        let location = DbLocation::Custom(temp_dir.path().join("results.db"));

        let stored = {
            let db = ResultsDb::open(location.clone()).await.unwrap();
            db.create(&run_input("carol", 0, 5.0), "solid").await.unwrap()
        };

        let db = ResultsDb::open(location).await.unwrap();
        let loaded = db.load_all_with_stages().await.unwrap();
        assert_eq!(loaded, vec![stored]);
    }

    #[test]
    fn test_location_paths() {
        assert_eq!(
            DbLocation::Default.path(),
            Some(PathBuf::from("data/runcoach.db"))
        );
        assert_eq!(
            DbLocation::Custom(PathBuf::from("/var/lib/runcoach/results.db")).path(),
            Some(PathBuf::from("/var/lib/runcoach/results.db"))
        );
        assert!(DbLocation::InMemory.path().is_none());
    }
}
