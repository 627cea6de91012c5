//! Shared fixtures for runcoachd integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use runcoach_common::{
    DbLocation, PersistenceError, ResultRepository, ResultsDb, Run, RunInput, RunSummary,
    StageClearTimeInput,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub fn run_input(player: &str, deaths: u32, energy: f64) -> RunInput {
    RunInput {
        player_name: player.to_string(),
        total_time: 1122.0,
        deaths,
        total_energy: energy,
        stage_clear_times: stages(&[120.5, 150.0, 180.75, 200.25, 220.0, 250.5]),
    }
}

pub fn stages(times: &[f64]) -> Vec<StageClearTimeInput> {
    times
        .iter()
        .enumerate()
        .map(|(i, t)| StageClearTimeInput::new(format!("Stage {}", i + 1), *t))
        .collect()
}

/// In-memory SQLite store that counts calls and can be told to fail loads.
pub struct CountingRepository {
    pub inner: ResultsDb,
    loads: AtomicUsize,
    creates: AtomicUsize,
    fail_loads: AtomicBool,
}

impl CountingRepository {
    pub async fn new() -> Self {
        Self {
            inner: ResultsDb::open(DbLocation::InMemory).await.unwrap(),
            loads: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            fail_loads: AtomicBool::new(false),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn fail_loads(&self) {
        self.fail_loads.store(true, Ordering::SeqCst);
    }

    /// Row counts of (results, stage_clear_times)
    pub async fn row_counts(&self) -> (i64, i64) {
        self.inner
            .execute(|conn| {
                let results: i64 =
                    conn.query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?;
                let stages: i64 =
                    conn.query_row("SELECT COUNT(*) FROM stage_clear_times", [], |row| {
                        row.get(0)
                    })?;
                Ok((results, stages))
            })
            .await
            .unwrap()
    }
}

#[async_trait]
impl ResultRepository for CountingRepository {
    async fn load_all_with_stages(&self) -> Result<Vec<Run>, PersistenceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("connection refused").into());
        }
        self.inner.load_all_with_stages().await
    }

    async fn load_summaries(&self) -> Result<Vec<RunSummary>, PersistenceError> {
        self.inner.load_summaries().await
    }

    async fn create(&self, run: &RunInput, analysis: &str) -> Result<Run, PersistenceError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(run, analysis).await
    }
}
