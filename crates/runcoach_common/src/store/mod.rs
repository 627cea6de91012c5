// Result history storage
//
// Runs and their stage entries live in SQLite. Callers go through the
// `ResultRepository` trait so the orchestrator can be exercised against
// test doubles.

pub mod db;

pub use db::{DbLocation, ResultsDb};

use crate::error::PersistenceError;
use crate::results::{Run, RunInput, RunSummary};
use async_trait::async_trait;

/// Persistence boundary for runs.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Every stored run with its stage entries attached, oldest first.
    async fn load_all_with_stages(&self) -> Result<Vec<Run>, PersistenceError>;

    /// Top-level fields of every stored run, oldest first.
    async fn load_summaries(&self) -> Result<Vec<RunSummary>, PersistenceError>;

    /// Atomically store a run, its stage entries and the analysis text.
    /// Returns the run exactly as a subsequent load would see it.
    async fn create(&self, run: &RunInput, analysis: &str) -> Result<Run, PersistenceError>;
}
