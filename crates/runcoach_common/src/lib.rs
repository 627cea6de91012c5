//! Runcoach Common - Shared types and the result-ingestion core
//!
//! Run records, cohort statistics, prompt assembly, the analysis provider
//! boundary and the SQLite result store.

pub mod error;
pub mod llm_client;
pub mod prompt;
pub mod results;
pub mod stats;
pub mod store;

pub use error::{IngestError, PersistenceError};
pub use llm_client::{
    AnalysisConfig, AnalysisError, AnalysisProvider, FakeAnalysisProvider, HttpAnalysisProvider,
};
pub use prompt::build_prompt;
pub use results::{Run, RunInput, RunSummary, StageClearTime, StageClearTimeInput, STAGE_COUNT};
pub use stats::{compute_cohort_statistics, median, CohortStats};
pub use store::{DbLocation, ResultRepository, ResultsDb};
