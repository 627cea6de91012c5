//! Ingestion orchestrator
//!
//! Runs a submission through validate -> load cohort -> compute stats ->
//! build prompt -> request analysis -> persist. Steps run strictly in order;
//! any failure ends the submission and nothing is stored.
//!
//! Two concurrent submissions may each compute statistics from a cohort that
//! lacks the other's run. Medians can therefore lag by one concurrent write.

use runcoach_common::{
    build_prompt, compute_cohort_statistics, AnalysisProvider, IngestError, PersistenceError,
    ResultRepository, Run, RunInput, RunSummary,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Step a submission is in. A failure in any step is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Validating,
    LoadingCohort,
    ComputingStats,
    BuildingPrompt,
    RequestingAnalysis,
    Persisting,
    Done,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestStage::Validating => "validating",
            IngestStage::LoadingCohort => "loading cohort",
            IngestStage::ComputingStats => "computing stats",
            IngestStage::BuildingPrompt => "building prompt",
            IngestStage::RequestingAnalysis => "requesting analysis",
            IngestStage::Persisting => "persisting",
            IngestStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Ties the repository, statistics, prompt builder and analysis provider
/// into the submit and list use cases.
pub struct IngestionOrchestrator {
    repository: Arc<dyn ResultRepository>,
    provider: Arc<dyn AnalysisProvider>,
}

impl IngestionOrchestrator {
    pub fn new(repository: Arc<dyn ResultRepository>, provider: Arc<dyn AnalysisProvider>) -> Self {
        Self {
            repository,
            provider,
        }
    }

    /// Ingest a new run. Returns the run as stored by the repository.
    pub async fn submit(&self, input: RunInput) -> Result<Run, IngestError> {
        let mut stage = IngestStage::Validating;

        match self.run_steps(&input, &mut stage).await {
            Ok(run) => {
                info!(
                    "Stored result {} for '{}' ({} stages)",
                    run.id,
                    run.player_name,
                    run.stage_clear_times.len()
                );
                Ok(run)
            }
            Err(e) if e.is_client_error() => {
                info!("Rejected submission for '{}': {}", input.player_name, e);
                Err(e)
            }
            Err(e) => {
                warn!(
                    "Submission for '{}' failed while {}: {}",
                    input.player_name, stage, e
                );
                Err(e)
            }
        }
    }

    async fn run_steps(&self, input: &RunInput, stage: &mut IngestStage) -> Result<Run, IngestError> {
        input.validate()?;

        advance(stage, IngestStage::LoadingCohort);
        let cohort = self.repository.load_all_with_stages().await?;

        advance(stage, IngestStage::ComputingStats);
        // The new run is not stored yet, so it never skews its own baseline.
        let stats = compute_cohort_statistics(&cohort);
        if stats.is_empty() {
            info!("No earlier runs; '{}' has no comparison baseline", input.player_name);
        }
        for (stage_name, median_time) in &stats.stage_medians {
            info!("Median time for stage '{}': {:?}", stage_name, median_time);
        }

        advance(stage, IngestStage::BuildingPrompt);
        let prompt = build_prompt(input, &stats);

        advance(stage, IngestStage::RequestingAnalysis);
        let analysis = self.provider.generate_analysis(&prompt).await?;

        advance(stage, IngestStage::Persisting);
        let run = self.repository.create(input, &analysis).await?;

        advance(stage, IngestStage::Done);
        Ok(run)
    }

    /// Every stored run with stages and analysis.
    pub async fn list_all(&self) -> Result<Vec<Run>, PersistenceError> {
        self.repository.load_all_with_stages().await
    }

    /// Every stored run projected to its top-level fields.
    pub async fn list_summaries(&self) -> Result<Vec<RunSummary>, PersistenceError> {
        self.repository.load_summaries().await
    }
}

fn advance(stage: &mut IngestStage, next: IngestStage) {
    debug!("ingest: {} -> {}", stage, next);
    *stage = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(IngestStage::RequestingAnalysis.to_string(), "requesting analysis");
        assert_eq!(IngestStage::Done.to_string(), "done");
    }

    #[test]
    fn test_advance_moves_stage() {
        let mut stage = IngestStage::Validating;
        advance(&mut stage, IngestStage::LoadingCohort);
        assert_eq!(stage, IngestStage::LoadingCohort);
    }
}
