//! Run records: submissions, stored runs and their per-stage breakdown.

use crate::error::IngestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every submitted run carries exactly this many stage entries.
pub const STAGE_COUNT: usize = 6;

/// One stage entry of a submission, before it has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageClearTimeInput {
    #[serde(alias = "stage_name")]
    pub stage_name: String,
    /// Seconds
    #[serde(alias = "clear_time")]
    pub clear_time: f64,
}

impl StageClearTimeInput {
    pub fn new(stage_name: impl Into<String>, clear_time: f64) -> Self {
        Self {
            stage_name: stage_name.into(),
            clear_time,
        }
    }
}

/// A run as submitted by a client. Carries no id, timestamp or analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInput {
    #[serde(alias = "player_name")]
    pub player_name: String,
    /// Seconds
    #[serde(alias = "total_time")]
    pub total_time: f64,
    pub deaths: u32,
    #[serde(alias = "total_energy")]
    pub total_energy: f64,
    #[serde(alias = "stage_clear_times")]
    pub stage_clear_times: Vec<StageClearTimeInput>,
}

impl RunInput {
    /// Check the submission's preconditions. Performs no I/O.
    ///
    /// The stage count is checked first so a wrong-length submission always
    /// reports the same message regardless of its other fields.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.stage_clear_times.len() != STAGE_COUNT {
            return Err(IngestError::invalid(format!(
                "stageClearTimes must have {} elements.",
                STAGE_COUNT
            )));
        }

        if self.player_name.trim().is_empty() {
            return Err(IngestError::invalid("playerName must not be empty."));
        }

        check_non_negative("totalTime", self.total_time)?;
        check_non_negative("totalEnergy", self.total_energy)?;

        for (index, stage) in self.stage_clear_times.iter().enumerate() {
            if stage.stage_name.trim().is_empty() {
                return Err(IngestError::invalid(format!(
                    "stageClearTimes[{}].stageName must not be empty.",
                    index
                )));
            }
            check_non_negative(&format!("stageClearTimes[{}].clearTime", index), stage.clear_time)?;
        }

        Ok(())
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<(), IngestError> {
    if !value.is_finite() || value < 0.0 {
        return Err(IngestError::invalid(format!(
            "{} must be a non-negative number.",
            field
        )));
    }
    Ok(())
}

/// A stored stage entry. Owned by exactly one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageClearTime {
    pub id: i64,
    /// Foreign key to the owning run; used for the join only.
    #[serde(skip)]
    pub result_id: i64,
    pub stage_name: String,
    pub clear_time: f64,
}

/// A stored run with its stage breakdown and analysis text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub player_name: String,
    pub total_time: f64,
    pub deaths: u32,
    pub total_energy: f64,
    pub analysis: String,
    pub stage_clear_times: Vec<StageClearTime>,
}

/// Top-level fields of a run, without stages or analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub player_name: String,
    pub total_time: f64,
    pub deaths: u32,
    pub total_energy: f64,
}

impl From<&Run> for RunSummary {
    fn from(run: &Run) -> Self {
        Self {
            player_name: run.player_name.clone(),
            total_time: run.total_time,
            deaths: run.deaths,
            total_energy: run.total_energy,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn six_stages(times: [f64; STAGE_COUNT]) -> Vec<StageClearTimeInput> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| StageClearTimeInput::new(format!("Stage {}", i + 1), *t))
            .collect()
    }

    pub fn run_input(player: &str, deaths: u32, energy: f64) -> RunInput {
        RunInput {
            player_name: player.to_string(),
            total_time: 1122.0,
            deaths,
            total_energy: energy,
            stage_clear_times: six_stages([120.5, 150.0, 180.75, 200.25, 220.0, 250.5]),
        }
    }

    pub fn stored_run(id: i64, deaths: u32, energy: f64, stages: &[(&str, f64)]) -> Run {
        Run {
            id,
            created_at: Utc::now(),
            player_name: format!("player-{}", id),
            total_time: 1000.0,
            deaths,
            total_energy: energy,
            analysis: "keep going".to_string(),
            stage_clear_times: stages
                .iter()
                .enumerate()
                .map(|(i, (name, time))| StageClearTime {
                    id: id * 10 + i as i64,
                    result_id: id,
                    stage_name: name.to_string(),
                    clear_time: *time,
                })
                .collect(),
        }
    }
}
