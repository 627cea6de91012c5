//! Cohort statistics over previously stored runs.
//!
//! Pure computation: no I/O, deterministic for a given input.

use crate::results::Run;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Medians of the comparison baseline. `None` means there is no cohort yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortStats {
    pub deaths_median: Option<f64>,
    pub energy_median: Option<f64>,
    /// Keyed by the exact stage-name string; names are never normalized.
    pub stage_medians: BTreeMap<String, Option<f64>>,
}

impl CohortStats {
    pub fn is_empty(&self) -> bool {
        self.deaths_median.is_none() && self.energy_median.is_none() && self.stage_medians.is_empty()
    }
}

/// Standard median: middle value for odd counts, mean of the two middle
/// values for even counts. `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Compute deaths, energy and per-stage medians across `existing_runs`.
///
/// Stage times are pooled per distinct stage name over every run that has an
/// entry for it, regardless of the entry's position in the run.
pub fn compute_cohort_statistics(existing_runs: &[Run]) -> CohortStats {
    if existing_runs.is_empty() {
        return CohortStats::default();
    }

    let deaths: Vec<f64> = existing_runs.iter().map(|r| f64::from(r.deaths)).collect();
    let energy: Vec<f64> = existing_runs.iter().map(|r| r.total_energy).collect();

    let mut stage_times: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for stage in existing_runs.iter().flat_map(|r| r.stage_clear_times.iter()) {
        stage_times
            .entry(stage.stage_name.clone())
            .or_default()
            .push(stage.clear_time);
    }

    let stage_medians = stage_times
        .into_iter()
        .map(|(name, times)| (name, median(&times)))
        .collect();

    CohortStats {
        deaths_median: median(&deaths),
        energy_median: median(&energy),
        stage_medians,
    }
}
