//! Analysis prompt assembly
//!
//! Combines the submitted run, the cohort medians and fixed stage context
//! into a single user message for the analysis provider.

use crate::results::RunInput;
use crate::stats::CohortStats;

/// Rendered in place of a median when there is no cohort to compare against.
pub const NO_VALUE: &str = "n/a";

/// Fixed description of the six stages.
pub const STAGE_CONTEXT: &str = "Stage 1 is a basic action stage. \
Stage 2, 3, and 4 are basic gamble stages. \
Stage 5 is a dynamic gamble stage. \
Stage 6 is the boss battle stage.";

/// Build the analysis prompt. Never fails, including on an empty cohort.
pub fn build_prompt(run: &RunInput, stats: &CohortStats) -> String {
    let clear_times = run
        .stage_clear_times
        .iter()
        .map(|st| format!("{}: {}s", st.stage_name, st.clear_time))
        .collect::<Vec<_>>()
        .join(", ");

    let request = format!(
        "Please give me a very brief advice. This player has clear times of {}, {} deaths, \
and total used energy of {}. Note that lower energy usage is better.",
        clear_times, run.deaths, run.total_energy
    );

    let medians = format!(
        "Median scores are: clear times of {}, {} deaths, and total used energy of {}.",
        render_stage_medians(stats),
        render_optional(stats.deaths_median),
        render_optional(stats.energy_median)
    );

    format!("{} {} {}", request, medians, STAGE_CONTEXT)
}

fn render_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => NO_VALUE.to_string(),
    }
}

fn render_stage_medians(stats: &CohortStats) -> String {
    let entries = stats
        .stage_medians
        .iter()
        .map(|(name, m)| format!("{}: {}", name, render_optional(*m)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", entries)
}
