//! Many independent portfolio simulations, run in parallel.
//!
//! Holdings are estimated once per batch. Every trial owns a generator seeded
//! from `seed + trial index`, so a batch is reproducible for a given seed
//! regardless of thread scheduling.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::aggregator::{HistoricalDataProvider, HoldingsProvider, PortfolioAggregator};
use super::performance::{analyze, PerformanceMetrics};
use crate::types::PortfolioValueSeries;
use crate::{Error, Result};

/// Distribution of outcomes across a batch of trials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialSummary {
    pub trials: usize,
    /// Portfolio value on day 0 (identical for every trial)
    pub start_value: f64,
    pub mean_final_value: f64,
    /// 5th percentile of final values
    pub p5_final_value: f64,
    /// Median final value
    pub p50_final_value: f64,
    /// 95th percentile of final values
    pub p95_final_value: f64,
    /// Fraction of trials ending below the start value
    pub probability_of_loss: f64,
    /// Metrics of the trial whose final value is the median
    pub median_metrics: PerformanceMetrics,
    /// Final value of each trial, in trial order
    pub final_values: Vec<f64>,
}

/// Run `trials` simulations of `aggregator`, trial `i` seeded with `seed + i`.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] when `trials` is zero, any error from
/// [`PortfolioAggregator::prepare`], or the first error any trial produced.
pub fn run_trials<H, D>(
    aggregator: &PortfolioAggregator<'_, H, D>,
    trials: usize,
    seed: u64,
) -> Result<TrialSummary>
where
    H: HoldingsProvider + ?Sized,
    D: HistoricalDataProvider + ?Sized,
{
    if trials == 0 {
        return Err(Error::InvalidParameter(
            "trials must be at least 1".to_string(),
        ));
    }

    let prepared = aggregator.prepare()?;
    let runs: Vec<PortfolioValueSeries> = (0..trials)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            prepared.simulate(&mut rng)
        })
        .collect::<Result<_>>()?;

    let days = prepared.days();
    let start_value = prepared.start_value();
    let final_values: Vec<f64> = runs.iter().map(|series| series[days]).collect();

    let mut order: Vec<usize> = (0..trials).collect();
    order.sort_by(|&a, &b| final_values[a].total_cmp(&final_values[b]));
    let sorted: Vec<f64> = order.iter().map(|&i| final_values[i]).collect();

    let median_index = order[nearest_rank(trials, 50.0)];
    let losses = final_values.iter().filter(|&&v| v < start_value).count();

    let summary = TrialSummary {
        trials,
        start_value,
        mean_final_value: final_values.iter().sum::<f64>() / trials as f64,
        p5_final_value: sorted[nearest_rank(trials, 5.0)],
        p50_final_value: sorted[nearest_rank(trials, 50.0)],
        p95_final_value: sorted[nearest_rank(trials, 95.0)],
        probability_of_loss: losses as f64 / trials as f64,
        median_metrics: analyze(&runs[median_index], days),
        final_values,
    };

    info!(
        trials,
        days,
        median = summary.p50_final_value,
        probability_of_loss = summary.probability_of_loss,
        "Trial batch complete"
    );

    Ok(summary)
}

/// Zero-based index of the nearest-rank percentile in a sorted list of `n` items.
fn nearest_rank(n: usize, percentile: f64) -> usize {
    let rank = (percentile / 100.0 * n as f64).ceil() as usize;
    rank.clamp(1, n) - 1
}
