//! Per-asset parameter estimation from historical closes.

use crate::types::{AssetParameters, HistoricalBar};
use crate::{Error, Result};

/// Number of most recent returns averaged into the momentum signal.
pub const MOMENTUM_WINDOW: usize = 10;

/// Estimate drift, volatility, and momentum from a price history.
///
/// Bars are sorted by date first, so callers may pass them in any order.
/// Volatility is the population (biased) standard deviation of simple
/// daily returns. Momentum is the mean of the last [`MOMENTUM_WINDOW`]
/// returns, falling back to the drift when fewer returns are available.
///
/// # Errors
///
/// Returns [`Error::InsufficientData`] when fewer than two bars are supplied.
pub fn estimate_parameters(bars: &[HistoricalBar]) -> Result<AssetParameters> {
    if bars.len() < 2 {
        return Err(Error::InsufficientData(format!(
            "Need at least 2 historical bars, got {}",
            bars.len()
        )));
    }

    let mut sorted = bars.to_vec();
    sorted.sort_by_key(|bar| bar.date);

    let returns = daily_returns(&sorted);
    let n = returns.len() as f64;

    let mean = returns.iter().sum::<f64>() / n;
    let mean_sq = returns.iter().map(|r| r * r).sum::<f64>() / n;
    // Rounding can push E[r^2] - E[r]^2 slightly below zero for flat series
    let volatility = (mean_sq - mean * mean).max(0.0).sqrt();

    let momentum = if returns.len() >= MOMENTUM_WINDOW {
        let recent = &returns[returns.len() - MOMENTUM_WINDOW..];
        recent.iter().sum::<f64>() / MOMENTUM_WINDOW as f64
    } else {
        mean
    };

    Ok(AssetParameters {
        average_daily_return: mean,
        volatility,
        momentum,
    })
}

/// Simple returns between consecutive closes.
fn daily_returns(bars: &[HistoricalBar]) -> Vec<f64> {
    bars.windows(2)
        .map(|pair| (pair[1].close - pair[0].close) / pair[0].close)
        .collect()
}
