//! Summary metrics for a simulated portfolio value series.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, Result};

/// Volatility below this is treated as zero when computing the Sharpe ratio.
pub const MIN_SIGMA: f64 = 1e-12;

/// Return and risk metrics for one value series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PerformanceMetrics {
    /// Total return from first to last value, in percent
    pub cumulative_return_pct: f64,
    /// Daily volatility scaled by `sqrt(days)`, in percent
    pub annualised_volatility_pct: f64,
    /// `mean × days / sigma`; `None` when the series has zero volatility
    pub annualised_sharpe: Option<f64>,
}

impl PerformanceMetrics {
    /// The Sharpe ratio, or [`Error::UndefinedMetric`] for a zero-volatility series.
    pub fn sharpe(&self) -> Result<f64> {
        self.annualised_sharpe.ok_or_else(|| {
            Error::UndefinedMetric("Sharpe ratio is undefined for zero volatility".to_string())
        })
    }

    fn zero() -> Self {
        Self {
            cumulative_return_pct: 0.0,
            annualised_volatility_pct: 0.0,
            annualised_sharpe: Some(0.0),
        }
    }
}

/// Compute cumulative return, annualised volatility, and Sharpe ratio.
///
/// `days` is the horizon used for annualisation, normally the number of
/// simulated days that produced `values`. Series shorter than two values
/// yield all-zero metrics.
///
/// The Sharpe ratio subtracts no risk-free rate: it is the annualised mean
/// daily return divided by the daily standard deviation. A series with no
/// variation reports `annualised_sharpe = None` rather than NaN or infinity.
pub fn analyze(values: &[f64], days: usize) -> PerformanceMetrics {
    if values.len() < 2 {
        return PerformanceMetrics::zero();
    }

    let first = values[0];
    let last = values[values.len() - 1];
    let cumulative_return_pct = if first != 0.0 {
        (last - first) / first * 100.0
    } else {
        0.0
    };

    let returns = daily_returns(values);
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let sigma = variance.sqrt();

    let horizon = days as f64;
    let annualised_volatility_pct = sigma * horizon.sqrt() * 100.0;

    let annualised_sharpe = if sigma > MIN_SIGMA {
        Some(mean * horizon / sigma)
    } else {
        warn!(points = values.len(), "Sharpe ratio undefined: series has zero volatility");
        None
    };

    PerformanceMetrics {
        cumulative_return_pct,
        annualised_volatility_pct,
        annualised_sharpe,
    }
}

/// Simple returns between consecutive values; a zero prior value yields 0.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|pair| {
            if pair[0] != 0.0 {
                (pair[1] - pair[0]) / pair[0]
            } else {
                0.0
            }
        })
        .collect()
}

/// Largest peak-to-trough decline of a value series, in percent.
pub fn max_drawdown_pct(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let mut running_max = values[0];
    let mut max_drawdown = 0.0;

    for &value in values {
        if value > running_max {
            running_max = value;
        }
        if running_max > 0.0 {
            let drawdown = (running_max - value) / running_max;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }
    }

    max_drawdown * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_series() {
        let metrics = analyze(&[1000.0, 1000.0], 1);
        assert_eq!(metrics.cumulative_return_pct, 0.0);
        assert_eq!(metrics.annualised_volatility_pct, 0.0);
        assert_eq!(metrics.annualised_sharpe, None);
        assert!(matches!(metrics.sharpe(), Err(Error::UndefinedMetric(_))));
    }

    #[test]
    fn test_short_series_is_zero() {
        for values in [vec![], vec![1234.0]] {
            let metrics = analyze(&values, 30);
            assert_eq!(metrics.cumulative_return_pct, 0.0);
            assert_eq!(metrics.annualised_volatility_pct, 0.0);
            assert_eq!(metrics.annualised_sharpe, Some(0.0));
        }
    }

    #[test]
    fn test_known_values() {
        // Returns: +10%, -10%
        let values = [100.0, 110.0, 99.0];
        let metrics = analyze(&values, 2);

        assert_relative_eq!(metrics.cumulative_return_pct, -1.0, epsilon = 1e-9);
        // mean = 0, population sigma = 0.1
        assert_relative_eq!(
            metrics.annualised_volatility_pct,
            0.1 * 2.0_f64.sqrt() * 100.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(metrics.sharpe().unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sharpe_has_no_risk_free_adjustment() {
        // Returns: +2%, +1% (approximately)
        let values = [100.0, 102.0, 103.02];
        let days = 2;
        let metrics = analyze(&values, days);

        let returns = daily_returns(&values);
        let mean = (returns[0] + returns[1]) / 2.0;
        let variance = ((returns[0] - mean).powi(2) + (returns[1] - mean).powi(2)) / 2.0;
        let expected = mean * days as f64 / variance.sqrt();

        assert_relative_eq!(metrics.sharpe().unwrap(), expected, epsilon = 1e-9);
        assert!(expected > 0.0);
    }

    #[test]
    fn test_zero_start_value_does_not_leak_infinity() {
        let metrics = analyze(&[0.0, 10.0, 11.0], 2);
        assert!(metrics.cumulative_return_pct.is_finite());
        assert!(metrics.annualised_volatility_pct.is_finite());
        assert!(metrics.annualised_sharpe.map_or(true, f64::is_finite));
    }

    #[test]
    fn test_max_drawdown() {
        let values = [100.0, 120.0, 90.0, 110.0, 80.0, 130.0];
        // Peak 120 to trough 80
        assert_relative_eq!(max_drawdown_pct(&values), 100.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_max_drawdown_monotonic() {
        assert_eq!(max_drawdown_pct(&[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(max_drawdown_pct(&[5.0]), 0.0);
    }
}
