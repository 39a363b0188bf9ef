//! Portfolio-level simulation: one bounded path per holding, summed by quantity.

use chrono::{Months, NaiveDate};
use tracing::debug;

use crate::simulation::{estimate_parameters, Calibration, CancelToken, NormalSource, PathSimulator};
use crate::types::{HistoricalBar, HoldingPosition, Portfolio, PortfolioValueSeries};
use crate::{Error, Result};

/// Supplies the holdings and cash balance to simulate.
pub trait HoldingsProvider {
    fn holdings(&self) -> Vec<HoldingPosition>;

    /// Cash balance, held constant for the whole simulation.
    fn available_balance(&self) -> f64;
}

/// Supplies historical closes for a ticker.
pub trait HistoricalDataProvider {
    /// Close of the latest bar dated on or before `as_of`.
    fn most_recent_close(&self, ticker: &str, as_of: NaiveDate) -> Option<f64>;

    /// Bars with `start <= date <= end`, in any order.
    fn bars_in_range(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Vec<HistoricalBar>;
}

impl HoldingsProvider for Portfolio {
    fn holdings(&self) -> Vec<HoldingPosition> {
        self.holdings.clone()
    }

    fn available_balance(&self) -> f64 {
        self.cash
    }
}

/// First day of the trailing-year estimation window ending at `as_of`.
pub fn trailing_year_start(as_of: NaiveDate) -> NaiveDate {
    as_of
        .checked_sub_months(Months::new(12))
        .unwrap_or(NaiveDate::MIN)
}

/// Runs one path per holding and aggregates them into a portfolio value series.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use folio_core::portfolio::{InMemoryHistory, PortfolioAggregator};
/// use folio_core::simulation::{rng_from_seed, Calibration};
/// use folio_core::Portfolio;
///
/// let portfolio = Portfolio::with_cash(5000.0);
/// let history = InMemoryHistory::new();
/// let as_of = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
///
/// let series = PortfolioAggregator::new(&portfolio, &history, as_of, 7, Calibration::new(2.0, 0.02, 0.3))
///     .run(&mut rng_from_seed(Some(1)))
///     .unwrap();
///
/// assert_eq!(series, vec![5000.0; 8]);
/// ```
pub struct PortfolioAggregator<'a, H: ?Sized, D: ?Sized> {
    holdings: &'a H,
    history: &'a D,
    as_of: NaiveDate,
    days: usize,
    calibration: Calibration,
    cancel: Option<CancelToken>,
}

impl<'a, H, D> PortfolioAggregator<'a, H, D>
where
    H: HoldingsProvider + ?Sized,
    D: HistoricalDataProvider + ?Sized,
{
    /// Simulate the holdings of `holdings` for `days` days after `as_of`,
    /// estimating from the trailing year of `history`.
    pub fn new(
        holdings: &'a H,
        history: &'a D,
        as_of: NaiveDate,
        days: usize,
        calibration: Calibration,
    ) -> Self {
        Self {
            holdings,
            history,
            as_of,
            days,
            calibration,
            cancel: None,
        }
    }

    /// Abort the run when `token` is cancelled or its deadline passes.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Fetch history, estimate parameters, and look up the seed price of every holding.
    ///
    /// Any holding that fails estimation or has no seed price aborts the
    /// whole preparation.
    pub fn prepare(&self) -> Result<PreparedPortfolio> {
        self.calibration.validate()?;

        let holdings = self.holdings.holdings();
        let cash = self.holdings.available_balance();
        let window_start = trailing_year_start(self.as_of);
        let mut legs = Vec::with_capacity(holdings.len());

        for holding in &holdings {
            if let Some(token) = &self.cancel {
                token.check()?;
            }

            let bars = self
                .history
                .bars_in_range(&holding.ticker, window_start, self.as_of);
            let params = estimate_parameters(&bars).map_err(|e| match e {
                Error::InsufficientData(msg) => {
                    Error::InsufficientData(format!("{}: {}", holding.ticker, msg))
                }
                other => other,
            })?;

            let seed_price = self
                .history
                .most_recent_close(&holding.ticker, self.as_of)
                .ok_or_else(|| Error::MissingPrice {
                    ticker: holding.ticker.clone(),
                    as_of: self.as_of,
                })?;

            debug!(
                ticker = %holding.ticker,
                bars = bars.len(),
                drift = params.average_daily_return,
                volatility = params.volatility,
                momentum = params.momentum,
                seed_price,
                "Estimated asset parameters"
            );

            legs.push(Leg {
                simulator: PathSimulator::new(params, self.calibration)?,
                seed_price,
                quantity: holding.quantity as f64,
            });
        }

        let start_value = cash
            + holdings
                .iter()
                .map(|h| h.purchase_price * h.quantity as f64)
                .sum::<f64>();

        Ok(PreparedPortfolio {
            legs,
            cash,
            start_value,
            days: self.days,
            cancel: self.cancel.clone(),
        })
    }

    /// Simulate the portfolio, drawing shocks from `rng`.
    ///
    /// No partial series is returned when a holding fails.
    pub fn run<S: NormalSource + ?Sized>(&self, rng: &mut S) -> Result<PortfolioValueSeries> {
        self.prepare()?.simulate(rng)
    }
}

#[derive(Debug, Clone, Copy)]
struct Leg {
    simulator: PathSimulator,
    seed_price: f64,
    quantity: f64,
}

/// A portfolio whose holdings are estimated and seeded, ready to be simulated
/// any number of times.
#[derive(Debug, Clone)]
pub struct PreparedPortfolio {
    legs: Vec<Leg>,
    cash: f64,
    start_value: f64,
    days: usize,
    cancel: Option<CancelToken>,
}

impl PreparedPortfolio {
    pub fn days(&self) -> usize {
        self.days
    }

    /// Cash plus every holding at its purchase price.
    pub fn start_value(&self) -> f64 {
        self.start_value
    }

    /// Simulate one path per holding, in holding order, and sum them by quantity plus cash.
    ///
    /// Day 0 is [`PreparedPortfolio::start_value`].
    pub fn simulate<S: NormalSource + ?Sized>(&self, rng: &mut S) -> Result<PortfolioValueSeries> {
        if self.legs.is_empty() {
            debug!(cash = self.cash, days = self.days, "No holdings, returning constant cash series");
            return Ok(vec![self.cash; self.days + 1]);
        }

        let mut series = vec![self.cash; self.days + 1];
        series[0] = self.start_value;

        for leg in &self.legs {
            let path = match &self.cancel {
                Some(token) => leg
                    .simulator
                    .simulate_with_cancel(leg.seed_price, self.days, rng, token)?,
                None => leg.simulator.simulate(leg.seed_price, self.days, rng)?,
            };
            for (value, price) in series.iter_mut().zip(&path).skip(1) {
                *value += price * leg.quantity;
            }
        }

        debug!(
            holdings = self.legs.len(),
            days = self.days,
            start_value = series[0],
            final_value = series[self.days],
            "Portfolio simulation complete"
        );

        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::InMemoryHistory;
    use crate::simulation::{rng_from_seed, SequenceSource};
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn calibration() -> Calibration {
        Calibration::new(2.0, 0.02, 0.3)
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    /// `n` consecutive daily bars ending at `as_of()`, with closes from `f(i)`.
    fn daily_bars(n: usize, f: impl Fn(usize) -> f64) -> Vec<HistoricalBar> {
        (0..n)
            .map(|i| {
                let date = as_of() - Duration::days((n - 1 - i) as i64);
                HistoricalBar::new(date, f(i))
            })
            .collect()
    }

    #[test]
    fn test_empty_holdings_constant_cash() {
        let portfolio = Portfolio::with_cash(5000.0);
        let history = InMemoryHistory::new();

        let series = PortfolioAggregator::new(&portfolio, &history, as_of(), 7, calibration())
            .run(&mut rng_from_seed(Some(1)))
            .unwrap();

        assert_eq!(series.len(), 8);
        assert!(series.iter().all(|&v| v == 5000.0));
    }

    #[test]
    fn test_series_shape_and_start_value() {
        let portfolio = Portfolio::with_cash(1000.0)
            .with_holding("AAPL", 10, 150.0)
            .with_holding("MSFT", 4, 300.0);
        let mut history = InMemoryHistory::new();
        history.insert("AAPL", daily_bars(60, |i| 150.0 + (i % 5) as f64));
        history.insert("MSFT", daily_bars(60, |i| 300.0 - (i % 3) as f64));

        let days = 30;
        let series = PortfolioAggregator::new(&portfolio, &history, as_of(), days, calibration())
            .run(&mut rng_from_seed(Some(11)))
            .unwrap();

        assert_eq!(series.len(), days + 1);
        // Day 0 uses stored purchase prices, not fetched closes
        assert_eq!(series[0], 1000.0 + 10.0 * 150.0 + 4.0 * 300.0);
        assert!(series.iter().all(|v| v.is_finite() && *v > 1000.0));
    }

    #[test]
    fn test_series_is_quantity_weighted_sum_of_paths() {
        let portfolio = Portfolio::with_cash(100.0)
            .with_holding("AAA", 3, 10.0)
            .with_holding("BBB", 7, 20.0);
        let aaa = daily_bars(80, |i| 10.0 + ((i * 3) % 7) as f64 * 0.1);
        let bbb = daily_bars(80, |i| 20.0 - ((i * 5) % 9) as f64 * 0.15);
        let mut history = InMemoryHistory::new();
        history.insert("AAA", aaa.clone());
        history.insert("BBB", bbb.clone());

        let days = 20;
        let series = PortfolioAggregator::new(&portfolio, &history, as_of(), days, calibration())
            .run(&mut rng_from_seed(Some(5)))
            .unwrap();

        // Replay each holding with the same generator, in holding order
        let mut rng = rng_from_seed(Some(5));
        let path_a = PathSimulator::new(estimate_parameters(&aaa).unwrap(), calibration())
            .unwrap()
            .simulate(aaa[79].close, days, &mut rng)
            .unwrap();
        let path_b = PathSimulator::new(estimate_parameters(&bbb).unwrap(), calibration())
            .unwrap()
            .simulate(bbb[79].close, days, &mut rng)
            .unwrap();
        assert_ne!(path_a[days], path_b[days]);

        assert_eq!(series[0], 100.0 + 3.0 * 10.0 + 7.0 * 20.0);
        for t in 1..=days {
            assert_relative_eq!(
                series[t],
                100.0 + 3.0 * path_a[t] + 7.0 * path_b[t],
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_prepared_portfolio_is_reusable() {
        let portfolio = Portfolio::with_cash(50.0).with_holding("AAPL", 2, 150.0);
        let mut history = InMemoryHistory::new();
        history.insert("AAPL", daily_bars(40, |i| 150.0 + (i % 4) as f64));
        let aggregator = PortfolioAggregator::new(&portfolio, &history, as_of(), 10, calibration());

        let prepared = aggregator.prepare().unwrap();
        assert_eq!(prepared.days(), 10);
        assert_eq!(prepared.start_value(), 350.0);

        for seed in [1, 2, 3] {
            assert_eq!(
                prepared.simulate(&mut rng_from_seed(Some(seed))).unwrap(),
                aggregator.run(&mut rng_from_seed(Some(seed))).unwrap()
            );
        }
    }

    #[test]
    fn test_series_feeds_performance_analysis() {
        let portfolio = Portfolio::with_cash(500.0).with_holding("AAPL", 7, 150.0);
        let mut history = InMemoryHistory::new();
        history.insert("AAPL", daily_bars(250, |i| 150.0 + ((i * 7) % 11) as f64 - 5.0));

        for seed in 0..10 {
            let days = 60;
            let series = PortfolioAggregator::new(&portfolio, &history, as_of(), days, calibration())
                .run(&mut rng_from_seed(Some(seed)))
                .unwrap();
            let metrics = crate::portfolio::analyze(&series, days);

            assert!(metrics.cumulative_return_pct.is_finite());
            assert!(metrics.annualised_volatility_pct.is_finite());
            assert!(metrics.annualised_sharpe.map_or(true, f64::is_finite));
        }
    }

    #[test]
    fn test_flat_history_holds_seed_value() {
        // Flat history means zero volatility, so every simulated day equals the seed close
        let portfolio = Portfolio::with_cash(200.0).with_holding("FLAT", 3, 40.0);
        let mut history = InMemoryHistory::new();
        history.insert("FLAT", daily_bars(30, |_| 50.0));

        let series = PortfolioAggregator::new(&portfolio, &history, as_of(), 5, calibration())
            .run(&mut SequenceSource::new(vec![1.5, -2.0]))
            .unwrap();

        assert_eq!(series[0], 200.0 + 3.0 * 40.0);
        for &value in &series[1..] {
            assert_relative_eq!(value, 200.0 + 3.0 * 50.0);
        }
    }

    #[test]
    fn test_only_trailing_year_is_used() {
        // A crash more than a year before as_of must not affect estimation
        let portfolio = Portfolio::new().with_holding("OLD", 1, 100.0);
        let mut history = InMemoryHistory::new();
        let mut bars = daily_bars(30, |_| 100.0);
        bars.push(HistoricalBar::new(as_of() - Duration::days(500), 10.0));
        bars.push(HistoricalBar::new(as_of() - Duration::days(499), 1000.0));
        history.insert("OLD", bars);

        let series = PortfolioAggregator::new(&portfolio, &history, as_of(), 4, calibration())
            .run(&mut SequenceSource::new(vec![3.0]))
            .unwrap();

        assert!(series.iter().all(|&v| v == 100.0));
    }

    #[test]
    fn test_insufficient_history_aborts() {
        let portfolio = Portfolio::with_cash(100.0)
            .with_holding("GOOD", 1, 10.0)
            .with_holding("THIN", 1, 10.0);
        let mut history = InMemoryHistory::new();
        history.insert("GOOD", daily_bars(20, |i| 10.0 + i as f64 * 0.1));
        history.insert("THIN", daily_bars(1, |_| 10.0));

        let result = PortfolioAggregator::new(&portfolio, &history, as_of(), 5, calibration())
            .run(&mut rng_from_seed(Some(1)));

        match result {
            Err(Error::InsufficientData(msg)) => assert!(msg.starts_with("THIN")),
            other => panic!("expected InsufficientData, got {:?}", other),
        }
    }

    /// History that returns bars but never a seed close.
    struct NoSeedHistory(InMemoryHistory);

    impl HistoricalDataProvider for NoSeedHistory {
        fn most_recent_close(&self, _ticker: &str, _as_of: NaiveDate) -> Option<f64> {
            None
        }

        fn bars_in_range(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Vec<HistoricalBar> {
            self.0.bars_in_range(ticker, start, end)
        }
    }

    #[test]
    fn test_missing_seed_price_aborts() {
        let portfolio = Portfolio::new().with_holding("AAPL", 5, 150.0);
        let mut inner = InMemoryHistory::new();
        inner.insert("AAPL", daily_bars(20, |i| 150.0 + i as f64));
        let history = NoSeedHistory(inner);

        let result = PortfolioAggregator::new(&portfolio, &history, as_of(), 5, calibration())
            .run(&mut rng_from_seed(Some(1)));

        match result {
            Err(Error::MissingPrice { ticker, as_of: date }) => {
                assert_eq!(ticker, "AAPL");
                assert_eq!(date, as_of());
            }
            other => panic!("expected MissingPrice, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_calibration_rejected() {
        let portfolio = Portfolio::with_cash(100.0);
        let history = InMemoryHistory::new();

        let result = PortfolioAggregator::new(
            &portfolio,
            &history,
            as_of(),
            5,
            Calibration::new(2.0, 0.0, 0.3),
        )
        .run(&mut rng_from_seed(Some(1)));

        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_cancelled_run_returns_error() {
        let portfolio = Portfolio::new().with_holding("AAPL", 5, 150.0);
        let mut history = InMemoryHistory::new();
        history.insert("AAPL", daily_bars(20, |i| 150.0 + i as f64));

        let token = CancelToken::new();
        token.cancel();

        let result = PortfolioAggregator::new(&portfolio, &history, as_of(), 5, calibration())
            .with_cancel(token)
            .run(&mut rng_from_seed(Some(1)));

        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_trailing_year_start() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            trailing_year_start(date),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()
        );
    }
}
