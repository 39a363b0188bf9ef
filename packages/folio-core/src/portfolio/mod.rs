//! Portfolio module.
//!
//! Aggregates per-holding paths into a portfolio value series and derives
//! performance metrics from it.

mod aggregator;
mod batch;
mod history;
mod performance;

pub use aggregator::{
    trailing_year_start, HistoricalDataProvider, HoldingsProvider, PortfolioAggregator,
    PreparedPortfolio,
};
pub use batch::{run_trials, TrialSummary};
pub use history::{InMemoryHistory, Scenario};
pub use performance::{analyze, daily_returns, max_drawdown_pct, PerformanceMetrics, MIN_SIGMA};
