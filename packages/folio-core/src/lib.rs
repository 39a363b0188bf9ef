//! Folio Core - Portfolio Monte-Carlo simulation engine.
//!
//! This crate turns a set of holdings and their price history into a
//! simulated portfolio value series and summary metrics:
//!
//! - **Parameter estimation**: drift, volatility, and momentum from daily closes
//! - **Path simulation**: bounded geometric Brownian motion with adaptive momentum
//! - **Aggregation**: per-holding paths weighted by quantity, plus constant cash
//! - **Performance**: cumulative return, annualised volatility, Sharpe ratio
//! - **Narrative**: prompt formatting and marker extraction for text generators
//!
//! The engine is synchronous and stateless. Randomness is injected through
//! [`simulation::NormalSource`], so seeded generators give reproducible runs.
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, NaiveDate};
//! use folio_core::portfolio::{analyze, InMemoryHistory, PortfolioAggregator};
//! use folio_core::simulation::{rng_from_seed, Calibration};
//! use folio_core::{HistoricalBar, Portfolio};
//!
//! let as_of = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
//! let bars: Vec<HistoricalBar> = (0..60)
//!     .map(|i| HistoricalBar::new(as_of - Duration::days(59 - i), 100.0 + (i % 7) as f64))
//!     .collect();
//!
//! let mut history = InMemoryHistory::new();
//! history.insert("AAPL", bars);
//! let portfolio = Portfolio::with_cash(1000.0).with_holding("AAPL", 10, 100.0);
//!
//! let days = 30;
//! let series = PortfolioAggregator::new(&portfolio, &history, as_of, days, Calibration::new(2.0, 0.02, 0.3))
//!     .run(&mut rng_from_seed(Some(42)))
//!     .unwrap();
//!
//! assert_eq!(series.len(), days + 1);
//! let metrics = analyze(&series, days);
//! println!("Return: {:.2}%", metrics.cumulative_return_pct);
//! ```

use chrono::NaiveDate;

pub mod config;
pub mod narrative;
pub mod portfolio;
pub mod simulation;
pub mod types;

// Re-export commonly used types
pub use types::{
    ApiResponse, AssetParameters, HistoricalBar, HoldingPosition, Portfolio,
    PortfolioValueSeries, SimulatedPath,
};

// Re-export main functionality
pub use config::EngineConfig;
pub use narrative::{extract_narrative, MarkerMatch, TextGenerator};
pub use portfolio::{
    analyze, run_trials, HistoricalDataProvider, HoldingsProvider, PerformanceMetrics,
    PortfolioAggregator, PreparedPortfolio, TrialSummary,
};
pub use simulation::{
    estimate_parameters, Calibration, CancelToken, NormalSource, PathSimulator,
};

/// Error types for folio-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("No price for {ticker} on or before {as_of}")]
    MissingPrice { ticker: String, as_of: NaiveDate },

    #[error("Undefined metric: {0}")]
    UndefinedMetric(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Text generation failed: {0}")]
    TextGeneration(String),

    #[error("Simulation cancelled")]
    Cancelled,

    #[error("Simulation deadline exceeded")]
    DeadlineExceeded,
}

/// Result type for folio-core operations.
pub type Result<T> = std::result::Result<T, Error>;
