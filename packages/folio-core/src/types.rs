//! Core data types for the simulation engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single daily close for one asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HistoricalBar {
    /// Trading date
    pub date: NaiveDate,
    /// Closing price
    pub close: f64,
}

impl HistoricalBar {
    /// Create a new bar.
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Statistical parameters estimated from an asset's history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct AssetParameters {
    /// Mean simple daily return (drift)
    pub average_daily_return: f64,
    /// Population standard deviation of daily returns
    pub volatility: f64,
    /// Mean of the most recent returns, or the drift when history is short
    pub momentum: f64,
}

/// A holding in the portfolio being simulated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoldingPosition {
    /// Ticker symbol (uppercase)
    pub ticker: String,
    /// Number of shares held
    pub quantity: u64,
    /// Price used to value the holding on day 0
    pub purchase_price: f64,
}

impl HoldingPosition {
    /// Create a new holding with the given ticker, quantity, and purchase price.
    pub fn new(ticker: &str, quantity: u64, purchase_price: f64) -> Self {
        Self {
            ticker: ticker.to_uppercase(),
            quantity,
            purchase_price,
        }
    }

    /// Day-0 value of this holding.
    pub fn market_value(&self) -> f64 {
        self.quantity as f64 * self.purchase_price
    }
}

/// A portfolio containing cash and holdings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Portfolio {
    /// List of holdings
    #[serde(default)]
    pub holdings: Vec<HoldingPosition>,
    /// Cash balance, constant over a simulation
    #[serde(default)]
    pub cash: f64,
}

impl Portfolio {
    /// Create a new empty portfolio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a portfolio with initial cash.
    pub fn with_cash(cash: f64) -> Self {
        Self {
            cash,
            ..Default::default()
        }
    }

    /// Add a holding, returning the portfolio for chaining.
    pub fn with_holding(mut self, ticker: &str, quantity: u64, purchase_price: f64) -> Self {
        self.holdings
            .push(HoldingPosition::new(ticker, quantity, purchase_price));
        self
    }

    /// Cash plus the day-0 value of every holding.
    pub fn starting_value(&self) -> f64 {
        self.cash + self.holdings.iter().map(|h| h.market_value()).sum::<f64>()
    }
}

/// Simulated prices for one holding; index 0 is the seed price.
pub type SimulatedPath = Vec<f64>;

/// Portfolio value per day; index 0 is the starting value.
pub type PortfolioValueSeries = Vec<f64>;

/// API response wrapper for CLI output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
