//! In-memory price history and JSON scenario files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::aggregator::HistoricalDataProvider;
use crate::types::{HistoricalBar, HoldingPosition, Portfolio};
use crate::Result;

/// Price history held in memory, keyed by uppercase ticker.
///
/// Bars are kept sorted by date.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct InMemoryHistory {
    series: BTreeMap<String, Vec<HistoricalBar>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the bars stored for `ticker`.
    pub fn insert(&mut self, ticker: &str, mut bars: Vec<HistoricalBar>) {
        bars.sort_by_key(|bar| bar.date);
        self.series.insert(ticker.to_uppercase(), bars);
    }

    /// All bars for `ticker`, oldest first.
    pub fn bars(&self, ticker: &str) -> &[HistoricalBar] {
        self.series
            .get(&ticker.to_uppercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Re-sort every series and uppercase keys after deserialising.
    fn normalize(self) -> Self {
        let mut out = Self::new();
        for (ticker, bars) in self.series {
            out.insert(&ticker, bars);
        }
        out
    }
}

impl HistoricalDataProvider for InMemoryHistory {
    fn most_recent_close(&self, ticker: &str, as_of: NaiveDate) -> Option<f64> {
        let bars = self.bars(ticker);
        let idx = bars.partition_point(|bar| bar.date <= as_of);
        idx.checked_sub(1).map(|i| bars[i].close)
    }

    fn bars_in_range(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Vec<HistoricalBar> {
        self.bars(ticker)
            .iter()
            .filter(|bar| bar.date >= start && bar.date <= end)
            .copied()
            .collect()
    }
}

/// A portfolio together with the history needed to simulate it.
///
/// ```json
/// {
///   "cash": 1000.0,
///   "holdings": [{"ticker": "AAPL", "quantity": 10, "purchase_price": 150.0}],
///   "history": {"AAPL": [{"date": "2024-01-02", "close": 185.6}]}
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    #[serde(default)]
    pub cash: f64,
    #[serde(default)]
    pub holdings: Vec<HoldingPosition>,
    #[serde(default)]
    pub history: InMemoryHistory,
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a scenario from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        let mut scenario: Scenario = serde_json::from_str(content)?;
        for holding in &mut scenario.holdings {
            holding.ticker = holding.ticker.to_uppercase();
        }
        scenario.history = scenario.history.normalize();
        Ok(scenario)
    }

    /// The holdings and cash as a [`Portfolio`].
    pub fn portfolio(&self) -> Portfolio {
        Portfolio {
            holdings: self.holdings.clone(),
            cash: self.cash,
        }
    }
}
