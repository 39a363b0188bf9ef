//! Prompt formatting and narrative extraction for text-generation services.
//!
//! The engine never talks to a model itself. It formats the metrics and a
//! holdings breakdown into a fixed prompt, hands that to a [`TextGenerator`],
//! and pulls the narrative out of the raw response between the
//! [`START_MARKER`] and [`FINISH_MARKER`] tags.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::portfolio::PerformanceMetrics;
use crate::types::HoldingPosition;
use crate::Result;

pub const START_MARKER: &str = "<Start>";
pub const FINISH_MARKER: &str = "<Finish>";

/// How narrative markers are matched in a raw response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarkerMatch {
    #[default]
    CaseSensitive,
    /// ASCII case-insensitive, so `<start>` and `<START>` also match
    CaseInsensitive,
}

/// An external text-generation service.
pub trait TextGenerator {
    /// Return the raw response for `prompt`.
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// One line of the holdings breakdown, e.g. `AAPL: 10 shares @ $150.00 = $1500.00`.
pub fn holding_line(holding: &HoldingPosition) -> String {
    format!(
        "{}: {} shares @ ${:.2} = ${:.2}",
        holding.ticker,
        holding.quantity,
        holding.purchase_price,
        holding.market_value()
    )
}

/// Build the fixed prompt embedding `metrics` and the holdings breakdown.
pub fn build_prompt(metrics: &PerformanceMetrics, holdings: &[HoldingPosition], days: usize) -> String {
    let sharpe = metrics
        .annualised_sharpe
        .map(|s| format!("{:.2}", s))
        .unwrap_or_else(|| "n/a".to_string());

    let breakdown = if holdings.is_empty() {
        "(cash only)".to_string()
    } else {
        holdings
            .iter()
            .map(holding_line)
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are a portfolio analyst. A Monte-Carlo simulation of the portfolio below \
         over {days} days produced these results:\n\
         Cumulative return: {:.2}%\n\
         Annualised volatility: {:.2}%\n\
         Sharpe ratio: {sharpe}\n\
         \n\
         Holdings:\n\
         {breakdown}\n\
         \n\
         Write a short, plain-language summary of the expected performance and risk of \
         this portfolio for a non-expert investor. Place the summary between \
         {START_MARKER} and {FINISH_MARKER}.",
        metrics.cumulative_return_pct, metrics.annualised_volatility_pct,
    )
}

/// Extract the text between the first start marker and the next finish marker.
///
/// The result is trimmed. When either marker is missing the whole trimmed
/// input is returned instead.
pub fn extract_narrative(raw: &str, matching: MarkerMatch) -> String {
    let haystack = match matching {
        MarkerMatch::CaseSensitive => Cow::Borrowed(raw),
        // ASCII lowering keeps byte offsets aligned with `raw`
        MarkerMatch::CaseInsensitive => Cow::Owned(raw.to_ascii_lowercase()),
    };
    let (start_marker, finish_marker) = match matching {
        MarkerMatch::CaseSensitive => (START_MARKER.to_string(), FINISH_MARKER.to_string()),
        MarkerMatch::CaseInsensitive => (
            START_MARKER.to_ascii_lowercase(),
            FINISH_MARKER.to_ascii_lowercase(),
        ),
    };

    let Some(start) = haystack.find(&start_marker) else {
        return raw.trim().to_string();
    };
    let body_start = start + start_marker.len();
    let Some(len) = haystack[body_start..].find(&finish_marker) else {
        return raw.trim().to_string();
    };

    raw[body_start..body_start + len].trim().to_string()
}

/// Build the prompt, call `generator`, and extract the narrative.
pub fn narrate<G: TextGenerator + ?Sized>(
    generator: &G,
    metrics: &PerformanceMetrics,
    holdings: &[HoldingPosition],
    days: usize,
    matching: MarkerMatch,
) -> Result<String> {
    let prompt = build_prompt(metrics, holdings, days);
    let raw = generator.generate(&prompt)?;
    Ok(extract_narrative(&raw, matching))
}
