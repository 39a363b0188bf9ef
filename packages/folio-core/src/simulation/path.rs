//! Bounded geometric Brownian motion with adaptive momentum.
//!
//! Each simulated day applies a GBM step whose drift is a blend of the
//! historical drift and a running momentum term. The resulting price is
//! clamped into two symmetric bands around the previous price:
//!
//! - **Daily movement band**: `±max_daily_movement`
//! - **Volatility band**: `±k_multiplier × volatility`
//!
//! Momentum is then updated by exponential smoothing toward the realised
//! return, clamped, and decayed.

use serde::{Deserialize, Serialize};

use super::cancel::CancelToken;
use super::random::NormalSource;
use crate::types::{AssetParameters, SimulatedPath};
use crate::{Error, Result};

// DRIFT_WEIGHT, MOMENTUM_LIMIT and MOMENTUM_DECAY are fixed heuristics, not
// fitted values. Changing any of them changes every simulated path.

/// Weight applied to historical drift in the effective drift.
pub const DRIFT_WEIGHT: f64 = 0.3;

/// Bound on the smoothed momentum, applied before decay.
pub const MOMENTUM_LIMIT: f64 = 0.005;

/// Per-day multiplicative momentum decay.
pub const MOMENTUM_DECAY: f64 = 0.9;

/// Calibration knobs shared by every holding in a run.
///
/// Every run takes an explicit calibration. `Calibration::default()`
/// (k = 2.0, 2% daily cap, α = 0.3) is what [`crate::config::EngineConfig`]
/// falls back to when a config file omits the section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Calibration {
    /// Width of the volatility band, in multiples of daily volatility
    pub k_multiplier: f64,
    /// Cap on the absolute daily price change, as a fraction
    pub max_daily_movement: f64,
    /// Weight of the latest return in the momentum update
    pub smoothing_factor: f64,
}

impl Calibration {
    /// Create a calibration; call [`Calibration::validate`] before use.
    pub fn new(k_multiplier: f64, max_daily_movement: f64, smoothing_factor: f64) -> Self {
        Self {
            k_multiplier,
            max_daily_movement,
            smoothing_factor,
        }
    }

    /// Check every knob is inside its documented range.
    pub fn validate(&self) -> Result<()> {
        if !self.k_multiplier.is_finite() || self.k_multiplier <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "k_multiplier must be positive, got {}",
                self.k_multiplier
            )));
        }
        if !(self.max_daily_movement > 0.0 && self.max_daily_movement < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "max_daily_movement must be in (0, 1), got {}",
                self.max_daily_movement
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing_factor) {
            return Err(Error::InvalidParameter(format!(
                "smoothing_factor must be in [0, 1], got {}",
                self.smoothing_factor
            )));
        }
        Ok(())
    }
}

/// Generates price paths for a single asset.
#[derive(Debug, Clone, Copy)]
pub struct PathSimulator {
    params: AssetParameters,
    calibration: Calibration,
}

impl PathSimulator {
    /// Create a simulator, rejecting out-of-range calibration or non-finite parameters.
    pub fn new(params: AssetParameters, calibration: Calibration) -> Result<Self> {
        calibration.validate()?;
        let finite = params.average_daily_return.is_finite()
            && params.volatility.is_finite()
            && params.momentum.is_finite();
        if !finite || params.volatility < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "asset parameters must be finite with non-negative volatility: {:?}",
                params
            )));
        }
        Ok(Self {
            params,
            calibration,
        })
    }

    /// Simulate `days` steps starting at `initial_price`.
    ///
    /// The returned path has `days + 1` prices and starts with `initial_price`.
    /// With `volatility == 0` the volatility band has zero width, so every
    /// simulated price equals `initial_price` whatever the drift or momentum.
    pub fn simulate<S: NormalSource + ?Sized>(
        &self,
        initial_price: f64,
        days: usize,
        rng: &mut S,
    ) -> Result<SimulatedPath> {
        self.run(initial_price, days, rng, None)
    }

    /// Like [`PathSimulator::simulate`], checking `cancel` before every step.
    pub fn simulate_with_cancel<S: NormalSource + ?Sized>(
        &self,
        initial_price: f64,
        days: usize,
        rng: &mut S,
        cancel: &CancelToken,
    ) -> Result<SimulatedPath> {
        self.run(initial_price, days, rng, Some(cancel))
    }

    fn run<S: NormalSource + ?Sized>(
        &self,
        initial_price: f64,
        days: usize,
        rng: &mut S,
        cancel: Option<&CancelToken>,
    ) -> Result<SimulatedPath> {
        if !initial_price.is_finite() || initial_price <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "initial price must be positive, got {}",
                initial_price
            )));
        }

        let drift = self.params.average_daily_return;
        let sigma = self.params.volatility;
        let Calibration {
            k_multiplier,
            max_daily_movement,
            smoothing_factor,
        } = self.calibration;

        let mut path = Vec::with_capacity(days + 1);
        path.push(initial_price);

        let mut current_price = initial_price;
        let mut momentum = self.params.momentum;

        for _ in 0..days {
            if let Some(token) = cancel {
                token.check()?;
            }

            let shock = rng.next_standard_normal();
            let effective_drift = DRIFT_WEIGHT * drift + momentum;
            let factor = ((effective_drift - sigma * sigma / 2.0) + sigma * shock).exp();
            let raw_price = current_price * factor;

            let new_price = raw_price
                .clamp(
                    current_price * (1.0 - max_daily_movement),
                    current_price * (1.0 + max_daily_movement),
                )
                .clamp(
                    current_price * (1.0 - k_multiplier * sigma),
                    current_price * (1.0 + k_multiplier * sigma),
                );

            let today_return = (new_price - current_price) / current_price;
            momentum = update_momentum(momentum, today_return, smoothing_factor);

            path.push(new_price);
            current_price = new_price;
        }

        Ok(path)
    }
}

/// Smooth toward `today_return`, clamp to ±[`MOMENTUM_LIMIT`], then decay.
pub(crate) fn update_momentum(momentum: f64, today_return: f64, smoothing_factor: f64) -> f64 {
    let smoothed = (1.0 - smoothing_factor) * momentum + smoothing_factor * today_return;
    smoothed.clamp(-MOMENTUM_LIMIT, MOMENTUM_LIMIT) * MOMENTUM_DECAY
}
