//! Single-asset simulation: parameter estimation and bounded price paths.

mod cancel;
mod estimator;
mod path;
mod random;

pub use cancel::CancelToken;
pub use estimator::{estimate_parameters, MOMENTUM_WINDOW};
pub use path::{Calibration, PathSimulator, DRIFT_WEIGHT, MOMENTUM_DECAY, MOMENTUM_LIMIT};
pub use random::{rng_from_seed, NormalSource, SequenceSource};
