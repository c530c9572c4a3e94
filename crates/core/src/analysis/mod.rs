//! The tempo-learning pipeline, one stage per file.
//!
//! Every stage is a small synchronous state machine with fixed-size storage.
//! [`crate::Engine`] wires them together in the order a trigger flows
//! through them: discrimination, interpolation, estimation, smoothing, octave
//! correction, locking and prediction.

mod discriminator;
mod estimator;
mod interpolator;
mod octave;
mod predictor;
mod smoother;
mod sticky;

pub use discriminator::{BeatDiscriminator, Verdict, MIN_BEAT_INTERVAL_MS};
pub use estimator::{bpm_from_interval, BpmEstimator, Estimate};
pub use interpolator::MissedBeatInterpolator;
pub use octave::{Correction, OctaveCorrector};
pub use predictor::{beat_period_ms, BeatPredictor};
pub use smoother::Smoother;
pub use sticky::StickyLockController;
