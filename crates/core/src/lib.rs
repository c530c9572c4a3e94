//! Real-time tempo tracking from onset triggers.
//!
//! An external onset detector reports "a beat happened now" as a boolean. The
//! [`Engine`] turns that stream into a smoothed BPM, a confidence score, a
//! predicted next-beat time and an optional sticky lock. It learns the beat
//! period from a short history, fills in beats the detector missed, corrects
//! half- and double-tempo locks and never reads a clock of its own, so any
//! input sequence can be replayed deterministically.
//!
//! Renderers on other threads read snapshots through a
//! [`SnapshotPublisher`]/[`SnapshotReader`] pair. Independent channels simply
//! use independent engines.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod publish;
pub mod stream;

pub use analysis::{BpmEstimator, Estimate};
pub use config::{EngineConfig, MAX_SANE_BPM};
pub use engine::{Engine, EngineSnapshot, EngineState, Phase};
pub use error::{Result, TempoError};
pub use history::{BeatEvent, BeatHistory, BeatKind};
pub use publish::{SnapshotPublisher, SnapshotReader};
pub use stream::{Frames, OnsetStream};
