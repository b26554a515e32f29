//! swarmscale-autoscale — hysteresis-gated replica scaling.
//!
//! Each tick reads the service's replica count, fetches one metric
//! sample, and feeds both into a pure decision function together with
//! the hysteresis timers carried over from the previous tick.
//!
//! # Scaling Algorithm
//!
//! ```text
//! sample unavailable         → Hold, timers untouched
//! value > up.threshold       → start/keep high_since, clear low_since
//!     elapsed ≥ up.duration and replicas < max → ScaleUp(replicas + 1), clear high_since
//! value < down.threshold     → start/keep low_since, clear high_since
//!     elapsed ≥ down.duration and replicas > min → ScaleDown(replicas - 1), clear low_since
//! otherwise                  → Hold, clear both
//! ```
//!
//! Scaling is always one replica per decision, so the loop observes the
//! effect of each step before taking the next one.

pub mod hysteresis;
pub mod scaler;

pub use hysteresis::{Evaluation, HysteresisState, evaluate};
pub use scaler::{Autoscaler, TickError, TickOutcome};
