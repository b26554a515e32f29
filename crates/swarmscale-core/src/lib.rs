//! swarmscale-core — shared types for the SwarmScale autoscaler.
//!
//! Holds the scaling policy and its environment loader, the per-tick
//! value types exchanged between the metric fetcher and the decision
//! engine, and the two collaborator seams the control loop drives:
//!
//! ```text
//! MetricSource  — query expression → Sample (value or unavailable)
//! Orchestrator  — service name → replica count, scale(service, n)
//! ```

pub mod config;
pub mod traits;
pub mod types;

pub use config::{ConfigError, ConfigResult, ScalerConfig, ScalingPolicy, ThresholdRule};
pub use traits::{MetricSource, Orchestrator};
pub use types::{Sample, ScaleDecision};
