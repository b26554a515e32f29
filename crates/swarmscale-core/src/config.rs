//! Environment configuration for the autoscaler.
//!
//! Every key is optional except `SERVICE_NAME`, `SCALE_UP_QUERY` and
//! `SCALE_DOWN_QUERY`. The configuration is read once at startup and
//! never mutated afterwards.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_PROMETHEUS_URL: &str = "http://prometheus:9090";
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MIN_REPLICAS: u32 = 2;
pub const DEFAULT_MAX_REPLICAS: u32 = 10;
pub const DEFAULT_SCALE_UP_THRESHOLD: f64 = 70.0;
pub const DEFAULT_SCALE_UP_DURATION_SECS: u64 = 300;
pub const DEFAULT_SCALE_DOWN_THRESHOLD: f64 = 30.0;
pub const DEFAULT_SCALE_DOWN_DURATION_SECS: u64 = 600;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that prevent the autoscaler from starting.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("required environment variable {0} is missing or empty")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("MIN_REPLICAS ({min}) must not exceed MAX_REPLICAS ({max})")]
    ReplicaBounds { min: u32, max: u32 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// One side of the hysteresis band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdRule {
    /// Metric expression handed to the metric source.
    pub query: String,
    /// Trigger value; the comparison is strict.
    pub threshold: f64,
    /// How long the metric must stay past `threshold` before acting.
    pub duration_secs: u64,
}

impl ThresholdRule {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Replica bounds plus the two threshold rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalingPolicy {
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub scale_up: ThresholdRule,
    /// Only `threshold` and `duration_secs` take part in decisions; the
    /// `query` is accepted and validated but never fetched.
    pub scale_down: ThresholdRule,
}

/// Full autoscaler configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalerConfig {
    /// Base URL of the Prometheus HTTP API.
    pub prometheus_url: String,
    /// Docker Engine endpoint (`unix://…` or `tcp://…`).
    pub docker_host: String,
    /// Name of the Swarm service to scale.
    pub service_name: String,
    pub check_interval_secs: u64,
    /// Upper bound on every external call.
    pub request_timeout_secs: u64,
    pub policy: ScalingPolicy,
}

impl ScalerConfig {
    /// Load from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let service_name = required(&lookup, "SERVICE_NAME")?;
        let up_query = required(&lookup, "SCALE_UP_QUERY")?;
        let down_query = required(&lookup, "SCALE_DOWN_QUERY")?;

        let config = ScalerConfig {
            prometheus_url: optional(&lookup, "PROMETHEUS_URL", DEFAULT_PROMETHEUS_URL.to_string())?
                .trim_end_matches('/')
                .to_string(),
            docker_host: optional(&lookup, "DOCKER_HOST", DEFAULT_DOCKER_HOST.to_string())?,
            service_name,
            check_interval_secs: optional(&lookup, "CHECK_INTERVAL", DEFAULT_CHECK_INTERVAL_SECS)?,
            request_timeout_secs: optional(
                &lookup,
                "REQUEST_TIMEOUT",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            policy: ScalingPolicy {
                min_replicas: optional(&lookup, "MIN_REPLICAS", DEFAULT_MIN_REPLICAS)?,
                max_replicas: optional(&lookup, "MAX_REPLICAS", DEFAULT_MAX_REPLICAS)?,
                scale_up: ThresholdRule {
                    query: up_query,
                    threshold: finite(
                        &lookup,
                        "SCALE_UP_THRESHOLD",
                        DEFAULT_SCALE_UP_THRESHOLD,
                    )?,
                    duration_secs: optional(
                        &lookup,
                        "SCALE_UP_DURATION",
                        DEFAULT_SCALE_UP_DURATION_SECS,
                    )?,
                },
                scale_down: ThresholdRule {
                    query: down_query,
                    threshold: finite(
                        &lookup,
                        "SCALE_DOWN_THRESHOLD",
                        DEFAULT_SCALE_DOWN_THRESHOLD,
                    )?,
                    duration_secs: optional(
                        &lookup,
                        "SCALE_DOWN_DURATION",
                        DEFAULT_SCALE_DOWN_DURATION_SECS,
                    )?,
                },
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.check_interval_secs == 0 {
            return Err(ConfigError::Zero("CHECK_INTERVAL"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Zero("REQUEST_TIMEOUT"));
        }

        let policy = &self.policy;
        if policy.min_replicas > policy.max_replicas {
            return Err(ConfigError::ReplicaBounds {
                min: policy.min_replicas,
                max: policy.max_replicas,
            });
        }

        // Inverted thresholds still run, they just never hold steady.
        if policy.scale_down.threshold >= policy.scale_up.threshold {
            warn!(
                scale_up_threshold = policy.scale_up.threshold,
                scale_down_threshold = policy.scale_down.threshold,
                "scale-down threshold is not below scale-up threshold; hysteresis band is empty"
            );
        }

        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn required<F>(lookup: &F, key: &'static str) -> ConfigResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Missing(key)),
    }
}

/// Unset and blank values fall back to `default`.
fn optional<F, T>(lookup: &F, key: &'static str, default: T) -> ConfigResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(v) if !v.trim().is_empty() => {
            v.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                value: v.clone(),
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

fn finite<F>(lookup: &F, key: &'static str, default: f64) -> ConfigResult<f64>
where
    F: Fn(&str) -> Option<String>,
{
    let value = optional(lookup, key, default)?;
    if !value.is_finite() {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    Ok(value)
}
