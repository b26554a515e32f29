//! Autoscaler — the fixed-interval control loop.
//!
//! One tick reads the replica count, fetches the scale-up query's sample,
//! runs [`evaluate`](crate::hysteresis::evaluate), and issues at most one
//! scale command. Tick failures are returned as [`TickError`]; `run` logs
//! them and carries on with the next tick. A panic inside a tick is caught
//! and logged the same way.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info};

use swarmscale_core::{MetricSource, Orchestrator, Sample, ScaleDecision, ScalingPolicy};

use crate::hysteresis::{HysteresisState, evaluate};

/// What a successful tick observed and decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub replicas: u32,
    pub sample: Sample,
    pub decision: ScaleDecision,
}

/// Why a tick stopped short.
#[derive(Debug, Error)]
pub enum TickError {
    /// Nothing was fetched or evaluated; timers are unchanged.
    #[error("failed to read replica count of {service}: {source}")]
    ReplicaRead {
        service: String,
        #[source]
        source: anyhow::Error,
    },

    /// The decision was made and the timers already reset; only the
    /// command itself failed.
    #[error("failed to scale {service} from {from} to {target}: {source}")]
    ScaleCommand {
        service: String,
        from: u32,
        target: u32,
        #[source]
        source: anyhow::Error,
    },
}

/// Drives one service from one metric.
pub struct Autoscaler<M, O> {
    service: String,
    policy: ScalingPolicy,
    metrics: M,
    orchestrator: O,
    state: HysteresisState,
}

impl<M, O> Autoscaler<M, O>
where
    M: MetricSource,
    O: Orchestrator,
{
    /// Create an autoscaler with both timers unset.
    pub fn new(service: impl Into<String>, policy: ScalingPolicy, metrics: M, orchestrator: O) -> Self {
        Self {
            service: service.into(),
            policy,
            metrics,
            orchestrator,
            state: HysteresisState::default(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Timers carried into the next tick.
    pub fn state(&self) -> HysteresisState {
        self.state
    }

    /// Run a single tick as of `now`.
    pub async fn tick(&mut self, now: Instant) -> Result<TickOutcome, TickError> {
        let replicas = self
            .orchestrator
            .replicas(&self.service)
            .await
            .map_err(|source| TickError::ReplicaRead {
                service: self.service.clone(),
                source,
            })?;

        // The scale-down query is never fetched: one signal drives both bands.
        let sample = self.metrics.fetch(&self.policy.scale_up.query).await;

        debug!(
            service = %self.service,
            replicas,
            sample = %sample,
            "evaluating"
        );

        let evaluation = evaluate(sample, replicas, self.state, &self.policy, now);
        self.state = evaluation.state;

        let outcome = TickOutcome {
            replicas,
            sample,
            decision: evaluation.decision,
        };

        if let Some(target) = evaluation.decision.target() {
            let direction = match evaluation.decision {
                ScaleDecision::ScaleUp(_) => "up",
                _ => "down",
            };
            info!(
                service = %self.service,
                from = replicas,
                to = target,
                value = %sample,
                direction,
                "scaling service"
            );

            self.orchestrator
                .scale(&self.service, target)
                .await
                .map_err(|source| TickError::ScaleCommand {
                    service: self.service.clone(),
                    from: replicas,
                    target,
                    source,
                })?;
        }

        Ok(outcome)
    }

    /// Tick every `interval` until `shutdown` flips or its sender is dropped.
    ///
    /// The first tick runs immediately.
    pub async fn run(&mut self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(
            service = %self.service,
            interval_secs = interval.as_secs(),
            min_replicas = self.policy.min_replicas,
            max_replicas = self.policy.max_replicas,
            "autoscaler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = tokio::time::Instant::now().into_std();
            match AssertUnwindSafe(self.tick(now)).catch_unwind().await {
                Ok(Ok(outcome)) => debug!(
                    service = %self.service,
                    replicas = outcome.replicas,
                    decision = %outcome.decision,
                    "tick complete"
                ),
                Ok(Err(e)) => error!(error = %e, "autoscaler tick failed"),
                Err(panic) => error!(
                    service = %self.service,
                    panic = panic_message(panic.as_ref()),
                    "autoscaler tick panicked"
                ),
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!(service = %self.service, "autoscaler shutting down");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_readable() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(format!("bad replica {}", 7));
        assert_eq!(panic_message(payload.as_ref()), "bad replica 7");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn tick_error_messages_name_the_call() {
        let err = TickError::ReplicaRead {
            service: "web".to_string(),
            source: anyhow::anyhow!("connection refused"),
        };
        assert_eq!(
            err.to_string(),
            "failed to read replica count of web: connection refused"
        );

        let err = TickError::ScaleCommand {
            service: "web".to_string(),
            from: 2,
            target: 3,
            source: anyhow::anyhow!("update out of sequence"),
        };
        assert_eq!(
            err.to_string(),
            "failed to scale web from 2 to 3: update out of sequence"
        );
    }
}
