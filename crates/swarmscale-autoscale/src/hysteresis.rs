//! Dual-threshold decision engine.
//!
//! `evaluate` is a pure function: the timers go in by value and the
//! updated timers come back out alongside the decision.

use std::time::Instant;

use tracing::debug;

use swarmscale_core::{Sample, ScaleDecision, ScalingPolicy};

/// When the metric first crossed each threshold in the current run.
///
/// At most one of the two is set at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HysteresisState {
    /// Start of the current continuous run above the scale-up threshold.
    pub high_since: Option<Instant>,
    /// Start of the current continuous run below the scale-down threshold.
    pub low_since: Option<Instant>,
}

impl HysteresisState {
    pub fn is_idle(&self) -> bool {
        self.high_since.is_none() && self.low_since.is_none()
    }
}

/// Decision plus the timers to carry into the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: ScaleDecision,
    pub state: HysteresisState,
}

/// Evaluate one sample against the policy.
///
/// Region checks run high, then low, then normal. Both thresholds are
/// strict, so a value sitting exactly on either one is in the normal band.
pub fn evaluate(
    sample: Sample,
    current_replicas: u32,
    state: HysteresisState,
    policy: &ScalingPolicy,
    now: Instant,
) -> Evaluation {
    let Some(value) = sample.value() else {
        debug!("metric unavailable, timers left as they are");
        return hold(state);
    };

    let mut next = state;

    if value > policy.scale_up.threshold {
        next.low_since = None;

        let since = *next.high_since.get_or_insert(now);
        let elapsed = now.saturating_duration_since(since);
        let required = policy.scale_up.duration();

        debug!(
            value,
            threshold = policy.scale_up.threshold,
            elapsed_secs = elapsed.as_secs(),
            required_secs = required.as_secs(),
            "metric above scale-up threshold"
        );

        if elapsed < required {
            return hold(next);
        }

        if current_replicas < policy.max_replicas {
            next.high_since = None;
            return Evaluation {
                decision: ScaleDecision::ScaleUp(current_replicas + 1),
                state: next,
            };
        }

        // The timer keeps running at the ceiling.
        debug!(
            replicas = current_replicas,
            max = policy.max_replicas,
            "already at maximum replicas"
        );
        return hold(next);
    }

    if value < policy.scale_down.threshold {
        next.high_since = None;

        let since = *next.low_since.get_or_insert(now);
        let elapsed = now.saturating_duration_since(since);
        let required = policy.scale_down.duration();

        debug!(
            value,
            threshold = policy.scale_down.threshold,
            elapsed_secs = elapsed.as_secs(),
            required_secs = required.as_secs(),
            "metric below scale-down threshold"
        );

        if elapsed < required {
            return hold(next);
        }

        if current_replicas > policy.min_replicas {
            next.low_since = None;
            return Evaluation {
                decision: ScaleDecision::ScaleDown(current_replicas - 1),
                state: next,
            };
        }

        debug!(
            replicas = current_replicas,
            min = policy.min_replicas,
            "already at minimum replicas"
        );
        return hold(next);
    }

    if !state.is_idle() {
        debug!(value, "metric back in normal range, resetting timers");
    }
    hold(HysteresisState::default())
}

fn hold(state: HysteresisState) -> Evaluation {
    Evaluation {
        decision: ScaleDecision::Hold,
        state,
    }
}
