//! Values exchanged within a single control-loop tick.

use std::fmt;

/// One reading of the scaling metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// The query succeeded. An empty result set is reported as `0.0`.
    Value(f64),
    /// The query failed (transport, status, or body). Never starts or
    /// cancels a hysteresis timer.
    Unavailable,
}

impl Sample {
    /// The scalar, if the sample is available.
    pub fn value(&self) -> Option<f64> {
        match self {
            Sample::Value(v) => Some(*v),
            Sample::Unavailable => None,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sample::Value(v) => write!(f, "{v:.2}"),
            Sample::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Outcome of evaluating one sample against the scaling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Scale up to the given replica count (always current + 1).
    ScaleUp(u32),
    /// Scale down to the given replica count (always current - 1).
    ScaleDown(u32),
    /// Leave the service alone this tick.
    Hold,
}

impl ScaleDecision {
    /// The replica count to request, if this decision scales.
    pub fn target(&self) -> Option<u32> {
        match self {
            ScaleDecision::ScaleUp(n) | ScaleDecision::ScaleDown(n) => Some(*n),
            ScaleDecision::Hold => None,
        }
    }
}

impl fmt::Display for ScaleDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleDecision::ScaleUp(n) => write!(f, "scale-up to {n}"),
            ScaleDecision::ScaleDown(n) => write!(f, "scale-down to {n}"),
            ScaleDecision::Hold => f.write_str("hold"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_value_accessor() {
        assert_eq!(Sample::Value(42.5).value(), Some(42.5));
        assert_eq!(Sample::Unavailable.value(), None);
        assert!(Sample::Value(f64::NAN).value().is_some_and(f64::is_nan));
    }

    #[test]
    fn decision_target() {
        assert_eq!(ScaleDecision::ScaleUp(3).target(), Some(3));
        assert_eq!(ScaleDecision::ScaleDown(2).target(), Some(2));
        assert_eq!(ScaleDecision::Hold.target(), None);
    }

    #[test]
    fn display_formats() {
        assert_eq!(Sample::Value(85.0).to_string(), "85.00");
        assert_eq!(Sample::Unavailable.to_string(), "unavailable");
        assert_eq!(ScaleDecision::ScaleUp(4).to_string(), "scale-up to 4");
        assert_eq!(ScaleDecision::Hold.to_string(), "hold");
    }
}
