//! Metric fetcher error types.

use thiserror::Error;

pub type MetricsResult<T> = Result<T, MetricsError>;

/// Reasons a query produced no usable sample.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("request to metric source failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("metric source returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed query response: {0}")]
    Decode(String),

    #[error("query rejected ({error_type}): {error}")]
    Query { error_type: String, error: String },

    #[error("unsupported result type: {0}")]
    ResultType(&'static str),

    #[error("sample value {value:?} is not a number")]
    ParseValue {
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
}
