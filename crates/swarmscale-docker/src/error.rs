//! Docker client error types.

use std::time::Duration;

use thiserror::Error;

pub type DockerResult<T> = Result<T, DockerError>;

#[derive(Debug, Error)]
pub enum DockerError {
    #[error("invalid docker endpoint {0:?}")]
    Endpoint(String),

    #[error("failed to connect to docker: {0}")]
    Connect(#[source] std::io::Error),

    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),

    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("docker did not answer within {0:?}")]
    Timeout(Duration),

    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("docker api returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode docker response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("service {0} is not in replicated mode")]
    NotReplicated(String),

    #[error("malformed service spec: {0}")]
    Malformed(String),
}
