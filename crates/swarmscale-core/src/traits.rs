//! Collaborator seams driven by the control loop.

use std::future::Future;

use crate::types::Sample;

/// A time-series backend that answers instant queries.
///
/// Implementations never fail: any transport or decoding problem is
/// logged and reported as [`Sample::Unavailable`].
pub trait MetricSource: Send + Sync {
    fn fetch(&self, query: &str) -> impl Future<Output = Sample> + Send;
}

/// The backend that owns the managed service's replicas.
pub trait Orchestrator: Send + Sync {
    /// Current desired replica count of `service`.
    fn replicas(&self, service: &str) -> impl Future<Output = anyhow::Result<u32>> + Send;

    /// Request that `service` run `replicas` instances.
    fn scale(
        &self,
        service: &str,
        replicas: u32,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}
