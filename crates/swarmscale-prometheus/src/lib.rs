//! swarmscale-prometheus — the metric fetcher.
//!
//! Runs Prometheus instant queries and reduces the answer to a single
//! [`Sample`](swarmscale_core::Sample):
//!
//! ```text
//! GET {base}/api/v1/query?query=<expr>
//!   ├── transport / status / body error → Sample::Unavailable (logged)
//!   ├── empty result                    → Sample::Value(0.0)
//!   └── result[0].value[1]              → Sample::Value(parsed)
//! ```

pub mod client;
pub mod error;
pub mod response;

pub use client::PrometheusClient;
pub use error::{MetricsError, MetricsResult};
pub use response::{QueryData, QueryResponse};
