//! swarmscale-docker — Docker Swarm as the orchestration target.
//!
//! Talks to the Docker Engine API over the endpoint named by
//! `DOCKER_HOST` (a unix socket by default, or plain TCP) using a
//! one-shot HTTP/1 connection per request.
//!
//! # Scaling
//!
//! ```text
//! GET  /v1.41/services/{name}                 → ID, Version.Index, Spec
//! POST /v1.41/services/{id}/update?version=N  ← Spec with
//!                                               Mode.Replicated.Replicas = target
//! ```
//!
//! The service is re-read right before every update so the version index
//! is fresh; the rest of the spec is sent back unchanged.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod service;

pub use client::DockerClient;
pub use endpoint::DockerEndpoint;
pub use error::{DockerError, DockerResult};
pub use service::Service;
