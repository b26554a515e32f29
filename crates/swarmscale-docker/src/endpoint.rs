//! `DOCKER_HOST` parsing.
//!
//! Plain connections only: `unix://` sockets and unencrypted `tcp://` or
//! `http://` hosts. `https://` hosts are rejected, and the TLS variables
//! `DOCKER_TLS_VERIFY` and `DOCKER_CERT_PATH` are not read. A TLS-protected
//! daemon has to be reached through a local socket or an unencrypted proxy.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::DockerError;

const DEFAULT_TCP_PORT: u16 = 2375;

/// Where the Docker Engine API listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerEndpoint {
    /// `unix:///var/run/docker.sock`
    Unix(PathBuf),
    /// `tcp://host:port` or `http://host:port`, stored as `host:port`.
    Tcp(String),
}

impl DockerEndpoint {
    /// Value sent in the `Host` header.
    pub fn host_header(&self) -> &str {
        match self {
            // Any name works over a socket; the docker CLI sends this one.
            DockerEndpoint::Unix(_) => "docker",
            DockerEndpoint::Tcp(addr) => addr,
        }
    }
}

impl FromStr for DockerEndpoint {
    type Err = DockerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(DockerError::Endpoint(s.to_string()));
            }
            return Ok(DockerEndpoint::Unix(PathBuf::from(path)));
        }

        let rest = s
            .strip_prefix("tcp://")
            .or_else(|| s.strip_prefix("http://"))
            .ok_or_else(|| DockerError::Endpoint(s.to_string()))?;
        let authority = rest.trim_end_matches('/');

        if authority.is_empty() || authority.contains('/') {
            return Err(DockerError::Endpoint(s.to_string()));
        }

        // Bracketed IPv6 literals carry colons of their own.
        let has_port = match authority.rfind(']') {
            Some(close) => authority[close..].contains(':'),
            None => authority.contains(':'),
        };

        if has_port {
            Ok(DockerEndpoint::Tcp(authority.to_string()))
        } else {
            Ok(DockerEndpoint::Tcp(format!("{authority}:{DEFAULT_TCP_PORT}")))
        }
    }
}

impl fmt::Display for DockerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DockerEndpoint::Unix(path) => write!(f, "unix://{}", path.display()),
            DockerEndpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
        }
    }
}
