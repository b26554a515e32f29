//! Docker Engine API client.
//!
//! Each call opens a fresh connection to the engine, performs a single
//! HTTP/1 exchange and drops the connection. Every call is bounded by the
//! client timeout.

use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, StatusCode, header};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use tokio::net::{TcpStream, UnixStream};
use tracing::{debug, info, warn};

use swarmscale_core::Orchestrator;

use crate::endpoint::DockerEndpoint;
use crate::error::{DockerError, DockerResult};
use crate::service::{Service, UpdateResponse};

/// Engine API version used as the path prefix (Docker 20.10+).
pub const DEFAULT_API_VERSION: &str = "v1.41";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error body returned by the engine on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Inspects and scales Swarm services.
#[derive(Debug, Clone)]
pub struct DockerClient {
    endpoint: DockerEndpoint,
    api_version: String,
    timeout: Duration,
}

impl DockerClient {
    pub fn new(endpoint: DockerEndpoint) -> Self {
        Self {
            endpoint,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build a client from a `DOCKER_HOST`-style string.
    pub fn from_host(host: &str) -> DockerResult<Self> {
        Ok(Self::new(host.parse()?))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn endpoint(&self) -> &DockerEndpoint {
        &self.endpoint
    }

    /// `GET /services/{name}`.
    pub async fn inspect_service(&self, name: &str) -> DockerResult<Service> {
        let path = format!("/{}/services/{name}", self.api_version);
        let (status, body) = self.request(Method::GET, &path, None).await?;

        if status == StatusCode::NOT_FOUND {
            return Err(DockerError::ServiceNotFound(name.to_string()));
        }
        check_status(status, &body)?;

        Ok(serde_json::from_slice(&body)?)
    }

    /// `POST /services/{id}/update?version=N` with `spec` as the body.
    pub async fn update_service(
        &self,
        service: &Service,
        spec: &serde_json::Value,
    ) -> DockerResult<UpdateResponse> {
        let path = format!(
            "/{}/services/{}/update?version={}",
            self.api_version, service.id, service.version.index
        );
        let payload = serde_json::to_vec(spec)?;
        let (status, body) = self.request(Method::POST, &path, Some(payload)).await?;

        if status == StatusCode::NOT_FOUND {
            return Err(DockerError::ServiceNotFound(service.name().to_string()));
        }
        check_status(status, &body)?;

        if body.is_empty() {
            return Ok(UpdateResponse::default());
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// Set the desired replica count of `name`.
    ///
    /// Re-reads the service first so the update carries the current
    /// version index.
    pub async fn scale_service(&self, name: &str, replicas: u32) -> DockerResult<()> {
        let service = self.inspect_service(name).await?;
        let spec = service.spec_with_replicas(replicas)?;

        let response = self.update_service(&service, &spec).await?;
        for warning in response.warnings.iter().flatten() {
            warn!(service = %name, %warning, "docker reported a warning on service update");
        }

        info!(
            service = %name,
            replicas,
            version = service.version.index,
            "service update accepted"
        );
        Ok(())
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> DockerResult<(StatusCode, Bytes)> {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::HOST, self.endpoint.host_header())
            .header(header::USER_AGENT, "swarmscale/0.1");
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let req = builder.body(Full::new(Bytes::from(body.unwrap_or_default())))?;

        debug!(method = %req.method(), uri = %req.uri(), endpoint = %self.endpoint, "docker request");

        match tokio::time::timeout(self.timeout, self.send(req)).await {
            Ok(result) => result,
            Err(_) => Err(DockerError::Timeout(self.timeout)),
        }
    }

    async fn send(&self, req: Request<Full<Bytes>>) -> DockerResult<(StatusCode, Bytes)> {
        match &self.endpoint {
            DockerEndpoint::Unix(path) => {
                let stream = UnixStream::connect(path)
                    .await
                    .map_err(DockerError::Connect)?;
                exchange(TokioIo::new(stream), req).await
            }
            DockerEndpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str())
                    .await
                    .map_err(DockerError::Connect)?;
                exchange(TokioIo::new(stream), req).await
            }
        }
    }
}

async fn exchange<I>(io: I, req: Request<Full<Bytes>>) -> DockerResult<(StatusCode, Bytes)>
where
    I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "docker connection closed with error");
        }
    });

    let resp = sender.send_request(req).await?;
    let status = resp.status();
    let body = resp.into_body().collect().await?.to_bytes();
    Ok((status, body))
}

fn check_status(status: StatusCode, body: &[u8]) -> DockerResult<()> {
    if status.is_success() {
        return Ok(());
    }
    let message = serde_json::from_slice::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
    Err(DockerError::Api {
        status: status.as_u16(),
        message,
    })
}

impl Orchestrator for DockerClient {
    async fn replicas(&self, service: &str) -> anyhow::Result<u32> {
        Ok(self.inspect_service(service).await?.replicas()?)
    }

    async fn scale(&self, service: &str, replicas: u32) -> anyhow::Result<()> {
        self.scale_service(service, replicas).await?;
        Ok(())
    }
}
