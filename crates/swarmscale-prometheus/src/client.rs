//! Prometheus HTTP client.

use std::time::Duration;

use tracing::{debug, warn};

use swarmscale_core::{MetricSource, Sample};

use crate::error::{MetricsError, MetricsResult};
use crate::response::QueryResponse;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs instant queries against a Prometheus server.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl PrometheusClient {
    /// Create a client for the server at `base_url` (e.g. `http://prometheus:9090`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound every query by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run `expr` and return the first vector entry's value.
    ///
    /// `Ok(None)` means the query succeeded but matched no series.
    pub async fn query(&self, expr: &str) -> MetricsResult<Option<f64>> {
        let url = format!("{}/api/v1/query", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("query", expr)])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(MetricsError::Status {
                status: status.as_u16(),
                body: truncate(&body, 256),
            });
        }

        QueryResponse::from_body(&body)?.first_value()
    }

    /// Run `expr` and fold every failure into [`Sample::Unavailable`].
    pub async fn sample(&self, expr: &str) -> Sample {
        match self.query(expr).await {
            Ok(Some(value)) => Sample::Value(value),
            Ok(None) => {
                debug!(query = %expr, "query returned no series, treating as zero");
                Sample::Value(0.0)
            }
            Err(e) => {
                warn!(query = %expr, error = %e, "metric query failed");
                Sample::Unavailable
            }
        }
    }
}

impl MetricSource for PrometheusClient {
    async fn fetch(&self, query: &str) -> Sample {
        self.sample(query).await
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn vector(values: &[&str]) -> serde_json::Value {
        let result: Vec<_> = values
            .iter()
            .map(|v| json!({"metric": {"service": "web"}, "value": [1700000000.0, v]}))
            .collect();
        json!({"status": "success", "data": {"resultType": "vector", "result": result}})
    }

    #[tokio::test]
    async fn passes_query_expression_through() {
        let server = MockServer::start().await;
        let expr = r#"avg(rate(container_cpu_usage_seconds_total{service="web"}[1m])) * 100"#;

        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .and(query_param("query", expr))
            .respond_with(ResponseTemplate::new(200).set_body_json(vector(&["85.5"])))
            .expect(1)
            .mount(&server)
            .await;

        let client = PrometheusClient::new(server.uri());
        assert_eq!(client.query(expr).await.unwrap(), Some(85.5));
    }

    #[tokio::test]
    async fn empty_result_is_zero() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vector(&[])))
            .mount(&server)
            .await;

        let client = PrometheusClient::new(server.uri());
        assert_eq!(client.fetch("up").await, Sample::Value(0.0));
    }

    #[tokio::test]
    async fn first_entry_only() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vector(&["12", "99"])))
            .mount(&server)
            .await;

        let client = PrometheusClient::new(server.uri());
        assert_eq!(client.fetch("up").await, Sample::Value(12.0));
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = PrometheusClient::new(server.uri());
        let err = client.query("up").await.unwrap_err();
        assert!(matches!(err, MetricsError::Status { status: 503, .. }));
        assert_eq!(client.fetch("up").await, Sample::Unavailable);
    }

    #[tokio::test]
    async fn bad_query_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": "error",
                "errorType": "bad_data",
                "error": "1:5: parse error"
            })))
            .mount(&server)
            .await;

        let client = PrometheusClient::new(server.uri());
        assert_eq!(client.fetch("avg(").await, Sample::Unavailable);
    }

    #[tokio::test]
    async fn scalar_result_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"resultType": "scalar", "result": [1700000000.0, "5"]}
            })))
            .mount(&server)
            .await;

        let client = PrometheusClient::new(server.uri());
        assert_eq!(client.fetch("scalar(up)").await, Sample::Unavailable);
    }

    #[tokio::test]
    async fn empty_matrix_is_zero() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"resultType": "matrix", "result": []}
            })))
            .mount(&server)
            .await;

        let client = PrometheusClient::new(server.uri());
        assert_eq!(client.fetch("up[5m]").await, Sample::Value(0.0));
    }

    #[tokio::test]
    async fn malformed_body_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = PrometheusClient::new(server.uri());
        assert!(matches!(
            client.query("up").await,
            Err(MetricsError::Decode(_))
        ));
        assert_eq!(client.fetch("up").await, Sample::Unavailable);
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/query"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(vector(&["50"]))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = PrometheusClient::new(server.uri()).with_timeout(Duration::from_millis(100));
        assert_eq!(client.fetch("up").await, Sample::Unavailable);
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        // Nothing listens on port 9 locally.
        let client = PrometheusClient::new("http://127.0.0.1:9").with_timeout(Duration::from_secs(2));
        assert_eq!(client.fetch("up").await, Sample::Unavailable);
    }

    #[test]
    fn trailing_slash_trimmed() {
        let client = PrometheusClient::new("http://prometheus:9090/");
        assert_eq!(client.base_url(), "http://prometheus:9090");
    }

    #[test]
    fn truncate_long_bodies() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
