//! Prometheus instant-query response model.
//!
//! Only the shapes an instant query can return are modelled. The value is
//! read from the first vector entry, a `[<unix timestamp>, "<float>"]`
//! pair. An empty result of any series type reads as no value; scalar,
//! string and non-empty matrix results are rejected.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{MetricsError, MetricsResult};

/// `[timestamp, "value"]` as sent on the wire.
pub type SamplePair = (f64, String);

/// Top-level envelope of `/api/v1/query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<QueryData>,
    #[serde(default, rename = "errorType")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum QueryData {
    Vector(Vec<VectorSample>),
    Scalar(SamplePair),
    Matrix(Vec<serde_json::Value>),
    #[serde(rename = "string")]
    Text(SamplePair),
}

/// One labelled series in a vector result.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorSample {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    pub value: SamplePair,
}

impl QueryResponse {
    /// Decode a raw response body.
    pub fn from_body(body: &str) -> MetricsResult<Self> {
        serde_json::from_str(body).map_err(|e| MetricsError::Decode(e.to_string()))
    }

    /// Value of the first vector entry.
    ///
    /// `Ok(None)` means the query matched nothing, whether the empty
    /// result was a vector or a matrix.
    pub fn first_value(&self) -> MetricsResult<Option<f64>> {
        if self.status != "success" {
            return Err(MetricsError::Query {
                error_type: self.error_type.clone().unwrap_or_else(|| self.status.clone()),
                error: self.error.clone().unwrap_or_default(),
            });
        }

        let data = self
            .data
            .as_ref()
            .ok_or_else(|| MetricsError::Decode("response has no data".to_string()))?;

        match data {
            QueryData::Vector(samples) => match samples.first() {
                Some(sample) => parse_value(&sample.value.1).map(Some),
                None => Ok(None),
            },
            QueryData::Matrix(series) if series.is_empty() => Ok(None),
            QueryData::Matrix(_) => Err(MetricsError::ResultType("matrix")),
            QueryData::Scalar(_) => Err(MetricsError::ResultType("scalar")),
            QueryData::Text(_) => Err(MetricsError::ResultType("string")),
        }
    }
}

/// Prometheus renders special values as `NaN`, `+Inf` and `-Inf`, all of
/// which `f64::from_str` accepts.
fn parse_value(value: &str) -> MetricsResult<f64> {
    value.parse::<f64>().map_err(|source| MetricsError::ParseValue {
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_first_entry_wins() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"instance": "a"}, "value": [1700000000.123, "85.5"]},
                    {"metric": {"instance": "b"}, "value": [1700000000.123, "12"]}
                ]
            }
        }"#;
        let resp = QueryResponse::from_body(body).unwrap();
        assert_eq!(resp.first_value().unwrap(), Some(85.5));
    }

    #[test]
    fn empty_vector_is_none() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#;
        let resp = QueryResponse::from_body(body).unwrap();
        assert_eq!(resp.first_value().unwrap(), None);
    }

    #[test]
    fn empty_matrix_is_none() {
        let body = r#"{"status":"success","data":{"resultType":"matrix","result":[]}}"#;
        let resp = QueryResponse::from_body(body).unwrap();
        assert_eq!(resp.first_value().unwrap(), None);
    }

    #[test]
    fn scalar_rejected() {
        let body = r#"{"status":"success","data":{"resultType":"scalar","result":[1700000000,"5"]}}"#;
        let err = QueryResponse::from_body(body).unwrap().first_value().unwrap_err();
        assert!(matches!(err, MetricsError::ResultType("scalar")));
    }

    #[test]
    fn string_rejected() {
        let body = r#"{"status":"success","data":{"resultType":"string","result":[1700000000,"up"]}}"#;
        let err = QueryResponse::from_body(body).unwrap().first_value().unwrap_err();
        assert!(matches!(err, MetricsError::ResultType("string")));
    }

    #[test]
    fn vector_without_labels() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[{"value":[1,"7"]}]}}"#;
        let resp = QueryResponse::from_body(body).unwrap();
        assert_eq!(resp.first_value().unwrap(), Some(7.0));
    }

    #[test]
    fn nan_value_parses() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{},"value":[1,"NaN"]}]}}"#;
        let value = QueryResponse::from_body(body).unwrap().first_value().unwrap();
        assert!(value.unwrap().is_nan());
    }

    #[test]
    fn error_status_reported() {
        let body = r#"{"status":"error","errorType":"bad_data","error":"parse error at char 4"}"#;
        let err = QueryResponse::from_body(body).unwrap().first_value().unwrap_err();
        match err {
            MetricsError::Query { error_type, error } => {
                assert_eq!(error_type, "bad_data");
                assert!(error.contains("parse error"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn matrix_rejected() {
        let body = r#"{"status":"success","data":{"resultType":"matrix","result":[{"metric":{},"values":[[1,"1"]]}]}}"#;
        let err = QueryResponse::from_body(body).unwrap().first_value().unwrap_err();
        assert!(matches!(err, MetricsError::ResultType("matrix")));
    }

    #[test]
    fn non_numeric_value_rejected() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{},"value":[1,"high"]}]}}"#;
        let err = QueryResponse::from_body(body).unwrap().first_value().unwrap_err();
        assert!(matches!(err, MetricsError::ParseValue { .. }));
    }

    #[test]
    fn garbage_body_is_decode_error() {
        assert!(matches!(
            QueryResponse::from_body("<html>502 Bad Gateway</html>"),
            Err(MetricsError::Decode(_))
        ));
    }
}
