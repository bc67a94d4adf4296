use crate::error::{MetricsError, Result};
use crate::{RawSample, UtilizationSampler};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Prometheus HTTP API client issuing the windowed-average utilization query
pub struct PrometheusSampler {
    base_url: String,
    query: String,
    client: Client,
}

/// Top-level Prometheus HTTP API response envelope
#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: Vec<VectorRow>,
}

#[derive(Debug, Deserialize)]
struct VectorRow {
    metric: BTreeMap<String, String>,
    /// `[unix_timestamp, "value"]` — Prometheus encodes the value as a string
    value: (f64, String),
}

impl PrometheusSampler {
    pub fn new(
        base_url: &str,
        metric: &str,
        window: &str,
        group_by_accelerator: bool,
        timeout: Duration,
    ) -> Result<Self> {
        if window.trim().is_empty() {
            return Err(MetricsError::invalid_config(
                "utilization window is empty",
                "Pass a PromQL range such as '1h' or '30m'",
            ));
        }
        if metric.trim().is_empty() {
            return Err(MetricsError::invalid_config(
                "utilization metric name is empty",
                "Pass the exporter's utilization metric, e.g. 'dcgm_gpu_utilization'",
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MetricsError::backend_unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            query: build_query(metric, window, group_by_accelerator),
            client,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Build the windowed-average query, grouped by pod identity and optionally
/// by accelerator
fn build_query(metric: &str, window: &str, group_by_accelerator: bool) -> String {
    let dimensions = if group_by_accelerator {
        "pod, namespace, gpu"
    } else {
        "pod, namespace"
    };
    format!(
        "avg by ({}) (avg_over_time({}[{}]))",
        dimensions, metric, window
    )
}

/// Turn a parsed response into raw samples, dropping rows whose value does
/// not parse as a float
fn into_samples(response: QueryResponse) -> Result<Vec<RawSample>> {
    if response.status != "success" {
        return Err(MetricsError::bad_response(format!(
            "query status '{}': {}",
            response.status,
            response.error.unwrap_or_default()
        )));
    }

    let data = response
        .data
        .ok_or_else(|| MetricsError::bad_response("success response without data"))?;

    if data.result_type != "vector" {
        return Err(MetricsError::bad_response(format!(
            "expected an instant vector, got '{}'",
            data.result_type
        )));
    }

    let mut samples = Vec::with_capacity(data.result.len());
    for row in data.result {
        let value: f64 = match row.value.1.parse() {
            Ok(v) => v,
            Err(_) => {
                warn!("Dropping sample with non-numeric value '{}'", row.value.1);
                continue;
            }
        };
        samples.push(RawSample {
            labels: row.metric,
            value,
        });
    }

    Ok(samples)
}

#[async_trait]
impl UtilizationSampler for PrometheusSampler {
    async fn sample(&self) -> Result<Vec<RawSample>> {
        let url = format!("{}/api/v1/query", self.base_url);
        debug!("GET {} query={}", url, self.query);

        let resp = self
            .client
            .get(&url)
            .query(&[("query", self.query.as_str())])
            .send()
            .await
            .map_err(|e| MetricsError::backend_unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MetricsError::backend_unavailable(format!(
                "query failed with status {}: {}",
                status, body
            )));
        }

        let response: QueryResponse = resp
            .json()
            .await
            .map_err(|e| MetricsError::bad_response(e.to_string()))?;

        into_samples(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query() {
        assert_eq!(
            build_query("dcgm_gpu_utilization", "1h", false),
            "avg by (pod, namespace) (avg_over_time(dcgm_gpu_utilization[1h]))"
        );
        assert_eq!(
            build_query("dcgm_gpu_utilization", "30m", true),
            "avg by (pod, namespace, gpu) (avg_over_time(dcgm_gpu_utilization[30m]))"
        );
    }

    #[test]
    fn test_parse_vector_response() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {
                        "metric": {"pod": "train-0", "namespace": "ml"},
                        "value": [1722000000.123, "0.0"]
                    },
                    {
                        "metric": {},
                        "value": [1722000000.123, "NaN"]
                    }
                ]
            }
        }"#;

        let response: QueryResponse = serde_json::from_str(body).unwrap();
        let samples = into_samples(response).unwrap();

        // The NaN row parses (f64 accepts NaN); both rows survive here, and
        // identity filtering is the candidate filter's job
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].labels.get("pod").unwrap(), "train-0");
        assert_eq!(samples[0].value, 0.0);
    }

    #[test]
    fn test_error_response_is_rejected() {
        let body = r#"{"status": "error", "error": "query timed out"}"#;
        let response: QueryResponse = serde_json::from_str(body).unwrap();

        let err = into_samples(response).unwrap_err();
        assert!(matches!(err, MetricsError::BadResponse { .. }));
        assert!(err.to_string().contains("query timed out"));
    }

    #[test]
    fn test_matrix_response_is_rejected() {
        let body = r#"{
            "status": "success",
            "data": {"resultType": "matrix", "result": []}
        }"#;
        let response: QueryResponse = serde_json::from_str(body).unwrap();

        let err = into_samples(response).unwrap_err();
        assert!(matches!(err, MetricsError::BadResponse { .. }));
    }

    /// With nothing listening, the query maps to BackendUnavailable rather
    /// than a hang (the client carries a timeout)
    #[tokio::test]
    async fn test_unreachable_backend_is_backend_unavailable() {
        let sampler = PrometheusSampler::new(
            "http://127.0.0.1:1",
            "dcgm_gpu_utilization",
            "1h",
            false,
            Duration::from_secs(1),
        )
        .unwrap();

        let result = sampler.sample().await;
        assert!(matches!(result, Err(MetricsError::BackendUnavailable { .. })));
    }

    #[test]
    fn test_empty_window_rejected() {
        let result = PrometheusSampler::new(
            "http://prometheus:9090",
            "dcgm_gpu_utilization",
            "",
            false,
            Duration::from_secs(10),
        );
        assert!(matches!(result, Err(MetricsError::InvalidConfig { .. })));
    }
}
