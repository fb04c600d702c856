//! Prometheus metrics for the HTTP surface.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use tracing::error;

use crate::state::AppState;

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub method: String,
    pub status: String,
}

pub struct Metrics {
    registry: Registry,
    http_requests: Family<RequestLabels, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("rusty_reviews");
        let http_requests = Family::<RequestLabels, Counter>::default();
        registry.register("http_requests", "HTTP requests served", http_requests.clone());
        Self { registry, http_requests }
    }

    pub fn record_request(&self, method: &str, status: StatusCode) {
        self.http_requests
            .get_or_create(&RequestLabels { method: method.to_string(), status: status.as_u16().to_string() })
            .inc();
    }

    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        encode(&mut out, &self.registry)?;
        Ok(out)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// `GET /metrics` in the OpenMetrics text format.
pub async fn render(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "application/openmetrics-text; version=1.0.0; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_method_and_status() {
        let metrics = Metrics::new();
        metrics.record_request("GET", StatusCode::OK);
        metrics.record_request("GET", StatusCode::OK);
        metrics.record_request("POST", StatusCode::UNAUTHORIZED);
        let text = metrics.encode().unwrap();
        assert!(text.contains(r#"rusty_reviews_http_requests_total{method="GET",status="200"} 2"#));
        assert!(text.contains(r#"rusty_reviews_http_requests_total{method="POST",status="401"} 1"#));
    }
}
