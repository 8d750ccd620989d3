//! # Prometheus Metrics
//!
//! One registry per service. HTTP-level metrics (request counts, latency)
//! are recorded in middleware; the escrow service additionally counts
//! loan approval checks by outcome through [`MeteredLoanApprovals`], which
//! is where a denied loan and an unreachable loan ledger become
//! distinguishable to operators.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use estate_core::{Address, LoanApprovalCheck, LoanDecision};
use prometheus::{
    core::Collector, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    loan_checks_total: IntCounterVec,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("estate_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "estate_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let loan_checks_total = IntCounterVec::new(
            Opts::new(
                "estate_loan_checks_total",
                "Loan approval checks made on escrow release, by outcome",
            ),
            &["outcome"],
        )
        .expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(loan_checks_total.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                loan_checks_total,
            }),
        }
    }

    /// Total request count, summed across all labels.
    pub fn requests(&self) -> u64 {
        let mut total = 0u64;
        for mf in &self.inner.http_requests_total.collect() {
            for m in mf.get_metric() {
                total += m.get_counter().get_value() as u64;
            }
        }
        total
    }

    /// Number of loan checks that ended with `outcome`.
    pub fn loan_checks(&self, outcome: &str) -> u64 {
        self.inner
            .loan_checks_total
            .with_label_values(&[outcome])
            .get()
    }

    /// Record a loan check outcome.
    pub fn record_loan_check(&self, decision: &LoanDecision) {
        self.inner
            .loan_checks_total
            .with_label_values(&[decision.outcome()])
            .inc();
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse the per-resource segment of status routes so that label
/// cardinality does not grow with the number of borrowers or properties.
fn normalize_path(path: &str) -> String {
    let mut segments = path.trim_start_matches('/').splitn(2, '/');
    match (segments.next(), segments.next()) {
        (Some("loan_status"), Some(_)) => "/loan_status/{buyer_address}".to_string(),
        (Some("escrow_status"), Some(_)) => "/escrow_status/{property_id}".to_string(),
        _ => path.to_string(),
    }
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        m.record_request(&method, &path, response.status().as_u16(), duration);
    }
    response
}

/// A [`LoanApprovalCheck`] that counts every decision of the wrapped check.
pub struct MeteredLoanApprovals {
    inner: Arc<dyn LoanApprovalCheck>,
    metrics: ApiMetrics,
}

impl MeteredLoanApprovals {
    pub fn new(inner: Arc<dyn LoanApprovalCheck>, metrics: ApiMetrics) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl LoanApprovalCheck for MeteredLoanApprovals {
    async fn check_approval(&self, buyer: &Address) -> LoanDecision {
        let decision = self.inner.check_approval(buyer).await;
        self.metrics.record_loan_check(&decision);
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(LoanDecision);

    #[async_trait]
    impl LoanApprovalCheck for Fixed {
        async fn check_approval(&self, _buyer: &Address) -> LoanDecision {
            self.0.clone()
        }
    }

    #[test]
    fn api_metrics_new_starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.loan_checks("approved"), 0);
    }

    #[test]
    fn record_request_increments() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/health/liveness", 200, 0.001);
        m.record_request("POST", "/apply_loan", 400, 0.002);
        assert_eq!(m.requests(), 2);
    }

    #[test]
    fn status_paths_are_normalized() {
        assert_eq!(
            normalize_path("/loan_status/0xabc"),
            "/loan_status/{buyer_address}"
        );
        assert_eq!(
            normalize_path("/escrow_status/42"),
            "/escrow_status/{property_id}"
        );
        assert_eq!(normalize_path("/apply_loan"), "/apply_loan");
        assert_eq!(normalize_path("/health/liveness"), "/health/liveness");
    }

    #[tokio::test]
    async fn metered_check_counts_each_outcome() {
        let metrics = ApiMetrics::new();
        let buyer = Address::new("0xbuyer").unwrap();
        for decision in [
            LoanDecision::Approved,
            LoanDecision::Denied,
            LoanDecision::Unavailable("timeout".into()),
            LoanDecision::Unavailable("refused".into()),
        ] {
            let check =
                MeteredLoanApprovals::new(Arc::new(Fixed(decision.clone())), metrics.clone());
            assert_eq!(check.check_approval(&buyer).await, decision);
        }
        assert_eq!(metrics.loan_checks("approved"), 1);
        assert_eq!(metrics.loan_checks("denied"), 1);
        assert_eq!(metrics.loan_checks("unavailable"), 2);
    }

    #[test]
    fn encoded_output_names_metrics() {
        let m = ApiMetrics::new();
        m.record_loan_check(&LoanDecision::Denied);
        m.record_request("GET", "/metrics", 200, 0.0);
        let text = m.gather_and_encode().unwrap();
        assert!(text.contains("estate_loan_checks_total{outcome=\"denied\"} 1"));
        assert!(text.contains("estate_http_requests_total"));
    }
}
