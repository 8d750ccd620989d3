//! # estate-api — HTTP services for the estate ledgers
//!
//! Two Axum applications, one per service:
//!
//! - [`loan_app`] — the loan ledger (apply, approve, reject, repay, status).
//! - [`escrow_app`] — the escrow ledger (create, deposit, release, refund,
//!   status), which consults the loan ledger over HTTP on release.
//!
//! Both mount unauthenticated health probes (`/health/liveness`,
//! `/health/readiness`) and, when metrics are enabled, `/metrics` in
//! Prometheus text format.
//!
//! ## Credentials
//!
//! Credentials travel in headers (`X-Admin-Key`, `X-Agent-Key`,
//! `X-Buyer-Address`). Handlers hand them to the ledgers, which own the
//! authorization decision; see [`extractors`].

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::{metrics_middleware, ApiMetrics};
pub use crate::state::{EscrowAppState, EscrowServiceConfig, LoanAppState, LoanServiceConfig};

/// Build the loan ledger application. Pass `Some(metrics)` to record
/// request metrics and expose `/metrics`.
pub fn loan_app(state: LoanAppState, metrics: Option<ApiMetrics>) -> Router {
    let api = with_observability(routes::loan::router(), metrics.clone()).with_state(state);
    let probes = probes(
        Router::new()
            .route("/health/liveness", get(liveness))
            .route("/health/readiness", get(loan_readiness)),
        metrics,
    );
    Router::new().merge(probes).merge(api)
}

/// Build the escrow ledger application. Pass `Some(metrics)` to record
/// request metrics and expose `/metrics`; build the state with the same
/// metrics to also count loan checks by outcome.
pub fn escrow_app(state: EscrowAppState, metrics: Option<ApiMetrics>) -> Router {
    let api =
        with_observability(routes::escrow::router(), metrics.clone()).with_state(state.clone());
    let probes = probes(
        Router::new()
            .route("/health/liveness", get(liveness))
            .route("/health/readiness", get(escrow_readiness))
            .with_state(state),
        metrics,
    );
    Router::new().merge(probes).merge(api)
}

fn with_observability<S>(router: Router<S>, metrics: Option<ApiMetrics>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let router = match metrics {
        Some(metrics) => router
            .layer(from_fn(metrics_middleware))
            .layer(Extension(metrics)),
        None => router,
    };
    router.layer(TraceLayer::new_for_http())
}

/// Mount `/metrics` next to the probes when metrics are enabled.
fn probes(router: Router, metrics: Option<ApiMetrics>) -> Router {
    match metrics {
        Some(metrics) => router
            .route("/metrics", get(prometheus_metrics))
            .layer(Extension(metrics)),
        None => router,
    }
}

/// GET /metrics — Prometheus scrape endpoint.
async fn prometheus_metrics(Extension(metrics): Extension<ApiMetrics>) -> impl IntoResponse {
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// The loan ledger has no dependencies; serving is being ready.
async fn loan_readiness() -> &'static str {
    "ready"
}

/// Readiness probe of the escrow service. Checks that the loan ledger
/// answers its liveness probe when a client is configured.
async fn escrow_readiness(State(state): State<EscrowAppState>) -> impl IntoResponse {
    if let Some(client) = &state.loan_ledger {
        if let Err(e) = client.health_check().await {
            tracing::warn!(error = %e, "loan ledger health check failed");
            return (StatusCode::SERVICE_UNAVAILABLE, "loan ledger unreachable").into_response();
        }
    }
    (StatusCode::OK, "ready").into_response()
}
