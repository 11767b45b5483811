use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::error;
use crate::metrics::{
    ADMITTED_TOTAL, DECISION_ERRORS, DECISION_LATENCY, REJECTED_TOTAL, REQUEST_TOTAL,
};
use crate::rate_limit::Decision;
use crate::state::AppState;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

// Admission check for the calling client
pub async fn rate_limit_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    REQUEST_TOTAL.inc();

    let client = state.identity.identify(&headers, peer);
    let limit = state.rate_limiter.policy().limit;

    let start_time = Instant::now();
    let decision = state.rate_limiter.check(&client).await;
    DECISION_LATENCY.observe(start_time.elapsed().as_secs_f64());

    match decision {
        Ok(Decision::Admitted { remaining, .. }) => {
            ADMITTED_TOTAL.inc();
            (
                StatusCode::OK,
                quota_headers(limit, remaining),
                "Request allowed",
            )
                .into_response()
        }
        Ok(Decision::Rejected { retry_after }) => {
            REJECTED_TOTAL.inc();
            let mut headers = quota_headers(limit, 0);
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));
            (StatusCode::TOO_MANY_REQUESTS, headers, "rate limit exceeded").into_response()
        }
        Err(e) => {
            DECISION_ERRORS.inc();
            error!(client = %client, error = %e, "Admission check failed");
            internal_error()
        }
    }
}

// Drop the stored quota for one client
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Path(client): Path<String>,
) -> Response {
    match state.rate_limiter.reset(&client).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!(client = %client, error = %e, "Rate limit reset failed");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::INTERNAL_SERVER_ERROR
            .canonical_reason()
            .unwrap_or("Internal Server Error"),
    )
        .into_response()
}

fn quota_headers(limit: u32, remaining: u32) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(LIMIT_HEADER, HeaderValue::from(limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
    headers
}

// whole seconds, rounded up, never zero
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}
