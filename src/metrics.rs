use lazy_static::lazy_static;
use prometheus::{Counter, Histogram, register_counter, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("quota_gate_requests_total", "Total number of admission checks").unwrap();
    pub static ref ADMITTED_TOTAL: Counter =
        register_counter!("quota_gate_admitted_total", "Requests admitted").unwrap();
    pub static ref REJECTED_TOTAL: Counter = register_counter!(
        "quota_gate_rejected_total",
        "Requests rejected by the rate limit"
    )
    .unwrap();
    pub static ref DECISION_ERRORS: Counter = register_counter!(
        "quota_gate_decision_errors_total",
        "Admission checks that failed"
    )
    .unwrap();
    pub static ref DECISION_LATENCY: Histogram = register_histogram!(
        "quota_gate_decision_latency_seconds",
        "Admission decision latency in seconds"
    )
    .unwrap();
}
