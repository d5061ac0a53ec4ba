// Prometheus counters for the judging pipeline.
use lazy_static::lazy_static;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

lazy_static! {
    pub static ref SANDBOX_CALLS: IntCounter = register_int_counter!(
        "gavel_sandbox_calls_total",
        "Sandbox executions released by the dispatcher"
    )
    .unwrap();
    pub static ref SUBMISSIONS_JUDGED: IntCounter = register_int_counter!(
        "gavel_submissions_judged_total",
        "Submit-type judging requests completed"
    )
    .unwrap();
    pub static ref CONTESTS_FINALIZED: IntCounter = register_int_counter!(
        "gavel_contest_finalizations_total",
        "Contestant finalizations applied"
    )
    .unwrap();
}

/// Render the default registry in the Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder
        .encode(&prometheus::gather(), &mut buffer)
        .is_err()
    {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
