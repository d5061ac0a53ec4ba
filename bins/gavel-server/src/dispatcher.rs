/// Throttled Test Dispatcher - paced fan-out against the sandbox.
///
/// **Core Responsibility:**
/// Run one batch of test cases against the sandbox without ever bursting:
/// exactly one call is released per pacing tick, no matter how many test
/// cases are queued. The sandbox is a shared, rate-sensitive dependency, so
/// the spacing guarantee matters more than raw throughput.
///
/// **Result identity:**
/// Every result carries the `test_id` (batch index) of its test case, and the
/// returned vector is sorted by that id. Callers never need to reason about
/// completion order, and `output.len() == input.len()` always holds: tasks
/// still outstanding when the drain deadline expires are reported as explicit
/// timed-out failures instead of being silently dropped.
///
/// **Failure semantics:**
/// A failed sandbox call (network error, non-success status, malformed
/// payload) becomes a single failing result; it never aborts the batch.
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use gavel_common::types::{ExecutionResult, TestCase};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::metrics;
use crate::sandbox::{RunOutput, Sandbox};

pub struct Dispatcher {
    sandbox: Arc<dyn Sandbox>,
    interval: Duration,
    drain_timeout: Duration,
}

impl Dispatcher {
    pub fn new(sandbox: Arc<dyn Sandbox>, interval: Duration, drain_timeout: Duration) -> Self {
        Dispatcher {
            sandbox,
            interval,
            drain_timeout,
        }
    }

    /// Judge a batch of test cases. Returns one result per test case, in
    /// input order.
    pub async fn run(
        &self,
        code: &str,
        language: &str,
        test_cases: &[TestCase],
    ) -> Vec<ExecutionResult> {
        let deadline = Instant::now() + self.drain_timeout;
        let mut tasks: JoinSet<ExecutionResult> = JoinSet::new();

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for (idx, test_case) in test_cases.iter().enumerate() {
            // One release per tick - this is the pacing guarantee.
            ticker.tick().await;

            let sandbox = Arc::clone(&self.sandbox);
            let code = code.to_string();
            let language = language.to_string();
            let test_case = test_case.clone();
            let test_id = idx as u32;

            metrics::SANDBOX_CALLS.inc();
            tasks.spawn(async move {
                let outcome = sandbox.execute(&language, &code, &test_case.input).await;
                judge(test_id, test_case, outcome)
            });
        }

        let mut results: Vec<ExecutionResult> = Vec::with_capacity(test_cases.len());
        let mut completed: HashSet<u32> = HashSet::new();

        loop {
            let joined = match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        completed = results.len(),
                        total = test_cases.len(),
                        "Dispatch drain deadline hit; abandoning outstanding tests"
                    );
                    tasks.abort_all();
                    break;
                }
            };

            match joined {
                Some(Ok(result)) => {
                    completed.insert(result.test_id);
                    results.push(result);
                }
                Some(Err(join_err)) => {
                    // Panicked task; the missing id is backfilled below.
                    warn!(error = %join_err, "Dispatched test task failed to join");
                }
                None => break,
            }
        }

        // Backfill abandoned or lost tests with explicit timeout failures so
        // the batch length is preserved.
        for (idx, test_case) in test_cases.iter().enumerate() {
            let test_id = idx as u32;
            if !completed.contains(&test_id) {
                results.push(ExecutionResult {
                    test_id,
                    input: test_case.input.clone(),
                    expected_output: test_case.expected_output.clone(),
                    actual_output: String::new(),
                    correct: false,
                    error: Some("execution timed out before completing".to_string()),
                });
            }
        }

        results.sort_by_key(|r| r.test_id);

        debug!(
            total = results.len(),
            passed = results.iter().filter(|r| r.correct).count(),
            "Dispatch batch complete"
        );

        results
    }
}

/// Byte-exact comparison of trimmed outputs. Trailing/leading whitespace and
/// newline-style differences do not count against the submission.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}

fn judge(
    test_id: u32,
    test_case: TestCase,
    outcome: anyhow::Result<RunOutput>,
) -> ExecutionResult {
    match outcome {
        Ok(run) => {
            let correct = outputs_match(&run.stdout, &test_case.expected_output);
            let error = if run.stderr.trim().is_empty() {
                None
            } else {
                Some(run.stderr)
            };
            ExecutionResult {
                test_id,
                input: test_case.input,
                expected_output: test_case.expected_output,
                actual_output: run.stdout,
                correct,
                error,
            }
        }
        Err(e) => ExecutionResult {
            test_id,
            input: test_case.input,
            expected_output: test_case.expected_output,
            actual_output: String::new(),
            correct: false,
            error: Some(e.to_string()),
        },
    }
}
