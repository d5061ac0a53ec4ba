// Scripted sandbox for tests. Behavior is keyed by the stdin value, which
// the tests set to the test-case index, so outcomes stay deterministic no
// matter what order the dispatched tasks complete in.

use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::time::Instant;

use crate::sandbox::{RunOutput, Sandbox};

enum Mode {
    /// stdout = 2 * stdin, matching the `cases()` fixtures.
    Doubling,
    /// stdout is always the same string.
    Constant(String),
}

pub struct FakeSandbox {
    mode: Mode,
    fail_on: Option<i64>,
    hang_on: Option<i64>,
    calls: Mutex<Vec<Instant>>,
}

impl FakeSandbox {
    pub fn doubling() -> Self {
        FakeSandbox {
            mode: Mode::Doubling,
            fail_on: None,
            hang_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn constant(stdout: &str) -> Self {
        FakeSandbox {
            mode: Mode::Constant(stdout.to_string()),
            fail_on: None,
            hang_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail the call whose stdin parses to this value.
    pub fn failing_on(mut self, stdin_value: i64) -> Self {
        self.fail_on = Some(stdin_value);
        self
    }

    /// Never complete the call whose stdin parses to this value.
    pub fn hanging_on(mut self, stdin_value: i64) -> Self {
        self.hang_on = Some(stdin_value);
        self
    }

    /// Release instants of every call, in release order.
    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sandbox for FakeSandbox {
    async fn execute(&self, _language: &str, _code: &str, stdin: &str) -> Result<RunOutput> {
        self.calls.lock().unwrap().push(Instant::now());

        let value: i64 = stdin.trim().parse().unwrap_or(0);
        if self.hang_on == Some(value) {
            std::future::pending::<()>().await;
        }
        if self.fail_on == Some(value) {
            bail!("synthetic sandbox failure");
        }

        let stdout = match &self.mode {
            Mode::Doubling => format!("{}\n", value * 2),
            Mode::Constant(output) => output.clone(),
        };
        Ok(RunOutput {
            stdout,
            stderr: String::new(),
        })
    }
}
