/// Sandbox Client - thin contract to the external code-execution service.
///
/// One call = one (code, language, stdin) -> (stdout, stderr) pair. The
/// sandbox is an opaque collaborator: any non-success status or missing run
/// payload is surfaced as an `Err`, which the dispatcher degrades to a
/// per-test failure rather than aborting the batch.
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn execute(&self, language: &str, code: &str, stdin: &str) -> Result<RunOutput>;
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<SourceFile<'a>>,
    stdin: &'a str,
}

#[derive(Debug, Serialize)]
struct SourceFile<'a> {
    name: String,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    run: Option<RunPhase>,
}

#[derive(Debug, Deserialize)]
struct RunPhase {
    #[serde(default)]
    output: String,
    #[serde(default)]
    stderr: String,
}

/// HTTP client for a Piston-style execution service.
pub struct HttpSandbox {
    client: reqwest::Client,
    base_url: String,
    version: String,
}

impl HttpSandbox {
    pub fn new(base_url: impl Into<String>, version: impl Into<String>) -> Self {
        HttpSandbox {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            version: version.into(),
        }
    }
}

#[async_trait]
impl Sandbox for HttpSandbox {
    async fn execute(&self, language: &str, code: &str, stdin: &str) -> Result<RunOutput> {
        let request = ExecuteRequest {
            language,
            version: &self.version,
            files: vec![SourceFile {
                name: source_file_name(language),
                content: code,
            }],
            stdin,
        };

        let response = self
            .client
            .post(format!("{}/execute", self.base_url))
            .json(&request)
            .send()
            .await
            .context("sandbox request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("sandbox returned status {}", status);
        }

        let body: ExecuteResponse = response
            .json()
            .await
            .context("malformed sandbox payload")?;

        let run = match body.run {
            Some(run) => run,
            None => bail!("sandbox response missing run output"),
        };

        debug!(
            language = language,
            stdout_len = run.output.len(),
            stderr_len = run.stderr.len(),
            "Sandbox call completed"
        );

        Ok(RunOutput {
            stdout: run.output,
            stderr: run.stderr,
        })
    }
}

fn source_file_name(language: &str) -> String {
    let ext = match language {
        "python" | "python3" => "py",
        "java" => "java",
        "rust" => "rs",
        "c" => "c",
        "c++" | "cpp" => "cpp",
        "javascript" | "node" => "js",
        "go" => "go",
        other => other,
    };
    format!("main.{}", ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let request = ExecuteRequest {
            language: "python",
            version: "*",
            files: vec![SourceFile {
                name: source_file_name("python"),
                content: "print(input())",
            }],
            stdin: "5",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["language"], "python");
        assert_eq!(json["version"], "*");
        assert_eq!(json["files"][0]["name"], "main.py");
        assert_eq!(json["stdin"], "5");
    }

    #[test]
    fn response_parses_run_payload() {
        let body: ExecuteResponse =
            serde_json::from_str(r#"{"run":{"output":"10\n","stderr":""}}"#).unwrap();
        let run = body.run.unwrap();
        assert_eq!(run.output, "10\n");
        assert!(run.stderr.is_empty());
    }

    #[test]
    fn response_without_run_is_detectable() {
        let body: ExecuteResponse =
            serde_json::from_str(r#"{"message":"rate limited"}"#).unwrap();
        assert!(body.run.is_none());
    }

    #[test]
    fn source_file_names_follow_language() {
        assert_eq!(source_file_name("java"), "main.java");
        assert_eq!(source_file_name("cpp"), "main.cpp");
        assert_eq!(source_file_name("zig"), "main.zig");
    }
}
