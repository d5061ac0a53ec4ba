// HTTP client commands against a running Gavel server.
use anyhow::{bail, Context, Result};
use gavel_common::types::{ExecutionResult, GlobalStanding, LeaderboardRow};
use serde::Deserialize;
use std::fs;

pub struct GavelClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    results: Vec<ExecutionResult>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    submission_id: String,
    accepted: bool,
    results: Vec<ExecutionResult>,
}

impl GavelClient {
    pub fn new(base_url: &str) -> Self {
        GavelClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn run(&self, problem: &str, language: &str, file: &str) -> Result<()> {
        let code = read_source(file)?;
        let response = self
            .client
            .post(format!("{}/execute/run/{}", self.base_url, problem))
            .json(&serde_json::json!({ "language": language, "code": code }))
            .send()
            .await
            .context("request failed")?;
        let body: RunResponse = expect_json(response).await?;
        print_results(&body.results);
        Ok(())
    }

    pub async fn submit(
        &self,
        problem: &str,
        user: &str,
        language: &str,
        file: &str,
        contest: Option<&str>,
    ) -> Result<()> {
        let code = read_source(file)?;
        let response = self
            .client
            .post(format!("{}/execute/submit/{}", self.base_url, problem))
            .json(&serde_json::json!({
                "user_id": user,
                "language": language,
                "code": code,
                "contest_id": contest,
            }))
            .send()
            .await
            .context("request failed")?;
        let body: SubmitResponse = expect_json(response).await?;

        let verdict = if body.accepted { "ACCEPTED" } else { "REJECTED" };
        println!("{} (submission {})", verdict, body.submission_id);
        print_results(&body.results);
        Ok(())
    }

    pub async fn register(&self, contest: &str, user: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/contest/register", self.base_url))
            .json(&serde_json::json!({ "contest_id": contest, "user_id": user }))
            .send()
            .await
            .context("request failed")?;
        expect_ok(response).await?;
        println!("Registered {} into {}", user, contest);
        Ok(())
    }

    pub async fn finish(&self, contest: &str, user: &str, completion_time: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/contest/finish", self.base_url))
            .json(&serde_json::json!({
                "contest_id": contest,
                "user_id": user,
                "completion_time": completion_time,
            }))
            .send()
            .await
            .context("request failed")?;
        let entry: serde_json::Value = expect_json(response).await?;
        println!(
            "Finalized {}: final_score={} time_taken={}",
            user, entry["final_score"], entry["time_taken"]
        );
        Ok(())
    }

    pub async fn contest_leaderboard(&self, contest: &str) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/leaderboard/contest/{}", self.base_url, contest))
            .send()
            .await
            .context("request failed")?;
        let rows: Vec<LeaderboardRow> = expect_json(response).await?;

        println!("{:<4} {:<20} {:>8} {:>10} {:>10}", "#", "user", "solved", "score", "time");
        for (rank, row) in rows.iter().enumerate() {
            println!(
                "{:<4} {:<20} {:>8} {:>10} {:>10}{}",
                rank + 1,
                row.user_id,
                row.problems_solved,
                row.final_score,
                row.time_taken,
                if row.violation { "  [violation]" } else { "" }
            );
        }
        Ok(())
    }

    pub async fn global_leaderboard(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/leaderboard/global", self.base_url))
            .send()
            .await
            .context("request failed")?;
        let rows: Vec<GlobalStanding> = expect_json(response).await?;

        println!(
            "{:<4} {:<20} {:>8} {:>9} {:>9} {:>9}",
            "#", "user", "solved", "problems", "contests", "score"
        );
        for (rank, row) in rows.iter().enumerate() {
            println!(
                "{:<4} {:<20} {:>8} {:>9} {:>9} {:>9}",
                rank + 1,
                row.user_id,
                row.problems_solved,
                row.problem_final_score,
                row.contest_final_score,
                row.leaderboard_score
            );
        }
        Ok(())
    }
}

fn read_source(file: &str) -> Result<String> {
    fs::read_to_string(file).with_context(|| format!("failed to read source file {}", file))
}

fn print_results(results: &[ExecutionResult]) {
    for result in results {
        let status = if result.correct { "PASS" } else { "FAIL" };
        match &result.error {
            Some(error) => println!("  test {}: {} ({})", result.test_id, status, error),
            None => println!("  test {}: {}", result.test_id, status),
        }
    }
}

async fn expect_ok(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("server returned {}: {}", status, body);
    }
    Ok(())
}

async fn expect_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("server returned {}: {}", status, body);
    }
    response.json().await.context("malformed server response")
}
