// HTTP route handlers for the Gavel judging service.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use gavel_common::types::{ExecutionResult, Problem, SubmissionRecord, UserProfile, RUN_BUCKET};
use gavel_common::Error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::metrics;
use crate::scoring;
use crate::submissions;
use crate::AppState;

/// Domain errors mapped onto HTTP statuses with a structured body. A missing
/// entity is a 404, a state conflict is a 409, and a malformed timestamp is
/// the caller's fault.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::AlreadyFinalized { .. } | Error::ContestClosed(_) => StatusCode::CONFLICT,
            Error::InvalidTimestamp { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub language: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub user_id: String,
    pub language: String,
    pub code: String,
    /// Present when the submission belongs to a running contest.
    #[serde(default)]
    pub contest_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub results: Vec<ExecutionResult>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub submission_id: String,
    pub accepted: bool,
    pub results: Vec<ExecutionResult>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub contest_id: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FinishRequest {
    pub contest_id: String,
    pub user_id: String,
    /// Contestant completion wall-clock time, `"h:MM:SS AM/PM"`.
    pub completion_time: String,
    /// Set when finalization was forced by a proctoring violation.
    #[serde(default)]
    pub violation: bool,
    /// Cleared when finalization came from an external timeout signal rather
    /// than the contestant's own finish action.
    #[serde(default = "default_submitted")]
    pub submitted: bool,
}

fn default_submitted() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ViolationRequest {
    pub contest_id: String,
    pub user_id: String,
    /// Wall-clock time the violation was detected, `"h:MM:SS AM/PM"`.
    pub completion_time: String,
}

/// POST /execute/run/{problem_id} - judge against the visible samples only.
/// Nothing is persisted; this is the editor's "run" button.
pub async fn execute_run(
    State(state): State<Arc<AppState>>,
    Path(problem_id): Path<String>,
    Json(payload): Json<RunRequest>,
) -> Result<Json<RunResponse>, ApiError> {
    let problem = state.store.problem(&problem_id).await?;
    let results = state
        .dispatcher
        .run(&payload.code, &payload.language, problem.bucket(RUN_BUCKET))
        .await;
    Ok(Json(RunResponse { results }))
}

/// POST /execute/submit/{problem_id} - judge against the full test set and
/// record the attempt. With a `contest_id` the verdict feeds the contest
/// scoring path; without one it feeds the practice path.
pub async fn execute_submit(
    State(state): State<Arc<AppState>>,
    Path(problem_id): Path<String>,
    Json(payload): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let problem = state.store.problem(&problem_id).await?;
    let results = state
        .dispatcher
        .run(&payload.code, &payload.language, &problem.judging_cases())
        .await;
    let record = submissions::build_record(&payload.language, &payload.code, results);
    metrics::SUBMISSIONS_JUDGED.inc();

    match &payload.contest_id {
        Some(contest_id) => {
            // Scoring validates contest state (frozen, unregistered user)
            // before anything is persisted; a rejected submission must not
            // resurrect a history list the freeze already deleted.
            state
                .results
                .apply_submission(contest_id, &payload.user_id, &problem_id, record.accepted)
                .await?;
            state
                .store
                .append_contest_submission(contest_id, &payload.user_id, &problem_id, &record)
                .await?;
        }
        None => {
            state
                .store
                .append_practice_submission(&payload.user_id, &problem_id, &record)
                .await?;
            apply_practice_outcome(&state, problem, &payload.user_id, record.accepted).await?;
        }
    }

    info!(
        problem = %problem_id,
        user = %payload.user_id,
        contest = payload.contest_id.as_deref().unwrap_or("practice"),
        accepted = record.accepted,
        "Submission judged"
    );
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            submission_id: record.id.to_string(),
            accepted: record.accepted,
            results: record.results,
        }),
    ))
}

/// Practice bookkeeping: acceptance counters on the problem, first-solve
/// points and tag progress on the user profile.
async fn apply_practice_outcome(
    state: &AppState,
    mut problem: Problem,
    user_id: &str,
    accepted: bool,
) -> Result<(), ApiError> {
    problem.submissions += 1;
    if accepted {
        problem.accepted_submissions += 1;
    }
    problem.acceptance = acceptance_rate(problem.accepted_submissions, problem.submissions);
    state.store.save_problem(&problem).await?;

    if accepted {
        // A practice solve may arrive before any contest registration seeded
        // the profile.
        let mut profile = match state.store.user(user_id).await {
            Ok(profile) => profile,
            Err(Error::NotFound { .. }) => UserProfile::new(user_id),
            Err(e) => return Err(e.into()),
        };
        if scoring::apply_practice_solve(&mut profile, &problem, &state.scores) {
            state.store.save_user(&profile).await?;
        }
    }
    Ok(())
}

pub fn acceptance_rate(accepted: u64, total: u64) -> String {
    if total == 0 {
        return "0.00 %".to_string();
    }
    format!("{:.2} %", accepted as f64 / total as f64 * 100.0)
}

/// POST /contest/register - seed the contestant's zeroed entry.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .results
        .register(&payload.contest_id, &payload.user_id)
        .await?;
    Ok(StatusCode::CREATED)
}

/// POST /contest/finish - finalize one contestant's score.
pub async fn finish_contest(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FinishRequest>,
) -> Result<Json<gavel_common::types::ContestEntry>, ApiError> {
    let entry = state
        .results
        .finish(
            &payload.contest_id,
            &payload.user_id,
            &payload.completion_time,
            payload.violation,
            payload.submitted,
        )
        .await?;
    Ok(Json(entry))
}

/// POST /contest/violation - a proctoring violation forces finalization:
/// the contestant is scored where they stand and locked out of further
/// submissions, with the violation flag carried onto the standings.
pub async fn report_violation(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ViolationRequest>,
) -> Result<Json<gavel_common::types::ContestEntry>, ApiError> {
    let entry = state
        .results
        .finish(
            &payload.contest_id,
            &payload.user_id,
            &payload.completion_time,
            true,
            false,
        )
        .await?;
    Ok(Json(entry))
}

/// GET /leaderboard/contest/{contest_id} - frozen standings (freezes the
/// contest on first call).
pub async fn contest_leaderboard(
    State(state): State<Arc<AppState>>,
    Path(contest_id): Path<String>,
) -> Result<Json<Vec<gavel_common::types::LeaderboardRow>>, ApiError> {
    Ok(Json(state.ranker.contest(&contest_id).await?))
}

/// GET /leaderboard/global - the cross-contest board, computed on demand.
pub async fn global_leaderboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<gavel_common::types::GlobalStanding>>, ApiError> {
    Ok(Json(state.ranker.global().await?))
}

/// GET /submissions/practice/{user_id}/{problem_id}
pub async fn practice_history(
    State(state): State<Arc<AppState>>,
    Path((user_id, problem_id)): Path<(String, String)>,
) -> Result<Json<Vec<SubmissionRecord>>, ApiError> {
    Ok(Json(
        state
            .store
            .practice_submissions(&user_id, &problem_id)
            .await?,
    ))
}

/// GET /submissions/contest/{contest_id}/{user_id}/{problem_id}
pub async fn contest_history(
    State(state): State<Arc<AppState>>,
    Path((contest_id, user_id, problem_id)): Path<(String, String, String)>,
) -> Result<Json<Vec<SubmissionRecord>>, ApiError> {
    Ok(Json(
        state
            .store
            .contest_submissions(&contest_id, &user_id, &problem_id)
            .await?,
    ))
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus text exposition.
pub async fn metrics_endpoint() -> impl IntoResponse {
    (StatusCode::OK, metrics::render())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acceptance_rate_formats_two_decimals() {
        assert_eq!(acceptance_rate(0, 0), "0.00 %");
        assert_eq!(acceptance_rate(1, 3), "33.33 %");
        assert_eq!(acceptance_rate(2, 2), "100.00 %");
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (Error::not_found("problem", "P1"), StatusCode::NOT_FOUND),
            (
                Error::ContestClosed("C1".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                Error::AlreadyFinalized {
                    contest_id: "C1".to_string(),
                    user_id: "u1".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                Error::InvalidTimestamp {
                    value: "25:99".to_string(),
                    expected: "%H:%M",
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                Error::Backend("redis down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            let response = ApiError(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    // Test assertions unwrap handler results, which needs a debuggable error.
    #[test]
    fn api_error_is_debug_renderable() {
        let rendered = format!("{:?}", ApiError(Error::not_found("contest", "C9")));
        assert!(rendered.contains("NotFound"));
    }

    #[test]
    fn submit_request_contest_id_is_optional() {
        let practice: SubmitRequest = serde_json::from_str(
            r#"{"user_id":"u1","language":"python","code":"print(1)"}"#,
        )
        .unwrap();
        assert!(practice.contest_id.is_none());

        let contest: SubmitRequest = serde_json::from_str(
            r#"{"user_id":"u1","language":"python","code":"print(1)","contest_id":"C1"}"#,
        )
        .unwrap();
        assert_eq!(contest.contest_id.as_deref(), Some("C1"));
    }
}
