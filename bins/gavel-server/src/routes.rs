// Route table for the Gavel judging service.

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/execute/run/:problem_id", post(handlers::execute_run))
        .route("/execute/submit/:problem_id", post(handlers::execute_submit))
        .route("/contest/register", post(handlers::register))
        .route("/contest/finish", post(handlers::finish_contest))
        .route("/contest/violation", post(handlers::report_violation))
        .route(
            "/leaderboard/contest/:contest_id",
            get(handlers::contest_leaderboard),
        )
        .route("/leaderboard/global", get(handlers::global_leaderboard))
        .route(
            "/submissions/practice/:user_id/:problem_id",
            get(handlers::practice_history),
        )
        .route(
            "/submissions/contest/:contest_id/:user_id/:problem_id",
            get(handlers::contest_history),
        )
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
}
