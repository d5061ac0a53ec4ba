//! Redis key semantics - defines only semantics, not runtime logic.
//!
//! Keeping every key builder here ensures the server's storage layer and any
//! operational tooling never drift, and that keys stay deterministic.

pub const PROBLEM_PREFIX: &str = "gavel:problem";
pub const CONTEST_PREFIX: &str = "gavel:contest";
pub const RESULTS_PREFIX: &str = "gavel:results";
pub const USER_PREFIX: &str = "gavel:user";
pub const SUBMISSIONS_PREFIX: &str = "gavel:submissions";

/// Set of all known problem ids (for the active-problem scan).
pub const PROBLEM_INDEX: &str = "gavel:problems";
/// Set of all known contest ids (for counting contests).
pub const CONTEST_INDEX: &str = "gavel:contests";
/// Set of all known user ids (for the global leaderboard scan).
pub const USER_INDEX: &str = "gavel:users";

pub fn problem_key(problem_id: &str) -> String {
    format!("{}:{}", PROBLEM_PREFIX, problem_id)
}

pub fn contest_key(contest_id: &str) -> String {
    format!("{}:{}", CONTEST_PREFIX, contest_id)
}

/// The single per-contest results document (live map or frozen standings).
pub fn results_key(contest_id: &str) -> String {
    format!("{}:{}", RESULTS_PREFIX, contest_id)
}

pub fn user_key(user_id: &str) -> String {
    format!("{}:{}", USER_PREFIX, user_id)
}

/// Practice submission history, one list per (user, problem).
pub fn practice_history_key(user_id: &str, problem_id: &str) -> String {
    format!("{}:practice:{}:{}", SUBMISSIONS_PREFIX, user_id, problem_id)
}

/// Contest submission history, one list per (contest, user, problem).
pub fn contest_history_key(contest_id: &str, user_id: &str, problem_id: &str) -> String {
    format!(
        "{}:contest:{}:{}:{}",
        SUBMISSIONS_PREFIX, contest_id, user_id, problem_id
    )
}

/// Set tracking every history list written for a contest, so closing the
/// contest can delete them without a keyspace scan.
pub fn contest_history_index(contest_id: &str) -> String {
    format!("{}:contest:{}:index", SUBMISSIONS_PREFIX, contest_id)
}
