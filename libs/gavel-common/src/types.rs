use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Test case bucket holding the visible samples shown in the editor.
pub const RUN_BUCKET: &str = "run";
/// Test case bucket holding the hidden judging set.
pub const SUBMIT_BUCKET: &str = "submit";

/// Wall-clock format used for contest start times (`"14:30"`).
pub const START_TIME_FORMAT: &str = "%H:%M";
/// Wall-clock format used for contestant completion timestamps (`"2:45:10 PM"`).
pub const COMPLETION_TIME_FORMAT: &str = "%I:%M:%S %p";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Weight used when averaging contest final scores across contests.
    pub fn weight(&self) -> i64 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

/// Outcome of judging one test case. Keyed by `test_id` (the position of the
/// test case in the dispatched batch) so callers re-associate results by
/// identity rather than completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub test_id: u32,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One judged attempt, appended to a per-(user, problem) or per-(contest,
/// user, problem) history. Failed attempts are stored too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub submitted_at: String,
    pub language: String,
    pub code: String,
    pub results: Vec<ExecutionResult>,
    pub accepted: bool,
}

/// Live scoring state for one contestant in one contest.
///
/// Created when the contestant registers (every contest problem at 0 points),
/// mutated on every submit, and finalized exactly once. `final_score` is only
/// meaningful after `finalized` flips to true and is never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContestEntry {
    pub points: BTreeMap<String, i64>,
    pub total_points: i64,
    pub max_points: i64,
    pub problems_solved: u32,
    pub violation: bool,
    pub submitted: bool,
    pub completion_time: String,
    pub time_taken: String,
    pub time_taken_secs: i64,
    pub final_score: i64,
    pub finalized: bool,
}

impl ContestEntry {
    /// Fresh entry for a contestant, zeroed for every contest problem.
    pub fn for_problems(problem_ids: &[String]) -> Self {
        ContestEntry {
            points: problem_ids.iter().map(|id| (id.clone(), 0)).collect(),
            total_points: 0,
            max_points: 0,
            problems_solved: 0,
            violation: false,
            submitted: false,
            completion_time: String::new(),
            time_taken: String::new(),
            time_taken_secs: 0,
            final_score: 0,
            finalized: false,
        }
    }
}

/// Frozen per-contest standing for one contestant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub user_id: String,
    pub problems_solved: u32,
    pub total_points: i64,
    pub max_points: i64,
    pub completion_time: String,
    pub time_taken: String,
    pub time_taken_secs: i64,
    pub final_score: i64,
    pub violation: bool,
    pub submitted: bool,
}

/// The per-contest results document: a live entry map while the contest is
/// running, replaced by the frozen ordered standings once it closes. The two
/// states are mutually exclusive by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ContestResults {
    Active { entries: BTreeMap<String, ContestEntry> },
    Closed { standings: Vec<LeaderboardRow> },
}

impl ContestResults {
    pub fn empty() -> Self {
        ContestResults::Active {
            entries: BTreeMap::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ContestResults::Closed { .. })
    }
}

/// Derived global standing. Never persisted; recomputed per request from the
/// user profiles and the current problem/contest population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStanding {
    pub user_id: String,
    pub problems_solved: u32,
    pub contests_entered: u32,
    pub problem_final_score: i64,
    pub contest_final_score: i64,
    pub leaderboard_score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub status: String,
    /// Test cases partitioned into named buckets ("run" / "submit").
    pub test_cases: BTreeMap<String, Vec<TestCase>>,
    pub submissions: u64,
    pub accepted_submissions: u64,
    pub acceptance: String,
}

impl Problem {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    pub fn bucket(&self, name: &str) -> &[TestCase] {
        self.test_cases.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The judging set: visible samples first, then the hidden bucket.
    pub fn judging_cases(&self) -> Vec<TestCase> {
        let mut cases = self.bucket(RUN_BUCKET).to_vec();
        cases.extend_from_slice(self.bucket(SUBMIT_BUCKET));
        cases
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contest {
    pub id: String,
    pub difficulty: Difficulty,
    /// Contest start wall-clock time, `"HH:MM"`.
    pub start_time: String,
    pub duration_hours: u32,
    pub participants: u32,
    pub problem_ids: Vec<String>,
}

impl Contest {
    /// Timestamp validation happens here, when the contest is stored, so a
    /// malformed start time can never surface during a contestant's
    /// finalization attempt.
    pub fn validate(&self) -> Result<()> {
        chrono::NaiveTime::parse_from_str(&self.start_time, START_TIME_FORMAT).map_err(|_| {
            Error::InvalidTimestamp {
                value: self.start_time.clone(),
                expected: START_TIME_FORMAT,
            }
        })?;
        Ok(())
    }
}

/// Cumulative per-user scoring state shared by the practice and contest
/// scoring paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub problem_score: i64,
    pub problems_solved: u32,
    pub contests_entered: u32,
    /// Running weighted sum of contest final scores and the matching weight
    /// sum; `contest_final_score` is their rounded quotient.
    pub contest_score_sum: i64,
    pub contest_weight_sum: i64,
    pub contest_final_score: i64,
    pub solved: BTreeSet<String>,
    pub tag_progress: BTreeMap<String, u32>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>) -> Self {
        UserProfile {
            id: id.into(),
            problem_score: 0,
            problems_solved: 0,
            contests_entered: 0,
            contest_score_sum: 0,
            contest_weight_sum: 0,
            contest_final_score: 0,
            solved: BTreeSet::new(),
            tag_progress: BTreeMap::new(),
        }
    }
}
