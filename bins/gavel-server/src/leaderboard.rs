/// Leaderboard Ranker - per-contest standings and the global board.
///
/// **Freeze semantics:**
/// The first standings request for a contest is the event that closes it:
/// the live entry map is ranked, stored as an ordered standings document,
/// and the contest's submission histories are deleted. Every later request
/// serves the frozen document untouched, so standings can never drift after
/// publication.
///
/// **Global board:**
/// Never persisted. Recomputed per request against the population counted at
/// that moment, so adding a problem or contest immediately rescales everyone.
use std::sync::Arc;

use gavel_common::types::{ContestResults, GlobalStanding, LeaderboardRow};
use gavel_common::Result;
use tracing::info;

use crate::config::ScoreTable;
use crate::results::ContestLocks;
use crate::scoring;
use crate::store::Store;

pub struct Ranker {
    store: Arc<dyn Store>,
    scores: ScoreTable,
    locks: Arc<ContestLocks>,
}

impl Ranker {
    pub fn new(store: Arc<dyn Store>, scores: ScoreTable, locks: Arc<ContestLocks>) -> Self {
        Ranker {
            store,
            scores,
            locks,
        }
    }

    /// Contest standings. Freezes the contest on first call; serves the
    /// cached standings on every call after that.
    pub async fn contest(&self, contest_id: &str) -> Result<Vec<LeaderboardRow>> {
        let _guard = self.locks.lock(contest_id).await;

        // Contest existence is checked first so an unknown id is a 404, not
        // an empty board.
        self.store.contest(contest_id).await?;

        let entries = match self.store.contest_results(contest_id).await? {
            Some(ContestResults::Closed { standings }) => return Ok(standings),
            Some(ContestResults::Active { entries }) => entries,
            None => return Ok(Vec::new()),
        };

        let mut standings: Vec<LeaderboardRow> = entries
            .into_iter()
            .map(|(user_id, entry)| LeaderboardRow {
                user_id,
                problems_solved: entry.problems_solved,
                total_points: entry.total_points,
                max_points: entry.max_points,
                completion_time: entry.completion_time,
                time_taken: entry.time_taken,
                time_taken_secs: entry.time_taken_secs,
                final_score: entry.final_score,
                violation: entry.violation,
                submitted: entry.submitted,
            })
            .collect();

        // Highest score first; ties break toward the faster contestant.
        standings.sort_by(|a, b| {
            b.final_score
                .cmp(&a.final_score)
                .then(a.time_taken_secs.cmp(&b.time_taken_secs))
        });

        self.store
            .save_contest_results(contest_id, &ContestResults::Closed {
                standings: standings.clone(),
            })
            .await?;
        self.store.delete_contest_submissions(contest_id).await?;

        info!(
            contest = contest_id,
            contestants = standings.len(),
            "Contest standings frozen"
        );
        Ok(standings)
    }

    /// The cross-contest global board, computed fresh from every profile and
    /// the current problem/contest population.
    pub async fn global(&self) -> Result<Vec<GlobalStanding>> {
        let active = self.store.active_problems().await?;
        let max_problem_score = scoring::max_problem_score(&active, &self.scores);
        let total_problems = active.len();
        let total_contests = self.store.contest_count().await?;

        let mut standings: Vec<GlobalStanding> = self
            .store
            .users()
            .await?
            .iter()
            .map(|profile| GlobalStanding {
                user_id: profile.id.clone(),
                problems_solved: profile.problems_solved,
                contests_entered: profile.contests_entered,
                problem_final_score: profile.problem_score,
                contest_final_score: profile.contest_final_score,
                leaderboard_score: scoring::global_score(
                    profile,
                    max_problem_score,
                    total_problems,
                    total_contests,
                ),
            })
            .collect();

        standings.sort_by(|a, b| {
            b.leaderboard_score
                .cmp(&a.leaderboard_score)
                .then(b.contest_final_score.cmp(&a.contest_final_score))
                .then(b.problem_final_score.cmp(&a.problem_final_score))
        });
        Ok(standings)
    }
}
