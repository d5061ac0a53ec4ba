/// Contest Result Store - registration, live scoring, and finalization.
///
/// **Critical Properties:**
/// - Every mutation of a contest's results document runs under that
///   contest's async lock, so concurrent submits against the same contest
///   serialize instead of racing read-modify-write cycles.
/// - A contestant is finalized exactly once. A second finish attempt is a
///   409-class error, never a silent recompute.
/// - Once the leaderboard freezes the contest, every mutation is rejected
///   with `ContestClosed`.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gavel_common::types::{ContestEntry, ContestResults, UserProfile};
use gavel_common::{Error, Result};
use tracing::info;

use crate::config::ScoreTable;
use crate::metrics;
use crate::scoring;
use crate::store::Store;

/// Per-contest async mutexes, created lazily. Guards stay alive in the map
/// for the life of the process; the contest population is small enough that
/// eviction is not worth the bookkeeping.
#[derive(Default)]
pub struct ContestLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ContestLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, contest_id: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            Arc::clone(
                locks
                    .entry(contest_id.to_string())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

pub struct ResultService {
    store: Arc<dyn Store>,
    scores: ScoreTable,
    locks: Arc<ContestLocks>,
}

impl ResultService {
    pub fn new(store: Arc<dyn Store>, scores: ScoreTable, locks: Arc<ContestLocks>) -> Self {
        ResultService {
            store,
            scores,
            locks,
        }
    }

    /// Register a contestant. Creates their zeroed entry and bumps the
    /// contest participant count. Registering twice is a no-op; registering
    /// into a closed contest is an error. A first-time user gets a profile
    /// seeded as a side effect.
    pub async fn register(&self, contest_id: &str, user_id: &str) -> Result<()> {
        let _guard = self.locks.lock(contest_id).await;

        let mut contest = self.store.contest(contest_id).await?;
        let mut entries = match self.load_results(contest_id).await? {
            ContestResults::Active { entries } => entries,
            ContestResults::Closed { .. } => {
                return Err(Error::ContestClosed(contest_id.to_string()))
            }
        };

        if entries.contains_key(user_id) {
            return Ok(());
        }

        if self.store.user(user_id).await.is_err() {
            self.store.save_user(&UserProfile::new(user_id)).await?;
        }

        entries.insert(
            user_id.to_string(),
            ContestEntry::for_problems(&contest.problem_ids),
        );
        contest.participants += 1;

        self.store.save_contest(&contest).await?;
        self.store
            .save_contest_results(contest_id, &ContestResults::Active { entries })
            .await?;

        info!(contest = contest_id, user = user_id, "Contestant registered");
        Ok(())
    }

    /// Fold one judged attempt into the contestant's running points. A solve
    /// adds the problem's full difficulty value; a wrong attempt applies the
    /// penalty. Points accumulate per problem and may go negative.
    pub async fn apply_submission(
        &self,
        contest_id: &str,
        user_id: &str,
        problem_id: &str,
        accepted: bool,
    ) -> Result<ContestEntry> {
        let _guard = self.locks.lock(contest_id).await;

        let mut entries = self.active_entries(contest_id).await?;
        let entry = entries
            .get_mut(user_id)
            .ok_or_else(|| Error::not_found("registration", user_id))?;
        if entry.finalized {
            return Err(Error::AlreadyFinalized {
                contest_id: contest_id.to_string(),
                user_id: user_id.to_string(),
            });
        }

        let problem = self.store.problem(problem_id).await?;
        let points = entry
            .points
            .get_mut(problem_id)
            .ok_or_else(|| Error::not_found("contest problem", problem_id))?;
        *points += self.scores.contest_points(accepted, problem.difficulty);
        entry.total_points = entry.points.values().sum();

        let updated = entry.clone();
        self.store
            .save_contest_results(contest_id, &ContestResults::Active { entries })
            .await?;
        Ok(updated)
    }

    /// Finalize one contestant: freeze their elapsed time, compute the final
    /// score exactly once, and fold the result into their profile's weighted
    /// contest average. Finalization may be triggered by an explicit finish
    /// (`submitted`), a proctoring `violation`, or an external timeout signal
    /// (both flags false); the flags are recorded on the entry and carried
    /// onto the frozen standings.
    pub async fn finish(
        &self,
        contest_id: &str,
        user_id: &str,
        completion_time: &str,
        violation: bool,
        submitted: bool,
    ) -> Result<ContestEntry> {
        let _guard = self.locks.lock(contest_id).await;

        let contest = self.store.contest(contest_id).await?;
        let mut entries = self.active_entries(contest_id).await?;
        let entry = entries
            .get_mut(user_id)
            .ok_or_else(|| Error::not_found("registration", user_id))?;
        if entry.finalized {
            return Err(Error::AlreadyFinalized {
                contest_id: contest_id.to_string(),
                user_id: user_id.to_string(),
            });
        }

        let mut max_points = 0;
        for problem_id in &contest.problem_ids {
            let problem = self.store.problem(problem_id).await?;
            max_points += self.scores.max_contest_points(problem.difficulty);
        }

        let (minutes, seconds) = scoring::elapsed_between(&contest.start_time, completion_time)?;

        entry.total_points = entry.points.values().sum();
        entry.problems_solved = entry.points.values().filter(|p| **p > 0).count() as u32;
        entry.max_points = max_points;
        entry.violation |= violation;
        entry.submitted = submitted;
        entry.completion_time = completion_time.to_string();
        entry.time_taken = scoring::format_hhmmss(minutes, seconds);
        entry.time_taken_secs = minutes * 60 + seconds;
        entry.final_score = scoring::final_score(
            entry.total_points,
            max_points,
            contest.participants,
            minutes,
            seconds,
            contest.duration_hours,
        );
        entry.finalized = true;

        let finalized = entry.clone();
        self.store
            .save_contest_results(contest_id, &ContestResults::Active { entries })
            .await?;

        let mut profile = self.store.user(user_id).await?;
        profile.contests_entered += 1;
        scoring::accumulate_contest_score(&mut profile, finalized.final_score, contest.difficulty);
        self.store.save_user(&profile).await?;

        metrics::CONTESTS_FINALIZED.inc();
        info!(
            contest = contest_id,
            user = user_id,
            final_score = finalized.final_score,
            time_taken = %finalized.time_taken,
            "Contestant finalized"
        );
        Ok(finalized)
    }

    async fn load_results(&self, contest_id: &str) -> Result<ContestResults> {
        Ok(self
            .store
            .contest_results(contest_id)
            .await?
            .unwrap_or_else(ContestResults::empty))
    }

    async fn active_entries(
        &self,
        contest_id: &str,
    ) -> Result<std::collections::BTreeMap<String, ContestEntry>> {
        match self.load_results(contest_id).await? {
            ContestResults::Active { entries } => Ok(entries),
            ContestResults::Closed { .. } => Err(Error::ContestClosed(contest_id.to_string())),
        }
    }
}
