/// Storage layer for problems, contests, results documents, user profiles,
/// and submission histories.
///
/// The `Store` trait is the seam between the judging/scoring logic and the
/// persistence backend: `RedisStore` is the production backend, and
/// `MemoryStore` backs tests and local development (`GAVEL_STORE=memory`).
/// Lookups that miss return `Error::NotFound`, never a null-ish default.
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use gavel_common::keys;
use gavel_common::types::{Contest, ContestResults, Problem, SubmissionRecord, UserProfile};
use gavel_common::{Error, Result};
use redis::AsyncCommands;

#[async_trait]
pub trait Store: Send + Sync {
    async fn problem(&self, id: &str) -> Result<Problem>;
    async fn save_problem(&self, problem: &Problem) -> Result<()>;
    /// All problems currently marked active, for the global-score
    /// denominators. Computed fresh per call, never cached.
    async fn active_problems(&self) -> Result<Vec<Problem>>;

    async fn contest(&self, id: &str) -> Result<Contest>;
    /// Persist a contest. Validates the start-time format up front so a bad
    /// timestamp can never break a later finalization.
    async fn save_contest(&self, contest: &Contest) -> Result<()>;
    async fn contest_count(&self) -> Result<usize>;

    async fn contest_results(&self, contest_id: &str) -> Result<Option<ContestResults>>;
    async fn save_contest_results(&self, contest_id: &str, results: &ContestResults) -> Result<()>;

    async fn user(&self, id: &str) -> Result<UserProfile>;
    async fn save_user(&self, user: &UserProfile) -> Result<()>;
    async fn users(&self) -> Result<Vec<UserProfile>>;

    async fn append_practice_submission(
        &self,
        user_id: &str,
        problem_id: &str,
        record: &SubmissionRecord,
    ) -> Result<()>;
    async fn practice_submissions(
        &self,
        user_id: &str,
        problem_id: &str,
    ) -> Result<Vec<SubmissionRecord>>;

    async fn append_contest_submission(
        &self,
        contest_id: &str,
        user_id: &str,
        problem_id: &str,
        record: &SubmissionRecord,
    ) -> Result<()>;
    async fn contest_submissions(
        &self,
        contest_id: &str,
        user_id: &str,
        problem_id: &str,
    ) -> Result<Vec<SubmissionRecord>>;
    /// Drop every submission history list written for a contest. Invoked by
    /// the leaderboard ranker when it freezes the contest.
    async fn delete_contest_submissions(&self, contest_id: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    problems: RwLock<HashMap<String, Problem>>,
    contests: RwLock<HashMap<String, Contest>>,
    results: RwLock<HashMap<String, ContestResults>>,
    users: RwLock<HashMap<String, UserProfile>>,
    histories: RwLock<HashMap<String, Vec<SubmissionRecord>>>,
    /// history keys per contest, mirroring the Redis cleanup index
    history_index: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn problem(&self, id: &str) -> Result<Problem> {
        self.problems
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("problem", id))
    }

    async fn save_problem(&self, problem: &Problem) -> Result<()> {
        self.problems
            .write()
            .unwrap()
            .insert(problem.id.clone(), problem.clone());
        Ok(())
    }

    async fn active_problems(&self) -> Result<Vec<Problem>> {
        Ok(self
            .problems
            .read()
            .unwrap()
            .values()
            .filter(|p| p.is_active())
            .cloned()
            .collect())
    }

    async fn contest(&self, id: &str) -> Result<Contest> {
        self.contests
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("contest", id))
    }

    async fn save_contest(&self, contest: &Contest) -> Result<()> {
        contest.validate()?;
        self.contests
            .write()
            .unwrap()
            .insert(contest.id.clone(), contest.clone());
        Ok(())
    }

    async fn contest_count(&self) -> Result<usize> {
        Ok(self.contests.read().unwrap().len())
    }

    async fn contest_results(&self, contest_id: &str) -> Result<Option<ContestResults>> {
        Ok(self.results.read().unwrap().get(contest_id).cloned())
    }

    async fn save_contest_results(&self, contest_id: &str, results: &ContestResults) -> Result<()> {
        self.results
            .write()
            .unwrap()
            .insert(contest_id.to_string(), results.clone());
        Ok(())
    }

    async fn user(&self, id: &str) -> Result<UserProfile> {
        self.users
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("user", id))
    }

    async fn save_user(&self, user: &UserProfile) -> Result<()> {
        self.users
            .write()
            .unwrap()
            .insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn users(&self) -> Result<Vec<UserProfile>> {
        Ok(self.users.read().unwrap().values().cloned().collect())
    }

    async fn append_practice_submission(
        &self,
        user_id: &str,
        problem_id: &str,
        record: &SubmissionRecord,
    ) -> Result<()> {
        let key = keys::practice_history_key(user_id, problem_id);
        self.histories
            .write()
            .unwrap()
            .entry(key)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn practice_submissions(
        &self,
        user_id: &str,
        problem_id: &str,
    ) -> Result<Vec<SubmissionRecord>> {
        let key = keys::practice_history_key(user_id, problem_id);
        Ok(self
            .histories
            .read()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_contest_submission(
        &self,
        contest_id: &str,
        user_id: &str,
        problem_id: &str,
        record: &SubmissionRecord,
    ) -> Result<()> {
        let key = keys::contest_history_key(contest_id, user_id, problem_id);
        self.histories
            .write()
            .unwrap()
            .entry(key.clone())
            .or_default()
            .push(record.clone());
        self.history_index
            .write()
            .unwrap()
            .entry(contest_id.to_string())
            .or_default()
            .push(key);
        Ok(())
    }

    async fn contest_submissions(
        &self,
        contest_id: &str,
        user_id: &str,
        problem_id: &str,
    ) -> Result<Vec<SubmissionRecord>> {
        let key = keys::contest_history_key(contest_id, user_id, problem_id);
        Ok(self
            .histories
            .read()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_contest_submissions(&self, contest_id: &str) -> Result<()> {
        let keys = self
            .history_index
            .write()
            .unwrap()
            .remove(contest_id)
            .unwrap_or_default();
        let mut histories = self.histories.write().unwrap();
        for key in keys {
            histories.remove(&key);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Redis backend
// ---------------------------------------------------------------------------

/// Redis-backed store. Documents are JSON strings under the deterministic
/// keys from `gavel_common::keys`; submission histories are RPUSH lists.
pub struct RedisStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: redis::aio::ConnectionManager) -> Self {
        RedisStore { conn }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(key).await.map_err(backend)?;
        match payload {
            Some(data) => {
                let value = serde_json::from_str(&data)
                    .map_err(|e| Error::Backend(format!("corrupt document at {}: {}", key, e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(value)
            .map_err(|e| Error::Backend(format!("serialization error: {}", e)))?;
        let _: () = conn.set(key, payload).await.map_err(backend)?;
        Ok(())
    }

    async fn append_record(&self, key: &str, record: &SubmissionRecord) -> Result<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(record)
            .map_err(|e| Error::Backend(format!("serialization error: {}", e)))?;
        let _: () = conn.rpush(key, payload).await.map_err(backend)?;
        Ok(())
    }

    async fn read_records(&self, key: &str) -> Result<Vec<SubmissionRecord>> {
        let mut conn = self.conn.clone();
        let payloads: Vec<String> = conn.lrange(key, 0, -1).await.map_err(backend)?;
        payloads
            .iter()
            .map(|p| {
                serde_json::from_str(p)
                    .map_err(|e| Error::Backend(format!("corrupt record at {}: {}", key, e)))
            })
            .collect()
    }
}

fn backend(e: redis::RedisError) -> Error {
    Error::Backend(e.to_string())
}

#[async_trait]
impl Store for RedisStore {
    async fn problem(&self, id: &str) -> Result<Problem> {
        self.get_json(&keys::problem_key(id))
            .await?
            .ok_or_else(|| Error::not_found("problem", id))
    }

    async fn save_problem(&self, problem: &Problem) -> Result<()> {
        self.set_json(&keys::problem_key(&problem.id), problem).await?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .sadd(keys::PROBLEM_INDEX, &problem.id)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn active_problems(&self) -> Result<Vec<Problem>> {
        // Problems are indexed in a set like contests and users, so listing
        // them never walks the keyspace.
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(keys::PROBLEM_INDEX).await.map_err(backend)?;

        let mut problems = Vec::new();
        for id in ids {
            if let Some(problem) = self.get_json::<Problem>(&keys::problem_key(&id)).await? {
                if problem.is_active() {
                    problems.push(problem);
                }
            }
        }
        Ok(problems)
    }

    async fn contest(&self, id: &str) -> Result<Contest> {
        self.get_json(&keys::contest_key(id))
            .await?
            .ok_or_else(|| Error::not_found("contest", id))
    }

    async fn save_contest(&self, contest: &Contest) -> Result<()> {
        contest.validate()?;
        self.set_json(&keys::contest_key(&contest.id), contest).await?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .sadd(keys::CONTEST_INDEX, &contest.id)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn contest_count(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let count: usize = conn.scard(keys::CONTEST_INDEX).await.map_err(backend)?;
        Ok(count)
    }

    async fn contest_results(&self, contest_id: &str) -> Result<Option<ContestResults>> {
        self.get_json(&keys::results_key(contest_id)).await
    }

    async fn save_contest_results(&self, contest_id: &str, results: &ContestResults) -> Result<()> {
        self.set_json(&keys::results_key(contest_id), results).await
    }

    async fn user(&self, id: &str) -> Result<UserProfile> {
        self.get_json(&keys::user_key(id))
            .await?
            .ok_or_else(|| Error::not_found("user", id))
    }

    async fn save_user(&self, user: &UserProfile) -> Result<()> {
        self.set_json(&keys::user_key(&user.id), user).await?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .sadd(keys::USER_INDEX, &user.id)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn users(&self) -> Result<Vec<UserProfile>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(keys::USER_INDEX).await.map_err(backend)?;
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = self.get_json::<UserProfile>(&keys::user_key(&id)).await? {
                users.push(user);
            }
        }
        Ok(users)
    }

    async fn append_practice_submission(
        &self,
        user_id: &str,
        problem_id: &str,
        record: &SubmissionRecord,
    ) -> Result<()> {
        self.append_record(&keys::practice_history_key(user_id, problem_id), record)
            .await
    }

    async fn practice_submissions(
        &self,
        user_id: &str,
        problem_id: &str,
    ) -> Result<Vec<SubmissionRecord>> {
        self.read_records(&keys::practice_history_key(user_id, problem_id))
            .await
    }

    async fn append_contest_submission(
        &self,
        contest_id: &str,
        user_id: &str,
        problem_id: &str,
        record: &SubmissionRecord,
    ) -> Result<()> {
        let key = keys::contest_history_key(contest_id, user_id, problem_id);
        self.append_record(&key, record).await?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .sadd(keys::contest_history_index(contest_id), &key)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn contest_submissions(
        &self,
        contest_id: &str,
        user_id: &str,
        problem_id: &str,
    ) -> Result<Vec<SubmissionRecord>> {
        self.read_records(&keys::contest_history_key(contest_id, user_id, problem_id))
            .await
    }

    async fn delete_contest_submissions(&self, contest_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let index = keys::contest_history_index(contest_id);
        let tracked: Vec<String> = conn.smembers(&index).await.map_err(backend)?;
        for key in tracked {
            let _: () = conn.del(key).await.map_err(backend)?;
        }
        let _: () = conn.del(index).await.map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_common::types::Difficulty;
    use std::collections::BTreeMap;

    fn sample_problem(id: &str, status: &str) -> Problem {
        Problem {
            id: id.to_string(),
            difficulty: Difficulty::Easy,
            tags: vec!["arrays".to_string()],
            status: status.to_string(),
            test_cases: BTreeMap::new(),
            submissions: 0,
            accepted_submissions: 0,
            acceptance: "0.00 %".to_string(),
        }
    }

    #[tokio::test]
    async fn missing_problem_is_not_found() {
        let store = MemoryStore::new();
        let err = store.problem("nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "problem", .. }));
    }

    #[tokio::test]
    async fn active_problem_filter() {
        let store = MemoryStore::new();
        store.save_problem(&sample_problem("P1", "active")).await.unwrap();
        store.save_problem(&sample_problem("P2", "draft")).await.unwrap();

        let active = store.active_problems().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "P1");
    }

    #[tokio::test]
    async fn contest_save_validates_start_time() {
        let store = MemoryStore::new();
        let contest = Contest {
            id: "C1".to_string(),
            difficulty: Difficulty::Medium,
            start_time: "not a time".to_string(),
            duration_hours: 2,
            participants: 0,
            problem_ids: vec![],
        };
        assert!(matches!(
            store.save_contest(&contest).await,
            Err(Error::InvalidTimestamp { .. })
        ));
        assert_eq!(store.contest_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn contest_submission_cleanup_removes_all_histories() {
        let store = MemoryStore::new();
        let record = SubmissionRecord {
            id: uuid::Uuid::new_v4(),
            submitted_at: "01/01/2026 [10:00:00]".to_string(),
            language: "python".to_string(),
            code: "print(1)".to_string(),
            results: vec![],
            accepted: true,
        };
        store
            .append_contest_submission("C1", "u1", "P1", &record)
            .await
            .unwrap();
        store
            .append_contest_submission("C1", "u2", "P2", &record)
            .await
            .unwrap();
        store
            .append_practice_submission("u1", "P1", &record)
            .await
            .unwrap();

        store.delete_contest_submissions("C1").await.unwrap();

        assert!(store.contest_submissions("C1", "u1", "P1").await.unwrap().is_empty());
        assert!(store.contest_submissions("C1", "u2", "P2").await.unwrap().is_empty());
        // practice history is untouched
        assert_eq!(store.practice_submissions("u1", "P1").await.unwrap().len(), 1);
    }
}
