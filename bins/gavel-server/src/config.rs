// Runtime configuration for the Gavel server.
use std::time::Duration;

use anyhow::{Context, Result};
use gavel_common::types::Difficulty;
use serde::{Deserialize, Serialize};

/// Which storage backend backs the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub store_backend: StoreBackend,
    pub redis_url: String,
    pub sandbox_url: String,
    /// Version hint forwarded to the sandbox collaborator.
    pub sandbox_version: String,
    /// Minimum spacing between sandbox calls within one dispatch batch.
    pub dispatch_interval: Duration,
    /// Overall wall-clock budget for one dispatch batch to drain.
    pub dispatch_timeout: Duration,
    pub scores: ScoreTable,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let store_backend = match std::env::var("GAVEL_STORE").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            _ => StoreBackend::Redis,
        };

        let dispatch_interval_ms = env_u64("GAVEL_PACE_MS", 200)?;
        let dispatch_timeout_ms = env_u64("GAVEL_DISPATCH_TIMEOUT_MS", 10_000)?;

        let scores = match std::env::var("GAVEL_SCORE_TABLE") {
            Ok(path) => ScoreTable::load(std::path::Path::new(&path))?,
            Err(_) => ScoreTable::default(),
        };

        Ok(ServerConfig {
            bind_addr: std::env::var("GAVEL_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            store_backend,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            sandbox_url: std::env::var("SANDBOX_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:2000/api/v2".to_string()),
            sandbox_version: std::env::var("SANDBOX_VERSION").unwrap_or_else(|_| "*".to_string()),
            dispatch_interval: Duration::from_millis(dispatch_interval_ms),
            dispatch_timeout: Duration::from_millis(dispatch_timeout_ms),
            scores,
        })
    }
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{} must be an integer, got {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

/// Difficulty-to-points policy. Injected as data so the scoring engine never
/// hardcodes point values in branching logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreTable {
    /// Points awarded for a correct contest solve, by difficulty.
    pub contest: ScoreRow,
    /// Points awarded for a first-time practice solve, by difficulty.
    pub practice: ScoreRow,
    /// Points added (negative) for an incorrect contest attempt.
    pub wrong_attempt: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRow {
    pub easy: i64,
    pub medium: i64,
    pub hard: i64,
}

impl ScoreRow {
    pub fn get(&self, difficulty: Difficulty) -> i64 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

impl Default for ScoreTable {
    fn default() -> Self {
        ScoreTable {
            contest: ScoreRow {
                easy: 100,
                medium: 200,
                hard: 300,
            },
            practice: ScoreRow {
                easy: 10,
                medium: 20,
                hard: 30,
            },
            wrong_attempt: -10,
        }
    }
}

impl ScoreTable {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read score table {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse score table {}", path.display()))
    }

    /// Contest points for one attempt: full difficulty value on a solve, the
    /// wrong-attempt penalty otherwise.
    pub fn contest_points(&self, solved: bool, difficulty: Difficulty) -> i64 {
        if solved {
            self.contest.get(difficulty)
        } else {
            self.wrong_attempt
        }
    }

    /// Full value of a contest problem, independent of attempts. Used for the
    /// `max_points` denominator at finalization.
    pub fn max_contest_points(&self, difficulty: Difficulty) -> i64 {
        self.contest.get(difficulty)
    }

    pub fn practice_points(&self, difficulty: Difficulty) -> i64 {
        self.practice.get(difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_contest_points() {
        let table = ScoreTable::default();
        assert_eq!(table.contest_points(true, Difficulty::Easy), 100);
        assert_eq!(table.contest_points(true, Difficulty::Medium), 200);
        assert_eq!(table.contest_points(true, Difficulty::Hard), 300);
        assert_eq!(table.contest_points(false, Difficulty::Hard), -10);
        assert_eq!(table.contest_points(false, Difficulty::Easy), -10);
    }

    #[test]
    fn default_practice_points() {
        let table = ScoreTable::default();
        assert_eq!(table.practice_points(Difficulty::Easy), 10);
        assert_eq!(table.practice_points(Difficulty::Medium), 20);
        assert_eq!(table.practice_points(Difficulty::Hard), 30);
    }

    #[test]
    fn score_table_round_trips_through_json() {
        let table = ScoreTable::default();
        let json = serde_json::to_string(&table).unwrap();
        let parsed: ScoreTable = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.contest.hard, 300);
        assert_eq!(parsed.wrong_attempt, -10);
    }
}
