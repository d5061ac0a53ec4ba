/// Scoring Engine - pure scoring formulas.
///
/// **Critical Properties:**
/// - Knows nothing about HTTP or the sandbox
/// - Knows nothing about the storage backend
/// - Pure functions: (points, times, populations) -> scores
///
/// Point values come from the injected `ScoreTable`, never from inline
/// branching (see `config::ScoreTable`).
use chrono::NaiveTime;
use gavel_common::types::{
    Difficulty, Problem, UserProfile, COMPLETION_TIME_FORMAT, START_TIME_FORMAT,
};
use gavel_common::{Error, Result};

use crate::config::ScoreTable;

/// Elapsed (minutes, seconds) between a contest start time (`"HH:MM"`) and a
/// contestant completion timestamp (`"h:MM:SS AM/PM"`).
///
/// A completion earlier than the start is interpreted as crossing midnight
/// and 24h is added. Only valid for contests shorter than a day.
pub fn elapsed_between(start: &str, completion: &str) -> Result<(i64, i64)> {
    let start_time =
        NaiveTime::parse_from_str(start, START_TIME_FORMAT).map_err(|_| Error::InvalidTimestamp {
            value: start.to_string(),
            expected: START_TIME_FORMAT,
        })?;
    let completion_time = NaiveTime::parse_from_str(completion, COMPLETION_TIME_FORMAT).map_err(
        |_| Error::InvalidTimestamp {
            value: completion.to_string(),
            expected: COMPLETION_TIME_FORMAT,
        },
    )?;

    let mut delta = completion_time.signed_duration_since(start_time);
    if delta < chrono::Duration::zero() {
        delta = delta + chrono::Duration::hours(24);
    }

    let total_secs = delta.num_seconds();
    Ok((total_secs / 60, total_secs % 60))
}

/// Render an elapsed (minutes, seconds) pair as `HH:MM:SS`.
pub fn format_hhmmss(minutes: i64, seconds: i64) -> String {
    let total = minutes * 60 + seconds;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// One-time contest final score.
///
/// `round(100 * ((total/max) * 0.7 + clamp(1 - t/T, 0, 1) * 0.3) * log2(n+1))`
///
/// Zero whenever total points, max points, or the contest duration is zero -
/// a contestant with no positive signal never earns a participation boost.
pub fn final_score(
    total_points: i64,
    max_points: i64,
    participants: u32,
    minutes: i64,
    seconds: i64,
    max_hours: u32,
) -> i64 {
    if total_points == 0 || max_points == 0 || max_hours == 0 {
        return 0;
    }

    let normalized = total_points as f64 / max_points as f64;

    let taken_secs = (minutes * 60 + seconds) as f64;
    let limit_secs = f64::from(max_hours) * 3600.0;
    let efficiency = (1.0 - taken_secs / limit_secs).clamp(0.0, 1.0);

    let boost = (f64::from(participants) + 1.0).log2();

    (100.0 * (normalized * 0.7 + efficiency * 0.3) * boost).round() as i64
}

/// Fold one finalized contest into the user's running weighted contest
/// average. Weights are 1/2/3 for easy/medium/hard contests.
pub fn accumulate_contest_score(
    profile: &mut UserProfile,
    final_score: i64,
    contest_difficulty: Difficulty,
) {
    let weight = contest_difficulty.weight();
    profile.contest_score_sum += final_score * weight;
    profile.contest_weight_sum += weight;
    profile.contest_final_score =
        (profile.contest_score_sum as f64 / profile.contest_weight_sum as f64).round() as i64;
}

/// Apply an accepted practice submission to a user profile. Awards the
/// difficulty-weighted points and bumps the per-tag progress counters only on
/// the first solve of the problem; repeats award nothing.
///
/// Returns true when points were awarded.
pub fn apply_practice_solve(profile: &mut UserProfile, problem: &Problem, table: &ScoreTable) -> bool {
    if !profile.solved.insert(problem.id.clone()) {
        return false;
    }
    profile.problem_score += table.practice_points(problem.difficulty);
    profile.problems_solved += 1;
    for tag in &problem.tags {
        *profile.tag_progress.entry(tag.clone()).or_insert(0) += 1;
    }
    true
}

/// Global leaderboard score: a weighted blend of the running contest final
/// average, the practice score normalized against the maximum achievable
/// score, and normalized solve/participation counts, each scaled to 0-1000.
///
/// The denominators (`max_problem_score`, `total_problems`,
/// `total_contests`) must be computed fresh by the caller per invocation.
pub fn global_score(
    profile: &UserProfile,
    max_problem_score: i64,
    total_problems: usize,
    total_contests: usize,
) -> i64 {
    if max_problem_score == 0 || total_problems == 0 || total_contests == 0 {
        return 0;
    }

    let problem_ratio = profile.problem_score as f64 / max_problem_score as f64 * 1000.0;
    let solved_ratio = f64::from(profile.problems_solved) / total_problems as f64 * 1000.0;
    let contest_ratio = f64::from(profile.contests_entered) / total_contests as f64 * 1000.0;

    (profile.contest_final_score as f64 * 0.5
        + problem_ratio * 0.3
        + solved_ratio * 0.1
        + contest_ratio * 0.1)
        .round() as i64
}

/// Sum of every active problem's full practice value - the denominator for
/// the practice-score ratio above.
pub fn max_problem_score(active_problems: &[Problem], table: &ScoreTable) -> i64 {
    active_problems
        .iter()
        .map(|p| table.practice_points(p.difficulty))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn table() -> ScoreTable {
        ScoreTable::default()
    }

    fn problem(id: &str, difficulty: Difficulty, tags: &[&str]) -> Problem {
        Problem {
            id: id.to_string(),
            difficulty,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            status: "active".to_string(),
            test_cases: BTreeMap::new(),
            submissions: 0,
            accepted_submissions: 0,
            acceptance: "0.00 %".to_string(),
        }
    }

    #[test]
    fn final_score_zero_guards() {
        assert_eq!(final_score(0, 300, 10, 5, 0, 2), 0);
        assert_eq!(final_score(250, 0, 10, 5, 0, 2), 0);
        assert_eq!(final_score(250, 300, 10, 5, 0, 0), 0);
    }

    /// Fixed-point regression input: 250/300 points, 9 participants, 10
    /// minutes elapsed of a 2 hour contest.
    #[test]
    fn final_score_regression_fixed_point() {
        // (250/300)*0.7 + (1 - 600/7200)*0.3 = 0.858333...
        // log2(10) = 3.321928...; *100 => 285.156... => 285
        assert_eq!(final_score(250, 300, 9, 10, 0, 2), 285);
    }

    #[test]
    fn final_score_clamps_overlong_time() {
        // 3 hours taken in a 2 hour contest: efficiency clamps to 0.
        let score = final_score(300, 300, 1, 180, 0, 2);
        // 0.7 * log2(2) * 100 = 70
        assert_eq!(score, 70);
    }

    #[test]
    fn final_score_can_use_negative_totals() {
        // Negative cumulative points still produce a deterministic score.
        let score = final_score(-20, 300, 3, 10, 0, 2);
        assert!(score < final_score(20, 300, 3, 10, 0, 2));
    }

    #[test]
    fn elapsed_same_day() {
        let (m, s) = elapsed_between("14:00", "2:45:30 PM").unwrap();
        assert_eq!((m, s), (45, 30));
    }

    #[test]
    fn elapsed_crosses_midnight() {
        let (m, s) = elapsed_between("23:50", "12:05:00 AM").unwrap();
        assert_eq!((m, s), (15, 0));
        assert!(m * 60 + s > 0);
    }

    #[test]
    fn elapsed_rejects_malformed_timestamps() {
        assert!(matches!(
            elapsed_between("25:99", "12:05:00 AM"),
            Err(Error::InvalidTimestamp { .. })
        ));
        assert!(matches!(
            elapsed_between("23:50", "12:05 AM"),
            Err(Error::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn hhmmss_formatting() {
        assert_eq!(format_hhmmss(10, 0), "00:10:00");
        assert_eq!(format_hhmmss(75, 30), "01:15:30");
        assert_eq!(format_hhmmss(0, 5), "00:00:05");
    }

    #[test]
    fn practice_first_solve_awards_points_and_tags() {
        let mut profile = UserProfile::new("u1");
        let p = problem("P1", Difficulty::Hard, &["dp", "graphs"]);

        assert!(apply_practice_solve(&mut profile, &p, &table()));
        assert_eq!(profile.problem_score, 30);
        assert_eq!(profile.problems_solved, 1);
        assert_eq!(profile.tag_progress["dp"], 1);
        assert_eq!(profile.tag_progress["graphs"], 1);
    }

    #[test]
    fn practice_repeat_solve_awards_nothing() {
        let mut profile = UserProfile::new("u1");
        let p = problem("P1", Difficulty::Easy, &["math"]);

        assert!(apply_practice_solve(&mut profile, &p, &table()));
        assert!(!apply_practice_solve(&mut profile, &p, &table()));
        assert_eq!(profile.problem_score, 10);
        assert_eq!(profile.problems_solved, 1);
        assert_eq!(profile.tag_progress["math"], 1);
    }

    #[test]
    fn contest_average_is_difficulty_weighted() {
        let mut profile = UserProfile::new("u1");
        accumulate_contest_score(&mut profile, 300, Difficulty::Easy);
        assert_eq!(profile.contest_final_score, 300);

        accumulate_contest_score(&mut profile, 600, Difficulty::Hard);
        // (300*1 + 600*3) / (1 + 3) = 525
        assert_eq!(profile.contest_final_score, 525);
    }

    #[test]
    fn global_score_zero_when_population_empty() {
        let profile = UserProfile::new("u1");
        assert_eq!(global_score(&profile, 0, 10, 3), 0);
        assert_eq!(global_score(&profile, 100, 0, 3), 0);
        assert_eq!(global_score(&profile, 100, 10, 0), 0);
    }

    #[test]
    fn global_score_blends_weighted_components() {
        let mut profile = UserProfile::new("u1");
        profile.contest_final_score = 400;
        profile.problem_score = 30;
        profile.problems_solved = 2;
        profile.contests_entered = 1;

        // contest: 400*0.5 = 200
        // problems: (30/60)*1000*0.3 = 150
        // solved:   (2/4)*1000*0.1 = 50
        // contests: (1/2)*1000*0.1 = 50
        assert_eq!(global_score(&profile, 60, 4, 2), 450);
    }

    #[test]
    fn max_problem_score_sums_active_difficulties() {
        let problems = vec![
            problem("P1", Difficulty::Easy, &[]),
            problem("P2", Difficulty::Medium, &[]),
            problem("P3", Difficulty::Hard, &[]),
        ];
        assert_eq!(max_problem_score(&problems, &table()), 60);
    }
}
