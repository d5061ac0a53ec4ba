/// Submission Aggregator - turns a judged batch into a durable record.
///
/// A record is accepted only when every test in the batch passed. The record
/// carries the full per-test evidence so history queries can replay exactly
/// what the contestant saw.
use chrono::Utc;
use gavel_common::types::{ExecutionResult, SubmissionRecord};
use uuid::Uuid;

pub const SUBMITTED_AT_FORMAT: &str = "%d/%m/%Y [%H:%M:%S]";

/// Build a submission record from a judged batch.
pub fn build_record(language: &str, code: &str, results: Vec<ExecutionResult>) -> SubmissionRecord {
    let accepted = is_accepted(&results);
    SubmissionRecord {
        id: Uuid::new_v4(),
        submitted_at: Utc::now().format(SUBMITTED_AT_FORMAT).to_string(),
        language: language.to_string(),
        code: code.to_string(),
        results,
        accepted,
    }
}

/// Accepted means every test case in the batch judged correct. An empty
/// batch is never accepted.
pub fn is_accepted(results: &[ExecutionResult]) -> bool {
    !results.is_empty() && results.iter().all(|r| r.correct)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(test_id: u32, correct: bool) -> ExecutionResult {
        ExecutionResult {
            test_id,
            input: "1".to_string(),
            expected_output: "2".to_string(),
            actual_output: if correct { "2" } else { "3" }.to_string(),
            correct,
            error: None,
        }
    }

    #[test]
    fn accepted_requires_every_test_to_pass() {
        assert!(is_accepted(&[result(0, true), result(1, true)]));
        assert!(!is_accepted(&[result(0, true), result(1, false)]));
        assert!(!is_accepted(&[]));
    }

    #[test]
    fn record_carries_verdict_and_evidence() {
        let record = build_record("python", "print(2)", vec![result(0, true), result(1, false)]);
        assert!(!record.accepted);
        assert_eq!(record.language, "python");
        assert_eq!(record.results.len(), 2);
        assert!(!record.id.is_nil());
    }

    #[test]
    fn submitted_at_uses_the_history_format() {
        let record = build_record("python", "print(2)", vec![result(0, true)]);
        // "dd/mm/yyyy [hh:mm:ss]"
        assert_eq!(record.submitted_at.len(), 21);
        assert_eq!(&record.submitted_at[2..3], "/");
        assert_eq!(&record.submitted_at[10..12], " [");
        assert!(record.submitted_at.ends_with(']'));
    }
}
