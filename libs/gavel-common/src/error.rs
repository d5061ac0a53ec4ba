use thiserror::Error;

/// Domain errors shared by the judging and scoring components.
///
/// "Absent" is always distinguished from "backend failure": lookups that miss
/// return `NotFound`, never a null-ish sentinel.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("contestant {user_id} already finalized in contest {contest_id}")]
    AlreadyFinalized { contest_id: String, user_id: String },

    #[error("contest {0} is closed; its results are frozen")]
    ContestClosed(String),

    #[error("invalid timestamp {value:?}, expected format {expected}")]
    InvalidTimestamp {
        value: String,
        expected: &'static str,
    },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
