//! Assessment error types.
//!
//! Every precondition failure in the lifecycle manager maps to its own
//! variant so callers can react (and translate to transport-level codes)
//! without string matching.

use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the assessment engine.
#[derive(Debug, Error)]
pub enum AssessmentError {
    /// The quiz does not exist in the question bank.
    #[error("quiz not found: {0}")]
    QuizNotFound(String),

    /// The attempt does not exist in the store.
    #[error("attempt not found: {0}")]
    AttemptNotFound(Uuid),

    /// The quiz exists but is not in the published state.
    #[error("quiz {0} is not available")]
    NotAvailable(String),

    /// The quiz has a scheduled start date in the future.
    #[error("quiz {quiz_id} opens at {opens_at}")]
    NotStartedYet {
        quiz_id: String,
        opens_at: chrono::DateTime<chrono::Utc>,
    },

    /// The quiz availability window has closed.
    #[error("quiz {quiz_id} closed at {closed_at}")]
    Ended {
        quiz_id: String,
        closed_at: chrono::DateTime<chrono::Utc>,
    },

    /// The user has no finished-attempt budget left.
    #[error("maximum of {allowed} attempts reached for quiz {quiz_id}")]
    MaxAttemptsReached { quiz_id: String, allowed: u32 },

    /// At least one prerequisite resolved to unmet.
    #[error("prerequisites not met for quiz {0}")]
    PrerequisitesNotMet(String),

    /// A user tried to act on an attempt they do not own.
    #[error("user {user_id} may not act on attempt {attempt_id}")]
    Forbidden { user_id: String, attempt_id: Uuid },

    /// The attempt already left the in-progress state.
    #[error("attempt {0} was already submitted")]
    AlreadySubmitted(Uuid),

    /// Review was requested for an attempt that is not awaiting one.
    #[error("attempt {0} is not awaiting review")]
    NotReady(Uuid),

    /// A question definition carried a type tag the engine does not know.
    /// This is a data defect, never a learner-input problem.
    #[error("unsupported question type: {0}")]
    UnsupportedQuestionType(String),

    /// A collaborator (store, bank, transcriber) failed.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl AssessmentError {
    /// Returns `true` for errors caused by the request rather than the
    /// system, useful for hosts deciding between 4xx and 5xx responses.
    pub fn is_precondition_failure(&self) -> bool {
        !matches!(
            self,
            AssessmentError::Storage(_) | AssessmentError::UnsupportedQuestionType(_)
        )
    }
}
