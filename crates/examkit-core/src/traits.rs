//! Collaborator traits the engine depends on.
//!
//! Implemented elsewhere (a database-backed host, or the in-memory
//! versions in `examkit-memory`). All methods return `anyhow::Result` at
//! the seam; the engine maps failures into
//! [`AssessmentError::Storage`](crate::error::AssessmentError).

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{AttemptStatus, Question, Quiz, QuizAttempt};
use crate::statistics::AttemptStatistics;

/// Quiz and question lookup. Only the lifecycle manager sees the
/// unredacted question definitions returned here.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Fetch quiz configuration, `None` when the quiz does not exist.
    async fn get_quiz(&self, quiz_id: &str) -> anyhow::Result<Option<Quiz>>;

    /// Full question definitions for a quiz, including correct answers.
    async fn get_questions(&self, quiz_id: &str) -> anyhow::Result<Vec<Question>>;

    /// Write the rolling statistics aggregate onto the quiz.
    async fn save_stats(&self, quiz_id: &str, stats: &AttemptStatistics) -> anyhow::Result<()>;
}

/// Attempt persistence.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn load(&self, attempt_id: Uuid) -> anyhow::Result<Option<QuizAttempt>>;

    /// Unconditional insert-or-replace.
    async fn save(&self, attempt: &QuizAttempt) -> anyhow::Result<()>;

    /// Conditional write: persists only when the stored attempt's status
    /// still equals `expected`, returning whether the write landed. This
    /// is the compare-and-swap that closes the double-submit race; a
    /// database-backed store implements it as a conditional UPDATE.
    async fn save_if_status(
        &self,
        attempt: &QuizAttempt,
        expected: AttemptStatus,
    ) -> anyhow::Result<bool>;

    /// Number of the user's finished (completed or graded) attempts for a
    /// quiz.
    async fn count_finished(&self, quiz_id: &str, user_id: &str) -> anyhow::Result<u32>;

    /// All finished attempts for a quiz, for statistics.
    async fn list_finished(&self, quiz_id: &str) -> anyhow::Result<Vec<QuizAttempt>>;
}

/// Speech-to-text collaborator for audio-response questions.
#[async_trait]
pub trait AudioTranscriber: Send + Sync {
    /// Transcribe the clip referenced by `clip` (an opaque media key).
    async fn transcribe(&self, clip: &str) -> anyhow::Result<String>;
}
