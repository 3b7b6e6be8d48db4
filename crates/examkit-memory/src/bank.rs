//! In-memory question bank.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use examkit_core::model::{Question, Quiz};
use examkit_core::statistics::AttemptStatistics;
use examkit_core::traits::QuestionBank;

/// A question bank backed by mutexed maps. Quizzes and their question
/// sets are registered up front; `save_stats` mutates the stored quiz.
#[derive(Default)]
pub struct InMemoryQuestionBank {
    quizzes: Mutex<HashMap<String, Quiz>>,
    questions: Mutex<HashMap<String, Vec<Question>>>,
}

impl InMemoryQuestionBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a quiz and its question set.
    pub fn insert(&self, quiz: Quiz, questions: Vec<Question>) {
        let quiz_id = quiz.id.clone();
        self.quizzes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(quiz_id.clone(), quiz);
        self.questions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(quiz_id, questions);
    }

    /// Stats currently stored on a quiz, for assertions.
    pub fn stats_of(&self, quiz_id: &str) -> Option<AttemptStatistics> {
        self.quizzes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(quiz_id)
            .and_then(|q| q.stats.clone())
    }
}

#[async_trait]
impl QuestionBank for InMemoryQuestionBank {
    async fn get_quiz(&self, quiz_id: &str) -> anyhow::Result<Option<Quiz>> {
        Ok(self
            .quizzes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(quiz_id)
            .cloned())
    }

    async fn get_questions(&self, quiz_id: &str) -> anyhow::Result<Vec<Question>> {
        Ok(self
            .questions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(quiz_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_stats(&self, quiz_id: &str, stats: &AttemptStatistics) -> anyhow::Result<()> {
        let mut quizzes = self.quizzes.lock().unwrap_or_else(|e| e.into_inner());
        match quizzes.get_mut(quiz_id) {
            Some(quiz) => {
                quiz.stats = Some(stats.clone());
                Ok(())
            }
            None => anyhow::bail!("quiz not found: {quiz_id}"),
        }
    }
}
