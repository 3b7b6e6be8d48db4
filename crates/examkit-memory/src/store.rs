//! In-memory attempt store with compare-and-swap writes.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use examkit_core::model::{AttemptStatus, QuizAttempt};
use examkit_core::traits::AttemptStore;

/// Attempt persistence over a single mutexed map. `save_if_status` holds
/// the map lock across check and write, giving it the atomicity a
/// database store would get from a conditional UPDATE.
#[derive(Default)]
pub struct InMemoryAttemptStore {
    attempts: Mutex<HashMap<Uuid, QuizAttempt>>,
}

impl InMemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn load(&self, attempt_id: Uuid) -> anyhow::Result<Option<QuizAttempt>> {
        Ok(self
            .attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&attempt_id)
            .cloned())
    }

    async fn save(&self, attempt: &QuizAttempt) -> anyhow::Result<()> {
        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(attempt.id, attempt.clone());
        Ok(())
    }

    async fn save_if_status(
        &self,
        attempt: &QuizAttempt,
        expected: AttemptStatus,
    ) -> anyhow::Result<bool> {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        match attempts.get(&attempt.id) {
            Some(stored) if stored.status == expected => {
                attempts.insert(attempt.id, attempt.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_finished(&self, quiz_id: &str, user_id: &str) -> anyhow::Result<u32> {
        Ok(self
            .attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|a| a.quiz_id == quiz_id && a.user_id == user_id && a.status.is_finished())
            .count() as u32)
    }

    async fn list_finished(&self, quiz_id: &str) -> anyhow::Result<Vec<QuizAttempt>> {
        Ok(self
            .attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|a| a.quiz_id == quiz_id && a.status.is_finished())
            .cloned()
            .collect())
    }
}
