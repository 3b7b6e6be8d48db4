//! Static completion lookup for prerequisite checks.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use examkit_core::prerequisites::CompletionLookup;

/// A completion lookup answering from a pre-seeded set of
/// `(user_id, reference)` pairs.
#[derive(Default)]
pub struct StaticCompletionLookup {
    completed: Mutex<HashSet<(String, String)>>,
}

impl StaticCompletionLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a user has completed the referenced item.
    pub fn mark_complete(&self, user_id: &str, reference: &str) {
        self.completed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((user_id.to_string(), reference.to_string()));
    }
}

#[async_trait]
impl CompletionLookup for StaticCompletionLookup {
    async fn is_complete(&self, reference: &str, user_id: &str) -> anyhow::Result<bool> {
        Ok(self
            .completed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&(user_id.to_string(), reference.to_string())))
    }
}
