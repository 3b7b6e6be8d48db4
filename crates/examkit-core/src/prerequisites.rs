//! Prerequisite gating ahead of new attempts.

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{Prerequisite, PrerequisiteKind};

/// Completion lookup for one prerequisite kind, implemented by the host
/// against whatever tracks quiz/module/assignment completion.
#[async_trait]
pub trait CompletionLookup: Send + Sync {
    /// Whether `user_id` has completed the referenced item.
    async fn is_complete(&self, reference: &str, user_id: &str) -> anyhow::Result<bool>;
}

/// Routes each prerequisite to the lookup for its kind. Unknown kinds
/// fail closed.
pub struct PrerequisiteChecker {
    quizzes: Arc<dyn CompletionLookup>,
    modules: Arc<dyn CompletionLookup>,
    assignments: Arc<dyn CompletionLookup>,
}

impl PrerequisiteChecker {
    pub fn new(
        quizzes: Arc<dyn CompletionLookup>,
        modules: Arc<dyn CompletionLookup>,
        assignments: Arc<dyn CompletionLookup>,
    ) -> Self {
        Self {
            quizzes,
            modules,
            assignments,
        }
    }

    /// Check a single prerequisite.
    pub async fn is_satisfied(
        &self,
        prerequisite: &Prerequisite,
        user_id: &str,
    ) -> anyhow::Result<bool> {
        let lookup = match prerequisite.kind {
            PrerequisiteKind::Quiz => &self.quizzes,
            PrerequisiteKind::Module => &self.modules,
            PrerequisiteKind::Assignment => &self.assignments,
            PrerequisiteKind::Unknown => {
                tracing::warn!(
                    reference = %prerequisite.reference,
                    "unknown prerequisite kind treated as unmet"
                );
                return Ok(false);
            }
        };
        lookup.is_complete(&prerequisite.reference, user_id).await
    }

    /// `true` only when every prerequisite resolves satisfied.
    pub async fn all_satisfied(
        &self,
        prerequisites: &[Prerequisite],
        user_id: &str,
    ) -> anyhow::Result<bool> {
        for prerequisite in prerequisites {
            if !self.is_satisfied(prerequisite, user_id).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
