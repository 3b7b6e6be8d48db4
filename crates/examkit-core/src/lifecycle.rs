//! Attempt lifecycle manager.
//!
//! Owns the state machine for a single attempt:
//! `in_progress → completed → graded`, with `timed_out` as an alternate
//! terminal when submission lands past the time limit. All wall-clock
//! time is passed in explicitly so the whole machine is testable with
//! injected clocks; randomness is an injected seedable RNG so shuffles
//! are deterministic under test.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use uuid::Uuid;

use crate::error::AssessmentError;
use crate::model::{
    AttemptStatus, GradingType, QuestionFeedback, Quiz, QuizAttempt, QuizStatus, ResponsePayload,
    SubmittedAnswer,
};
use crate::prerequisites::PrerequisiteChecker;
use crate::scoring::grade_submission;
use crate::statistics::{compute_attempt_statistics, AttemptStatistics};
use crate::traits::{AttemptStore, AudioTranscriber, QuestionBank};

/// The attempt lifecycle engine, constructed with injected collaborators.
pub struct AttemptEngine {
    bank: Arc<dyn QuestionBank>,
    store: Arc<dyn AttemptStore>,
    prerequisites: PrerequisiteChecker,
    transcriber: Arc<dyn AudioTranscriber>,
    rng: Mutex<StdRng>,
}

impl AttemptEngine {
    pub fn new(
        bank: Arc<dyn QuestionBank>,
        store: Arc<dyn AttemptStore>,
        prerequisites: PrerequisiteChecker,
        transcriber: Arc<dyn AudioTranscriber>,
    ) -> Self {
        Self {
            bank,
            store,
            prerequisites,
            transcriber,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Replace the shuffle RNG with a seeded one for deterministic tests.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Start a new attempt. Runs the full precondition ladder (published
    /// quiz, availability window, attempt budget, prerequisites), failing
    /// fast with a specific error before any write. On success the
    /// question set is snapshotted (shuffled when configured) and the
    /// attempt persisted; the returned view is answer-redacted.
    pub async fn start_attempt(
        &self,
        quiz_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<QuizAttempt, AssessmentError> {
        let quiz = self.load_quiz(quiz_id).await?;

        if quiz.status != QuizStatus::Published {
            return Err(AssessmentError::NotAvailable(quiz_id.to_string()));
        }
        if let Some(opens_at) = quiz.schedule.opens_at {
            if now < opens_at {
                return Err(AssessmentError::NotStartedYet {
                    quiz_id: quiz_id.to_string(),
                    opens_at,
                });
            }
        }
        if let Some(closes_at) = quiz.schedule.closes_at {
            if now > closes_at {
                return Err(AssessmentError::Ended {
                    quiz_id: quiz_id.to_string(),
                    closed_at: closes_at,
                });
            }
        }

        let finished = self.store.count_finished(quiz_id, user_id).await?;
        if finished >= quiz.settings.attempts_allowed {
            return Err(AssessmentError::MaxAttemptsReached {
                quiz_id: quiz_id.to_string(),
                allowed: quiz.settings.attempts_allowed,
            });
        }

        if !self
            .prerequisites
            .all_satisfied(&quiz.prerequisites, user_id)
            .await?
        {
            return Err(AssessmentError::PrerequisitesNotMet(quiz_id.to_string()));
        }

        let mut questions = self.bank.get_questions(quiz_id).await?;
        if quiz.settings.shuffle_questions {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            questions.shuffle(&mut *rng);
        }

        let attempt = QuizAttempt {
            id: Uuid::new_v4(),
            quiz_id: quiz_id.to_string(),
            user_id: user_id.to_string(),
            started_at: now,
            finished_at: None,
            time_limit_minutes: quiz.settings.time_limit_minutes,
            status: AttemptStatus::InProgress,
            questions,
            answers: Vec::new(),
            score: None,
            passed: None,
            feedback: Vec::new(),
            reviewed_by: None,
            reviewed_at: None,
        };
        self.store.save(&attempt).await?;

        tracing::info!(attempt_id = %attempt.id, quiz_id, user_id, "attempt started");
        Ok(attempt.redacted())
    }

    /// Submit answers for grading.
    ///
    /// Submissions past the time limit transition to `timed_out` but the
    /// supplied answers are still graded; timing out never discards
    /// work. The persist is a conditional write keyed on
    /// `status == in_progress`, so of two racing submits exactly one
    /// lands; the loser sees `AlreadySubmitted`.
    pub async fn submit_attempt(
        &self,
        attempt_id: Uuid,
        mut answers: Vec<SubmittedAnswer>,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<QuizAttempt, AssessmentError> {
        let mut attempt = self
            .store
            .load(attempt_id)
            .await?
            .ok_or(AssessmentError::AttemptNotFound(attempt_id))?;

        if attempt.user_id != user_id {
            return Err(AssessmentError::Forbidden {
                user_id: user_id.to_string(),
                attempt_id,
            });
        }
        if attempt.status != AttemptStatus::InProgress {
            return Err(AssessmentError::AlreadySubmitted(attempt_id));
        }

        let quiz = self.load_quiz(&attempt.quiz_id).await?;
        let timed_out = attempt.elapsed_minutes(now) > attempt.time_limit_minutes as f64;

        self.fill_transcripts(&mut answers).await;
        let outcome = grade_submission(&attempt.questions, &answers);

        attempt.finished_at = Some(now);
        attempt.answers = answers;
        attempt.score = Some(outcome.percent);
        attempt.passed = Some(outcome.percent >= quiz.settings.passing_score);
        attempt.feedback = outcome.feedback;
        attempt.status = resolved_status(
            timed_out,
            quiz.settings.grading_type,
            outcome.fully_graded,
        );

        let landed = self
            .store
            .save_if_status(&attempt, AttemptStatus::InProgress)
            .await?;
        if !landed {
            return Err(AssessmentError::AlreadySubmitted(attempt_id));
        }

        tracing::info!(
            attempt_id = %attempt.id,
            status = %attempt.status,
            score = outcome.percent,
            "attempt submitted"
        );
        self.spawn_stats_refresh(attempt.quiz_id.clone());

        Ok(attempt.redacted())
    }

    /// Manually review a completed attempt: overwrite feedback, recompute
    /// the score, and transition to `graded`. The only mutation permitted
    /// after submission; `graded` is terminal.
    pub async fn review_attempt(
        &self,
        attempt_id: Uuid,
        feedback: Vec<QuestionFeedback>,
        reviewer_id: &str,
        now: DateTime<Utc>,
    ) -> Result<QuizAttempt, AssessmentError> {
        let mut attempt = self
            .store
            .load(attempt_id)
            .await?
            .ok_or(AssessmentError::AttemptNotFound(attempt_id))?;

        if attempt.status != AttemptStatus::Completed {
            return Err(AssessmentError::NotReady(attempt_id));
        }

        let quiz = self.load_quiz(&attempt.quiz_id).await?;

        let total_possible: f64 = attempt.questions.iter().map(|q| q.max_points()).sum();
        let total_awarded: f64 = feedback
            .iter()
            .filter_map(|f| f.points_awarded)
            .sum();
        let percent = if total_possible > 0.0 {
            total_awarded / total_possible * 100.0
        } else {
            0.0
        };

        attempt.feedback = feedback;
        attempt.score = Some(percent);
        attempt.passed = Some(percent >= quiz.settings.passing_score);
        attempt.reviewed_by = Some(reviewer_id.to_string());
        attempt.reviewed_at = Some(now);
        attempt.status = AttemptStatus::Graded;

        let landed = self
            .store
            .save_if_status(&attempt, AttemptStatus::Completed)
            .await?;
        if !landed {
            return Err(AssessmentError::NotReady(attempt_id));
        }

        tracing::info!(attempt_id = %attempt.id, reviewer_id, score = percent, "attempt reviewed");
        self.spawn_stats_refresh(attempt.quiz_id.clone());

        Ok(attempt.redacted())
    }

    /// Recompute and persist quiz statistics from finished attempts.
    pub async fn compute_statistics(
        &self,
        quiz_id: &str,
    ) -> Result<AttemptStatistics, AssessmentError> {
        self.load_quiz(quiz_id).await?;
        let stats = refresh_quiz_stats(&*self.store, &*self.bank, quiz_id).await?;
        Ok(stats)
    }

    async fn load_quiz(&self, quiz_id: &str) -> Result<Quiz, AssessmentError> {
        self.bank
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| AssessmentError::QuizNotFound(quiz_id.to_string()))
    }

    /// Transcribe any audio answers that arrived without a transcript,
    /// concurrently. A failed transcription leaves the answer without a
    /// transcript (it scores zero) rather than failing the submission.
    async fn fill_transcripts(&self, answers: &mut [SubmittedAnswer]) {
        let pending: Vec<(usize, String)> = answers
            .iter()
            .enumerate()
            .filter_map(|(i, answer)| match &answer.response {
                ResponsePayload::Audio {
                    clip,
                    transcript: None,
                } => Some((i, clip.clone())),
                _ => None,
            })
            .collect();
        if pending.is_empty() {
            return;
        }

        let results =
            future::join_all(pending.iter().map(|(_, clip)| self.transcriber.transcribe(clip)))
                .await;

        for ((index, clip), result) in pending.iter().zip(results) {
            match result {
                Ok(text) => {
                    if let ResponsePayload::Audio { transcript, .. } =
                        &mut answers[*index].response
                    {
                        *transcript = Some(text);
                    }
                }
                Err(e) => {
                    tracing::warn!(clip = %clip, error = %e, "transcription failed; answer scores zero");
                }
            }
        }
    }

    /// Best-effort statistics refresh after a submission or review. Runs
    /// detached; a failure is logged and the aggregate stays stale until
    /// the next refresh, never surfaced to the learner.
    fn spawn_stats_refresh(&self, quiz_id: String) {
        let store = Arc::clone(&self.store);
        let bank = Arc::clone(&self.bank);
        tokio::spawn(async move {
            if let Err(e) = refresh_quiz_stats(&*store, &*bank, &quiz_id).await {
                tracing::error!(quiz_id, error = %e, "quiz stats refresh failed");
            }
        });
    }
}

/// Status an attempt resolves to at submission time. Timing out wins over
/// everything; otherwise automatic grading finishes the attempt only when
/// no question is left awaiting manual or peer grading.
fn resolved_status(timed_out: bool, grading: GradingType, fully_graded: bool) -> AttemptStatus {
    if timed_out {
        AttemptStatus::TimedOut
    } else if grading == GradingType::Automatic && fully_graded {
        AttemptStatus::Graded
    } else {
        AttemptStatus::Completed
    }
}

async fn refresh_quiz_stats(
    store: &dyn AttemptStore,
    bank: &dyn QuestionBank,
    quiz_id: &str,
) -> anyhow::Result<AttemptStatistics> {
    let attempts = store.list_finished(quiz_id).await?;
    let stats = compute_attempt_statistics(&attempts);
    bank.save_stats(quiz_id, &stats).await?;
    Ok(stats)
}
