//! Core data model: quizzes, questions, answers, and attempts.
//!
//! Question content and answer payloads are internally tagged enums so the
//! type tag drives scorer dispatch and an unknown tag fails loudly at the
//! deserialization boundary instead of silently scoring zero.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Hotspot;
use crate::statistics::AttemptStatistics;

// ---------------------------------------------------------------------------
// Quiz configuration
// ---------------------------------------------------------------------------

/// Quiz configuration. Owned by the course-authoring side; the engine
/// reads everything and writes only `stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub settings: QuizSettings,
    #[serde(default)]
    pub schedule: QuizSchedule,
    #[serde(default)]
    pub prerequisites: Vec<Prerequisite>,
    #[serde(default)]
    pub status: QuizStatus,
    /// Rolling aggregate, refreshed after submissions.
    #[serde(default)]
    pub stats: Option<AttemptStatistics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSettings {
    /// Minutes a learner has between start and submission.
    pub time_limit_minutes: u32,
    /// How many finished attempts each learner may accumulate.
    pub attempts_allowed: u32,
    /// Pass threshold on the 0–100 score scale.
    pub passing_score: f64,
    pub grading_type: GradingType,
    pub shuffle_questions: bool,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            time_limit_minutes: 60,
            attempts_allowed: 1,
            passing_score: 70.0,
            grading_type: GradingType::Automatic,
            shuffle_questions: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingType {
    Automatic,
    Manual,
}

/// Optional availability window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizSchedule {
    #[serde(default)]
    pub opens_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closes_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

/// A gating condition checked before a new attempt may start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prerequisite {
    pub kind: PrerequisiteKind,
    /// Identifier of the quiz/module/assignment that must be complete.
    pub reference: String,
}

/// Unrecognized kinds deserialize to `Unknown` and fail closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrerequisiteKind {
    Quiz,
    Module,
    Assignment,
    #[serde(other)]
    Unknown,
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

/// An immutable question definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub content: QuestionContent,
    #[serde(default)]
    pub scoring: ScoringPolicy,
}

impl Question {
    /// Maximum points this question can award. Case studies earn the sum
    /// of their sub-questions; their own `points` field is ignored.
    pub fn max_points(&self) -> f64 {
        match &self.content {
            QuestionContent::CaseStudy { sub_questions, .. } => {
                sub_questions.iter().map(Question::max_points).sum()
            }
            _ => self.scoring.points,
        }
    }

    /// Copy with all correct-answer material stripped, safe to hand to a
    /// learner. Display-only: the redacted copy cannot be graded.
    pub fn redacted(&self) -> Question {
        Question {
            id: self.id.clone(),
            content: self.content.redacted(),
            scoring: self.scoring.clone(),
        }
    }
}

/// Type-specific question payload. The `type` tag uses the public
/// kebab-case type names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionContent {
    MultipleChoice {
        prompt: String,
        options: Vec<String>,
        correct: String,
    },
    TrueFalse {
        prompt: String,
        correct: bool,
    },
    Matching {
        prompt: String,
        /// Left-hand key to its correct right-hand value.
        pairs: HashMap<String, String>,
    },
    FillBlank {
        prompt: String,
        /// Any of these counts as correct (compared case/whitespace
        /// insensitively).
        accepted: Vec<String>,
    },
    Sequence {
        prompt: String,
        correct_order: Vec<String>,
    },
    Hotspot {
        prompt: String,
        image: String,
        hotspots: Vec<Hotspot>,
    },
    DragDrop {
        prompt: String,
        /// Drop-slot key to the item that belongs there.
        slots: HashMap<String, String>,
    },
    AudioResponse {
        prompt: String,
        /// Reference answer the transcript is compared against.
        reference: String,
    },
    MathEquation {
        prompt: String,
        /// Reference expression, e.g. `x^2 - 1`.
        reference: String,
    },
    DiagramLabel {
        prompt: String,
        /// Label site to its expected text.
        labels: HashMap<String, String>,
    },
    CaseStudy {
        prompt: String,
        sub_questions: Vec<Question>,
    },
    PeerReview {
        prompt: String,
    },
    Essay {
        prompt: String,
    },
    Coding {
        prompt: String,
        #[serde(default)]
        language: Option<String>,
        #[serde(default)]
        starter: Option<String>,
    },
}

impl QuestionContent {
    /// Public kebab-case name of the question type.
    pub fn type_name(&self) -> &'static str {
        match self {
            QuestionContent::MultipleChoice { .. } => "multiple-choice",
            QuestionContent::TrueFalse { .. } => "true-false",
            QuestionContent::Matching { .. } => "matching",
            QuestionContent::FillBlank { .. } => "fill-blank",
            QuestionContent::Sequence { .. } => "sequence",
            QuestionContent::Hotspot { .. } => "hotspot",
            QuestionContent::DragDrop { .. } => "drag-drop",
            QuestionContent::AudioResponse { .. } => "audio-response",
            QuestionContent::MathEquation { .. } => "math-equation",
            QuestionContent::DiagramLabel { .. } => "diagram-label",
            QuestionContent::CaseStudy { .. } => "case-study",
            QuestionContent::PeerReview { .. } => "peer-review",
            QuestionContent::Essay { .. } => "essay",
            QuestionContent::Coding { .. } => "coding",
        }
    }

    /// Strip correct-answer material while keeping what the learner needs
    /// to answer. Sequences come back sorted so the order leaks nothing.
    pub fn redacted(&self) -> QuestionContent {
        match self {
            QuestionContent::MultipleChoice {
                prompt, options, ..
            } => QuestionContent::MultipleChoice {
                prompt: prompt.clone(),
                options: options.clone(),
                correct: String::new(),
            },
            QuestionContent::TrueFalse { prompt, .. } => QuestionContent::TrueFalse {
                prompt: prompt.clone(),
                correct: false,
            },
            QuestionContent::Matching { prompt, pairs } => QuestionContent::Matching {
                prompt: prompt.clone(),
                pairs: pairs.keys().map(|k| (k.clone(), String::new())).collect(),
            },
            QuestionContent::FillBlank { prompt, .. } => QuestionContent::FillBlank {
                prompt: prompt.clone(),
                accepted: Vec::new(),
            },
            QuestionContent::Sequence {
                prompt,
                correct_order,
            } => {
                let mut items = correct_order.clone();
                items.sort();
                QuestionContent::Sequence {
                    prompt: prompt.clone(),
                    correct_order: items,
                }
            }
            QuestionContent::Hotspot { prompt, image, .. } => QuestionContent::Hotspot {
                prompt: prompt.clone(),
                image: image.clone(),
                hotspots: Vec::new(),
            },
            QuestionContent::DragDrop { prompt, slots } => QuestionContent::DragDrop {
                prompt: prompt.clone(),
                slots: slots.keys().map(|k| (k.clone(), String::new())).collect(),
            },
            QuestionContent::AudioResponse { prompt, .. } => QuestionContent::AudioResponse {
                prompt: prompt.clone(),
                reference: String::new(),
            },
            QuestionContent::MathEquation { prompt, .. } => QuestionContent::MathEquation {
                prompt: prompt.clone(),
                reference: String::new(),
            },
            QuestionContent::DiagramLabel { prompt, labels } => QuestionContent::DiagramLabel {
                prompt: prompt.clone(),
                labels: labels.keys().map(|k| (k.clone(), String::new())).collect(),
            },
            QuestionContent::CaseStudy {
                prompt,
                sub_questions,
            } => QuestionContent::CaseStudy {
                prompt: prompt.clone(),
                sub_questions: sub_questions.iter().map(Question::redacted).collect(),
            },
            other @ (QuestionContent::PeerReview { .. }
            | QuestionContent::Essay { .. }
            | QuestionContent::Coding { .. }) => other.clone(),
        }
    }
}

/// How a question is scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub points: f64,
    #[serde(default)]
    pub partial_credit: bool,
    /// Numeric tolerance for math-equation sampling.
    #[serde(default)]
    pub tolerance: Option<f64>,
    #[serde(default)]
    pub peer_review: Option<PeerReviewPolicy>,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            points: 1.0,
            partial_credit: false,
            tolerance: None,
            peer_review: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerReviewPolicy {
    /// Reviews required before the question becomes gradable.
    pub min_reviewers: usize,
    pub rubric: Vec<RubricCriterion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricCriterion {
    pub id: String,
    pub weight: f64,
}

// ---------------------------------------------------------------------------
// Answers
// ---------------------------------------------------------------------------

/// One learner answer inside a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: String,
    pub response: ResponsePayload,
    /// Seconds the learner spent on the question, self-reported.
    #[serde(default)]
    pub time_spent_secs: Option<u32>,
    /// Self-reported confidence in 0.0..=1.0.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Shape of a submitted response, tagged to match against the question
/// type at scoring time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponsePayload {
    /// Selected option (multiple-choice).
    Choice { selected: String },
    /// True/false selection.
    Flag { value: bool },
    /// Key-to-value pairing (matching, drag-drop).
    Pairs { pairs: HashMap<String, String> },
    /// Submitted ordering (sequence).
    Order { order: Vec<String> },
    /// Click locations (hotspot).
    Clicks { clicks: Vec<crate::geometry::Point> },
    /// Free text (fill-blank, math-equation, essay, coding).
    Text { text: String },
    /// Audio clip reference plus transcript once transcribed.
    Audio {
        clip: String,
        #[serde(default)]
        transcript: Option<String>,
    },
    /// Label-site-to-text map (diagram-label).
    Labels { labels: HashMap<String, String> },
    /// Nested answers for case-study sub-questions.
    SubAnswers { answers: Vec<SubmittedAnswer> },
    /// Collected peer reviews.
    Reviews { reviews: Vec<PeerReviewEntry> },
}

/// One reviewer's rubric scores, each criterion in 0.0..=1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerReviewEntry {
    pub reviewer_id: String,
    pub scores: HashMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Attempts
// ---------------------------------------------------------------------------

/// Lifecycle of an attempt. `Graded` and `TimedOut` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Graded,
    TimedOut,
}

impl AttemptStatus {
    /// Finished attempts count toward the attempt budget and statistics.
    pub fn is_finished(&self) -> bool {
        matches!(self, AttemptStatus::Completed | AttemptStatus::Graded)
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Graded => "graded",
            AttemptStatus::TimedOut => "timed_out",
        };
        write!(f, "{name}")
    }
}

/// Per-question grading feedback. `points_awarded` is `None` while the
/// question is not yet gradable (essay, coding, peer review waiting on
/// reviewers); callers must never collapse that into zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionFeedback {
    pub question_id: String,
    pub correct: bool,
    pub points_awarded: Option<f64>,
    pub points_possible: f64,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// One learner's timed run through a quiz: the mutable aggregate root.
///
/// The question snapshot is taken at start time with full answer
/// material so later edits to the live quiz cannot change grading;
/// [`QuizAttempt::redacted`] is the learner-facing view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub quiz_id: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Copied from the quiz at start time; immune to later quiz edits.
    pub time_limit_minutes: u32,
    pub status: AttemptStatus,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
    /// Percentage score in 0–100, set at submission.
    pub score: Option<f64>,
    pub passed: Option<bool>,
    #[serde(default)]
    pub feedback: Vec<QuestionFeedback>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl QuizAttempt {
    /// Wall-clock duration of a finished attempt.
    pub fn duration(&self) -> Option<Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    /// Minutes elapsed since the attempt started.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> f64 {
        (now - self.started_at).num_seconds() as f64 / 60.0
    }

    /// Learner-facing copy with the snapshot's answer material stripped.
    pub fn redacted(&self) -> QuizAttempt {
        QuizAttempt {
            questions: self.questions.iter().map(Question::redacted).collect(),
            ..self.clone()
        }
    }
}
