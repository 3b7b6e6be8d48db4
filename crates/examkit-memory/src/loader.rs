//! TOML quiz fixture loader.
//!
//! Loads quiz definitions (configuration plus question set) from TOML
//! files, for seeding the in-memory bank in tests and demos. Uses a flat
//! intermediate schema so an unrecognized question-type string can be
//! rejected as the data defect it is, rather than scoring zero later.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use examkit_core::error::AssessmentError;
use examkit_core::geometry::Hotspot;
use examkit_core::model::{
    GradingType, PeerReviewPolicy, Prerequisite, PrerequisiteKind, Question, QuestionContent,
    Quiz, QuizSchedule, QuizSettings, QuizStatus, RubricCriterion, ScoringPolicy,
};

/// A quiz definition plus its question set, as loaded from one file.
#[derive(Debug, Clone)]
pub struct QuizFixture {
    pub quiz: Quiz,
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizFile {
    quiz: TomlQuizHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizHeader {
    id: String,
    title: String,
    #[serde(default = "default_status")]
    status: String,
    #[serde(default)]
    settings: Option<TomlSettings>,
    #[serde(default)]
    schedule: Option<TomlSchedule>,
    #[serde(default)]
    prerequisites: Vec<TomlPrerequisite>,
}

fn default_status() -> String {
    "draft".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlSettings {
    #[serde(default = "default_time_limit")]
    time_limit_minutes: u32,
    #[serde(default = "default_attempts")]
    attempts_allowed: u32,
    #[serde(default = "default_passing_score")]
    passing_score: f64,
    #[serde(default = "default_grading_type")]
    grading_type: String,
    #[serde(default)]
    shuffle_questions: bool,
}

fn default_time_limit() -> u32 {
    60
}

fn default_attempts() -> u32 {
    1
}

fn default_passing_score() -> f64 {
    70.0
}

fn default_grading_type() -> String {
    "automatic".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlSchedule {
    #[serde(default)]
    opens_at: Option<String>,
    #[serde(default)]
    closes_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlPrerequisite {
    kind: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    prompt: String,
    #[serde(default = "default_points")]
    points: f64,
    #[serde(default)]
    partial_credit: bool,
    #[serde(default)]
    tolerance: Option<f64>,

    // Type-specific fields; which ones apply depends on `type`.
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_option: Option<String>,
    #[serde(default)]
    correct_flag: Option<bool>,
    #[serde(default)]
    pairs: HashMap<String, String>,
    #[serde(default)]
    accepted: Vec<String>,
    #[serde(default)]
    correct_order: Vec<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    hotspots: Vec<TomlHotspot>,
    #[serde(default)]
    slots: HashMap<String, String>,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    labels: HashMap<String, String>,
    #[serde(default)]
    sub_questions: Vec<TomlQuestion>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    starter: Option<String>,
    #[serde(default)]
    peer_review: Option<TomlPeerReview>,
}

fn default_points() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct TomlHotspot {
    x: f64,
    y: f64,
    radius: f64,
}

#[derive(Debug, Deserialize)]
struct TomlPeerReview {
    min_reviewers: usize,
    #[serde(default)]
    rubric: Vec<TomlCriterion>,
}

#[derive(Debug, Deserialize)]
struct TomlCriterion {
    id: String,
    weight: f64,
}

/// Load a quiz fixture from a TOML file.
pub fn load_quiz_file(path: &Path) -> Result<QuizFixture> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file: {}", path.display()))?;
    parse_quiz_str(&content, path)
}

/// Parse a TOML string into a quiz fixture (useful for testing).
pub fn parse_quiz_str(content: &str, source_path: &Path) -> Result<QuizFixture> {
    let parsed: TomlQuizFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let settings = match parsed.quiz.settings {
        Some(s) => QuizSettings {
            time_limit_minutes: s.time_limit_minutes,
            attempts_allowed: s.attempts_allowed,
            passing_score: s.passing_score,
            grading_type: parse_grading_type(&s.grading_type)?,
            shuffle_questions: s.shuffle_questions,
        },
        None => QuizSettings::default(),
    };

    let schedule = match parsed.quiz.schedule {
        Some(s) => QuizSchedule {
            opens_at: s.opens_at.as_deref().map(parse_timestamp).transpose()?,
            closes_at: s.closes_at.as_deref().map(parse_timestamp).transpose()?,
        },
        None => QuizSchedule::default(),
    };

    let prerequisites = parsed
        .quiz
        .prerequisites
        .into_iter()
        .map(|p| Prerequisite {
            kind: parse_prerequisite_kind(&p.kind),
            reference: p.reference,
        })
        .collect();

    let questions = parsed
        .questions
        .into_iter()
        .map(convert_question)
        .collect::<Result<Vec<_>>>()?;

    Ok(QuizFixture {
        quiz: Quiz {
            id: parsed.quiz.id,
            title: parsed.quiz.title,
            settings,
            schedule,
            prerequisites,
            status: parse_status(&parsed.quiz.status)?,
            stats: None,
        },
        questions,
    })
}

/// Load all `.toml` quiz fixtures from a directory (non-recursive).
/// Files that fail to parse are skipped with a warning.
pub fn load_quiz_directory(dir: &Path) -> Result<Vec<QuizFixture>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut fixtures = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "toml") {
            match load_quiz_file(&path) {
                Ok(fixture) => fixtures.push(fixture),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }
    Ok(fixtures)
}

fn parse_status(s: &str) -> Result<QuizStatus> {
    match s {
        "draft" => Ok(QuizStatus::Draft),
        "published" => Ok(QuizStatus::Published),
        "archived" => Ok(QuizStatus::Archived),
        other => anyhow::bail!("unknown quiz status: {other}"),
    }
}

fn parse_grading_type(s: &str) -> Result<GradingType> {
    match s {
        "automatic" => Ok(GradingType::Automatic),
        "manual" => Ok(GradingType::Manual),
        other => anyhow::bail!("unknown grading type: {other}"),
    }
}

fn parse_prerequisite_kind(s: &str) -> PrerequisiteKind {
    match s {
        "quiz" => PrerequisiteKind::Quiz,
        "module" => PrerequisiteKind::Module,
        "assignment" => PrerequisiteKind::Assignment,
        other => {
            // Fails closed at attempt time; flagged here for visibility.
            tracing::warn!("unknown prerequisite kind in fixture: {other}");
            PrerequisiteKind::Unknown
        }
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid timestamp: {s}"))
}

fn convert_question(q: TomlQuestion) -> Result<Question> {
    let content = match q.kind.as_str() {
        "multiple-choice" => QuestionContent::MultipleChoice {
            prompt: q.prompt,
            options: q.options,
            correct: q.correct_option.unwrap_or_default(),
        },
        "true-false" => QuestionContent::TrueFalse {
            prompt: q.prompt,
            correct: q.correct_flag.unwrap_or(false),
        },
        "matching" => QuestionContent::Matching {
            prompt: q.prompt,
            pairs: q.pairs,
        },
        "fill-blank" => QuestionContent::FillBlank {
            prompt: q.prompt,
            accepted: q.accepted,
        },
        "sequence" => QuestionContent::Sequence {
            prompt: q.prompt,
            correct_order: q.correct_order,
        },
        "hotspot" => QuestionContent::Hotspot {
            prompt: q.prompt,
            image: q.image.unwrap_or_default(),
            hotspots: q
                .hotspots
                .iter()
                .map(|h| Hotspot {
                    x: h.x,
                    y: h.y,
                    radius: h.radius,
                })
                .collect(),
        },
        "drag-drop" => QuestionContent::DragDrop {
            prompt: q.prompt,
            slots: q.slots,
        },
        "audio-response" => QuestionContent::AudioResponse {
            prompt: q.prompt,
            reference: q.reference.unwrap_or_default(),
        },
        "math-equation" => QuestionContent::MathEquation {
            prompt: q.prompt,
            reference: q.reference.unwrap_or_default(),
        },
        "diagram-label" => QuestionContent::DiagramLabel {
            prompt: q.prompt,
            labels: q.labels,
        },
        "case-study" => QuestionContent::CaseStudy {
            prompt: q.prompt,
            sub_questions: q
                .sub_questions
                .into_iter()
                .map(convert_question)
                .collect::<Result<Vec<_>>>()?,
        },
        "peer-review" => QuestionContent::PeerReview { prompt: q.prompt },
        "essay" => QuestionContent::Essay { prompt: q.prompt },
        "coding" => QuestionContent::Coding {
            prompt: q.prompt,
            language: q.language,
            starter: q.starter,
        },
        other => {
            return Err(AssessmentError::UnsupportedQuestionType(other.to_string()).into());
        }
    };

    Ok(Question {
        id: q.id,
        content,
        scoring: ScoringPolicy {
            points: q.points,
            partial_credit: q.partial_credit,
            tolerance: q.tolerance,
            peer_review: q.peer_review.map(|pr| PeerReviewPolicy {
                min_reviewers: pr.min_reviewers,
                rubric: pr
                    .rubric
                    .into_iter()
                    .map(|c| RubricCriterion {
                        id: c.id,
                        weight: c.weight,
                    })
                    .collect(),
            }),
        },
    })
}

/// A warning from fixture validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub question_id: Option<String>,
    pub message: String,
}

/// Validate a loaded fixture for common authoring mistakes.
pub fn validate_fixture(fixture: &QuizFixture) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_ids = std::collections::HashSet::new();
    for question in &fixture.questions {
        if !seen_ids.insert(&question.id) {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: format!("duplicate question ID: {}", question.id),
            });
        }
    }

    for question in &fixture.questions {
        let warn = |message: String| ValidationWarning {
            question_id: Some(question.id.clone()),
            message,
        };

        if question.scoring.points <= 0.0
            && !matches!(question.content, QuestionContent::CaseStudy { .. })
        {
            warnings.push(warn("points is not positive".into()));
        }

        match &question.content {
            QuestionContent::MultipleChoice {
                options, correct, ..
            } => {
                if options.is_empty() {
                    warnings.push(warn("multiple-choice question has no options".into()));
                } else if !options.contains(correct) {
                    warnings.push(warn(
                        "correct option is not in the option list".into(),
                    ));
                }
            }
            QuestionContent::Sequence { correct_order, .. } if correct_order.is_empty() => {
                warnings.push(warn("sequence question has no items".into()));
            }
            QuestionContent::Hotspot { hotspots, .. } if hotspots.is_empty() => {
                warnings.push(warn("hotspot question has no hotspots".into()));
            }
            QuestionContent::PeerReview { .. } => match &question.scoring.peer_review {
                Some(pr) if pr.rubric.is_empty() => {
                    warnings.push(warn("peer-review rubric is empty".into()));
                }
                Some(_) => {}
                None => {
                    warnings.push(warn(
                        "peer-review question has no peer_review config".into(),
                    ));
                }
            },
            _ => {}
        }
    }

    warnings
}
