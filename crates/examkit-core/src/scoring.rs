//! Question scorers and the scoring dispatcher.
//!
//! One pure function per question type, routed by the content tag. Every
//! scorer is deterministic, bounded by the question's points, and treats a
//! malformed response as a zero score rather than a grading failure, since
//! one bad answer must not block the rest of the submission.
//!
//! Scores of `None` mean "not yet gradable" (essay, coding, peer review
//! short of its reviewer quorum) and are distinct from `Some(0.0)`.

use std::collections::HashMap;

use crate::algebra::{self, Expr, SAMPLE_POINTS};
use crate::geometry::{Hotspot, Point};
use crate::model::{
    PeerReviewEntry, PeerReviewPolicy, Question, QuestionContent, QuestionFeedback,
    ResponsePayload, ScoringPolicy, SubmittedAnswer,
};
use crate::similarity::{normalize, text_similarity};

/// Outcome of scoring one question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionScore {
    /// Points awarded, `None` while not yet gradable.
    pub awarded: Option<f64>,
    /// Whether the answer was fully correct.
    pub correct: bool,
    /// Short human-readable grading note.
    pub explanation: Option<String>,
}

impl QuestionScore {
    fn graded(awarded: f64, correct: bool, explanation: impl Into<String>) -> Self {
        Self {
            awarded: Some(awarded),
            correct,
            explanation: Some(explanation.into()),
        }
    }

    fn ungraded(explanation: impl Into<String>) -> Self {
        Self {
            awarded: None,
            correct: false,
            explanation: Some(explanation.into()),
        }
    }

    fn zero(explanation: impl Into<String>) -> Self {
        Self::graded(0.0, false, explanation)
    }
}

/// Aggregate result of grading a whole submission.
#[derive(Debug, Clone)]
pub struct GradeOutcome {
    pub total_awarded: f64,
    pub total_possible: f64,
    /// `total_awarded / total_possible` on the 0–100 scale.
    pub percent: f64,
    /// False while any question is still awaiting manual/peer grading.
    pub fully_graded: bool,
    pub feedback: Vec<QuestionFeedback>,
}

/// Score one question against an optional response.
///
/// `None` response means the learner skipped the question: zero for
/// auto-gradable types, ungraded for manual-only types.
pub fn score_question(question: &Question, response: Option<&ResponsePayload>) -> QuestionScore {
    let policy = &question.scoring;
    match (&question.content, response) {
        (QuestionContent::MultipleChoice { correct, .. }, Some(ResponsePayload::Choice { selected })) => {
            score_exact(selected == correct, policy.points)
        }
        (QuestionContent::TrueFalse { correct, .. }, Some(ResponsePayload::Flag { value })) => {
            score_exact(value == correct, policy.points)
        }
        (QuestionContent::Matching { pairs, .. }, Some(ResponsePayload::Pairs { pairs: submitted }))
        | (QuestionContent::DragDrop { slots: pairs, .. }, Some(ResponsePayload::Pairs { pairs: submitted })) => {
            score_pairs(pairs, submitted, policy)
        }
        (QuestionContent::FillBlank { accepted, .. }, Some(ResponsePayload::Text { text })) => {
            score_fill_blank(accepted, text, policy.points)
        }
        (QuestionContent::Sequence { correct_order, .. }, Some(ResponsePayload::Order { order })) => {
            score_sequence(correct_order, order, policy)
        }
        (QuestionContent::Hotspot { hotspots, .. }, Some(ResponsePayload::Clicks { clicks })) => {
            score_hotspot(hotspots, clicks, policy)
        }
        (QuestionContent::AudioResponse { reference, .. }, Some(ResponsePayload::Audio { transcript, .. })) => {
            match transcript {
                Some(text) => score_audio(reference, text, policy),
                None => {
                    tracing::warn!(question_id = %question.id, "audio answer has no transcript");
                    QuestionScore::zero("audio response could not be transcribed")
                }
            }
        }
        (QuestionContent::MathEquation { reference, .. }, Some(ResponsePayload::Text { text })) => {
            score_math(reference, text, policy, &question.id)
        }
        (QuestionContent::DiagramLabel { labels, .. }, Some(ResponsePayload::Labels { labels: submitted })) => {
            score_labels(labels, submitted, policy)
        }
        (QuestionContent::CaseStudy { sub_questions, .. }, Some(ResponsePayload::SubAnswers { answers })) => {
            score_case_study(sub_questions, answers)
        }
        (QuestionContent::PeerReview { .. }, Some(ResponsePayload::Reviews { reviews })) => {
            match &policy.peer_review {
                Some(pr) => score_peer_review(pr, reviews, policy),
                None => {
                    tracing::warn!(question_id = %question.id, "peer-review question without rubric config");
                    QuestionScore::ungraded("peer review is not configured")
                }
            }
        }
        // Manual-only types stay ungraded whether or not a response exists.
        (QuestionContent::Essay { .. }, _) | (QuestionContent::Coding { .. }, _) => {
            QuestionScore::ungraded("awaiting manual review")
        }
        (QuestionContent::PeerReview { .. }, None) => {
            QuestionScore::ungraded("awaiting peer reviews")
        }
        // Skipped auto-gradable question.
        (_, None) => QuestionScore::zero("no answer submitted"),
        // Payload shape does not fit the question type: malformed learner
        // input, scored zero and logged rather than propagated.
        (content, Some(other)) => {
            tracing::warn!(
                question_id = %question.id,
                question_type = content.type_name(),
                response_kind = response_kind(other),
                "response payload does not match question type"
            );
            QuestionScore::zero("answer format did not match the question")
        }
    }
}

fn response_kind(payload: &ResponsePayload) -> &'static str {
    match payload {
        ResponsePayload::Choice { .. } => "choice",
        ResponsePayload::Flag { .. } => "flag",
        ResponsePayload::Pairs { .. } => "pairs",
        ResponsePayload::Order { .. } => "order",
        ResponsePayload::Clicks { .. } => "clicks",
        ResponsePayload::Text { .. } => "text",
        ResponsePayload::Audio { .. } => "audio",
        ResponsePayload::Labels { .. } => "labels",
        ResponsePayload::SubAnswers { .. } => "sub_answers",
        ResponsePayload::Reviews { .. } => "reviews",
    }
}

fn score_exact(correct: bool, points: f64) -> QuestionScore {
    if correct {
        QuestionScore::graded(points, true, "correct")
    } else {
        QuestionScore::zero("incorrect")
    }
}

fn score_pairs(
    correct: &HashMap<String, String>,
    submitted: &HashMap<String, String>,
    policy: &ScoringPolicy,
) -> QuestionScore {
    let total = correct.len();
    if total == 0 {
        return QuestionScore::zero("question has no pairs to match");
    }
    let matched = correct
        .iter()
        .filter(|(key, value)| submitted.get(*key) == Some(value))
        .count();

    let explanation = format!("{matched} of {total} pairs matched");
    if policy.partial_credit {
        let awarded = matched as f64 / total as f64 * policy.points;
        QuestionScore::graded(awarded, matched == total, explanation)
    } else {
        score_exact(matched == total, policy.points)
    }
}

fn score_fill_blank(accepted: &[String], text: &str, points: f64) -> QuestionScore {
    let submitted = normalize(text);
    let hit = accepted.iter().any(|a| normalize(a) == submitted);
    score_exact(hit, points)
}

fn score_sequence(
    correct_order: &[String],
    order: &[String],
    policy: &ScoringPolicy,
) -> QuestionScore {
    let total = correct_order.len();
    if total == 0 {
        return QuestionScore::zero("question has no sequence to order");
    }
    let in_place = correct_order
        .iter()
        .zip(order.iter())
        .filter(|(a, b)| a == b)
        .count();
    let all = in_place == total && order.len() == total;

    let explanation = format!("{in_place} of {total} positions correct");
    if policy.partial_credit {
        let awarded = in_place as f64 / total as f64 * policy.points;
        QuestionScore::graded(awarded, all, explanation)
    } else {
        score_exact(all, policy.points)
    }
}

fn score_hotspot(hotspots: &[Hotspot], clicks: &[Point], policy: &ScoringPolicy) -> QuestionScore {
    let total = hotspots.len();
    if total == 0 {
        return QuestionScore::zero("question has no hotspots");
    }

    let mut hit = vec![false; total];
    let mut misses = 0usize;
    for click in clicks {
        match hotspots.iter().position(|h| h.contains(click)) {
            Some(i) => hit[i] = true,
            None => misses += 1,
        }
    }
    let hits = hit.iter().filter(|h| **h).count();
    let all = hits == total && misses == 0;

    let explanation = format!("{hits} of {total} hotspots hit, {misses} stray clicks");
    if policy.partial_credit {
        let fraction =
            (hits as f64 / total as f64 - 0.5 * misses as f64 / total as f64).max(0.0);
        QuestionScore::graded(fraction * policy.points, all, explanation)
    } else {
        score_exact(all, policy.points)
    }
}

fn score_audio(reference: &str, transcript: &str, policy: &ScoringPolicy) -> QuestionScore {
    let similarity = text_similarity(reference, transcript);
    let explanation = format!("transcript similarity {similarity:.2}");
    if policy.partial_credit {
        QuestionScore::graded(similarity * policy.points, similarity > 0.8, explanation)
    } else {
        score_exact(similarity > 0.8, policy.points)
    }
}

fn score_math(
    reference: &str,
    submitted: &str,
    policy: &ScoringPolicy,
    question_id: &str,
) -> QuestionScore {
    let reference_expr = match Expr::parse(reference) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(question_id, error = %e, "reference expression does not parse");
            return QuestionScore::zero("question reference expression is invalid");
        }
    };
    let submitted_expr = match Expr::parse(submitted) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(question_id, error = %e, "submitted expression does not parse");
            return QuestionScore::zero("submitted expression could not be parsed");
        }
    };

    if reference_expr == submitted_expr {
        return QuestionScore::graded(policy.points, true, "expressions match symbolically");
    }

    let tolerance = policy.tolerance.unwrap_or(algebra::DEFAULT_TOLERANCE);
    let matched = algebra::matching_samples(&reference_expr, &submitted_expr, tolerance);
    let samples = SAMPLE_POINTS.len();
    let explanation = format!("{matched} of {samples} sample points agree");

    if policy.partial_credit {
        let awarded = matched as f64 / samples as f64 * policy.points;
        QuestionScore::graded(awarded, matched == samples, explanation)
    } else {
        score_exact(matched == samples, policy.points)
    }
}

fn score_labels(
    expected: &HashMap<String, String>,
    submitted: &HashMap<String, String>,
    policy: &ScoringPolicy,
) -> QuestionScore {
    let total = expected.len();
    if total == 0 {
        return QuestionScore::zero("question has no labels");
    }

    let mut exact = 0usize;
    let mut partial = 0usize;
    for (site, reference) in expected {
        let Some(text) = submitted.get(site) else {
            continue;
        };
        let similarity = text_similarity(reference, text);
        if similarity >= 1.0 {
            exact += 1;
        } else if similarity > 0.7 {
            partial += 1;
        }
    }
    let all = exact == total;

    let explanation = format!("{exact} exact and {partial} close labels of {total}");
    if policy.partial_credit {
        let fraction = (exact as f64 + 0.5 * partial as f64) / total as f64;
        QuestionScore::graded(fraction * policy.points, all, explanation)
    } else {
        score_exact(all, policy.points)
    }
}

fn score_case_study(sub_questions: &[Question], answers: &[SubmittedAnswer]) -> QuestionScore {
    let by_id: HashMap<&str, &ResponsePayload> = answers
        .iter()
        .map(|a| (a.question_id.as_str(), &a.response))
        .collect();

    let mut awarded = 0.0;
    let mut possible = 0.0;
    let mut pending = false;
    for sub in sub_questions {
        possible += sub.max_points();
        let result = score_question(sub, by_id.get(sub.id.as_str()).copied());
        match result.awarded {
            Some(points) => awarded += points,
            // A sub-question waiting on manual grading keeps the whole
            // case study ungradable; summing it as zero would collapse
            // "pending" into "wrong".
            None => pending = true,
        }
    }

    if pending {
        return QuestionScore::ungraded("case study has sub-questions awaiting review");
    }
    QuestionScore::graded(
        awarded,
        (awarded - possible).abs() < f64::EPSILON,
        format!("{awarded:.1} of {possible:.1} sub-question points"),
    )
}

fn score_peer_review(
    config: &PeerReviewPolicy,
    reviews: &[PeerReviewEntry],
    policy: &ScoringPolicy,
) -> QuestionScore {
    if reviews.len() < config.min_reviewers {
        return QuestionScore::ungraded(format!(
            "{} of {} required reviews submitted",
            reviews.len(),
            config.min_reviewers
        ));
    }

    let total_weight: f64 = config.rubric.iter().map(|c| c.weight).sum();
    if total_weight <= 0.0 {
        return QuestionScore::zero("rubric has no weight");
    }

    let mut weighted = 0.0;
    for criterion in &config.rubric {
        let scores: Vec<f64> = reviews
            .iter()
            .filter_map(|r| r.scores.get(&criterion.id).copied())
            .collect();
        if scores.is_empty() {
            continue;
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        weighted += mean.clamp(0.0, 1.0) * criterion.weight;
    }
    let fraction = weighted / total_weight;

    let explanation = format!("rubric-weighted review score {:.0}%", fraction * 100.0);
    if policy.partial_credit {
        QuestionScore::graded(
            fraction * policy.points,
            fraction >= 1.0 - f64::EPSILON,
            explanation,
        )
    } else {
        score_exact(fraction >= 1.0 - f64::EPSILON, policy.points)
    }
}

/// Grade a whole submission against the attempt's question snapshot.
///
/// Answers referencing question IDs outside the snapshot are skipped with
/// a warning; they can neither add points nor abort grading.
pub fn grade_submission(questions: &[Question], answers: &[SubmittedAnswer]) -> GradeOutcome {
    let mut by_id: HashMap<&str, &ResponsePayload> = HashMap::new();
    for answer in answers {
        if questions.iter().any(|q| q.id == answer.question_id) {
            by_id.insert(answer.question_id.as_str(), &answer.response);
        } else {
            tracing::warn!(
                question_id = %answer.question_id,
                "answer references a question outside the attempt snapshot; ignored"
            );
        }
    }

    let mut feedback = Vec::with_capacity(questions.len());
    let mut total_awarded = 0.0;
    let mut total_possible = 0.0;
    let mut fully_graded = true;

    for question in questions {
        let possible = question.max_points();
        let result = score_question(question, by_id.get(question.id.as_str()).copied());
        match result.awarded {
            Some(points) => total_awarded += points,
            None => fully_graded = false,
        }
        total_possible += possible;
        feedback.push(QuestionFeedback {
            question_id: question.id.clone(),
            correct: result.correct,
            points_awarded: result.awarded,
            points_possible: possible,
            explanation: result.explanation,
        });
    }

    let percent = if total_possible > 0.0 {
        total_awarded / total_possible * 100.0
    } else {
        0.0
    };

    GradeOutcome {
        total_awarded,
        total_possible,
        percent,
        fully_graded,
        feedback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RubricCriterion;

    fn question(content: QuestionContent, points: f64, partial: bool) -> Question {
        Question {
            id: "q".into(),
            content,
            scoring: ScoringPolicy {
                points,
                partial_credit: partial,
                ..Default::default()
            },
        }
    }

    fn awarded(score: &QuestionScore) -> f64 {
        score.awarded.expect("expected a graded score")
    }

    #[test]
    fn multiple_choice_exact_match() {
        let q = question(
            QuestionContent::MultipleChoice {
                prompt: "?".into(),
                options: vec!["a".into(), "b".into()],
                correct: "b".into(),
            },
            4.0,
            false,
        );
        let right = ResponsePayload::Choice {
            selected: "b".into(),
        };
        let wrong = ResponsePayload::Choice {
            selected: "a".into(),
        };
        assert_eq!(awarded(&score_question(&q, Some(&right))), 4.0);
        assert_eq!(awarded(&score_question(&q, Some(&wrong))), 0.0);
    }

    #[test]
    fn true_false_exact_match() {
        let q = question(
            QuestionContent::TrueFalse {
                prompt: "?".into(),
                correct: true,
            },
            2.0,
            false,
        );
        assert_eq!(
            awarded(&score_question(&q, Some(&ResponsePayload::Flag { value: true }))),
            2.0
        );
        assert_eq!(
            awarded(&score_question(&q, Some(&ResponsePayload::Flag { value: false }))),
            0.0
        );
    }

    #[test]
    fn sequence_partial_credit_per_position() {
        let q = question(
            QuestionContent::Sequence {
                prompt: "?".into(),
                correct_order: vec!["a".into(), "b".into(), "c".into()],
            },
            3.0,
            true,
        );
        let perfect = ResponsePayload::Order {
            order: vec!["a".into(), "b".into(), "c".into()],
        };
        assert_eq!(awarded(&score_question(&q, Some(&perfect))), 3.0);

        // One of three positions correct: a in place, c and b swapped.
        let swapped = ResponsePayload::Order {
            order: vec!["a".into(), "c".into(), "b".into()],
        };
        let score = score_question(&q, Some(&swapped));
        assert!((awarded(&score) - 1.0).abs() < 1e-12);
        assert!(!score.correct);
    }

    #[test]
    fn no_partial_credit_is_all_or_nothing() {
        let q = question(
            QuestionContent::Sequence {
                prompt: "?".into(),
                correct_order: vec!["a".into(), "b".into(), "c".into()],
            },
            3.0,
            false,
        );
        let nearly = ResponsePayload::Order {
            order: vec!["a".into(), "c".into(), "b".into()],
        };
        assert_eq!(awarded(&score_question(&q, Some(&nearly))), 0.0);
    }

    #[test]
    fn matching_counts_correct_pairs() {
        let q = question(
            QuestionContent::Matching {
                prompt: "?".into(),
                pairs: [
                    ("fr".to_string(), "paris".to_string()),
                    ("de".to_string(), "berlin".to_string()),
                    ("it".to_string(), "rome".to_string()),
                    ("es".to_string(), "madrid".to_string()),
                ]
                .into(),
            },
            8.0,
            true,
        );
        let half_right = ResponsePayload::Pairs {
            pairs: [
                ("fr".to_string(), "paris".to_string()),
                ("de".to_string(), "rome".to_string()),
                ("it".to_string(), "berlin".to_string()),
                ("es".to_string(), "madrid".to_string()),
            ]
            .into(),
        };
        assert!((awarded(&score_question(&q, Some(&half_right))) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn hotspot_hit_within_radius() {
        let q = question(
            QuestionContent::Hotspot {
                prompt: "?".into(),
                image: "organs.png".into(),
                hotspots: vec![Hotspot {
                    x: 10.0,
                    y: 10.0,
                    radius: 5.0,
                }],
            },
            5.0,
            true,
        );
        let near = ResponsePayload::Clicks {
            clicks: vec![Point::new(12.0, 12.0)],
        };
        assert_eq!(awarded(&score_question(&q, Some(&near))), 5.0);

        let far = ResponsePayload::Clicks {
            clicks: vec![Point::new(20.0, 20.0)],
        };
        assert_eq!(awarded(&score_question(&q, Some(&far))), 0.0);
    }

    #[test]
    fn hotspot_stray_clicks_penalized() {
        let q = question(
            QuestionContent::Hotspot {
                prompt: "?".into(),
                image: "map.png".into(),
                hotspots: vec![
                    Hotspot { x: 0.0, y: 0.0, radius: 2.0 },
                    Hotspot { x: 50.0, y: 50.0, radius: 2.0 },
                ],
            },
            10.0,
            true,
        );
        // Both hotspots hit plus one stray: (2/2 - 0.5*1/2) * 10 = 7.5
        let clicks = ResponsePayload::Clicks {
            clicks: vec![
                Point::new(0.0, 0.0),
                Point::new(50.0, 50.0),
                Point::new(100.0, 100.0),
            ],
        };
        let score = score_question(&q, Some(&clicks));
        assert!((awarded(&score) - 7.5).abs() < 1e-12);
        assert!(!score.correct);
    }

    #[test]
    fn fill_blank_normalized_comparison() {
        let q = question(
            QuestionContent::FillBlank {
                prompt: "?".into(),
                accepted: vec!["Cell Wall".into(), "cell-wall".into()],
            },
            1.0,
            false,
        );
        let ok = ResponsePayload::Text {
            text: "  cell   WALL ".into(),
        };
        assert_eq!(awarded(&score_question(&q, Some(&ok))), 1.0);
        let no = ResponsePayload::Text {
            text: "membrane".into(),
        };
        assert_eq!(awarded(&score_question(&q, Some(&no))), 0.0);
    }

    #[test]
    fn audio_similarity_scales_points() {
        let q = question(
            QuestionContent::AudioResponse {
                prompt: "?".into(),
                reference: "the powerhouse of the cell".into(),
            },
            10.0,
            true,
        );
        let exact = ResponsePayload::Audio {
            clip: "clip-1".into(),
            transcript: Some("The Powerhouse of the Cell".into()),
        };
        assert!((awarded(&score_question(&q, Some(&exact))) - 10.0).abs() < 1e-9);

        let missing = ResponsePayload::Audio {
            clip: "clip-2".into(),
            transcript: None,
        };
        assert_eq!(awarded(&score_question(&q, Some(&missing))), 0.0);
    }

    #[test]
    fn math_factored_form_earns_full_points_via_sampling() {
        let q = question(
            QuestionContent::MathEquation {
                prompt: "Factor".into(),
                reference: "x^2 - 1".into(),
            },
            6.0,
            true,
        );
        let submitted = ResponsePayload::Text {
            text: "(x-1)*(x+1)".into(),
        };
        let score = score_question(&q, Some(&submitted));
        assert!((awarded(&score) - 6.0).abs() < 1e-12);
        assert!(score.correct);
    }

    #[test]
    fn math_partial_samples_scale_points() {
        let q = question(
            QuestionContent::MathEquation {
                prompt: "?".into(),
                reference: "x^2".into(),
            },
            5.0,
            true,
        );
        // 2x agrees with x^2 at x=0 and x=2 only: 2/5 of the points.
        let submitted = ResponsePayload::Text { text: "2*x".into() };
        assert!((awarded(&score_question(&q, Some(&submitted))) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn math_unparseable_submission_scores_zero() {
        let q = question(
            QuestionContent::MathEquation {
                prompt: "?".into(),
                reference: "x + 1".into(),
            },
            5.0,
            true,
        );
        let submitted = ResponsePayload::Text {
            text: "x +* 1".into(),
        };
        assert_eq!(awarded(&score_question(&q, Some(&submitted))), 0.0);
    }

    #[test]
    fn diagram_labels_weight_partial_matches() {
        let q = question(
            QuestionContent::DiagramLabel {
                prompt: "?".into(),
                labels: [
                    ("a".to_string(), "mitochondria".to_string()),
                    ("b".to_string(), "nucleus".to_string()),
                ]
                .into(),
            },
            4.0,
            true,
        );
        // One exact, one close-but-not-exact: (1 + 0.5) / 2 * 4 = 3.
        let submitted = ResponsePayload::Labels {
            labels: [
                ("a".to_string(), "Mitochondria".to_string()),
                ("b".to_string(), "nucleas".to_string()),
            ]
            .into(),
        };
        let score = score_question(&q, Some(&submitted));
        assert!((awarded(&score) - 3.0).abs() < 1e-12);
        assert!(!score.correct);
    }

    #[test]
    fn case_study_sums_sub_scores() {
        let q = question(
            QuestionContent::CaseStudy {
                prompt: "Scenario".into(),
                sub_questions: vec![
                    question(
                        QuestionContent::TrueFalse {
                            prompt: "?".into(),
                            correct: true,
                        },
                        2.0,
                        false,
                    ),
                    Question {
                        id: "sub-2".into(),
                        ..question(
                            QuestionContent::MultipleChoice {
                                prompt: "?".into(),
                                options: vec!["x".into(), "y".into()],
                                correct: "y".into(),
                            },
                            3.0,
                            false,
                        )
                    },
                ],
            },
            // Parent points are ignored for case studies.
            99.0,
            true,
        );
        let submitted = ResponsePayload::SubAnswers {
            answers: vec![
                SubmittedAnswer {
                    question_id: "q".into(),
                    response: ResponsePayload::Flag { value: true },
                    time_spent_secs: None,
                    confidence: None,
                },
                SubmittedAnswer {
                    question_id: "sub-2".into(),
                    response: ResponsePayload::Choice {
                        selected: "x".into(),
                    },
                    time_spent_secs: None,
                    confidence: None,
                },
            ],
        };
        let score = score_question(&q, Some(&submitted));
        assert!((awarded(&score) - 2.0).abs() < 1e-12);
        assert!(!score.correct);
    }

    #[test]
    fn peer_review_below_quorum_is_ungraded_not_zero() {
        let mut q = question(QuestionContent::PeerReview { prompt: "?".into() }, 10.0, true);
        q.scoring.peer_review = Some(PeerReviewPolicy {
            min_reviewers: 2,
            rubric: vec![RubricCriterion {
                id: "clarity".into(),
                weight: 1.0,
            }],
        });
        let one_review = ResponsePayload::Reviews {
            reviews: vec![PeerReviewEntry {
                reviewer_id: "r1".into(),
                scores: [("clarity".to_string(), 0.9)].into(),
            }],
        };
        let score = score_question(&q, Some(&one_review));
        assert_eq!(score.awarded, None);
    }

    #[test]
    fn peer_review_weighted_rubric_average() {
        let mut q = question(QuestionContent::PeerReview { prompt: "?".into() }, 10.0, true);
        q.scoring.peer_review = Some(PeerReviewPolicy {
            min_reviewers: 2,
            rubric: vec![
                RubricCriterion {
                    id: "clarity".into(),
                    weight: 3.0,
                },
                RubricCriterion {
                    id: "depth".into(),
                    weight: 1.0,
                },
            ],
        });
        let reviews = ResponsePayload::Reviews {
            reviews: vec![
                PeerReviewEntry {
                    reviewer_id: "r1".into(),
                    scores: [
                        ("clarity".to_string(), 1.0),
                        ("depth".to_string(), 0.5),
                    ]
                    .into(),
                },
                PeerReviewEntry {
                    reviewer_id: "r2".into(),
                    scores: [
                        ("clarity".to_string(), 0.5),
                        ("depth".to_string(), 0.5),
                    ]
                    .into(),
                },
            ],
        };
        // clarity mean 0.75 * 3 + depth mean 0.5 * 1 = 2.75; / 4 = 0.6875
        let score = score_question(&q, Some(&reviews));
        assert!((awarded(&score) - 6.875).abs() < 1e-12);
    }

    #[test]
    fn essay_is_always_ungraded() {
        let q = question(QuestionContent::Essay { prompt: "?".into() }, 20.0, false);
        let answered = ResponsePayload::Text {
            text: "my essay".into(),
        };
        assert_eq!(score_question(&q, Some(&answered)).awarded, None);
        assert_eq!(score_question(&q, None).awarded, None);
    }

    #[test]
    fn mismatched_payload_scores_zero() {
        let q = question(
            QuestionContent::TrueFalse {
                prompt: "?".into(),
                correct: true,
            },
            2.0,
            false,
        );
        let wrong_shape = ResponsePayload::Text { text: "yes".into() };
        let score = score_question(&q, Some(&wrong_shape));
        assert_eq!(score.awarded, Some(0.0));
    }

    #[test]
    fn grade_submission_aggregates_and_flags_pending() {
        let questions = vec![
            Question {
                id: "q1".into(),
                ..question(
                    QuestionContent::TrueFalse {
                        prompt: "?".into(),
                        correct: true,
                    },
                    5.0,
                    false,
                )
            },
            Question {
                id: "q2".into(),
                ..question(QuestionContent::Essay { prompt: "?".into() }, 5.0, false)
            },
        ];
        let answers = vec![SubmittedAnswer {
            question_id: "q1".into(),
            response: ResponsePayload::Flag { value: true },
            time_spent_secs: Some(30),
            confidence: Some(0.9),
        }];
        let outcome = grade_submission(&questions, &answers);
        assert!((outcome.total_awarded - 5.0).abs() < 1e-12);
        assert!((outcome.total_possible - 10.0).abs() < 1e-12);
        assert!((outcome.percent - 50.0).abs() < 1e-12);
        assert!(!outcome.fully_graded);
        assert_eq!(outcome.feedback.len(), 2);
        assert_eq!(outcome.feedback[1].points_awarded, None);
    }

    #[test]
    fn grade_submission_ignores_unknown_question_ids() {
        let questions = vec![Question {
            id: "q1".into(),
            ..question(
                QuestionContent::TrueFalse {
                    prompt: "?".into(),
                    correct: true,
                },
                5.0,
                false,
            )
        }];
        let answers = vec![
            SubmittedAnswer {
                question_id: "ghost".into(),
                response: ResponsePayload::Flag { value: true },
                time_spent_secs: None,
                confidence: None,
            },
            SubmittedAnswer {
                question_id: "q1".into(),
                response: ResponsePayload::Flag { value: true },
                time_spent_secs: None,
                confidence: None,
            },
        ];
        let outcome = grade_submission(&questions, &answers);
        assert_eq!(outcome.feedback.len(), 1);
        assert!((outcome.percent - 100.0).abs() < 1e-12);
    }
}
