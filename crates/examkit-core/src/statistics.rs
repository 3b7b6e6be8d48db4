//! Attempt population statistics and the discrimination index.
//!
//! Pure functions over finished attempts. Empty input always yields a
//! zeroed statistics object, never a division by zero.

use serde::{Deserialize, Serialize};

use crate::model::QuizAttempt;

/// Number of 20-point-wide score distribution buckets.
pub const DISTRIBUTION_BUCKETS: usize = 5;

/// Share of attempts forming each reference group for the discrimination
/// index (top and bottom 27%, the conventional psychometric cut).
const DISCRIMINATION_GROUP_SHARE: f64 = 0.27;

/// Aggregate statistics for one quiz, derived from finished attempts.
/// A value object: computed on demand, written into `Quiz::stats`, never
/// persisted as an entity of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptStatistics {
    pub total_attempts: u32,
    /// Mean score on the 0–100 scale.
    pub average_score: f64,
    /// Percentage of attempts that passed.
    pub pass_rate: f64,
    /// Mean attempt duration in seconds.
    pub average_time_secs: f64,
    /// Counts per bucket: 0–20, 21–40, 41–60, 61–80, 81–100.
    pub score_distribution: [u32; DISTRIBUTION_BUCKETS],
}

/// Bucket index for a score on the 0–100 scale.
pub fn score_bucket(score: f64) -> usize {
    if score <= 20.0 {
        0
    } else if score <= 40.0 {
        1
    } else if score <= 60.0 {
        2
    } else if score <= 80.0 {
        3
    } else {
        4
    }
}

/// Compute statistics over finished attempts for one quiz.
///
/// Attempts without a score (still in progress, or passed in by mistake)
/// count toward totals but contribute zero score.
pub fn compute_attempt_statistics(attempts: &[QuizAttempt]) -> AttemptStatistics {
    if attempts.is_empty() {
        return AttemptStatistics::default();
    }

    let n = attempts.len() as f64;
    let mut score_sum = 0.0;
    let mut passed = 0u32;
    let mut time_sum = 0.0;
    let mut distribution = [0u32; DISTRIBUTION_BUCKETS];

    for attempt in attempts {
        let score = attempt.score.unwrap_or(0.0);
        score_sum += score;
        distribution[score_bucket(score)] += 1;
        if attempt.passed.unwrap_or(false) {
            passed += 1;
        }
        if let Some(duration) = attempt.duration() {
            time_sum += duration.num_milliseconds() as f64 / 1000.0;
        }
    }

    AttemptStatistics {
        total_attempts: attempts.len() as u32,
        average_score: score_sum / n,
        pass_rate: passed as f64 / n * 100.0,
        average_time_secs: time_sum / n,
        score_distribution: distribution,
    }
}

/// Discrimination index for one question: how well it separates high and
/// low scorers.
///
/// Attempts are sorted by total score descending; the top and bottom 27%
/// (minimum group size 1) form the reference groups, and the result is
/// `(correct_in_top - correct_in_bottom) / group_size`, in [-1, 1].
///
/// With fewer than two attempts the value is statistically meaningless
/// and should be treated as advisory only.
pub fn discrimination_index(attempts: &[QuizAttempt], question_id: &str) -> f64 {
    if attempts.is_empty() {
        return 0.0;
    }

    let mut sorted: Vec<&QuizAttempt> = attempts.iter().collect();
    sorted.sort_by(|a, b| {
        let sa = a.score.unwrap_or(0.0);
        let sb = b.score.unwrap_or(0.0);
        sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
    });

    let group = ((sorted.len() as f64 * DISCRIMINATION_GROUP_SHARE).floor() as usize).max(1);

    let answered_correctly = |attempt: &QuizAttempt| -> bool {
        attempt
            .feedback
            .iter()
            .any(|f| f.question_id == question_id && f.correct)
    };

    let correct_top = sorted[..group]
        .iter()
        .filter(|a| answered_correctly(a))
        .count() as f64;
    let correct_bottom = sorted[sorted.len() - group..]
        .iter()
        .filter(|a| answered_correctly(a))
        .count() as f64;

    (correct_top - correct_bottom) / group as f64
}
