//! Text similarity for free-text answer scoring.
//!
//! Audio-response and diagram-label scorers compare learner text against a
//! reference using Jaro–Winkler over normalized (lower-cased, whitespace
//! collapsed) text.

/// Lower-case and collapse runs of whitespace to single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Jaro similarity between two strings, in 0.0..=1.0.
pub fn jaro(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Characters count as matching when within this window of each other.
    let window = (a.len().max(b.len()) / 2).saturating_sub(1);

    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, ca) in a.iter().enumerate() {
        let lo = i.saturating_sub(window);
        let hi = (i + window + 1).min(b.len());
        for j in lo..hi {
            if !b_matched[j] && *ca == b[j] {
                a_matched[i] = true;
                b_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }

    if matches == 0 {
        return 0.0;
    }

    // Transpositions: matched characters out of order, counted in halves.
    let mut transpositions = 0usize;
    let mut j = 0usize;
    for (i, matched) in a_matched.iter().enumerate() {
        if !matched {
            continue;
        }
        while !b_matched[j] {
            j += 1;
        }
        if a[i] != b[j] {
            transpositions += 1;
        }
        j += 1;
    }
    let transpositions = transpositions as f64 / 2.0;

    let m = matches as f64;
    (m / a.len() as f64 + m / b.len() as f64 + (m - transpositions) / m) / 3.0
}

/// Jaro–Winkler similarity: Jaro boosted by a shared prefix of up to four
/// characters with the standard 0.1 scaling factor.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    let base = jaro(a, b);

    let prefix = a
        .chars()
        .zip(b.chars())
        .take(4)
        .take_while(|(x, y)| x == y)
        .count();

    (base + prefix as f64 * 0.1 * (1.0 - base)).min(1.0)
}

/// Similarity between two free-text answers after normalization.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    jaro_winkler(&normalize(a), &normalize(b))
}
