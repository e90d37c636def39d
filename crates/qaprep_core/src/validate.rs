//! Semantic similarity validation of Q&A pairs.
//!
//! A pair passes when its question/answer cosine similarity is strictly above
//! the threshold and the two sides are not the same string after
//! case-insensitive trimming.

use crate::embed::EmbeddingProvider;
use crate::parse::TextPair;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_THRESHOLD: f32 = 0.85;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, na, nb) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(d, aa, bb), (x, y)| {
            (d + (x * y), aa + (x * x), bb + (y * y))
        });

    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairResult {
    pub line: usize,
    pub question: String,
    pub answer: String,
    pub similarity: f32,
    pub identical: bool,
    pub passes: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub generated_at: DateTime<Utc>,
    pub threshold: f32,
    pub total: usize,
    pub min_similarity: f32,
    pub max_similarity: f32,
    pub mean_similarity: f32,
    pub above_threshold: usize,
    pub passed: usize,
    pub results: Vec<PairResult>,
}

#[derive(Debug, Clone, Copy)]
pub struct HistogramBucket {
    pub label: &'static str,
    pub lo: f32,
    pub hi: f32,
    pub count: usize,
}

const HISTOGRAM_RANGES: [(&str, f32, f32); 5] = [
    ("very low  (< 0.50)", 0.0, 0.5),
    ("low       (0.50-0.70)", 0.5, 0.7),
    ("medium    (0.70-0.85)", 0.7, 0.85),
    ("high      (0.85-0.95)", 0.85, 0.95),
    ("very high (>= 0.95)", 0.95, 1.01),
];

impl ValidationReport {
    pub fn below_threshold(&self) -> Vec<&PairResult> {
        self.results
            .iter()
            .filter(|r| r.similarity <= self.threshold)
            .collect()
    }

    pub fn identical(&self) -> Vec<&PairResult> {
        self.results.iter().filter(|r| r.identical).collect()
    }

    pub fn sorted_by_similarity(&self) -> Vec<&PairResult> {
        let mut sorted: Vec<&PairResult> = self.results.iter().collect();
        sorted.sort_by(|a, b| a.similarity.total_cmp(&b.similarity));
        sorted
    }

    pub fn histogram(&self) -> Vec<HistogramBucket> {
        HISTOGRAM_RANGES
            .iter()
            .map(|&(label, lo, hi)| HistogramBucket {
                label,
                lo,
                hi,
                count: self
                    .results
                    .iter()
                    .filter(|r| r.similarity >= lo && r.similarity < hi)
                    .count(),
            })
            .collect()
    }
}

fn is_identical(question: &str, answer: &str) -> bool {
    question.trim().to_lowercase() == answer.trim().to_lowercase()
}

/// Embed both sides of every pair (one batch call per side) and score them.
pub fn validate_pairs<E>(
    embedder: &E,
    pairs: &[TextPair],
    threshold: f32,
) -> Result<ValidationReport>
where
    E: EmbeddingProvider,
{
    let questions: Vec<String> = pairs.iter().map(|p| p.question.clone()).collect();
    let answers: Vec<String> = pairs.iter().map(|p| p.answer.clone()).collect();

    let question_embeddings = embedder.embed_batch(&questions)?;
    let answer_embeddings = embedder.embed_batch(&answers)?;

    let mut results = Vec::with_capacity(pairs.len());
    for ((pair, q_emb), a_emb) in pairs
        .iter()
        .zip(&question_embeddings)
        .zip(&answer_embeddings)
    {
        let similarity = cosine_similarity(q_emb, a_emb);
        let identical = is_identical(&pair.question, &pair.answer);
        results.push(PairResult {
            line: pair.line,
            question: pair.question.clone(),
            answer: pair.answer.clone(),
            similarity,
            identical,
            passes: similarity > threshold && !identical,
        });
    }

    let total = results.len();
    let (min, max, sum) = results.iter().fold(
        (f32::INFINITY, f32::NEG_INFINITY, 0.0f32),
        |(lo, hi, sum), r| (lo.min(r.similarity), hi.max(r.similarity), sum + r.similarity),
    );

    Ok(ValidationReport {
        generated_at: Utc::now(),
        threshold,
        total,
        min_similarity: if total == 0 { 0.0 } else { min },
        max_similarity: if total == 0 { 0.0 } else { max },
        mean_similarity: if total == 0 { 0.0 } else { sum / total as f32 },
        above_threshold: results.iter().filter(|r| r.similarity > threshold).count(),
        passed: results.iter().filter(|r| r.passes).count(),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Maps texts to fixed vectors so pair similarities are exact.
    struct FixedProvider;

    impl EmbeddingProvider for FixedProvider {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(match text {
                "east" => vec![1.0, 0.0],
                "north" => vec![0.0, 1.0],
                "northeast" => vec![1.0, 1.0],
                other => vec![other.len() as f32, 1.0],
            })
        }
    }

    fn pair(q: &str, a: &str, line: usize) -> TextPair {
        TextPair {
            question: q.to_string(),
            answer: a.to_string(),
            line,
        }
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn cosine_of_parallel_and_orthogonal_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn passed_count_matches_threshold_and_identity_rule() {
        let pairs = vec![
            pair("east", "east", 1),       // sim 1.0 but identical -> fail
            pair("east", "north", 3),      // sim 0.0 -> fail
            pair("east", "northeast", 5),  // sim ~0.707 -> pass at 0.5
        ];
        let report = validate_pairs(&FixedProvider, &pairs, 0.5).expect("validate");

        assert_eq!(report.total, 3);
        assert_eq!(report.passed, 1);
        assert_eq!(report.above_threshold, 2);
        assert_eq!(report.identical().len(), 1);
        assert_eq!(report.below_threshold().len(), 1);
        assert!(report.results[0].identical);
        assert!(!report.results[0].passes);
        assert!(report.results[2].passes);

        // Property: passed == pairs with sim > threshold and not identical.
        let expected = report
            .results
            .iter()
            .filter(|r| r.similarity > report.threshold && !r.identical)
            .count();
        assert_eq!(report.passed, expected);
    }

    #[test]
    fn identity_check_ignores_case_and_whitespace() {
        let pairs = vec![pair("  East ", "east", 1)];
        let report = validate_pairs(&FixedProvider, &pairs, 0.5).expect("validate");
        assert!(report.results[0].identical);
    }

    #[test]
    fn threshold_is_strict() {
        // Orthogonal vectors give an exact 0.0; a pair at the threshold fails.
        let pairs = vec![pair("east", "north", 1)];
        let report = validate_pairs(&FixedProvider, &pairs, 0.0).expect("validate");
        assert_eq!(report.passed, 0);
        assert_eq!(report.above_threshold, 0);
    }

    #[test]
    fn aggregate_stats_over_known_similarities() {
        let pairs = vec![
            pair("east", "east", 1),      // 1.0
            pair("east", "north", 2),     // 0.0
            pair("east", "northeast", 3), // ~0.7071
        ];
        let report = validate_pairs(&FixedProvider, &pairs, DEFAULT_THRESHOLD).expect("validate");
        assert!((report.min_similarity - 0.0).abs() < 1e-6);
        assert!((report.max_similarity - 1.0).abs() < 1e-6);
        assert!((report.mean_similarity - (1.0 + 0.0 + 0.7071068) / 3.0).abs() < 1e-4);

        let hist = report.histogram();
        assert_eq!(hist.len(), 5);
        assert_eq!(hist[0].count, 1); // 0.0
        assert_eq!(hist[2].count, 1); // 0.7071
        assert_eq!(hist[4].count, 1); // 1.0
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let report = validate_pairs(&FixedProvider, &[], DEFAULT_THRESHOLD).expect("validate");
        assert_eq!(report.total, 0);
        assert_eq!(report.passed, 0);
        assert_eq!(report.mean_similarity, 0.0);
        assert_eq!(report.min_similarity, 0.0);
    }

    #[test]
    fn sorted_by_similarity_is_ascending() {
        let pairs = vec![
            pair("east", "east", 1),
            pair("east", "north", 2),
            pair("east", "northeast", 3),
        ];
        let report = validate_pairs(&FixedProvider, &pairs, DEFAULT_THRESHOLD).expect("validate");
        let sorted = report.sorted_by_similarity();
        assert!(sorted.windows(2).all(|w| w[0].similarity <= w[1].similarity));
        assert_eq!(sorted[0].line, 2);
    }
}
