//! Text rendering of validation reports: a console summary and a detailed
//! per-pair file sorted by similarity ascending.

use crate::validate::{PairResult, ValidationReport};
use std::fmt::Write;

pub const PREVIEW_CHARS: usize = 100;
pub const MAX_LOW_DETAILS: usize = 10;
pub const MAX_IDENTICAL_DETAILS: usize = 5;

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{truncated}...")
    }
}

fn percent(count: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        count as f32 / total as f32 * 100.0
    }
}

pub fn render_console(report: &ValidationReport) -> String {
    let mut out = String::new();
    let rule = "=".repeat(80);
    let thin = "-".repeat(80);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Q-A PAIR SIMILARITY VALIDATION REPORT");
    let _ = writeln!(out, "{rule}");

    let _ = writeln!(out, "\nOverall:");
    let _ = writeln!(out, "  total pairs: {}", report.total);
    let _ = writeln!(out, "  mean similarity: {:.4}", report.mean_similarity);
    let _ = writeln!(out, "  min similarity:  {:.4}", report.min_similarity);
    let _ = writeln!(out, "  max similarity:  {:.4}", report.max_similarity);

    let below = report.below_threshold();
    let identical = report.identical();

    let _ = writeln!(out, "\nValidation:");
    let _ = writeln!(
        out,
        "  similarity > {:.2}: {}/{} ({:.1}%)",
        report.threshold,
        report.above_threshold,
        report.total,
        percent(report.above_threshold, report.total)
    );
    let _ = writeln!(
        out,
        "  similarity <= {:.2}: {}",
        report.threshold,
        below.len()
    );
    let _ = writeln!(out, "  identical pairs: {}", identical.len());

    let _ = writeln!(
        out,
        "\nPassed (similarity > {:.2} and not identical): {}/{} ({:.1}%)",
        report.threshold,
        report.passed,
        report.total,
        percent(report.passed, report.total)
    );

    if !below.is_empty() {
        let _ = writeln!(
            out,
            "\nPairs with similarity <= {:.2} ({}):",
            report.threshold,
            below.len()
        );
        let _ = writeln!(out, "{thin}");
        for (i, item) in below.iter().take(MAX_LOW_DETAILS).enumerate() {
            let _ = writeln!(
                out,
                "\n{}. line {} | similarity {:.4}",
                i + 1,
                item.line,
                item.similarity
            );
            let _ = writeln!(out, "   Q: {}", preview(&item.question));
            let _ = writeln!(out, "   A: {}", preview(&item.answer));
        }
        if below.len() > MAX_LOW_DETAILS {
            let _ = writeln!(out, "\n   ... and {} more", below.len() - MAX_LOW_DETAILS);
        }
    }

    if !identical.is_empty() {
        let _ = writeln!(out, "\nIdentical pairs ({}):", identical.len());
        let _ = writeln!(out, "{thin}");
        for (i, item) in identical.iter().take(MAX_IDENTICAL_DETAILS).enumerate() {
            let _ = writeln!(out, "\n{}. line {}", i + 1, item.line);
            let _ = writeln!(out, "   Q: {}", preview(&item.question));
            let _ = writeln!(out, "   A: {}", preview(&item.answer));
        }
        if identical.len() > MAX_IDENTICAL_DETAILS {
            let _ = writeln!(
                out,
                "\n   ... and {} more",
                identical.len() - MAX_IDENTICAL_DETAILS
            );
        }
    }

    let _ = writeln!(out, "\nSimilarity distribution:");
    for bucket in report.histogram() {
        let pct = percent(bucket.count, report.total);
        let bar = "#".repeat((pct / 2.0) as usize);
        let _ = writeln!(
            out,
            "  {:<24} {:4} ({:5.1}%) {}",
            bucket.label, bucket.count, pct, bar
        );
    }

    let _ = writeln!(out, "\n{rule}");
    out
}

fn write_pair(out: &mut String, item: &PairResult, with_similarity: bool) {
    let wide = "-".repeat(100);
    if with_similarity {
        let _ = writeln!(out, "line: {} | similarity: {:.4}", item.line, item.similarity);
    } else {
        let _ = writeln!(out, "line: {}", item.line);
    }
    let _ = writeln!(out, "Q: {}", item.question);
    let _ = writeln!(out, "A: {}", item.answer);
    let _ = writeln!(out, "{wide}");
}

pub fn render_detailed(report: &ValidationReport) -> String {
    let mut out = String::new();
    let wide = "=".repeat(100);
    let thin = "-".repeat(100);

    let _ = writeln!(out, "DETAILED Q-A SIMILARITY VALIDATION REPORT");
    let _ = writeln!(out, "generated at: {}", report.generated_at.to_rfc3339());
    let _ = writeln!(out, "threshold: {:.2}", report.threshold);
    let _ = writeln!(out, "{wide}\n");

    let below = report.below_threshold();
    if !below.is_empty() {
        let _ = writeln!(
            out,
            "PAIRS WITH SIMILARITY <= {:.2} ({})",
            report.threshold,
            below.len()
        );
        let _ = writeln!(out, "{thin}\n");
        for item in &below {
            write_pair(&mut out, item, true);
        }
    }

    let identical = report.identical();
    if !identical.is_empty() {
        let _ = writeln!(out, "\nIDENTICAL PAIRS ({})", identical.len());
        let _ = writeln!(out, "{thin}\n");
        for item in &identical {
            write_pair(&mut out, item, false);
        }
    }

    let _ = writeln!(out, "\nALL PAIRS (SORTED BY SIMILARITY)");
    let _ = writeln!(out, "{thin}\n");
    for item in report.sorted_by_similarity() {
        let status = if item.passes { "PASS" } else { "FAIL" };
        let _ = writeln!(
            out,
            "[{status}] line: {} | similarity: {:.4}",
            item.line, item.similarity
        );
        let _ = writeln!(out, "Q: {}", item.question);
        let _ = writeln!(out, "A: {}", item.answer);
        let _ = writeln!(out, "{thin}");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationReport;
    use chrono::Utc;

    fn result(line: usize, similarity: f32, identical: bool, threshold: f32) -> PairResult {
        PairResult {
            line,
            question: format!("question {line}"),
            answer: format!("answer {line}"),
            similarity,
            identical,
            passes: similarity > threshold && !identical,
        }
    }

    fn report() -> ValidationReport {
        let threshold = 0.85;
        let results = vec![
            result(1, 0.95, false, threshold),
            result(3, 0.40, false, threshold),
            result(5, 0.99, true, threshold),
        ];
        ValidationReport {
            generated_at: Utc::now(),
            threshold,
            total: results.len(),
            min_similarity: 0.40,
            max_similarity: 0.99,
            mean_similarity: 0.78,
            above_threshold: 2,
            passed: 1,
            results,
        }
    }

    #[test]
    fn console_report_carries_counts_and_sections() {
        let text = render_console(&report());
        assert!(text.contains("total pairs: 3"));
        assert!(text.contains("similarity > 0.85: 2/3 (66.7%)"));
        assert!(text.contains("Passed (similarity > 0.85 and not identical): 1/3"));
        assert!(text.contains("Pairs with similarity <= 0.85 (1):"));
        assert!(text.contains("Identical pairs (1):"));
        assert!(text.contains("Similarity distribution:"));
    }

    #[test]
    fn console_report_truncates_long_previews() {
        let mut r = report();
        r.results[0].question = "x".repeat(150);
        let text = render_console(&r);
        assert!(!text.contains(&"x".repeat(150)));
    }

    #[test]
    fn detailed_report_lists_all_pairs_ascending() {
        let text = render_detailed(&report());
        assert!(text.contains("ALL PAIRS (SORTED BY SIMILARITY)"));
        let low = text.find("similarity: 0.4000").expect("low pair");
        let high = text.rfind("similarity: 0.9900").expect("high pair");
        assert!(low < high);
        assert!(text.contains("[PASS] line: 1"));
        assert!(text.contains("[FAIL] line: 3"));
        assert!(text.contains("[FAIL] line: 5"));
    }

    #[test]
    fn empty_report_renders_without_panicking() {
        let empty = ValidationReport {
            generated_at: Utc::now(),
            threshold: 0.85,
            total: 0,
            min_similarity: 0.0,
            max_similarity: 0.0,
            mean_similarity: 0.0,
            above_threshold: 0,
            passed: 0,
            results: Vec::new(),
        };
        let text = render_console(&empty);
        assert!(text.contains("total pairs: 0"));
        assert!(text.contains("0/0 (0.0%)"));
    }
}
