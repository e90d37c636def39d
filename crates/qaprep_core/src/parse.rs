//! Parser for plain-text Q&A files.
//!
//! The input format is one `Q:`-prefixed line followed by an `A:`-prefixed
//! line per pair. Prefixes are matched case-insensitively, blank and
//! unmarked lines are skipped, and a question with no answer before the next
//! question (or end of file) is dropped.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// One parsed pair. `line` is the 1-indexed line number of the question,
/// kept so validation reports can point back into the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPair {
    pub question: String,
    pub answer: String,
    pub line: usize,
}

fn strip_marker(line: &str, marker: char) -> Option<&str> {
    let mut chars = line.chars();
    let first = chars.next()?;
    if first.to_ascii_lowercase() != marker {
        return None;
    }
    let rest = chars.as_str().strip_prefix(':')?;
    Some(rest.trim())
}

pub fn parse_qa_text(input: &str) -> Vec<TextPair> {
    let mut pairs = Vec::new();
    let mut pending: Option<(String, usize)> = None;

    for (idx, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(question) = strip_marker(line, 'q') {
            // A repeated question re-arms the state; the earlier one had no
            // answer and is dropped.
            pending = Some((question.to_string(), idx + 1));
        } else if let Some(answer) = strip_marker(line, 'a') {
            if let Some((question, line_num)) = pending.take() {
                pairs.push(TextPair {
                    question,
                    answer: answer.to_string(),
                    line: line_num,
                });
            }
        }
    }

    pairs
}

pub fn parse_qa_file(path: &Path) -> Result<Vec<TextPair>> {
    let input =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(parse_qa_text(&input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_with_line_numbers() {
        let input = "Q: first question\nA: first answer\n\nQ: second question\nA: second answer\n";
        let pairs = parse_qa_text(input);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].question, "first question");
        assert_eq!(pairs[0].answer, "first answer");
        assert_eq!(pairs[0].line, 1);
        assert_eq!(pairs[1].line, 4);
    }

    #[test]
    fn prefix_match_is_case_insensitive() {
        let pairs = parse_qa_text("q: lower\na: case\nQ: upper\nA: case\n");
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].question, "lower");
        assert_eq!(pairs[1].question, "upper");
    }

    #[test]
    fn blank_and_unmarked_lines_between_pair_are_skipped() {
        let pairs = parse_qa_text("Q: question\n# a comment\n\nA: answer\n");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].answer, "answer");
    }

    #[test]
    fn question_without_answer_is_dropped() {
        let pairs = parse_qa_text("Q: orphan\nQ: kept\nA: yes\nQ: trailing orphan\n");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].question, "kept");
        assert_eq!(pairs[0].line, 2);
    }

    #[test]
    fn answer_without_question_is_ignored() {
        assert!(parse_qa_text("A: stray answer\n").is_empty());
    }
}
