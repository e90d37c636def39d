//! The format converters, one per supported input shape.

use crate::model::{FormattedSample, MessagesRecord, QaPairRecord, QaRecord, RecordError};
use crate::parse::TextPair;
use crate::template;
use serde_json::Value;

/// Records skipped beyond this many are summarised as a single
/// "... and N more" line by the CLI.
pub const MAX_SKIP_WARNINGS: usize = 5;

/// Result of the clean conversion. `skipped` keeps the record index and the
/// reason so callers can report a bounded sample of them.
#[derive(Debug, Default)]
pub struct CleanConversion {
    pub samples: Vec<FormattedSample>,
    pub skipped: Vec<(usize, RecordError)>,
}

/// Pull a string out of a record under any of the accepted keys, coercing
/// scalar values and trimming whitespace. `None` when every key is absent,
/// null, or a composite value.
fn field(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match value.get(key) {
            Some(Value::String(s)) => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            Some(Value::Bool(b)) => return Some(b.to_string()),
            _ => {}
        }
    }
    None
}

fn clean_fields(value: &Value) -> Result<(String, String), RecordError> {
    if !value.is_object() {
        return Err(RecordError::NotAnObject);
    }

    let question = field(value, &["Q", "question"]).ok_or(RecordError::MissingQuestion)?;
    let answer = field(value, &["A", "answer"]).ok_or(RecordError::MissingAnswer)?;

    if question.is_empty() {
        return Err(RecordError::EmptyQuestion);
    }
    if answer.is_empty() {
        return Err(RecordError::EmptyAnswer);
    }
    Ok((question, answer))
}

/// Convert raw records into text-only samples without a system turn.
/// Records with a missing or empty side are skipped, never defaulted.
pub fn format_clean(values: &[Value]) -> CleanConversion {
    let mut out = CleanConversion::default();

    for (idx, value) in values.iter().enumerate() {
        match clean_fields(value) {
            Ok((question, answer)) => {
                let text = template::render(None, &question, &answer);
                out.samples.push(FormattedSample::text_only(text));
            }
            Err(err) => out.skipped.push((idx, err)),
        }
    }

    out
}

fn styled_sample(
    system_prompt: Option<&str>,
    question: &str,
    answer: &str,
) -> FormattedSample {
    FormattedSample {
        text: template::render(system_prompt, question, answer),
        question: Some(question.to_string()),
        answer: Some(answer.to_string()),
        metadata: None,
    }
}

/// Convert curated records into styled samples, expanding each question
/// variation into its own sample that reuses the base answer. Empty fields
/// pass through as empty turns, matching the permissive styled pipeline.
pub fn format_styled(records: &[QaRecord], system_prompt: Option<&str>) -> Vec<FormattedSample> {
    let mut out = Vec::with_capacity(records.len());

    for record in records {
        let question = record.question.trim();
        let answer = record.answer.trim();
        out.push(styled_sample(system_prompt, question, answer));

        for variation in &record.variations {
            out.push(styled_sample(system_prompt, variation.question.trim(), answer));
        }
    }

    out
}

/// Convert role/content conversation records: the first `user` message
/// becomes the question, the first `model` message the answer, metadata is
/// carried through (empty map when absent).
pub fn format_messages(
    records: &[MessagesRecord],
    system_prompt: Option<&str>,
) -> Vec<FormattedSample> {
    records
        .iter()
        .map(|record| {
            let question = record.first_content("user");
            let answer = record.first_content("model");
            FormattedSample {
                text: template::render(system_prompt, question, answer),
                question: Some(question.to_string()),
                answer: Some(answer.to_string()),
                metadata: Some(record.metadata.clone().unwrap_or_default()),
            }
        })
        .collect()
}

/// Re-key parsed text pairs into `{"Q": ..., "A": ...}` records.
pub fn pairs_to_records(pairs: &[TextPair]) -> Vec<QaPairRecord> {
    pairs
        .iter()
        .map(|pair| QaPairRecord {
            question: pair.question.clone(),
            answer: pair.answer.clone(),
        })
        .collect()
}
