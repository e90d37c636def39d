use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a raw record was rejected by a converter. Converters classify and skip
/// rather than abort; the CLI prints a bounded number of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("no question field (expected 'Q' or 'question')")]
    MissingQuestion,
    #[error("no answer field (expected 'A' or 'answer')")]
    MissingAnswer,
    #[error("empty question")]
    EmptyQuestion,
    #[error("empty answer")]
    EmptyAnswer,
    #[error("record is not a JSON object")]
    NotAnObject,
}

/// A curated Q&A record, possibly carrying alternate phrasings of the
/// question. Unknown fields are ignored so files with extra annotation keys
/// still load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaRecord {
    #[serde(default, alias = "Q")]
    pub question: String,
    #[serde(default, alias = "A")]
    pub answer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<Variation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Variation {
    #[serde(default, alias = "Q")]
    pub question: String,
}

/// One chat-turn-templated training sample. The clean converter emits only
/// `text`; the styled converters echo the source fields next to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedSample {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl FormattedSample {
    pub fn text_only(text: String) -> Self {
        Self {
            text,
            question: None,
            answer: None,
            metadata: None,
        }
    }
}

/// Role/content conversation shape, one message per turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesRecord {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl MessagesRecord {
    /// Content of the first message with the given role, empty when absent.
    pub fn first_content(&self, role: &str) -> &str {
        self.messages
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Output shape of the text parser export: `{"Q": ..., "A": ...}` records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaPairRecord {
    #[serde(rename = "Q")]
    pub question: String,
    #[serde(rename = "A")]
    pub answer: String,
}
