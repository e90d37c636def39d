pub mod convert;
pub mod embed;
pub mod merge;
pub mod minilm_embed;
pub mod model;
pub mod parse;
pub mod report;
pub mod stats;
pub mod storage;
pub mod template;
pub mod validate;

pub use convert::{
    format_clean, format_messages, format_styled, pairs_to_records, CleanConversion,
    MAX_SKIP_WARNINGS,
};
pub use embed::{EmbeddingProvider, HashEmbeddingProvider, DEFAULT_EMBEDDING_DIM};
pub use merge::{collect_input_files, merge_json_files, MergeOutcome};
pub use minilm_embed::MiniLmEmbeddingProvider;
pub use model::{
    ChatMessage, FormattedSample, MessagesRecord, QaPairRecord, QaRecord, RecordError, Variation,
};
pub use parse::{parse_qa_file, parse_qa_text, TextPair};
pub use report::{render_console, render_detailed};
pub use stats::LengthStats;
pub use storage::{load_json_array, load_jsonl_values, save_json_pretty, save_jsonl, write_text};
pub use template::{extract_answer, render, TURN_END, TURN_START};
pub use validate::{cosine_similarity, validate_pairs, ValidationReport, DEFAULT_THRESHOLD};
