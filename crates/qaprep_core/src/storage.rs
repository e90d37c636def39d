use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Load a JSON file whose payload must be an array of records.
pub fn load_json_array(path: &Path) -> Result<Vec<Value>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parse {}", path.display()))?;

    match value {
        Value::Array(items) => Ok(items),
        _ => anyhow::bail!("{}: expected a JSON array of records", path.display()),
    }
}

/// Write pretty-printed JSON (2-space indent), the shape the converters emit.
pub fn save_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).context("serialize json")?;
    writer.write_all(b"\n").context("write trailing newline")?;
    writer.flush().context("flush output")
}

/// Write one compact JSON object per line.
pub fn save_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for item in items {
        let line = serde_json::to_string(item).context("serialize jsonl record")?;
        writer.write_all(line.as_bytes()).context("write record line")?;
        writer.write_all(b"\n").context("write newline")?;
    }

    writer.flush().context("flush output")
}

/// Load a JSON Lines file, one value per non-blank line.
pub fn load_jsonl_values(path: &Path) -> Result<Vec<Value>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut values = Vec::new();

    for line in reader.lines() {
        let line = line.with_context(|| format!("read line from {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .with_context(|| format!("parse jsonl record in {}", path.display()))?;
        values.push(value);
    }

    Ok(values)
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("write {}", path.display()))
}
