//! Merging many JSON input files into one record list.
//!
//! Each file may hold either a single object or an array of objects. A file
//! that cannot be read or parsed is recorded and skipped; one bad batch file
//! never aborts a merge run.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub values: Vec<Value>,
    pub skipped_files: Vec<(PathBuf, String)>,
}

fn load_value(path: &Path) -> Result<Value> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let value =
        serde_json::from_reader(BufReader::new(file)).context("parse json payload")?;
    Ok(value)
}

pub fn merge_json_files(paths: &[PathBuf]) -> MergeOutcome {
    let mut out = MergeOutcome::default();

    for path in paths {
        match load_value(path) {
            Ok(Value::Array(items)) => out.values.extend(items),
            Ok(value @ Value::Object(_)) => out.values.push(value),
            Ok(_) => out
                .skipped_files
                .push((path.clone(), "payload is neither object nor array".to_string())),
            Err(err) => out.skipped_files.push((path.clone(), format!("{err:#}"))),
        }
    }

    out
}

/// Collect batch files from a directory by filename prefix/suffix, sorted by
/// name so batch ordering is stable (`variations_q1_styled.json`,
/// `variations_q2_styled.json`, ...).
pub fn collect_input_files(dir: &Path, prefix: &str, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("scan {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with(prefix) && name.ends_with(suffix) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn merge_extends_arrays_and_appends_objects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let array_path = dir.path().join("batch.json");
        let object_path = dir.path().join("single.json");
        fs::write(&array_path, r#"[{"q": 1}, {"q": 2}]"#).expect("write");
        fs::write(&object_path, r#"{"q": 3}"#).expect("write");

        let outcome = merge_json_files(&[array_path, object_path]);
        assert_eq!(outcome.values.len(), 3);
        assert!(outcome.skipped_files.is_empty());
    }

    #[test]
    fn merge_skips_unreadable_and_invalid_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bad_json = dir.path().join("bad.json");
        let scalar = dir.path().join("scalar.json");
        fs::write(&bad_json, "{not json").expect("write");
        fs::write(&scalar, "42").expect("write");
        let missing = dir.path().join("missing.json");

        let outcome = merge_json_files(&[bad_json, scalar, missing]);
        assert!(outcome.values.is_empty());
        assert_eq!(outcome.skipped_files.len(), 3);
    }

    #[test]
    fn collect_filters_and_sorts_by_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in [
            "variations_q2_styled.json",
            "variations_q1_styled.json",
            "variations_q1_raw.json",
            "other.json",
        ] {
            fs::write(dir.path().join(name), "[]").expect("write");
        }

        let files =
            collect_input_files(dir.path(), "variations_q", "_styled.json").expect("collect");
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["variations_q1_styled.json", "variations_q2_styled.json"]
        );
    }
}
