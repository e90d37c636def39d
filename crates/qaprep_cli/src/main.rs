use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use qaprep_core::{
    collect_input_files, format_clean, format_messages, format_styled, load_json_array,
    merge_json_files, pairs_to_records, parse_qa_file, render_console, render_detailed,
    save_json_pretty, save_jsonl, validate_pairs, write_text, EmbeddingProvider,
    FormattedSample, HashEmbeddingProvider, LengthStats, MessagesRecord,
    MiniLmEmbeddingProvider, QaRecord, DEFAULT_EMBEDDING_DIM, DEFAULT_THRESHOLD,
    MAX_SKIP_WARNINGS,
};
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "qaprep")]
#[command(about = "Q&A dataset preparation for chat fine-tuning")]
struct Cli {
    /// Path to the sentence-encoder weights (.safetensors). When provided
    /// with --tokenizer-path, validation uses neural embeddings.
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    /// Path to the tokenizer.json file. Required when --model-path is set.
    #[arg(long, global = true)]
    tokenizer_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct SystemPromptArgs {
    /// System prompt to prepend as a system turn.
    #[arg(long, conflicts_with = "system_prompt_file")]
    system_prompt: Option<String>,

    /// Read the system prompt from a file instead.
    #[arg(long)]
    system_prompt_file: Option<PathBuf>,
}

impl SystemPromptArgs {
    fn resolve(&self) -> Result<Option<String>> {
        if let Some(prompt) = &self.system_prompt {
            return Ok(Some(prompt.clone()));
        }
        if let Some(path) = &self.system_prompt_file {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read system prompt {}", path.display()))?;
            return Ok(Some(text.trim_end().to_string()));
        }
        Ok(None)
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Format Q&A records into text-only samples without a system turn.
    Format {
        /// Input JSON files, each an array of Q&A records.
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Suffix appended to each input file stem for its output file.
        #[arg(long, default_value = "_formatted_clean")]
        suffix: String,
    },
    /// Merge styled variation batches and format them with a system turn.
    FormatStyled {
        #[arg(long, default_value = ".")]
        input_dir: PathBuf,
        /// Batch filename prefix.
        #[arg(long, default_value = "variations_q")]
        prefix: String,
        /// Batch filename suffix.
        #[arg(long, default_value = "_styled.json")]
        suffix: String,
        #[arg(long, default_value = "dataset_gemma_fix.json")]
        output: PathBuf,
        #[command(flatten)]
        prompt: SystemPromptArgs,
    },
    /// Format role/content conversation records.
    FormatMessages {
        #[arg(long, default_value = "dataset.json")]
        input: PathBuf,
        #[arg(long, default_value = "dataset_gemma.json")]
        output: PathBuf,
        #[command(flatten)]
        prompt: SystemPromptArgs,
    },
    /// Parse a Q:/A: text file into a JSON array of records.
    ParseTxt {
        #[arg(long, default_value = "dataset_v2.txt")]
        input: PathBuf,
        #[arg(long, default_value = "dataset_v2.json")]
        output: PathBuf,
    },
    /// Merge JSON record files into one JSON Lines file.
    ExportJsonl {
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        #[arg(long)]
        output: PathBuf,
    },
    /// Validate question/answer semantic similarity.
    Validate {
        #[arg(long, default_value = "data_v3.txt")]
        input: PathBuf,
        /// Where to write the detailed per-pair report.
        #[arg(long, default_value = "similarity_report_detailed.txt")]
        report: PathBuf,
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f32,
    },
}

/// Verify the safetensors header belongs to a BERT-style encoder before
/// handing it to the loader, so a wrong model file fails with a clear
/// message instead of a missing-tensor error.
fn check_safetensors_header(path: &Path) -> Result<()> {
    let mut file =
        File::open(path).with_context(|| format!("open safetensors: {}", path.display()))?;

    // First 8 bytes are a little-endian u64 giving the header size.
    let mut size_buf = [0u8; 8];
    file.read_exact(&mut size_buf)
        .context("read safetensors header size")?;
    let header_size = u64::from_le_bytes(size_buf) as usize;

    // Cap at 10 MB to avoid reading the whole file.
    let read_size = header_size.min(10 * 1024 * 1024);
    let mut header_buf = vec![0u8; read_size];
    file.read_exact(&mut header_buf)
        .context("read safetensors header JSON")?;

    let header = String::from_utf8_lossy(&header_buf);
    if header.contains("encoder.layer.0.attention.self.query.weight") {
        Ok(())
    } else {
        anyhow::bail!(
            "{}: not a BERT-style encoder (no encoder.layer.* tensors in header)",
            path.display()
        )
    }
}

fn make_embedder(cli: &Cli) -> Result<Box<dyn EmbeddingProvider>> {
    match (&cli.model_path, &cli.tokenizer_path) {
        (Some(model), Some(tokenizer)) => {
            check_safetensors_header(model)?;
            eprintln!("Loading model from {} ...", model.display());
            let provider = MiniLmEmbeddingProvider::load(model, tokenizer)?;
            eprintln!("Model loaded.");
            Ok(Box::new(provider))
        }
        (None, None) => Ok(Box::new(HashEmbeddingProvider::new(DEFAULT_EMBEDDING_DIM))),
        _ => anyhow::bail!("--model-path and --tokenizer-path must both be provided"),
    }
}

fn model_name(cli: &Cli) -> String {
    cli.model_path
        .as_ref()
        .map(|p| {
            p.file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string())
        })
        .unwrap_or_else(|| "hash".to_string())
}

fn print_skip_warnings(skipped: &[(usize, qaprep_core::RecordError)]) {
    for (idx, err) in skipped.iter().take(MAX_SKIP_WARNINGS) {
        eprintln!("warning: skipping sample #{idx}: {err}");
    }
    if skipped.len() > MAX_SKIP_WARNINGS {
        eprintln!(
            "warning: ... and {} more skipped samples",
            skipped.len() - MAX_SKIP_WARNINGS
        );
    }
}

fn print_length_stats(stats: &LengthStats) {
    println!("response length:");
    println!(
        "  too short (<30 tokens):  {:4} ({:.1}%)",
        stats.too_short,
        stats.share(stats.too_short) * 100.0
    );
    println!(
        "  optimal (30-200 tokens): {:4} ({:.1}%)",
        stats.optimal,
        stats.share(stats.optimal) * 100.0
    );
    println!(
        "  too long (>200 tokens):  {:4} ({:.1}%)",
        stats.too_long,
        stats.share(stats.too_long) * 100.0
    );

    if stats.short_share() > qaprep_core::stats::SHORT_SHARE_WARNING {
        eprintln!(
            "warning: {:.1}% of responses are under 30 tokens; consider enriching answers",
            stats.short_share() * 100.0
        );
    }
}

fn print_sample(samples: &[FormattedSample]) {
    if let Some(first) = samples.first() {
        println!("sample output:");
        for line in first.text.lines() {
            println!("  {line}");
        }
    }
}

fn derived_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}{suffix}.json"))
}

fn run_format(inputs: &[PathBuf], suffix: &str) -> Result<()> {
    let mut processed = 0usize;

    for input in inputs {
        if !input.exists() {
            eprintln!("warning: skipping {} (file not found)", input.display());
            continue;
        }

        let values = match load_json_array(input) {
            Ok(values) => values,
            Err(err) => {
                eprintln!("warning: skipping {}: {err:#}", input.display());
                continue;
            }
        };

        let conversion = format_clean(&values);
        print_skip_warnings(&conversion.skipped);

        if conversion.samples.is_empty() {
            eprintln!(
                "warning: {}: no samples formatted, expected records like {{\"Q\": ..., \"A\": ...}}",
                input.display()
            );
            continue;
        }

        let output = derived_output(input, suffix);
        save_json_pretty(&output, &conversion.samples)?;
        processed += 1;

        println!(
            "file={} loaded={} formatted={} skipped={} output={}",
            input.display(),
            values.len(),
            conversion.samples.len(),
            conversion.skipped.len(),
            output.display()
        );
        print_length_stats(&LengthStats::from_samples(&conversion.samples));
        print_sample(&conversion.samples);
    }

    if processed == 0 {
        println!("no files processed");
    }
    Ok(())
}

fn values_to_records<T>(values: Vec<Value>, what: &str) -> Vec<T>
where
    T: serde::de::DeserializeOwned,
{
    let mut records = Vec::with_capacity(values.len());
    for (idx, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(record) => records.push(record),
            Err(err) => eprintln!("warning: skipping {what} #{idx}: {err}"),
        }
    }
    records
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Format { input, suffix } => run_format(input, suffix)?,
        Commands::FormatStyled {
            input_dir,
            prefix,
            suffix,
            output,
            prompt,
        } => {
            let system_prompt = prompt.resolve()?;
            let files = collect_input_files(input_dir, prefix, suffix)?;
            println!("found {} batch files", files.len());

            let outcome = merge_json_files(&files);
            for (path, reason) in &outcome.skipped_files {
                eprintln!("warning: skipping {}: {reason}", path.display());
            }
            println!("merged {} records", outcome.values.len());

            let records: Vec<QaRecord> = values_to_records(outcome.values, "record");
            let samples = format_styled(&records, system_prompt.as_deref());
            save_json_pretty(output, &samples)?;

            println!(
                "formatted={} output={}",
                samples.len(),
                output.display()
            );
        }
        Commands::FormatMessages {
            input,
            output,
            prompt,
        } => {
            let system_prompt = prompt.resolve()?;
            let values = load_json_array(input)?;
            let records: Vec<MessagesRecord> = values_to_records(values, "record");
            let samples = format_messages(&records, system_prompt.as_deref());
            save_json_pretty(output, &samples)?;

            println!(
                "file={} formatted={} output={}",
                input.display(),
                samples.len(),
                output.display()
            );
        }
        Commands::ParseTxt { input, output } => {
            let pairs = parse_qa_file(input)?;
            let records = pairs_to_records(&pairs);
            save_json_pretty(output, &records)?;

            println!(
                "file={} pairs={} output={}",
                input.display(),
                records.len(),
                output.display()
            );
        }
        Commands::ExportJsonl { input, output } => {
            let outcome = merge_json_files(input);
            for (path, reason) in &outcome.skipped_files {
                eprintln!("warning: skipping {}: {reason}", path.display());
            }
            save_jsonl(output, &outcome.values)?;

            println!(
                "files={} records={} output={}",
                input.len() - outcome.skipped_files.len(),
                outcome.values.len(),
                output.display()
            );
        }
        Commands::Validate {
            input,
            report,
            threshold,
        } => {
            let embedder = make_embedder(&cli)?;
            let pairs = parse_qa_file(input)?;
            println!("file={} pairs={}", input.display(), pairs.len());

            let result = validate_pairs(&embedder, &pairs, *threshold)?;
            print!("{}", render_console(&result));
            write_text(report, &render_detailed(&result))?;

            let run_id = format!("validate-{}", chrono::Utc::now().timestamp_millis());
            println!(
                "run_id={} model={} total={} passed={} pass_rate={:.4} report={}",
                run_id,
                model_name(&cli),
                result.total,
                result.passed,
                if result.total == 0 {
                    0.0
                } else {
                    result.passed as f32 / result.total as f32
                },
                report.display()
            );
        }
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
