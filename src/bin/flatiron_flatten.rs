//! flatiron-flatten: flatten nested JSON into flat rows
//!
//! Usage:
//!   # Read from file, output to stdout
//!   flatiron-flatten --schema schema.json data.json
//!
//!   # Read from stdin, output to stdout
//!   echo '{"a": {"b": [1, 2]}, "c": 3}' | flatiron-flatten --schema schema.json
//!
//!   # Process NDJSON, write rows to a file
//!   flatiron-flatten --schema schema.json --ndjson events.jsonl --output rows.jsonl
//!
//!   # Only transform documents in which a path exists
//!   flatiron-flatten --schema schema.json --filter-exists 'items[*]' data.json

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use flatiron::schema::{Exist, Filter};
use flatiron::{JsonFlattener, RowWriter, Schema};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "flatiron-flatten")]
#[command(about = "Flatten nested JSON into flat rows", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Schema config file (JSON)
    #[arg(long, short = 's')]
    schema: String,

    /// Process newline-delimited JSON (one JSON document per line)
    #[arg(long)]
    ndjson: bool,

    /// Treat a top-level JSON array as a single document instead of a
    /// stream of documents
    #[arg(long)]
    no_ignore_array: bool,

    /// Output file for rows (stdout if omitted)
    #[arg(long, short = 'o')]
    output: Option<String>,

    /// Only transform documents in which this path has at least one match
    #[arg(long, value_name = "PATH")]
    filter_exists: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let schema_json = std::fs::read_to_string(&args.schema)
        .with_context(|| format!("Failed to read schema file: {}", args.schema))?;
    let schema = Schema::from_json_str(&schema_json)?;
    let flattener = JsonFlattener::new(schema);

    let filter = args
        .filter_exists
        .as_deref()
        .map(Exist::new)
        .transpose()
        .context("Invalid --filter-exists path")?;

    let documents = read_documents(args.input.as_deref(), args.ndjson, args.no_ignore_array)?;

    if let Some(path) = args.output {
        let file = File::create(&path).with_context(|| format!("Failed to create: {path}"))?;
        let mut writer = RowWriter::new(file);
        process_documents(&documents, &flattener, filter.as_ref(), &mut writer)?;
        writer.flush()?;
    } else {
        let stdout = std::io::stdout();
        let mut writer = RowWriter::new(stdout.lock());
        process_documents(&documents, &flattener, filter.as_ref(), &mut writer)?;
        writer.flush()?;
    }

    Ok(())
}

/// Transform each document, writing its rows. A document that fails to
/// transform is reported and skipped so one bad record cannot abort the
/// whole batch.
fn process_documents<W: Write>(
    documents: &[Value],
    flattener: &JsonFlattener,
    filter: Option<&Exist>,
    writer: &mut RowWriter<W>,
) -> Result<()> {
    for document in documents {
        if let Some(filter) = filter {
            if !filter.matches(document) {
                continue;
            }
        }
        match flattener.transform(document) {
            Ok(rows) => writer.write_rows(&rows)?,
            Err(error) => warn!(%error, "skipping document"),
        }
    }
    Ok(())
}

/// Read documents using SIMD-accelerated JSON parsing when possible, with
/// a serde_json fallback for NDJSON or malformed input.
fn read_documents(
    input_file: Option<&str>,
    ndjson: bool,
    no_ignore_array: bool,
) -> Result<Vec<Value>> {
    let reader: Box<dyn Read> = if let Some(file_path) = input_file {
        Box::new(BufReader::new(
            File::open(file_path).with_context(|| format!("Failed to open: {file_path}"))?,
        ))
    } else {
        Box::new(std::io::stdin())
    };

    let mut content = Vec::new();
    let mut buf_reader = BufReader::new(reader);
    buf_reader
        .read_to_end(&mut content)
        .context("Failed to read input")?;

    if ndjson {
        return parse_lines(&content);
    }

    // Try SIMD parsing first (faster) - use OwnedValue to avoid borrow
    // issues. simd-json mutates its buffer, so keep the original around
    // for the fallback.
    let mut simd_buf = content.clone();
    match simd_json::to_owned_value(&mut simd_buf) {
        Ok(simd_json::OwnedValue::Array(items)) if !no_ignore_array => {
            // Top-level array: treat each element as a document
            let mut documents = Vec::with_capacity(items.len());
            for item in items {
                let json_str = simd_json::to_string(&item)?;
                documents.push(serde_json::from_str(&json_str)?);
            }
            Ok(documents)
        }
        Ok(value) => {
            let json_str = simd_json::to_string(&value)?;
            Ok(vec![serde_json::from_str(&json_str)?])
        }
        Err(_) => parse_lines(&content),
    }
}

fn parse_lines(content: &[u8]) -> Result<Vec<Value>> {
    let text = String::from_utf8_lossy(content);
    let mut documents = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).context("Failed to parse JSON line")?;
        documents.push(value);
    }
    Ok(documents)
}
