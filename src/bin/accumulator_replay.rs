//! Accumulator Replay Tool
//!
//! Feeds recorded metric batches through a last-value accumulator and prints
//! the snapshot an exporter would serve.
//!
//! Usage:
//!   accumulator-replay [--config <file.toml>] <batches.jsonl>...
//!
//! Each input file holds one JSON-encoded `ResourceMetrics` batch per line.
//! Files are replayed concurrently against a single accumulator, the way
//! independent scrape pipelines would feed it.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use metrics_accumulator::{Accumulator, AccumulatorConfig, LastValueAccumulator, ResourceMetrics};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn print_usage() {
    eprintln!("Usage: accumulator-replay [--config <file.toml>] <batches.jsonl>...");
}

/// Replay one JSON-lines file, returning the number of stored datapoints
fn replay_file(accumulator: &LastValueAccumulator, path: &Path) -> Result<usize, BoxError> {
    let reader = BufReader::new(File::open(path)?);
    let mut processed = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let batch: ResourceMetrics = serde_json::from_str(&line)
            .map_err(|e| format!("{}:{}: {}", path.display(), idx + 1, e))?;
        let stored = accumulator.accumulate(&batch);
        debug!(
            "{}:{}: stored {} of {} datapoints",
            path.display(),
            idx + 1,
            stored,
            batch.data_point_count()
        );
        processed += stored;
    }

    Ok(processed)
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut config = AccumulatorConfig::from_env();
    let mut inputs: Vec<PathBuf> = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config requires a path")?;
                config = AccumulatorConfig::load(&path)?;
            }
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            _ => inputs.push(PathBuf::from(arg)),
        }
    }

    if inputs.is_empty() {
        print_usage();
        return Err("no batch files given".into());
    }

    info!("Metric expiration: {:?}", config.metric_expiration);
    let accumulator = Arc::new(LastValueAccumulator::new(&config));

    let handles: Vec<_> = inputs
        .into_iter()
        .map(|path| {
            let accumulator = Arc::clone(&accumulator);
            tokio::task::spawn_blocking(move || {
                let processed = replay_file(&accumulator, &path)?;
                Ok::<_, BoxError>((path, processed))
            })
        })
        .collect();

    let mut total = 0;
    for handle in handles {
        let (path, processed) = handle.await??;
        info!("{}: stored {} datapoints", path.display(), processed);
        total += processed;
    }

    let snapshot = accumulator.collect();
    info!(
        "Stored {} datapoints, serving {} timeseries",
        total,
        snapshot.len()
    );

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
