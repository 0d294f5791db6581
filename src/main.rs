// src/main.rs
use std::sync::Arc;

use clap::Parser;
use fee_extractor::documents::FsDocumentSource;
use fee_extractor::extractors::{FeeExtractor, DEFAULT_CONTEXT_RADIUS};
use fee_extractor::pipeline::{self, PipelineConfig};
use fee_extractor::report::{AggregationPolicy, DocumentOutcome, Overrides, RunSummary};
use fee_extractor::storage::StorageManager;
use fee_extractor::utils::{self, AppError};

const CONCURRENCY_ENV: &str = "FEE_EXTRACTOR_CONCURRENCY";
const DEFAULT_CONCURRENCY: usize = 4;

/// Command Line Interface for the underwriter fee extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the offering documents (.txt, .html, .pdf)
    #[arg(short, long)]
    input_dir: String,

    /// Output directory for reports
    #[arg(short, long, default_value = "./output")]
    output_dir: String,

    /// How several fee candidates of one document become a single fee
    #[arg(short, long, value_enum, default_value_t = AggregationPolicy::Sum)]
    aggregate: AggregationPolicy,

    /// Documents processed in parallel (default: $FEE_EXTRACTOR_CONCURRENCY or 4)
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// JSON file of manual per-document overrides
    #[arg(long)]
    overrides: Option<String>,

    /// Characters of context kept around each matched span
    #[arg(long, default_value_t = DEFAULT_CONTEXT_RADIUS)]
    context_radius: usize,

    /// Debug mode - save annotated HTML files for debugging
    #[arg(short, long)]
    debug: bool,
}

fn resolve_concurrency(arg: Option<usize>) -> Result<usize, AppError> {
    if let Some(n) = arg {
        tracing::debug!("Using concurrency {} from command-line argument", n);
        return Ok(n.max(1));
    }
    match std::env::var(CONCURRENCY_ENV) {
        Ok(value) => {
            let n = value.trim().parse::<usize>().map_err(|_| {
                AppError::Config(format!("{} must be a positive integer, got '{}'", CONCURRENCY_ENV, value))
            })?;
            tracing::debug!("Using concurrency {} from {}", n, CONCURRENCY_ENV);
            Ok(n.max(1))
        }
        Err(_) => {
            tracing::debug!("Using concurrency {} (default)", DEFAULT_CONCURRENCY);
            Ok(DEFAULT_CONCURRENCY)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    let concurrency = resolve_concurrency(args.concurrency)?;

    let overrides = match &args.overrides {
        Some(path) => {
            let overrides = Overrides::load(path)?;
            if overrides.is_empty() {
                tracing::warn!("Overrides file {} has no entries", path);
            }
            overrides
        }
        None => Overrides::default(),
    };

    // 3. Initialize storage
    let storage = StorageManager::new(&args.output_dir)?;
    let debug_storage = if args.debug {
        Some(storage.clone())
    } else {
        None
    };

    // 4. Index the input documents
    let source = Arc::new(FsDocumentSource::open(&args.input_dir)?);
    let ids = source.document_ids();
    tracing::info!("Found {} documents in {}", ids.len(), source.root().display());

    if ids.is_empty() {
        return Err(AppError::Config(format!(
            "No supported documents found in {}",
            args.input_dir
        )));
    }

    // 5. Initialize fee extractor
    let extractor = Arc::new(FeeExtractor::new().with_context_radius(args.context_radius));

    // 6. Process every document
    let config = Arc::new(PipelineConfig {
        policy: args.aggregate,
        concurrency,
        overrides,
        debug_storage,
    });
    let outcomes = pipeline::run_batch(source, ids, extractor, config).await?;

    // 7. Save reports
    let mut summary = RunSummary::new(args.aggregate);
    for outcome in &outcomes {
        summary.record(outcome);

        if let DocumentOutcome::Extracted(report) | DocumentOutcome::NoFeeFound(report) = outcome {
            match storage.save_document_report(report) {
                Ok(path) => tracing::info!("Saved report to: {}", path.display()),
                Err(e) => tracing::error!("Failed to save report for {}: {}", report.doc_id, e),
            }
        }
    }

    summary.log_report();
    if let Err(e) = storage.save_summary(&summary) {
        tracing::error!("Failed to save run summary: {}", e);
    }

    if summary.successfully_processed == 0 && summary.failure_count() > 0 {
        return Err(AppError::Processing(format!(
            "Failed to extract a fee from any of {} documents",
            summary.failure_count()
        )));
    }

    Ok(())
}
