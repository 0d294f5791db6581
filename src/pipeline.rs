// src/pipeline.rs

//! Batch runner: one extraction per document, documents isolated from each
//! other so a failure never stops the rest of the run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::documents::{DocumentId, DocumentSource};
use crate::extractors::{find_underwriters, FeeExtractor};
use crate::report::{AggregationPolicy, DocumentOutcome, DocumentReport, FailureRecord, Overrides};
use crate::storage::StorageManager;
use crate::utils::error::AppError;
use crate::utils::html_debug;

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub policy: AggregationPolicy,
    /// Documents processed at the same time.
    pub concurrency: usize,
    pub overrides: Overrides,
    /// Receives annotated HTML when debugging; `None` disables it.
    pub debug_storage: Option<StorageManager>,
}

/// Loads, extracts and summarizes a single document.
pub fn process_document(
    source: &dyn DocumentSource,
    id: &DocumentId,
    extractor: &FeeExtractor,
    config: &PipelineConfig,
) -> DocumentOutcome {
    let manual = config.overrides.get(id);
    let location = source.location(id);

    if let Some(manual) = manual {
        if manual.skip {
            tracing::info!("Skipping document {} (manual override)", id);
            return DocumentOutcome::Skipped {
                doc_id: id.clone(),
                note: manual.note.clone(),
            };
        }
        tracing::warn!(
            "Manual override applied for document {} (file: {})",
            id,
            location.as_deref().unwrap_or("N/A")
        );
    }

    let document = match source.load(id) {
        Ok(document) => document,
        Err(e) => {
            tracing::error!(
                "Failed to load document {} (file: {}): {}",
                id,
                location.as_deref().unwrap_or("N/A"),
                e
            );
            return DocumentOutcome::SourceFailed(FailureRecord {
                doc_id: id.clone(),
                source: location,
                reason: e.to_string(),
            });
        }
    };
    tracing::debug!(
        "Loaded document {} ({} bytes of text)",
        document.id(),
        document.text().len()
    );

    let result = extractor.extract(document.text());

    if let Some(storage) = &config.debug_storage {
        let written = storage
            .debug_html_path(id)
            .map_err(AppError::from)
            .and_then(|path| html_debug::create_debug_html(document.text(), &path, &result));
        if let Err(e) = written {
            tracing::warn!("Failed to create debug HTML for {}: {}", id, e);
        }
    }

    let parties = find_underwriters(document.text());
    if let Some(lead) = &parties.lead_left {
        tracing::debug!("Document {}: lead underwriter {}", id, lead);
    }

    let report = DocumentReport::build(id.clone(), location, result, config.policy, manual)
        .with_parties(parties);

    if report.multiple_fees {
        tracing::warn!(
            "Multiple fee values found in document {}: {:?}, using total: {:?}",
            id,
            report.summary.distinct_amounts,
            report.fee_total
        );
    }

    if report.has_fee() {
        tracing::info!(
            "Document {}: {} candidate(s), fee total {:?}",
            id,
            report.candidates.len(),
            report.fee_total
        );
        DocumentOutcome::Extracted(report)
    } else {
        tracing::warn!("No fee found in document {}", id);
        DocumentOutcome::NoFeeFound(report)
    }
}

/// Runs [`process_document`] over `ids` on the blocking pool, at most
/// `config.concurrency` at a time. Outcomes come back sorted by document id.
pub async fn run_batch<S>(
    source: Arc<S>,
    ids: Vec<DocumentId>,
    extractor: Arc<FeeExtractor>,
    config: Arc<PipelineConfig>,
) -> Result<Vec<DocumentOutcome>, AppError>
where
    S: DocumentSource + 'static,
{
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut tasks = JoinSet::new();

    tracing::info!(
        "Processing {} documents with concurrency {}",
        ids.len(),
        config.concurrency.max(1)
    );

    for id in ids {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| AppError::Processing(format!("Worker pool closed: {}", e)))?;
        let source = Arc::clone(&source);
        let extractor = Arc::clone(&extractor);
        let config = Arc::clone(&config);

        tasks.spawn_blocking(move || {
            let _permit = permit;
            // PDF text conversion can panic on broken files; keep it to this document.
            panic::catch_unwind(AssertUnwindSafe(|| {
                process_document(source.as_ref(), &id, &extractor, &config)
            }))
            .unwrap_or_else(|_| {
                tracing::error!("Processing panicked for document {}", id);
                DocumentOutcome::SourceFailed(FailureRecord {
                    doc_id: id.clone(),
                    source: source.location(&id),
                    reason: "Document processing panicked".to_string(),
                })
            })
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => tracing::error!("Document task failed to complete: {}", e),
        }
    }

    outcomes.sort_by(|a, b| a.doc_id().cmp(b.doc_id()));
    Ok(outcomes)
}
