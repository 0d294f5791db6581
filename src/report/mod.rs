// src/report/mod.rs

//! Caller-side interpretation of extraction results: turning a list of fee
//! candidates into one number per document, and the run-level counters.

pub mod overrides;

pub use overrides::{DocumentOverride, Overrides};

use crate::documents::DocumentId;
use crate::extractors::{ExtractionResult, FeeCandidate, UnderwriterParties};
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// How several candidates of one document become a single fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationPolicy {
    /// Sum of distinct (series, amount) pairs.
    #[default]
    Sum,
    /// Largest distinct amount.
    Max,
    /// Amount of the highest-priority candidate.
    First,
    /// A total only when every candidate agrees; otherwise flagged for review.
    Review,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeSummary {
    pub policy: AggregationPolicy,
    pub total: Option<Decimal>,
    pub distinct_amounts: Vec<Decimal>,
    pub per_series: BTreeMap<String, Decimal>,
    pub needs_review: bool,
}

impl AggregationPolicy {
    pub fn aggregate(self, result: &ExtractionResult) -> FeeSummary {
        // The same fee restated by two phrasings counts once.
        let mut seen: HashSet<(Option<&str>, Decimal)> = HashSet::new();
        let distinct: Vec<&FeeCandidate> = result
            .iter()
            .filter(|c| seen.insert((c.series.as_deref(), c.amount)))
            .collect();

        let mut distinct_amounts: Vec<Decimal> = Vec::new();
        for candidate in &distinct {
            if !distinct_amounts.contains(&candidate.amount) {
                distinct_amounts.push(candidate.amount);
            }
        }

        let mut per_series: BTreeMap<String, Decimal> = BTreeMap::new();
        for candidate in &distinct {
            if let Some(series) = &candidate.series {
                *per_series.entry(series.clone()).or_default() += candidate.amount;
            }
        }

        let total = match self {
            AggregationPolicy::Sum => distinct.iter().map(|c| c.amount).reduce(|a, b| a + b),
            AggregationPolicy::Max => distinct_amounts.iter().copied().max(),
            AggregationPolicy::First => result.candidates().first().map(|c| c.amount),
            AggregationPolicy::Review => match distinct_amounts.as_slice() {
                [only] => Some(*only),
                _ => None,
            },
        };

        let needs_review = result.has_ambiguous()
            || (self == AggregationPolicy::Review && distinct_amounts.len() > 1);

        FeeSummary {
            policy: self,
            total,
            distinct_amounts,
            per_series,
            needs_review,
        }
    }
}

/// Everything written for one processed document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub doc_id: DocumentId,
    pub source: Option<String>,
    pub scrape_success: bool,
    /// Fee used downstream: the override if one exists, else the aggregate.
    pub fee_total: Option<Decimal>,
    /// Aggregate of the extracted candidates, before any override.
    pub extracted_total: Option<Decimal>,
    pub multiple_fees: bool,
    pub had_override: bool,
    pub override_note: Option<String>,
    /// First underwriter named in the defining sentence.
    pub underwriter_lead_left: Option<String>,
    pub underwriter_all: Vec<String>,
    pub summary: FeeSummary,
    pub candidates: Vec<FeeCandidate>,
    pub extraction_timestamp: String,
}

impl DocumentReport {
    pub fn build(
        doc_id: DocumentId,
        source: Option<String>,
        result: ExtractionResult,
        policy: AggregationPolicy,
        manual: Option<&DocumentOverride>,
    ) -> Self {
        let summary = policy.aggregate(&result);
        let extracted_total = summary.total;
        let fee_total = manual.and_then(|o| o.fee_total).or(extracted_total);

        Self {
            doc_id,
            source,
            scrape_success: !result.is_empty(),
            fee_total,
            extracted_total,
            multiple_fees: summary.distinct_amounts.len() > 1,
            had_override: manual.is_some(),
            override_note: manual.and_then(|o| o.note.clone()),
            underwriter_lead_left: None,
            underwriter_all: Vec::new(),
            summary,
            candidates: result.into_iter().collect(),
            extraction_timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_parties(mut self, parties: UnderwriterParties) -> Self {
        self.underwriter_lead_left = parties.lead_left;
        self.underwriter_all = parties.all;
        self
    }

    /// A document counts as processed when it yielded a candidate or a manual fee.
    pub fn has_fee(&self) -> bool {
        self.scrape_success || self.fee_total.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub doc_id: DocumentId,
    pub source: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultipleFeeRecord {
    pub doc_id: DocumentId,
    pub source: Option<String>,
    pub amounts: Vec<Decimal>,
    pub total_used: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Extracted(DocumentReport),
    NoFeeFound(DocumentReport),
    SourceFailed(FailureRecord),
    Skipped {
        doc_id: DocumentId,
        note: Option<String>,
    },
}

impl DocumentOutcome {
    pub fn doc_id(&self) -> &DocumentId {
        match self {
            DocumentOutcome::Extracted(report) | DocumentOutcome::NoFeeFound(report) => {
                &report.doc_id
            }
            DocumentOutcome::SourceFailed(failure) => &failure.doc_id,
            DocumentOutcome::Skipped { doc_id, .. } => doc_id,
        }
    }

    pub fn report(&self) -> Option<&DocumentReport> {
        match self {
            DocumentOutcome::Extracted(report) | DocumentOutcome::NoFeeFound(report) => {
                Some(report)
            }
            _ => None,
        }
    }
}

/// Run-level counters and the documents worth a second look.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub policy: AggregationPolicy,
    pub generated_at: String,
    pub total_documents: usize,
    pub skipped: usize,
    pub source_failed: usize,
    pub no_fee_found: usize,
    pub successfully_processed: usize,
    pub needs_review: usize,
    pub failed_documents: Vec<FailureRecord>,
    pub multiple_fee_documents: Vec<MultipleFeeRecord>,
    pub overridden_documents: Vec<DocumentId>,
}

impl RunSummary {
    pub fn new(policy: AggregationPolicy) -> Self {
        Self {
            policy,
            generated_at: chrono::Utc::now().to_rfc3339(),
            total_documents: 0,
            skipped: 0,
            source_failed: 0,
            no_fee_found: 0,
            successfully_processed: 0,
            needs_review: 0,
            failed_documents: Vec::new(),
            multiple_fee_documents: Vec::new(),
            overridden_documents: Vec::new(),
        }
    }

    pub fn from_outcomes<'a>(
        policy: AggregationPolicy,
        outcomes: impl IntoIterator<Item = &'a DocumentOutcome>,
    ) -> Self {
        let mut summary = Self::new(policy);
        for outcome in outcomes {
            summary.record(outcome);
        }
        summary
    }

    pub fn record(&mut self, outcome: &DocumentOutcome) {
        self.total_documents += 1;
        match outcome {
            DocumentOutcome::Skipped { .. } => self.skipped += 1,
            DocumentOutcome::SourceFailed(failure) => {
                self.source_failed += 1;
                self.failed_documents.push(failure.clone());
            }
            DocumentOutcome::NoFeeFound(report) => {
                self.no_fee_found += 1;
                self.failed_documents.push(FailureRecord {
                    doc_id: report.doc_id.clone(),
                    source: report.source.clone(),
                    reason: "No fee found in document".to_string(),
                });
                self.note_report(report);
            }
            DocumentOutcome::Extracted(report) => {
                self.successfully_processed += 1;
                if report.multiple_fees {
                    self.multiple_fee_documents.push(MultipleFeeRecord {
                        doc_id: report.doc_id.clone(),
                        source: report.source.clone(),
                        amounts: report.summary.distinct_amounts.clone(),
                        total_used: report.fee_total,
                    });
                }
                self.note_report(report);
            }
        }
    }

    fn note_report(&mut self, report: &DocumentReport) {
        if report.summary.needs_review {
            self.needs_review += 1;
        }
        if report.had_override {
            self.overridden_documents.push(report.doc_id.clone());
        }
    }

    pub fn failure_count(&self) -> usize {
        self.source_failed + self.no_fee_found
    }

    /// Logs the counters, then the failed and multi-fee documents.
    pub fn log_report(&self) {
        tracing::info!(
            "Processing complete. total_documents: {}, successfully_processed: {}, no_fee_found: {}, source_failed: {}, skipped: {}, needs_review: {}",
            self.total_documents,
            self.successfully_processed,
            self.no_fee_found,
            self.source_failed,
            self.skipped,
            self.needs_review
        );

        for (idx, fail) in self.failed_documents.iter().enumerate() {
            tracing::info!(
                "Failed document {}. {} ({}): {}",
                idx + 1,
                fail.doc_id,
                fail.source.as_deref().unwrap_or("N/A"),
                fail.reason
            );
        }

        for (idx, multi) in self.multiple_fee_documents.iter().enumerate() {
            tracing::warn!(
                "Multiple fee values {}. {} ({}): {:?}, total fee used: {}",
                idx + 1,
                multi.doc_id,
                multi.source.as_deref().unwrap_or("N/A"),
                multi.amounts,
                multi
                    .total_used
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
        }

        if !self.overridden_documents.is_empty() {
            tracing::info!("Manual overrides applied to: {:?}", self.overridden_documents);
        }
    }
}
