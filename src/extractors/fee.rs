// src/extractors/fee.rs

// --- Imports ---
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::ops::Range;

use super::amount::{
    dollar_amounts, first_series_in, is_ratio, last_series_in, series_labels_in,
    series_lookback_start, surrounding_text, DollarAmount,
};
use super::rules::{default_rule_specs, Locator, RuleSpec};

// --- Constants ---
/// Characters of audit context kept on each side of a matched span.
pub const DEFAULT_CONTEXT_RADIUS: usize = 80;

// --- Default Table (Lazy Static) ---
static DEFAULT_RULES: Lazy<Vec<FeeRule>> = Lazy::new(|| {
    default_rule_specs()
        .iter()
        .map(|spec| FeeRule::compile(spec).expect("Failed to compile default fee rule"))
        .collect()
});

static DEFAULT_EXTRACTOR: Lazy<FeeExtractor> = Lazy::new(FeeExtractor::new);

// --- Data Structures ---

/// One fee amount found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeCandidate {
    /// The amount, USD implied.
    pub amount: Decimal,
    /// Label of the rule that located it.
    pub rule: String,
    /// Whitespace-collapsed text around the matched span.
    pub context: String,
    /// e.g. "Series 2024B"
    pub series: Option<String>,
    /// Set when the span held several amounts without an "and" list.
    pub ambiguous: bool,
    /// Byte range of `$<numeral>` in the input.
    pub position: (usize, usize),
    /// Byte range of the whole matched span in the input.
    pub span: (usize, usize),
}

/// Candidates for one document, in rule priority order then text order.
/// Empty means no rule matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    candidates: Vec<FeeCandidate>,
}

impl ExtractionResult {
    pub fn candidates(&self) -> &[FeeCandidate] {
        &self.candidates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeeCandidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn amounts(&self) -> Vec<Decimal> {
        self.candidates.iter().map(|c| c.amount).collect()
    }

    pub fn has_ambiguous(&self) -> bool {
        self.candidates.iter().any(|c| c.ambiguous)
    }
}

impl IntoIterator for ExtractionResult {
    type Item = FeeCandidate;
    type IntoIter = std::vec::IntoIter<FeeCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.into_iter()
    }
}

impl<'a> IntoIterator for &'a ExtractionResult {
    type Item = &'a FeeCandidate;
    type IntoIter = std::slice::Iter<'a, FeeCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

/// A compiled table row.
#[derive(Debug, Clone)]
pub struct FeeRule {
    label: String,
    pattern: Regex,
    locator: Locator,
}

impl FeeRule {
    pub fn compile(spec: &RuleSpec) -> Result<Self, ExtractError> {
        let pattern = Regex::new(&spec.pattern).map_err(|e| {
            ExtractError::InvalidPattern(format!("rule '{}': {}", spec.label, e))
        })?;
        Ok(Self {
            label: spec.label.clone(),
            pattern,
            locator: spec.locator,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

// An amount picked out of a span, before it becomes a candidate.
struct Located {
    amount: DollarAmount,
    series: Option<String>,
    ambiguous: bool,
}

// --- Main Extractor Structure ---

/// Applies an ordered rule table to document text.
///
/// Every rule runs against the whole text and candidates accumulate; a `$`
/// occurrence is claimed by the first (highest priority) rule that locates it.
/// Aggregating candidates into one fee is left to the caller.
#[derive(Debug, Clone)]
pub struct FeeExtractor {
    rules: Vec<FeeRule>,
    context_radius: usize,
}

impl Default for FeeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeeExtractor {
    /// Extractor over the built-in rule table.
    pub fn new() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
            context_radius: DEFAULT_CONTEXT_RADIUS,
        }
    }

    /// Extractor over a caller supplied table, in priority order.
    pub fn with_rules(specs: &[RuleSpec]) -> Result<Self, ExtractError> {
        let rules = specs.iter().map(FeeRule::compile).collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rules,
            context_radius: DEFAULT_CONTEXT_RADIUS,
        })
    }

    /// Appends a rule with the lowest priority.
    pub fn push_rule(&mut self, spec: &RuleSpec) -> Result<(), ExtractError> {
        self.rules.push(FeeRule::compile(spec)?);
        Ok(())
    }

    pub fn with_context_radius(mut self, radius: usize) -> Self {
        self.context_radius = radius;
        self
    }

    pub fn rules(&self) -> &[FeeRule] {
        &self.rules
    }

    /// Extracts every fee candidate from `text`. No match is an empty result.
    pub fn extract(&self, text: &str) -> ExtractionResult {
        let mut candidates = Vec::new();
        if !text.contains('$') {
            return ExtractionResult { candidates };
        }

        let mut claimed: HashSet<usize> = HashSet::new();

        for rule in &self.rules {
            for mat in rule.pattern.find_iter(text) {
                let span = mat.range();
                let located = self.locate(rule, text, span.clone());
                tracing::debug!(
                    "Rule '{}' matched bytes {}..{} ({} amount(s))",
                    rule.label,
                    span.start,
                    span.end,
                    located.len()
                );

                for found in located {
                    if !claimed.insert(found.amount.start) {
                        tracing::trace!(
                            "Amount at byte {} already claimed, skipping for rule '{}'",
                            found.amount.start,
                            rule.label
                        );
                        continue;
                    }
                    candidates.push(FeeCandidate {
                        amount: found.amount.value,
                        rule: rule.label.clone(),
                        context: surrounding_text(text, span.clone(), self.context_radius),
                        series: found.series,
                        ambiguous: found.ambiguous,
                        position: (found.amount.start, found.amount.end),
                        span: (span.start, span.end),
                    });
                }
            }
        }

        ExtractionResult { candidates }
    }

    /// Byte-oriented entry point: fails with `MalformedInput` on non-UTF-8 input.
    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<ExtractionResult, ExtractError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ExtractError::MalformedInput(e.to_string()))?;
        Ok(self.extract(text))
    }

    /// Picks amounts out of one matched span according to the rule's locator.
    fn locate(&self, rule: &FeeRule, text: &str, span: Range<usize>) -> Vec<Located> {
        let all = dollar_amounts(text, span.clone());

        let amounts: Vec<DollarAmount> = match rule.locator {
            Locator::First => all.into_iter().take(1).collect(),
            Locator::Listed => all,
        };

        let amounts: Vec<DollarAmount> = amounts
            .into_iter()
            .filter(|amount| {
                let ratio = is_ratio(text, amount);
                if ratio {
                    tracing::trace!(
                        "Rule '{}' skipped ratio amount at byte {}",
                        rule.label,
                        amount.start
                    );
                }
                !ratio
            })
            .collect();

        // Several amounts must form an "and" list ("$X and $Y", "$X, $Y and $Z")
        // to count as a series list.
        let gaps: Vec<&str> = amounts
            .windows(2)
            .map(|pair| &text[pair[0].end..pair[1].start])
            .collect();
        let ambiguous = match gaps.last() {
            None => false,
            Some(last) => {
                !has_and(last) || !gaps.iter().all(|gap| has_and(gap) || gap.trim() == ",")
            }
        };
        if ambiguous {
            tracing::debug!(
                "Rule '{}' span {}..{} holds {} amounts without an 'and' list",
                rule.label,
                span.start,
                span.end,
                amounts.len()
            );
        }

        // "the Series 2024B and Series 2024C Underwriters fees of $X and $Y":
        // labels listed ahead of the amounts pair up one to one.
        if amounts.len() > 1 {
            let labels = series_labels_in(text, span.start..amounts[0].start);
            if labels.len() == amounts.len() {
                return amounts
                    .into_iter()
                    .zip(labels)
                    .map(|(amount, series)| Located {
                        amount,
                        series: Some(series),
                        ambiguous,
                    })
                    .collect();
            }
        }

        let last = amounts.len().saturating_sub(1);
        amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| {
                let window_start = if i == 0 {
                    series_lookback_start(text, span.start, amount.start)
                } else {
                    amounts[i - 1].end
                };
                let mut series = last_series_in(text, window_start..amount.start);
                if series.is_none() && i == last {
                    // "... as compensation for underwriting the Series 2024A Bonds"
                    series = first_series_in(text, amount.end..span.end);
                }
                Located {
                    amount: amount.clone(),
                    series,
                    ambiguous,
                }
            })
            .collect()
    }
}

fn has_and(gap: &str) -> bool {
    gap.split(|c: char| !c.is_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case("and"))
}

/// Extracts fee candidates with the built-in rule table.
pub fn extract_fees(text: &str) -> ExtractionResult {
    DEFAULT_EXTRACTOR.extract(text)
}

/// Like [`extract_fees`], for raw bytes that still need to be validated as text.
pub fn extract_fees_from_bytes(bytes: &[u8]) -> Result<ExtractionResult, ExtractError> {
    DEFAULT_EXTRACTOR.extract_bytes(bytes)
}
