// src/extractors/rules.rs

//! The fee rule table.
//!
//! Each row pairs a trigger pattern with an amount locator. The pattern
//! matches the whole span (trigger phrase plus the amounts it governs); the
//! locator decides which `$` amounts inside that span become candidates.
//! New document phrasings are new rows here, the extraction loop in
//! `fee.rs` never changes.

use super::amount::{NUMERAL, SERIES_LABEL};
use serde::Serialize;

// ASCII word boundary. Unicode `\b` forces the slower engines on non-ASCII text.
const B: &str = r"(?-u:\b)";

const PARTY: &str = r"(?:underwriters?|purchasers?)";
const POSSESSIVE_PARTY: &str = r"(?:underwriting|underwriters?|purchasers?)(?:['’]s|['’])?";
const CHARGE: &str = r"(?:compensation|discount|fees?|expenses)";
const FEE_QUALIFIER: &str = r"(?:an?\s+)?(?:aggregate\s+|total\s+|underwriting\s+)?";
const FEE_OF: &str = r"fees?\s+(?:in\s+the\s+amount\s+of|of|equal\s+to)\s+";

// Text allowed between a trigger and the first `$` it owns.
const TRIGGER_GAP: usize = 400;
// Text allowed between two listed amounts, or around a compensation clause.
const LIST_GAP: usize = 160;

/// How a rule turns its matched span into amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    /// Only the first amount of the span.
    First,
    /// Every amount of the span ("a fee of $X and ... a fee of $Y").
    Listed,
}

/// Uncompiled table row.
#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub label: String,
    pub pattern: String,
    pub locator: Locator,
}

impl RuleSpec {
    pub fn new(label: impl Into<String>, pattern: impl Into<String>, locator: Locator) -> Self {
        Self {
            label: label.into(),
            pattern: pattern.into(),
            locator,
        }
    }
}

/// The built-in table, highest priority first.
pub fn default_rule_specs() -> Vec<RuleSpec> {
    let amount = format!(r"\${NUMERAL}");
    // "... a fee of $Y", "..., $Y", "... and $Y", "..., and the $Y"
    let list_tail = format!(
        r"(?:(?:[^$]{{0,{LIST_GAP}}}?{B}{FEE_OF}|\s*,\s*(?:and\s+)?(?:the\s+)?|\s+and\s+(?:the\s+)?){amount})*"
    );
    let lead = format!(r"[^$]{{0,{TRIGGER_GAP}}}?{amount}");
    let payee = format!(
        r"(?:to\s+)?(?:the\s+)?(?:[\w.&,'’-]+\s+){{0,6}}?{PARTY}\s+{FEE_QUALIFIER}fees?{B}"
    );

    vec![
        // "pay JPMS a fee of $134,133.31 as compensation for underwriting the Series 2024A Bonds"
        RuleSpec::new(
            "compensation_for_services",
            format!(
                r"(?i){B}pay{B}[^$]{{0,{LIST_GAP}}}?{B}{FEE_OF}{amount}{list_tail}[^$]{{0,{LIST_GAP}}}?{B}as\s+compensation\s+for\s+(?:its\s+|their\s+)?(?:underwriting|purchasing){B}(?:\s+(?:of\s+)?(?:the\s+)?{SERIES_LABEL})?"
            ),
            Locator::Listed,
        ),
        // "As compensation for underwriting the Bonds, the County will pay J.P. Morgan Securities LLC a fee of $100,000"
        RuleSpec::new(
            "compensation_leading",
            format!(
                r"(?i){B}as\s+compensation\s+for\s+(?:its\s+|their\s+)?(?:underwriting|purchasing){B}[^$]{{0,{LIST_GAP}}}?{B}pay{B}[^$]{{0,{LIST_GAP}}}?{B}{FEE_OF}{amount}{list_tail}"
            ),
            Locator::Listed,
        ),
        // "the Underwriter will be paid a fee in the amount of $746,091.20"
        RuleSpec::new(
            "will_be_paid_fee",
            format!(
                r"(?i){B}{PARTY}\s+(?:will|shall)\s+(?:be\s+paid|receive)\s+{FEE_QUALIFIER}fees?{B}{lead}{list_tail}"
            ),
            Locator::Listed,
        ),
        // "will pay the Underwriters a fee ... in the amount of $X"
        RuleSpec::new(
            "will_pay_fee",
            format!(r"(?i){B}(?:will|shall)\s+pay\s+{payee}{lead}{list_tail}"),
            Locator::Listed,
        ),
        // "has agreed to pay the Underwriters an aggregate fee of $X for ..."
        RuleSpec::new(
            "agreed_to_pay_fee",
            format!(r"(?i){B}(?:(?:has|have)\s+)?agree[sd]?\s+to\s+pay\s+{payee}{lead}{list_tail}"),
            Locator::Listed,
        ),
        // "the Series 2024B Underwriter a fee of $160,994 and the Series 2024C Underwriter a fee of $157,840"
        RuleSpec::new(
            "party_fee_of",
            format!(r"(?i){B}{PARTY}\s+{FEE_QUALIFIER}{FEE_OF}{amount}{list_tail}"),
            Locator::Listed,
        ),
        // "Underwriters' discount of $725,500.00". Percent language is never a flat fee.
        RuleSpec::new(
            "discount_of",
            format!(
                r"(?i){B}{POSSESSIVE_PARTY}\s+{CHARGE}{B}(?:[^$%]{{0,{LIST_GAP}}}?\s)?of\s+{amount}"
            ),
            Locator::First,
        ),
        // "the underwriting compensation is $X"
        RuleSpec::new(
            "discount_is",
            format!(
                r"(?i){B}{POSSESSIVE_PARTY}\s+{CHARGE}{B}[^$%]{{0,{LIST_GAP}}}?{B}(?:is|was|will\s+be)\s+{amount}"
            ),
            Locator::First,
        ),
        // "less $725,500.00 of Underwriter's discount"
        RuleSpec::new(
            "amount_of_discount",
            format!(r"(?i){amount}\s+of\s+{POSSESSIVE_PARTY}\s+(?:discount|fees?|expenses|compensation){B}"),
            Locator::First,
        ),
    ]
}
