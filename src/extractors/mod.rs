// src/extractors/mod.rs
pub mod amount;
pub mod fee;
pub mod party;
pub mod rules;

// Re-export key extraction types for convenience
pub use fee::{
    extract_fees,
    extract_fees_from_bytes,
    ExtractionResult,
    FeeCandidate,
    FeeExtractor,
    FeeRule,
    DEFAULT_CONTEXT_RADIUS,
};
pub use party::{find_underwriters, UnderwriterParties};
pub use rules::{default_rule_specs, Locator, RuleSpec};
