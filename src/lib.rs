// src/lib.rs

//! Underwriter fee extraction from municipal bond offering documents.
//!
//! The core is [`extractors::FeeExtractor`]: plain text in, an ordered list of
//! fee candidates out. Everything else (document loading, aggregation into a
//! single fee, reports) sits around it.

pub mod documents;
pub mod extractors;
pub mod pipeline;
pub mod report;
pub mod storage;
pub mod utils;

pub use extractors::{extract_fees, extract_fees_from_bytes, ExtractionResult, FeeCandidate, FeeExtractor};
pub use utils::AppError;
