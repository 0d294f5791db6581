// src/report/overrides.rs

//! Manual per-document corrections, keyed by document id.
//!
//! ```json
//! {
//!   "deal-0042": { "fee_total": "412500.00", "note": "fee stated in supplement" },
//!   "deal-0077": { "skip": true, "note": "commercial paper memorandum" }
//! }
//! ```

use crate::documents::DocumentId;
use crate::utils::error::AppError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOverride {
    /// Leave the document out of the run entirely.
    #[serde(default)]
    pub skip: bool,
    /// Replaces the aggregated fee; extracted candidates are still reported.
    #[serde(default)]
    pub fee_total: Option<Decimal>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Overrides {
    entries: BTreeMap<DocumentId, DocumentOverride>,
}

impl Overrides {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let entries: BTreeMap<DocumentId, DocumentOverride> = serde_json::from_str(json)
            .map_err(|e| AppError::Config(format!("Invalid overrides file: {}", e)))?;
        Ok(Self { entries })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let overrides = Self::from_json(&json)?;
        tracing::info!("Loaded {} manual overrides from {}", overrides.len(), path.display());
        Ok(overrides)
    }

    pub fn get(&self, id: &DocumentId) -> Option<&DocumentOverride> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_overrides() {
        let json = r#"{
            "deal-1": { "fee_total": "412500.00", "note": "from supplement" },
            "deal-2": { "skip": true }
        }"#;
        let overrides = Overrides::from_json(json).unwrap();
        assert_eq!(overrides.len(), 2);

        let first = overrides.get(&DocumentId::new("deal-1")).unwrap();
        assert!(!first.skip);
        assert_eq!(first.fee_total, Some(Decimal::from_str("412500.00").unwrap()));
        assert_eq!(first.note.as_deref(), Some("from supplement"));

        let second = overrides.get(&DocumentId::new("deal-2")).unwrap();
        assert!(second.skip);
        assert_eq!(second.fee_total, None);

        assert!(overrides.get(&DocumentId::new("deal-3")).is_none());
    }

    #[test]
    fn test_invalid_overrides_are_config_errors() {
        assert!(matches!(
            Overrides::from_json("[1, 2]"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        fs::write(&path, r#"{"x": {"note": "checked by hand"}}"#).unwrap();
        let overrides = Overrides::load(&path).unwrap();
        assert_eq!(
            overrides.get(&DocumentId::new("x")).and_then(|o| o.note.clone()),
            Some("checked by hand".to_string())
        );
    }
}
