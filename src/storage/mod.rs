use std::fs;
use std::path::{Path, PathBuf};
use crate::documents::DocumentId;
use crate::report::{DocumentReport, RunSummary};
use crate::utils::error::StorageError;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory for annotated debug HTML, created on first use
    pub fn debug_dir(&self) -> Result<PathBuf, StorageError> {
        let dir = self.base_dir.join("debug");
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .map_err(StorageError::IoError)?;
        }
        Ok(dir)
    }

    /// Path of the annotated debug HTML for one document
    pub fn debug_html_path(&self, doc_id: &DocumentId) -> Result<PathBuf, StorageError> {
        Ok(self.debug_dir()?.join(format!("{}_annotated.html", doc_id.file_stem())))
    }

    /// Saves the report of one document as `<doc_id>.json`
    pub fn save_document_report(&self, report: &DocumentReport) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(format!("{}.json", report.doc_id.file_stem()));
        self.write_json(&file_path, report)?;

        tracing::debug!("Saved report for {} to {}", report.doc_id, file_path.display());

        Ok(file_path)
    }

    /// Saves the run summary as `summary.json`
    pub fn save_summary(&self, summary: &RunSummary) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join("summary.json");
        self.write_json(&file_path, summary)?;

        tracing::info!("Saved run summary to {}", file_path.display());

        Ok(file_path)
    }

    fn write_json<T: Serialize>(&self, file_path: &Path, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(file_path, json)
            .map_err(StorageError::IoError)
    }
}
