// src/documents/mod.rs
pub mod models;
pub mod source;

pub use models::{Document, DocumentFormat, DocumentId};
pub use source::{html_to_text, read_document_text, DocumentSource, FsDocumentSource};
