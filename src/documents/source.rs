// src/documents/source.rs
use crate::documents::models::{Document, DocumentFormat, DocumentId};
use crate::utils::error::SourceError;
use scraper::{node::Node, Html};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Supplies document text to the extractor. Failures stay on this side of the
/// boundary and are reported per document.
pub trait DocumentSource: Send + Sync {
    /// Full plain text of the document.
    fn document_text(&self, id: &DocumentId) -> Result<String, SourceError>;

    /// Human readable location (path, URL) of the document, if any.
    fn location(&self, _id: &DocumentId) -> Option<String> {
        None
    }

    fn load(&self, id: &DocumentId) -> Result<Document, SourceError> {
        let text = self.document_text(id)?;
        Ok(Document::new(id.clone(), text))
    }
}

/// Documents already downloaded into one directory. The id is the file stem.
#[derive(Debug, Clone)]
pub struct FsDocumentSource {
    root: PathBuf,
    index: BTreeMap<DocumentId, PathBuf>,
}

impl FsDocumentSource {
    /// Indexes the supported files directly under `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, SourceError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(SourceError::NotFound(format!(
                "input directory {}",
                root.display()
            )));
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut index: BTreeMap<DocumentId, PathBuf> = BTreeMap::new();
        for path in paths {
            if DocumentFormat::from_path(&path).is_none() {
                tracing::debug!("Skipping unsupported file: {}", path.display());
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                tracing::warn!("Skipping file with non UTF-8 name: {}", path.display());
                continue;
            };
            let id = DocumentId::new(stem);
            if let Some(existing) = index.get(&id) {
                tracing::warn!(
                    "Duplicate document id '{}': keeping {}, ignoring {}",
                    id,
                    existing.display(),
                    path.display()
                );
                continue;
            }
            index.insert(id, path);
        }

        tracing::info!("Indexed {} documents under {}", index.len(), root.display());
        Ok(Self { root, index })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ids in sorted order.
    pub fn document_ids(&self) -> Vec<DocumentId> {
        self.index.keys().cloned().collect()
    }

    pub fn path_of(&self, id: &DocumentId) -> Option<&Path> {
        self.index.get(id).map(PathBuf::as_path)
    }
}

impl DocumentSource for FsDocumentSource {
    fn document_text(&self, id: &DocumentId) -> Result<String, SourceError> {
        let path = self
            .index
            .get(id)
            .ok_or_else(|| SourceError::NotFound(id.to_string()))?;
        read_document_text(path)
    }

    fn location(&self, id: &DocumentId) -> Option<String> {
        self.path_of(id).map(|p| p.display().to_string())
    }
}

/// Reads one file and converts it to plain text according to its extension.
pub fn read_document_text(path: &Path) -> Result<String, SourceError> {
    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| SourceError::UnsupportedFormat(path.display().to_string()))?;
    let bytes = fs::read(path)?;
    tracing::debug!("Read {} bytes from {} ({:?})", bytes.len(), path.display(), format);

    match format {
        DocumentFormat::Text => String::from_utf8(bytes)
            .map_err(|e| SourceError::Encoding(format!("{}: {}", path.display(), e))),
        DocumentFormat::Html => Ok(html_to_text(&String::from_utf8_lossy(&bytes))),
        DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| SourceError::Pdf(format!("{}: {}", path.display(), e))),
    }
}

// Elements that break the text flow. Inline markup (span, b, a, ...) joins directly.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "dd", "div", "dl", "dt",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol",
    "p", "pre", "section", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

fn is_block(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

/// Flattens an HTML document to whitespace-collapsed text, dropping scripts,
/// styles and the head. Text inside one block is joined as written, so
/// `<span>$</span>746,091` stays `$746,091`.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut content = String::new();
    let mut last_block = None;

    for node in document.tree.root().descendants() {
        match node.value() {
            Node::Element(el) if is_block(el.name()) => content.push(' '),
            Node::Text(text_node) => {
                let hidden = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .map(|el| matches!(el.name(), "script" | "style" | "head"))
                        .unwrap_or(false)
                });
                if hidden {
                    continue;
                }

                // Leaving a block ("<p>a</p>b") breaks the text as well.
                let block = node
                    .ancestors()
                    .find(|ancestor| {
                        ancestor
                            .value()
                            .as_element()
                            .map(|el| is_block(el.name()))
                            .unwrap_or(false)
                    })
                    .map(|ancestor| ancestor.id());
                if last_block.is_some() && block != last_block {
                    content.push(' ');
                }
                last_block = block;

                content.push_str(&text_node.text);
            }
            _ => {}
        }
    }

    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &[u8]) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_html_to_text_skips_scripts() {
        let html = r#"<html><head><title>OS</title><style>p { color: red; }</style></head>
            <body><p>The Underwriter will be paid</p><script>var fee = "$1";</script>
            <p>a fee of <b>$5,000</b>.</p></body></html>"#;
        let text = html_to_text(html);
        assert_eq!(text, "The Underwriter will be paid a fee of $5,000.");
    }

    #[test]
    fn test_html_inline_markup_keeps_tokens_whole() {
        let html = "<html><body><p>The Underwriter will be paid a fee in the amount of \
                    <span>$</span><span>746,091</span>.20.</p></body></html>";
        let text = html_to_text(html);
        assert_eq!(
            text,
            "The Underwriter will be paid a fee in the amount of $746,091.20."
        );
        let result = crate::extractors::extract_fees(&text);
        assert_eq!(result.amounts(), vec![rust_decimal::Decimal::new(74609120, 2)]);
    }

    #[test]
    fn test_html_block_boundaries_separate_text() {
        let html = "<table><tr><td>Underwriters</td><td>$5,000</td></tr></table>\
                    <div>first<br>second</div><p>one</p>two";
        assert_eq!(html_to_text(html), "Underwriters $5,000 first second one two");
    }

    #[test]
    fn test_index_and_read_documents() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "deal-1.txt", b"will pay the Underwriter a fee of $1,000");
        write(dir.path(), "deal-2.html", b"<p>no fee here</p>");
        write(dir.path(), "notes.docx", b"ignored");

        let source = FsDocumentSource::open(dir.path()).unwrap();
        assert_eq!(
            source.document_ids(),
            vec![DocumentId::new("deal-1"), DocumentId::new("deal-2")]
        );

        let doc = source.load(&DocumentId::new("deal-1")).unwrap();
        assert_eq!(doc.text(), "will pay the Underwriter a fee of $1,000");
        assert_eq!(
            source.document_text(&DocumentId::new("deal-2")).unwrap(),
            "no fee here"
        );
        assert!(source
            .location(&DocumentId::new("deal-2"))
            .unwrap()
            .ends_with("deal-2.html"));
    }

    #[test]
    fn test_duplicate_stems_keep_first_path() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", b"text");
        write(dir.path(), "a.html", b"<p>html</p>");

        let source = FsDocumentSource::open(dir.path()).unwrap();
        assert_eq!(source.document_ids().len(), 1);
        assert!(source.path_of(&DocumentId::new("a")).unwrap().ends_with("a.html"));
    }

    #[test]
    fn test_missing_document_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsDocumentSource::open(dir.path()).unwrap();
        assert!(matches!(
            source.document_text(&DocumentId::new("nope")),
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(
            FsDocumentSource::open(dir.path().join("missing")),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_text_is_an_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.txt", &[0x66, 0xff, 0xfe]);
        let source = FsDocumentSource::open(dir.path()).unwrap();
        assert!(matches!(
            source.document_text(&DocumentId::new("bad")),
            Err(SourceError::Encoding(_))
        ));
    }
}
