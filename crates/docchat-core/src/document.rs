//! PDF document loading.
//!
//! Text is extracted page by page and concatenated in page order with no
//! separator beyond what each page's own text carries.

use std::fs;
use std::path::Path;

use lopdf::Document;
use tracing::info;

use crate::error::DocumentError;

/// Source of per-page text for a PDF byte buffer.
pub trait PdfExtractor: Send + Sync {
    /// Text of each page, in page order.
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, DocumentError>;
}

/// Extracts the text layer with `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
        let doc = Document::load_mem(pdf_bytes)?;

        // get_pages is keyed by 1-based page number, so iteration is in page order
        doc.get_pages()
            .keys()
            .map(|&page| {
                doc.extract_text(&[page])
                    .map_err(|source| DocumentError::PageText { page, source })
            })
            .collect()
    }
}

/// An uploaded document after text extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub name: String,
    pub text: String,
    pub page_count: usize,
}

pub struct DocumentLoader<E = LopdfExtractor> {
    extractor: E,
}

impl DocumentLoader<LopdfExtractor> {
    pub fn new() -> Self {
        Self {
            extractor: LopdfExtractor,
        }
    }
}

impl Default for DocumentLoader<LopdfExtractor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: PdfExtractor> DocumentLoader<E> {
    pub fn with_extractor(extractor: E) -> Self {
        Self { extractor }
    }

    /// Concatenate every page's text in page order.
    pub fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, DocumentError> {
        Ok(self.load_bytes("", pdf_bytes)?.text)
    }

    /// Extract an uploaded buffer into a named document.
    pub fn load_bytes(&self, name: impl Into<String>, pdf_bytes: &[u8]) -> Result<LoadedDocument, DocumentError> {
        let pages = self.extractor.extract_pages(pdf_bytes)?;
        Ok(LoadedDocument {
            name: name.into(),
            page_count: pages.len(),
            text: pages.concat(),
        })
    }

    /// `None` when nothing was uploaded.
    pub fn load(&self, upload: Option<&[u8]>) -> Result<Option<String>, DocumentError> {
        upload.map(|bytes| self.extract_text(bytes)).transpose()
    }

    /// Read and extract a `.pdf` file from disk. Other extensions are refused
    /// before the file is opened.
    pub fn load_path(&self, path: &Path) -> Result<LoadedDocument, DocumentError> {
        if !is_pdf_path(path) {
            return Err(DocumentError::NotPdf(path.to_path_buf()));
        }

        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let document = self.load_bytes(name, &bytes)?;
        info!(
            document = %document.name,
            pages = document.page_count,
            chars = document.text.chars().count(),
            "document loaded"
        );
        Ok(document)
    }
}

pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
