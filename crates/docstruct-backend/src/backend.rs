//! DOCX backend: package in, element stream out
//!
//! One [`DocxBackend`] can convert any number of documents; every conversion
//! gets its own walker and numbering state, so concurrent use from separate
//! worker threads needs no locking beyond cloning the backend.

use crate::numbering::NumberingDb;
use crate::package::DocxPackage;
use crate::plausibility::{HeuristicPlausibility, PlausibilityModel};
use crate::styles::StyleRegistry;
use crate::walker::DocWalker;
use crate::xml::{attr_i64, child, is_elem};
use docstruct_core::{ConvertOptions, DocStructError, DocumentStream, Result};
use std::path::Path;

/// Converter from DOCX packages to [`DocumentStream`]s
#[derive(Debug)]
pub struct DocxBackend {
    options: ConvertOptions,
    model: Box<dyn PlausibilityModel>,
}

impl Default for DocxBackend {
    #[inline]
    fn default() -> Self {
        Self {
            options: ConvertOptions::default(),
            model: Box::new(HeuristicPlausibility),
        }
    }
}

impl DocxBackend {
    /// Create a backend with default options and the heuristic plausibility
    /// model.
    #[inline]
    #[must_use = "creates a backend with default options"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the conversion options.
    #[inline]
    #[must_use = "returns the backend with options configured"]
    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    /// Plug in an external plausibility model (the production deployment
    /// scores candidates with text classifiers).
    #[inline]
    #[must_use = "returns the backend with the model configured"]
    pub fn with_plausibility(mut self, model: Box<dyn PlausibilityModel>) -> Self {
        self.model = model;
        self
    }

    /// The active conversion options.
    #[inline]
    #[must_use = "returns the active options"]
    pub const fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert a DOCX package held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`DocStructError::InvalidPackage`] when the buffer is not a
    /// word-processing package.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<DocumentStream> {
        self.convert(&DocxPackage::from_bytes(bytes)?)
    }

    /// Convert a DOCX file.
    ///
    /// # Errors
    ///
    /// Returns [`DocStructError::Io`] when the file cannot be read and
    /// [`DocStructError::InvalidPackage`] when it is not a word-processing
    /// package.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<DocumentStream> {
        self.convert(&DocxPackage::from_path(path)?)
    }

    fn convert(&self, package: &DocxPackage) -> Result<DocumentStream> {
        let doc = roxmltree::Document::parse(&package.document_xml)
            .map_err(|e| DocStructError::InvalidPackage(format!("malformed document.xml: {e}")))?;
        let body = doc
            .root_element()
            .children()
            .find(|n| is_elem(*n, "body"))
            .ok_or_else(|| {
                DocStructError::InvalidPackage("document.xml has no w:body".to_string())
            })?;

        let styles = package
            .styles_xml
            .as_deref()
            .map(StyleRegistry::parse)
            .unwrap_or_default();
        let num_db = NumberingDb::new(
            package.numbering_xml.as_deref(),
            self.options,
            self.model.as_ref(),
        );
        let (page_width, page_height) = page_size(body, &self.options);

        let walker = DocWalker::new(styles, num_db, self.options, page_width, page_height);
        Ok(walker.walk(body))
    }
}

/// Page size from the body `w:sectPr`, falling back to the configured
/// defaults when the section properties are missing.
fn page_size(body: roxmltree::Node<'_, '_>, options: &ConvertOptions) -> (i64, i64) {
    let pg_sz = child(body, "sectPr").and_then(|sect| child(sect, "pgSz"));
    (
        pg_sz
            .and_then(|n| attr_i64(n, "w"))
            .unwrap_or(options.default_page_width),
        pg_sz
            .and_then(|n| attr_i64(n, "h"))
            .unwrap_or(options.default_page_height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    #[test]
    fn page_size_reads_sect_pr() {
        let xml = format!(
            "<w:body {NS}><w:sectPr><w:pgSz w:w=\"16840\" w:h=\"11907\"/></w:sectPr></w:body>"
        );
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let options = ConvertOptions::default();
        assert_eq!(page_size(doc.root_element(), &options), (16840, 11907));
    }

    #[test]
    fn page_size_falls_back_to_defaults() {
        let xml = format!("<w:body {NS}></w:body>");
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let options = ConvertOptions::default();
        assert_eq!(page_size(doc.root_element(), &options), (11907, 16840));
    }

    #[test]
    fn malformed_document_xml_is_an_invalid_package() {
        let backend = DocxBackend::new();
        let package = DocxPackage {
            document_xml: "<w:document".to_string(),
            styles_xml: None,
            numbering_xml: None,
        };
        assert!(matches!(
            backend.convert(&package),
            Err(DocStructError::InvalidPackage(_))
        ));
    }

    #[test]
    fn document_without_body_is_an_invalid_package() {
        let backend = DocxBackend::new();
        let package = DocxPackage {
            document_xml: format!("<w:document {NS}></w:document>"),
            styles_xml: None,
            numbering_xml: None,
        };
        assert!(matches!(
            backend.convert(&package),
            Err(DocStructError::InvalidPackage(_))
        ));
    }
}
