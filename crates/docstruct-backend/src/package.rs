//! DOCX package access
//!
//! DOCX files are ZIP archives; the engine consumes three parts:
//! - `word/document.xml`: body content (required)
//! - `word/styles.xml`: style definitions (optional)
//! - `word/numbering.xml`: numbering definitions (optional)

use docstruct_core::{DocStructError, Result};
use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// The XML parts of an opened DOCX package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocxPackage {
    /// `word/document.xml` content
    pub document_xml: String,
    /// `word/styles.xml` content, when present
    pub styles_xml: Option<String>,
    /// `word/numbering.xml` content, when present
    pub numbering_xml: Option<String>,
}

impl DocxPackage {
    /// Open a package from an in-memory byte buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DocStructError::InvalidPackage`] when the buffer is not a ZIP
    /// archive or `word/document.xml` is missing or unreadable.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| DocStructError::InvalidPackage(format!("not a ZIP archive: {e}")))?;

        let document_xml = read_part(&mut archive, "word/document.xml")?.ok_or_else(|| {
            DocStructError::InvalidPackage("missing word/document.xml".to_string())
        })?;

        // styles.xml and numbering.xml are optional parts
        let styles_xml = read_part(&mut archive, "word/styles.xml")?;
        if styles_xml.is_none() {
            log::debug!("word/styles.xml absent, continuing with empty style registry");
        }
        let numbering_xml = read_part(&mut archive, "word/numbering.xml")?;
        if numbering_xml.is_none() {
            log::debug!("word/numbering.xml absent, continuing with empty numbering registry");
        }

        Ok(Self {
            document_xml,
            styles_xml,
            numbering_xml,
        })
    }

    /// Open a package from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`DocStructError::Io`] when the file cannot be read and
    /// [`DocStructError::InvalidPackage`] when it is not a DOCX package.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let Ok(mut file) = archive.by_name(name) else {
        return Ok(None);
    };
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(Some(content))
}
