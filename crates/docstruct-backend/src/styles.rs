//! Style registry parsed from `word/styles.xml`
//!
//! The classifier consults styles for three things: the style name (heading
//! detection), the base-style chain (style-linked numbering), and the style's
//! own run properties (bold and font size for the typographic gate).
//!
//! ## XML structure
//! ```xml
//! <w:styles>
//!   <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
//!     <w:name w:val="Normal"/>
//!   </w:style>
//!   <w:style w:type="paragraph" w:styleId="Heading1">
//!     <w:name w:val="Heading 1"/>
//!     <w:basedOn w:val="Normal"/>
//!     <w:rPr><w:b/><w:sz w:val="28"/></w:rPr>
//!   </w:style>
//! </w:styles>
//! ```

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

/// One style definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleDef {
    /// Style id (`w:styleId`)
    pub style_id: String,
    /// Display name (`w:name`)
    pub name: Option<String>,
    /// Base style id (`w:basedOn`)
    pub based_on: Option<String>,
    /// Bold flag from the style's own run properties
    pub font_bold: Option<bool>,
    /// Font size in points from the style's own run properties
    pub font_size_pt: Option<f32>,
}

/// All styles of a document, with the default paragraph style resolved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleRegistry {
    styles: HashMap<String, StyleDef>,
    default_paragraph: Option<String>,
}

impl StyleRegistry {
    /// Parse `styles.xml`. Parsing is best-effort: a malformed tail is logged
    /// and the styles read so far are kept.
    #[must_use = "returns the parsed style registry"]
    pub fn parse(xml: &str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut styles = HashMap::new();
        let mut default_paragraph: Option<String> = None;

        let mut in_style = false;
        let mut in_rpr = false;
        let mut in_tbl_style_pr = false;
        let mut is_default_paragraph = false;
        let mut current = StyleDef::default();

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e) | Event::Empty(ref e)) => match e.name().as_ref() {
                    b"w:style" => {
                        in_style = true;
                        current = StyleDef {
                            style_id: get_attr(e, b"w:styleId").unwrap_or_default(),
                            ..StyleDef::default()
                        };
                        let style_type = get_attr(e, b"w:type");
                        let is_default = matches!(
                            get_attr(e, b"w:default").as_deref(),
                            Some("1" | "true")
                        );
                        is_default_paragraph =
                            is_default && style_type.as_deref() == Some("paragraph");
                    }
                    // conditional-format sub-styles carry their own names and
                    // run properties which must not leak into the style
                    b"w:tblStylePr" if in_style => in_tbl_style_pr = true,
                    b"w:rPr" if in_style && !in_tbl_style_pr => in_rpr = true,
                    b"w:name" if in_style && !in_tbl_style_pr => {
                        current.name = get_attr(e, b"w:val");
                    }
                    b"w:basedOn" if in_style && !in_tbl_style_pr => {
                        current.based_on = get_attr(e, b"w:val");
                    }
                    b"w:b" if in_rpr => {
                        current.font_bold = Some(!val_off(e));
                    }
                    b"w:sz" if in_rpr => {
                        // w:sz carries half-points
                        if let Some(half_points) =
                            get_attr(e, b"w:val").and_then(|v| v.parse::<f32>().ok())
                        {
                            current.font_size_pt = Some(half_points / 2.0);
                        }
                    }
                    _ => {}
                },
                Ok(Event::End(ref e)) => match e.name().as_ref() {
                    b"w:style" => {
                        if !current.style_id.is_empty() {
                            if is_default_paragraph {
                                default_paragraph = Some(current.style_id.clone());
                            }
                            styles.insert(current.style_id.clone(), std::mem::take(&mut current));
                        }
                        in_style = false;
                        in_rpr = false;
                        in_tbl_style_pr = false;
                        is_default_paragraph = false;
                    }
                    b"w:rPr" => in_rpr = false,
                    b"w:tblStylePr" => in_tbl_style_pr = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    log::warn!("stopping styles.xml parse early: {e}");
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        Self {
            styles,
            default_paragraph,
        }
    }

    /// Create an empty registry (document without a styles part).
    #[inline]
    #[must_use = "creates an empty style registry"]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a style by id.
    #[inline]
    #[must_use = "returns the style definition if present"]
    pub fn get(&self, style_id: &str) -> Option<&StyleDef> {
        self.styles.get(style_id)
    }

    /// Resolve a paragraph's style: its explicit id, or the document default.
    #[must_use = "returns the resolved style definition if any"]
    pub fn resolve(&self, style_id: Option<&str>) -> Option<&StyleDef> {
        match style_id {
            Some(id) => self.get(id),
            None => self
                .default_paragraph
                .as_deref()
                .and_then(|id| self.get(id)),
        }
    }
}

#[inline]
fn get_attr(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| std::str::from_utf8(&a.value).ok().map(str::to_string))
}

/// Check if w:val explicitly turns the property off ("0" or "false")
#[inline]
fn val_off(e: &quick_xml::events::BytesStart<'_>) -> bool {
    matches!(get_attr(e, b"w:val").as_deref(), Some("0" | "false"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES_XML: &str = r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
        <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
            <w:name w:val="Normal"/>
            <w:rPr><w:sz w:val="24"/></w:rPr>
        </w:style>
        <w:style w:type="paragraph" w:styleId="Heading1">
            <w:name w:val="Heading 1"/>
            <w:basedOn w:val="Normal"/>
            <w:rPr><w:b/><w:sz w:val="32"/></w:rPr>
        </w:style>
        <w:style w:type="paragraph" w:styleId="Quiet">
            <w:name w:val="Quiet"/>
            <w:rPr><w:b w:val="0"/></w:rPr>
        </w:style>
    </w:styles>"#;

    #[test]
    fn parses_names_bases_and_run_properties() {
        let registry = StyleRegistry::parse(STYLES_XML);
        let heading = registry.get("Heading1").unwrap();
        assert_eq!(heading.name.as_deref(), Some("Heading 1"));
        assert_eq!(heading.based_on.as_deref(), Some("Normal"));
        assert_eq!(heading.font_bold, Some(true));
        assert_eq!(heading.font_size_pt, Some(16.0));
    }

    #[test]
    fn explicit_off_bold_is_false() {
        let registry = StyleRegistry::parse(STYLES_XML);
        assert_eq!(registry.get("Quiet").unwrap().font_bold, Some(false));
    }

    #[test]
    fn resolves_default_paragraph_style() {
        let registry = StyleRegistry::parse(STYLES_XML);
        let default = registry.resolve(None).unwrap();
        assert_eq!(default.style_id, "Normal");
        assert_eq!(default.font_size_pt, Some(12.0));
        let explicit = registry.resolve(Some("Heading1")).unwrap();
        assert_eq!(explicit.style_id, "Heading1");
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = StyleRegistry::empty();
        assert!(registry.resolve(None).is_none());
        assert!(registry.resolve(Some("Normal")).is_none());
    }

    #[test]
    fn table_substyle_properties_do_not_leak() {
        let xml = r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
            <w:style w:type="table" w:styleId="Grid">
                <w:name w:val="Grid"/>
                <w:tblStylePr w:type="firstRow">
                    <w:rPr><w:b/></w:rPr>
                </w:tblStylePr>
            </w:style>
        </w:styles>"#;
        let registry = StyleRegistry::parse(xml);
        assert_eq!(registry.get("Grid").unwrap().font_bold, None);
    }
}
