//! HTML serialization of the element stream
//!
//! Produces two parallel strings: the document body (anchored divs, headings,
//! paragraphs and tables) and a table of contents made of `<a href="#anchor">`
//! links, root link first. Anchors in the TOC always resolve to ids in the
//! body.

use crate::config::ConvertOptions;
use crate::content::{DocumentStream, Element, ParagraphItem, TableItem};

/// Options for HTML serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HtmlOptions {
    /// Character budget of TOC labels before truncation
    pub toc_header_max_chars: usize,
    /// Deepest heading tag emitted (`h1`..`h9`)
    pub heading_tag_depth_clamp: usize,
}

impl Default for HtmlOptions {
    #[inline]
    fn default() -> Self {
        Self {
            toc_header_max_chars: 35,
            heading_tag_depth_clamp: 9,
        }
    }
}

impl From<&ConvertOptions> for HtmlOptions {
    #[inline]
    fn from(options: &ConvertOptions) -> Self {
        Self {
            toc_header_max_chars: options.toc_header_max_chars,
            heading_tag_depth_clamp: options.heading_tag_depth_clamp,
        }
    }
}

/// HTML serializer for a [`DocumentStream`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HtmlSerializer {
    options: HtmlOptions,
}

impl HtmlSerializer {
    /// Create a serializer with default options.
    #[inline]
    #[must_use = "creates a serializer with default options"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a serializer with custom options.
    #[inline]
    #[must_use = "creates a serializer with custom options"]
    pub const fn with_options(options: HtmlOptions) -> Self {
        Self { options }
    }

    /// Render the stream as `(body_html, toc_html)`.
    #[must_use = "returns the rendered body and TOC strings"]
    pub fn serialize(&self, stream: &DocumentStream) -> (String, String) {
        let mut body = String::new();
        let mut toc = String::new();
        for element in &stream.elements {
            match element {
                Element::Root(node) => {
                    let anchor = node.anchor.as_deref().unwrap_or_default();
                    body.push_str(&format!("<div id=\"{anchor}\"></div>"));
                    toc.push_str(&self.toc_link(anchor, &node.prefix, node.depth));
                }
                Element::Paragraph(par) => self.paragraph_html(par, &mut body, &mut toc),
                Element::Table(table) => self.table_html(table, &mut body, &mut toc),
            }
        }
        (body, toc)
    }

    fn paragraph_html(&self, par: &ParagraphItem, body: &mut String, toc: &mut String) {
        let classes = breadcrumb_classes(par);
        let css = paragraph_style(par);
        let text = escape_html(&par.full_text());
        if par.node.depth > 0 {
            let level = par.node.depth.min(self.options.heading_tag_depth_clamp).max(1);
            let anchor = par.node.anchor.as_deref().unwrap_or_default();
            toc.push_str(&self.toc_link(anchor, &par.full_text(), par.node.depth));
            body.push_str(&format!(
                "<div style=\"{css}\"><h{level} id=\"{anchor}\" class=\"{classes}\">{text}</h{level}></div>"
            ));
        } else {
            body.push_str(&format!(
                "<div style=\"{css}\"><p class=\"{classes}\">{text}</p></div>"
            ));
        }
    }

    fn table_html(&self, table: &TableItem, body: &mut String, toc: &mut String) {
        let classes = table.node.parents.values().cloned().collect::<Vec<_>>().join(" ");
        let anchor = table.node.anchor.as_deref().unwrap_or_default();
        let title = escape_html(&table.node.prefix);
        toc.push_str(&self.toc_link(anchor, &table.node.prefix, table.node.depth));
        body.push_str(&format!(
            "<table id=\"{anchor}\" class=\"w3-table w3-hoverable {classes}\" title=\"{title}\">"
        ));
        for (i, row) in table.rows.iter().enumerate() {
            body.push_str("<tr>");
            let cell_tag = if i == 0 { "th" } else { "td" };
            for cell in row {
                let cell_text = escape_html(&cell.text).replace('\n', "<br>");
                body.push_str(&format!("<{cell_tag}>{cell_text}</{cell_tag}>"));
            }
            body.push_str("</tr>");
        }
        body.push_str("</table>");
    }

    fn toc_link(&self, anchor: &str, text: &str, depth: usize) -> String {
        let label = make_toc_header(text, depth, self.options.toc_header_max_chars);
        format!("<a href=\"#{anchor}\">{label}</a><br>")
    }
}

/// Indent a TOC label by depth, truncate it, then escape for HTML.
fn make_toc_header(text: &str, depth: usize, max_chars: usize) -> String {
    let mut label = "__".repeat(depth.saturating_sub(1));
    label.push_str(text);
    if label.chars().count() > max_chars {
        label = label.chars().take(max_chars).collect();
        label.push_str("...");
    }
    escape_html(&label)
}

fn breadcrumb_classes(par: &ParagraphItem) -> String {
    par.node.parents.values().cloned().collect::<Vec<_>>().join(" ")
}

fn paragraph_style(par: &ParagraphItem) -> String {
    let mut css = String::new();
    if let Some(alignment) = par.alignment {
        css.push_str(&format!("text-align: {};", alignment.as_css()));
    }
    if par.bold {
        css.push_str("font-weight: bold;");
    }
    css
}

/// Escape a string for HTML element and attribute contexts.
#[must_use = "returns the escaped string"]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Alignment, CellItem, Node, NumSource};

    fn heading(text: &str, depth: usize, anchor: &str) -> ParagraphItem {
        let mut node = Node::new("", depth, NumSource::Heading);
        node.anchor = Some(anchor.to_string());
        node.parents.insert(1, anchor.to_string());
        ParagraphItem {
            text: text.to_string(),
            bold: true,
            alignment: None,
            node,
        }
    }

    #[test]
    fn escapes_html_metacharacters() {
        assert_eq!(
            escape_html(r#"a < b & "c" > 'd'"#),
            "a &lt; b &amp; &quot;c&quot; &gt; &#x27;d&#x27;"
        );
    }

    #[test]
    fn root_only_stream_renders_placeholder_and_link() {
        let stream = DocumentStream::new();
        let (body, toc) = HtmlSerializer::new().serialize(&stream);
        assert_eq!(body, "<div id=\"default-start-doc\"></div>");
        assert_eq!(
            toc,
            "<a href=\"#default-start-doc\">[Начало документа]</a><br>"
        );
    }

    #[test]
    fn heading_paragraph_gets_anchor_and_toc_entry() {
        let mut stream = DocumentStream::new();
        stream
            .elements
            .push(Element::Paragraph(heading("Overview", 1, "par1")));
        let (body, toc) = HtmlSerializer::new().serialize(&stream);
        assert!(body.contains("<h1 id=\"par1\" class=\"par1\">Overview</h1>"));
        assert!(body.contains("font-weight: bold;"));
        assert!(toc.contains("<a href=\"#par1\">Overview</a><br>"));
    }

    #[test]
    fn body_paragraph_has_no_toc_entry() {
        let mut stream = DocumentStream::new();
        let mut node = Node::default();
        node.parents.insert(1, "default-start-doc".to_string());
        stream.elements.push(Element::Paragraph(ParagraphItem {
            text: "plain body".to_string(),
            bold: false,
            alignment: Some(Alignment::Justify),
            node,
        }));
        let (body, toc) = HtmlSerializer::new().serialize(&stream);
        assert!(body.contains(
            "<div style=\"text-align: justify;\"><p class=\"default-start-doc\">plain body</p></div>"
        ));
        // only the root link
        assert_eq!(toc.matches("<a href=").count(), 1);
    }

    #[test]
    fn toc_label_is_indented_and_truncated() {
        let long = "a".repeat(50);
        let label = make_toc_header(&long, 3, 35);
        assert!(label.starts_with("____aaaa"));
        assert!(label.ends_with("..."));
        // four underscores plus 31 characters of text, then the ellipsis
        assert_eq!(label.chars().count(), 38);
    }

    #[test]
    fn heading_tag_is_clamped() {
        let mut stream = DocumentStream::new();
        stream
            .elements
            .push(Element::Paragraph(heading("deep", 12, "par1")));
        let (body, _) = HtmlSerializer::new().serialize(&stream);
        assert!(body.contains("<h9 id=\"par1\""));
        assert!(!body.contains("<h12"));
    }

    #[test]
    fn table_renders_header_row_and_breaks() {
        let mut node = Node::new("Таблица 1", 2, NumSource::Table);
        node.anchor = Some("table1".to_string());
        node.parents.insert(1, "default-start-doc".to_string());
        let mut table = TableItem::new(node);
        table.rows.push(vec![
            CellItem {
                text: "A".to_string(),
                ..CellItem::default()
            },
            CellItem {
                text: "B".to_string(),
                ..CellItem::default()
            },
        ]);
        table.rows.push(vec![
            CellItem {
                text: "first\nsecond".to_string(),
                ..CellItem::default()
            },
            CellItem {
                text: "2".to_string(),
                ..CellItem::default()
            },
        ]);
        let mut stream = DocumentStream::new();
        stream.elements.push(Element::Table(table));
        let (body, toc) = HtmlSerializer::new().serialize(&stream);
        assert!(body.contains("<table id=\"table1\" class=\"w3-table w3-hoverable default-start-doc\" title=\"Таблица 1\">"));
        assert!(body.contains("<th>A</th><th>B</th>"));
        assert!(body.contains("<td>first<br>second</td><td>2</td>"));
        assert!(toc.contains("<a href=\"#table1\">__Таблица 1</a><br>"));
    }

    #[test]
    fn serialization_is_deterministic() {
        let mut stream = DocumentStream::new();
        stream
            .elements
            .push(Element::Paragraph(heading("Stable", 1, "par1")));
        let serializer = HtmlSerializer::new();
        assert_eq!(serializer.serialize(&stream), serializer.serialize(&stream));
    }
}
