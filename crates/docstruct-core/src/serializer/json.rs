//! JSON serialization of the element stream
//!
//! Renders the stream as an ordered list of elements keyed by their
//! hierarchical context: titles carry their own text, subtitles and body text
//! point back to their ancestors through the breadcrumb, and table cells are
//! indexed by their row/column header cells.

use crate::config::ConvertOptions;
use crate::content::{DocumentStream, Element, NumSource, ParagraphItem, TableItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Options for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JsonOptions {
    /// Character budget of title labels before truncation
    pub title_max_chars: usize,
    /// Pretty-print with indentation (default: false)
    pub pretty: bool,
}

impl Default for JsonOptions {
    #[inline]
    fn default() -> Self {
        Self {
            title_max_chars: 35,
            pretty: false,
        }
    }
}

impl From<&ConvertOptions> for JsonOptions {
    #[inline]
    fn from(options: &ConvertOptions) -> Self {
        Self {
            title_max_chars: options.toc_header_max_chars,
            pretty: false,
        }
    }
}

/// Content type of a serialized element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    /// Top-level title paragraph
    #[serde(rename = "text/title")]
    Title,
    /// Nested subtitle paragraph
    #[serde(rename = "text/subtitle")]
    Subtitle,
    /// Body text paragraph
    #[serde(rename = "text")]
    Text,
    /// Table
    #[serde(rename = "table")]
    Table,
}

/// A serialized element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonElement {
    /// Element kind
    #[serde(rename = "content-type")]
    pub content_type: ContentType,
    /// Top-level context: own text for titles, depth-1 ancestor otherwise
    pub title: String,
    /// Truncated text of the deepest ancestor (or of the subtitle itself)
    #[serde(rename = "sub-title")]
    pub sub_title: String,
    /// Paragraph text, or the indexed cell records of a table
    pub content: ElementContent,
}

/// Content payload of a serialized element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementContent {
    /// Paragraph text
    Text(String),
    /// Indexed table cells
    Cells(Vec<CellRecord>),
}

/// One indexed table cell (or a group of cells sharing the same indices)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    /// 1-based data row index
    pub row: usize,
    /// 1-based data column index within the row
    pub col: usize,
    /// Colon-joined texts of the row-header cells spanning this cell
    #[serde(rename = "sub-title-row")]
    pub sub_title_row: String,
    /// Colon-joined texts of the column-header cells spanning this cell
    #[serde(rename = "sub-title-col")]
    pub sub_title_col: String,
    /// Cell text, or the list of grouped cell texts
    pub value: CellValue,
}

/// Scalar or grouped cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// A single cell text
    One(String),
    /// Texts of several cells sharing the same indices
    Many(Vec<String>),
}

/// JSON serializer for a [`DocumentStream`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonSerializer {
    options: JsonOptions,
}

impl JsonSerializer {
    /// Create a serializer with default options.
    #[inline]
    #[must_use = "creates a serializer with default options"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a serializer with custom options.
    #[inline]
    #[must_use = "creates a serializer with custom options"]
    pub const fn with_options(options: JsonOptions) -> Self {
        Self { options }
    }

    /// Render the stream as a list of elements.
    #[must_use = "returns the serialized element list"]
    pub fn serialize(&self, stream: &DocumentStream) -> Vec<JsonElement> {
        let mut indexed: HashMap<String, String> = HashMap::new();
        let mut elements = Vec::new();
        for element in &stream.elements {
            match element {
                Element::Root(node) => {
                    if let Some(anchor) = &node.anchor {
                        indexed.insert(anchor.clone(), node.prefix.clone());
                    }
                }
                Element::Paragraph(par) => {
                    if let Some(anchor) = &par.node.anchor {
                        indexed.insert(anchor.clone(), par.full_text());
                    }
                    elements.push(self.paragraph_element(par, &indexed));
                }
                Element::Table(table) => elements.push(self.table_element(table, &indexed)),
            }
        }
        elements
    }

    /// Render the stream as a JSON string. A serialization failure is turned
    /// into a `{"result": "Failed", "traceback": …}` object for operator
    /// triage instead of failing the conversion.
    #[must_use = "returns the rendered JSON string"]
    pub fn to_json_string(&self, stream: &DocumentStream) -> String {
        let elements = self.serialize(stream);
        let rendered = if self.options.pretty {
            serde_json::to_string_pretty(&elements)
        } else {
            serde_json::to_string(&elements)
        };
        match rendered {
            Ok(json) => json,
            Err(e) => {
                serde_json::json!({ "result": "Failed", "traceback": e.to_string() }).to_string()
            }
        }
    }

    fn paragraph_element(
        &self,
        par: &ParagraphItem,
        indexed: &HashMap<String, String>,
    ) -> JsonElement {
        // Paragraphs numbered through the synthetic default abstract read as
        // body text: their prefix is a sentinel, not document numbering.
        let depth = if par.node.has_default_prefix() {
            0
        } else {
            par.node.depth
        };
        if depth == 1 {
            JsonElement {
                content_type: ContentType::Title,
                title: par.full_text(),
                sub_title: String::new(),
                content: ElementContent::Text(String::new()),
            }
        } else if depth > 1 {
            let prefix_chars = if matches!(
                par.node.source,
                Some(NumSource::Heading | NumSource::Appendix)
            ) {
                0
            } else {
                par.node.prefix.chars().count()
            };
            let full = par.full_text();
            let content: String = full.chars().skip(prefix_chars).collect();
            JsonElement {
                content_type: ContentType::Subtitle,
                title: ancestor_text(par, 1, indexed),
                sub_title: self.make_title(&full),
                content: ElementContent::Text(content.trim().to_string()),
            }
        } else {
            JsonElement {
                content_type: ContentType::Text,
                title: ancestor_text(par, 1, indexed),
                sub_title: self.make_title(&deepest_ancestor_text(&par.node.parents, indexed)),
                content: ElementContent::Text(par.full_text()),
            }
        }
    }

    fn table_element(&self, table: &TableItem, indexed: &HashMap<String, String>) -> JsonElement {
        JsonElement {
            content_type: ContentType::Table,
            title: table.node.prefix.clone(),
            sub_title: self.make_title(&deepest_ancestor_text(&table.node.parents, indexed)),
            content: ElementContent::Cells(table_content(table)),
        }
    }

    fn make_title(&self, text: &str) -> String {
        let max = self.options.title_max_chars;
        if text.chars().count() > max {
            let mut truncated: String = text.chars().take(max).collect();
            truncated.push_str("...");
            truncated
        } else {
            text.to_string()
        }
    }
}

fn ancestor_text(
    par: &ParagraphItem,
    depth: usize,
    indexed: &HashMap<String, String>,
) -> String {
    par.node
        .parents
        .get(&depth)
        .and_then(|anchor| indexed.get(anchor))
        .cloned()
        .unwrap_or_default()
}

fn deepest_ancestor_text(
    parents: &std::collections::BTreeMap<usize, String>,
    indexed: &HashMap<String, String>,
) -> String {
    parents
        .values()
        .next_back()
        .and_then(|anchor| indexed.get(anchor))
        .cloned()
        .unwrap_or_default()
}

/// Index cell emitted before grouping
struct RawRecord {
    row: usize,
    col: usize,
    sub_title_row: String,
    sub_title_col: String,
    value: String,
}

/// Index the content cells of a table by their header cells.
fn table_content(table: &TableItem) -> Vec<CellRecord> {
    let Some(first_row) = table.rows.first() else {
        return Vec::new();
    };
    let Some(left_top) = first_row.first() else {
        return Vec::new();
    };
    let (content_x_left, row_prefix) = if first_row.len() > 1 {
        let prefix = if left_top.text.is_empty() {
            String::new()
        } else {
            format!("{}: ", left_top.text)
        };
        (left_top.x + left_top.colspan, prefix)
    } else {
        (0, String::new())
    };
    let content_y_top = left_top.y + left_top.rowspan;

    let mut content = Vec::new();
    let mut row_index = 0;
    for row in &table.rows {
        let mut col_index = 0;
        let mut row_records = Vec::new();
        for cell in row {
            if cell.x >= content_x_left && cell.y >= content_y_top && !cell.text.is_empty() {
                if col_index == 0 {
                    row_index += 1;
                }
                col_index += 1;
                row_records.push(RawRecord {
                    row: row_index,
                    col: col_index,
                    sub_title_row: format!(
                        "{row_prefix}{}",
                        row_header_index(table, cell.y, cell.rowspan, content_x_left)
                    ),
                    sub_title_col: col_header_index(table, cell.x, cell.colspan, content_y_top),
                    value: cell.text.clone(),
                });
            }
        }
        content.extend(group_by_index(row_records));
    }
    content
}

/// Colon-joined texts of index cells left of the content range that span the
/// given row range.
fn row_header_index(table: &TableItem, y: usize, rowspan: usize, content_x_left: usize) -> String {
    let mut index = Vec::new();
    for row in &table.rows {
        for idx_cell in row {
            if idx_cell.x >= content_x_left || idx_cell.y > y {
                break;
            }
            if idx_cell.y <= y
                && y + rowspan <= idx_cell.y + idx_cell.rowspan
                && !idx_cell.text.is_empty()
            {
                index.push(idx_cell.text.clone());
            }
        }
    }
    index.join(": ")
}

/// Colon-joined texts of index cells above the content range that span the
/// given column range.
fn col_header_index(table: &TableItem, x: usize, colspan: usize, content_y_top: usize) -> String {
    let mut index = Vec::new();
    for row in &table.rows {
        for idx_cell in row {
            if idx_cell.y >= content_y_top || idx_cell.x > x {
                break;
            }
            if idx_cell.x <= x
                && x + colspan <= idx_cell.x + idx_cell.colspan
                && !idx_cell.text.is_empty()
            {
                index.push(idx_cell.text.clone());
            }
        }
    }
    index.join(": ")
}

/// Merge the records of one row that share both index keys. The merged record
/// keeps the first row index, the smallest column index and every value in
/// emission order.
fn group_by_index(records: Vec<RawRecord>) -> Vec<CellRecord> {
    let mut grouped: Vec<CellRecord> = Vec::new();
    for record in records {
        if let Some(existing) = grouped.iter_mut().find(|g| {
            g.sub_title_row == record.sub_title_row && g.sub_title_col == record.sub_title_col
        }) {
            existing.col = existing.col.min(record.col);
            let value = std::mem::replace(&mut existing.value, CellValue::Many(Vec::new()));
            existing.value = match value {
                CellValue::One(first) => CellValue::Many(vec![first, record.value]),
                CellValue::Many(mut values) => {
                    values.push(record.value);
                    CellValue::Many(values)
                }
            };
        } else {
            grouped.push(CellRecord {
                row: record.row,
                col: record.col,
                sub_title_row: record.sub_title_row,
                sub_title_col: record.sub_title_col,
                value: CellValue::One(record.value),
            });
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{CellItem, Node, DOC_START_ANCHOR};

    fn par(text: &str, prefix: &str, depth: usize, source: NumSource, anchor: &str) -> ParagraphItem {
        let mut node = Node::new(prefix, depth, source);
        if !anchor.is_empty() {
            node.anchor = Some(anchor.to_string());
        }
        node.parents.insert(1, DOC_START_ANCHOR.to_string());
        ParagraphItem {
            text: text.to_string(),
            bold: true,
            alignment: None,
            node,
        }
    }

    fn cell(x: usize, y: usize, colspan: usize, rowspan: usize, text: &str) -> CellItem {
        CellItem {
            x,
            y,
            rowspan,
            colspan,
            text: text.to_string(),
            ..CellItem::default()
        }
    }

    #[test]
    fn empty_document_serializes_to_empty_list() {
        let stream = DocumentStream::new();
        let serializer = JsonSerializer::new();
        assert!(serializer.serialize(&stream).is_empty());
        assert_eq!(serializer.to_json_string(&stream), "[]");
    }

    #[test]
    fn title_element_carries_own_text() {
        let mut stream = DocumentStream::new();
        stream.elements.push(Element::Paragraph(par(
            "Overview",
            "Overview",
            1,
            NumSource::Heading,
            "par1",
        )));
        let elements = JsonSerializer::new().serialize(&stream);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].content_type, ContentType::Title);
        assert_eq!(elements[0].title, "Overview");
        assert_eq!(elements[0].sub_title, "");
        assert_eq!(elements[0].content, ElementContent::Text(String::new()));
    }

    #[test]
    fn subtitle_strips_builtin_prefix() {
        let mut stream = DocumentStream::new();
        let title = par("Intro", "Intro", 1, NumSource::Heading, "par1");
        let mut sub = par("Primary", "2.1.", 2, NumSource::Builtin, "par2");
        sub.node.parents.insert(1, "par1".to_string());
        sub.node.parents.insert(2, "par2".to_string());
        stream.elements.push(Element::Paragraph(title));
        stream.elements.push(Element::Paragraph(sub));
        let elements = JsonSerializer::new().serialize(&stream);
        assert_eq!(elements[1].content_type, ContentType::Subtitle);
        assert_eq!(elements[1].title, "Intro");
        assert_eq!(elements[1].sub_title, "2.1. Primary");
        assert_eq!(elements[1].content, ElementContent::Text("Primary".to_string()));
    }

    #[test]
    fn subtitle_keeps_appendix_text_whole() {
        let mut stream = DocumentStream::new();
        let mut sub = par(
            "Приложение А\nсостав изделия",
            "Приложение А",
            2,
            NumSource::Appendix,
            "par1",
        );
        sub.node.parents.insert(2, "par1".to_string());
        stream.elements.push(Element::Paragraph(sub));
        let elements = JsonSerializer::new().serialize(&stream);
        assert_eq!(
            elements[0].content,
            ElementContent::Text("Приложение А\nсостав изделия".to_string())
        );
    }

    #[test]
    fn body_text_points_to_deepest_ancestor() {
        let mut stream = DocumentStream::new();
        let title = par("Intro", "Intro", 1, NumSource::Heading, "par1");
        let mut sub = par("Scope", "1.1.", 2, NumSource::Builtin, "par2");
        sub.node.parents.insert(1, "par1".to_string());
        sub.node.parents.insert(2, "par2".to_string());
        let mut body = par("Body line.", "", 0, NumSource::Builtin, "");
        body.node.source = None;
        body.node.parents.insert(1, "par1".to_string());
        body.node.parents.insert(2, "par2".to_string());
        stream.elements.push(Element::Paragraph(title));
        stream.elements.push(Element::Paragraph(sub));
        stream.elements.push(Element::Paragraph(body));
        let elements = JsonSerializer::new().serialize(&stream);
        assert_eq!(elements[2].content_type, ContentType::Text);
        assert_eq!(elements[2].title, "Intro");
        assert_eq!(elements[2].sub_title, "1.1. Scope");
        assert_eq!(elements[2].content, ElementContent::Text("Body line.".to_string()));
    }

    #[test]
    fn default_sentinel_paragraph_reads_as_body_text() {
        let mut stream = DocumentStream::new();
        let mut sub = par("Orphan", "default 1.%2.", 1, NumSource::Builtin, "par1");
        sub.node.parents.insert(1, "par1".to_string());
        stream.elements.push(Element::Paragraph(sub));
        let elements = JsonSerializer::new().serialize(&stream);
        assert_eq!(elements[0].content_type, ContentType::Text);
        assert_eq!(elements[0].content, ElementContent::Text("Orphan".to_string()));
    }

    #[test]
    fn sub_title_is_truncated() {
        let long = "к".repeat(60);
        let mut stream = DocumentStream::new();
        let title = par(&long, &long, 1, NumSource::Heading, "par1");
        let mut body = par("text", "", 0, NumSource::Heading, "");
        body.node.source = None;
        body.node.parents.insert(1, "par1".to_string());
        stream.elements.push(Element::Paragraph(title));
        stream.elements.push(Element::Paragraph(body));
        let elements = JsonSerializer::new().serialize(&stream);
        assert_eq!(elements[1].sub_title.chars().count(), 38);
        assert!(elements[1].sub_title.ends_with("..."));
    }

    fn indexed_table() -> TableItem {
        let mut node = Node::new("Таблица 1", 2, NumSource::Table);
        node.anchor = Some("table1".to_string());
        node.parents.insert(1, DOC_START_ANCHOR.to_string());
        let mut table = TableItem::new(node);
        table.rows.push(vec![
            cell(0, 0, 1, 1, ""),
            cell(1, 0, 1, 1, "A"),
            cell(2, 0, 1, 1, "B"),
        ]);
        table.rows.push(vec![
            cell(0, 1, 1, 1, "r1"),
            cell(1, 1, 1, 1, "1"),
            cell(2, 1, 1, 1, "2"),
        ]);
        table.rows.push(vec![
            cell(0, 2, 1, 1, "r2"),
            cell(1, 2, 1, 1, "3"),
            cell(2, 2, 1, 1, "4"),
        ]);
        table
    }

    #[test]
    fn table_cells_are_indexed_by_headers() {
        let mut stream = DocumentStream::new();
        stream.elements.push(Element::Table(indexed_table()));
        let elements = JsonSerializer::new().serialize(&stream);
        assert_eq!(elements[0].content_type, ContentType::Table);
        assert_eq!(elements[0].title, "Таблица 1");
        let ElementContent::Cells(records) = &elements[0].content else {
            panic!("expected cell records");
        };
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].row, 1);
        assert_eq!(records[0].col, 1);
        assert_eq!(records[0].sub_title_row, "r1");
        assert_eq!(records[0].sub_title_col, "A");
        assert_eq!(records[0].value, CellValue::One("1".to_string()));
        assert_eq!(records[3].row, 2);
        assert_eq!(records[3].col, 2);
        assert_eq!(records[3].sub_title_row, "r2");
        assert_eq!(records[3].sub_title_col, "B");
    }

    #[test]
    fn row_prefix_joins_corner_cell_text() {
        let mut table = indexed_table();
        table.rows[0][0].text = "Param".to_string();
        let mut stream = DocumentStream::new();
        stream.elements.push(Element::Table(table));
        let elements = JsonSerializer::new().serialize(&stream);
        let ElementContent::Cells(records) = &elements[0].content else {
            panic!("expected cell records");
        };
        assert_eq!(records[0].sub_title_row, "Param: r1");
    }

    #[test]
    fn cells_under_one_spanning_header_are_grouped() {
        let mut node = Node::new("Таблица", 2, NumSource::Table);
        node.anchor = Some("table1".to_string());
        let mut table = TableItem::new(node);
        table.rows.push(vec![
            cell(0, 0, 1, 1, ""),
            cell(1, 0, 2, 1, "A"),
        ]);
        table.rows.push(vec![
            cell(0, 1, 1, 1, "r1"),
            cell(1, 1, 1, 1, "1"),
            cell(2, 1, 1, 1, "2"),
        ]);
        let mut stream = DocumentStream::new();
        stream.elements.push(Element::Table(table));
        let elements = JsonSerializer::new().serialize(&stream);
        let ElementContent::Cells(records) = &elements[0].content else {
            panic!("expected cell records");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].col, 1);
        assert_eq!(
            records[0].value,
            CellValue::Many(vec!["1".to_string(), "2".to_string()])
        );
    }

    #[test]
    fn json_round_trip_is_structurally_equal() {
        let mut stream = DocumentStream::new();
        stream.elements.push(Element::Paragraph(par(
            "Intro",
            "Intro",
            1,
            NumSource::Heading,
            "par1",
        )));
        stream.elements.push(Element::Table(indexed_table()));
        let serializer = JsonSerializer::new();
        let elements = serializer.serialize(&stream);
        let json = serializer.to_json_string(&stream);
        let back: Vec<JsonElement> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, elements);
        assert!(json.contains("\"content-type\":\"text/title\""));
        assert!(json.contains("\"sub-title-row\""));
        // non-ASCII survives untouched
        assert!(json.contains("Таблица 1"));
    }
}
