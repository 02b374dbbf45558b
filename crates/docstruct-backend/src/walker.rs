//! Document walker: the single pass that produces the element stream
//!
//! Walks body content in document order, classifying paragraphs, suppressing
//! table-of-contents rows, maintaining the depth-indexed breadcrumb, and
//! stitching tables that continue across page breaks. Drawing-frame tables
//! are not emitted: their interior text re-enters the paragraph pipeline.

use crate::numbering::NumberingDb;
use crate::paragraph::{ParagraphSource, ParagraphView};
use crate::styles::StyleRegistry;
use crate::table::{TableCell, TableHandler};
use crate::xml::is_elem;
use docstruct_core::{
    CellItem, ConvertOptions, DocumentStream, Element, Node, NumSource, TableItem,
    DOC_START_ANCHOR,
};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static RE_PAGE_NUMBER_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)$").expect("regex is compile-time constant"));

/// Walker state for one document conversion
#[derive(Debug)]
pub struct DocWalker<'m> {
    styles: StyleRegistry,
    num_db: NumberingDb<'m>,
    options: ConvertOptions,
    page_width: i64,
    page_height: i64,
    stream: DocumentStream,
    chars_count: usize,
    last_depth: usize,
    depth_anchor: BTreeMap<usize, String>,
    /// Rolling window of the last two non-empty paragraph texts, consulted
    /// for table-title inference
    last_pars: Vec<String>,
}

impl<'m> DocWalker<'m> {
    /// Create a walker over an empty stream.
    #[must_use = "returns the walker"]
    pub fn new(
        styles: StyleRegistry,
        num_db: NumberingDb<'m>,
        options: ConvertOptions,
        page_width: i64,
        page_height: i64,
    ) -> Self {
        let mut depth_anchor = BTreeMap::new();
        depth_anchor.insert(1, DOC_START_ANCHOR.to_string());
        Self {
            styles,
            num_db,
            options,
            page_width,
            page_height,
            stream: DocumentStream::new(),
            chars_count: 0,
            last_depth: 1,
            depth_anchor,
            last_pars: Vec::new(),
        }
    }

    /// Walk the `w:body` element and return the finished stream.
    #[must_use = "returns the converted document stream"]
    pub fn walk(mut self, body: roxmltree::Node<'_, '_>) -> DocumentStream {
        for node in body.children() {
            if is_elem(node, "p") {
                self.process_paragraph(ParagraphSource::from_node(node));
            } else if is_elem(node, "tbl") {
                self.process_table(node);
            } else if node.is_element() && !is_elem(node, "sectPr") {
                log::debug!("skipping body element w:{}", node.tag_name().name());
            }
        }
        self.stream
    }

    /// Classify and append one paragraph. Frame-cell paragraphs re-enter
    /// through this same path.
    pub fn process_paragraph(&mut self, source: ParagraphSource) {
        let mut par = ParagraphView::new(source, &self.styles, self.options.bold_runs_threshold);
        self.num_db.numerize(&mut par);
        if par.text.is_empty() {
            return;
        }
        self.last_pars.push(par.text.clone());
        if self.last_pars.len() > 2 {
            self.last_pars.remove(0);
        }
        if self.detect_toc_row(&par.text) {
            par.node.depth = 0;
        }
        if par.node.depth > 0 {
            let anchor = format!("par{}", self.stream.elements.len());
            self.last_depth = par.node.depth;
            self.depth_anchor.insert(par.node.depth, anchor.clone());
            par.node.anchor = Some(anchor);
        }
        par.node.parents = self.current_parents();
        self.chars_count += par.text.chars().count();
        self.stream.elements.push(Element::Paragraph(par.into_item()));
    }

    /// A TOC row is demoted to body text: dotted leaders anywhere, or a
    /// page-number tail within the opening pages of the document.
    fn detect_toc_row(&self, text: &str) -> bool {
        if text.contains(".....") {
            return true;
        }
        if self.chars_count / self.options.avg_page_chars_count > self.options.max_toc_pages {
            return false;
        }
        RE_PAGE_NUMBER_TAIL
            .captures(text)
            .and_then(|caps| caps.get(1))
            .is_some_and(|m| {
                m.as_str()
                    .parse::<u64>()
                    .is_ok_and(|page| page < self.options.max_doc_pages)
            })
    }

    /// Process one table: accumulate data rows into subtables, inline frame
    /// text cells, and close subtables on text-cell boundaries.
    fn process_table(&mut self, tbl: roxmltree::Node<'_, '_>) {
        let mut table = TableHandler::new(tbl, self.page_width, self.page_height, &self.options);
        let rows = std::mem::take(&mut table.rows);
        let mut subtable = TableItem::new(self.table_title_node());

        for row in rows {
            if row.iter().any(|cell| cell.is_text) {
                self.append_table(subtable);
                if let Some(text_cell) = row.into_iter().find(|cell| cell.is_text) {
                    for par in text_cell.paragraphs {
                        self.process_paragraph(par);
                    }
                }
                subtable = TableItem::new(self.table_title_node());
            } else {
                let visible: Vec<CellItem> = if table.has_frame {
                    row.iter()
                        .filter(|cell| table.in_text_range(cell))
                        .map(TableCell::to_item)
                        .collect()
                } else {
                    row.iter().map(TableCell::to_item).collect()
                };
                if !visible.is_empty() {
                    subtable.rows.push(visible);
                }
            }
        }
        self.append_table(subtable);
    }

    /// Emit-or-extend: a non-blank subtable either continues the previous
    /// table (same column count, de-duplicated header) or becomes a fresh
    /// stream element with a breadcrumb snapshot.
    fn append_table(&mut self, mut table: TableItem) {
        if table.is_blank() {
            return;
        }
        if let Some(Element::Table(prev)) = self.stream.elements.last_mut() {
            if prev.rows.last().map(Vec::len) == table.rows.first().map(Vec::len) {
                concat_tables(prev, table);
                return;
            }
        }
        table.node.parents = self.current_parents();
        self.stream.elements.push(Element::Table(table));
    }

    /// Title for the next subtable, inferred from the rolling window.
    fn table_title_node(&self) -> Node {
        let window = self.last_pars.join(" ");
        let title = slice_from_last(&window, "таблица")
            .or_else(|| slice_from_last(&window, "т а б л и ц а"))
            .unwrap_or_else(|| {
                if window.trim().is_empty() {
                    "Таблица".to_string()
                } else {
                    window.clone()
                }
            });
        let mut node = Node::new(title, self.last_depth + 1, NumSource::Table);
        node.anchor = Some(format!("table{}", self.stream.elements.len()));
        node
    }

    fn current_parents(&self) -> BTreeMap<usize, String> {
        self.depth_anchor
            .range(..=self.last_depth)
            .map(|(depth, anchor)| (*depth, anchor.clone()))
            .collect()
    }
}

/// Splice a continuing subtable into the previous table, dropping its header
/// row when it repeats the previous header verbatim.
fn concat_tables(prev: &mut TableItem, mut next: TableItem) {
    if row_key(prev.rows.first()) == row_key(next.rows.first()) {
        next.rows.remove(0);
    }
    prev.rows.extend(next.rows);
}

fn row_key(row: Option<&Vec<CellItem>>) -> String {
    row.map(|cells| {
        cells
            .iter()
            .map(|cell| cell.text.as_str())
            .collect::<Vec<_>>()
            .join("\t")
    })
    .unwrap_or_default()
}

/// Slice the window from the last occurrence of `needle`, matched
/// case-insensitively.
fn slice_from_last(window: &str, needle: &str) -> Option<String> {
    let lower = window.to_lowercase();
    let byte_pos = lower.rfind(needle)?;
    let char_idx = lower[..byte_pos].chars().count();
    Some(window.chars().skip(char_idx).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plausibility::HeuristicPlausibility;

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    static MODEL: HeuristicPlausibility = HeuristicPlausibility;

    fn walk_body(body: &str) -> DocumentStream {
        let xml = format!("<w:document {NS}><w:body>{body}</w:body></w:document>");
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let body_node = doc
            .root_element()
            .children()
            .find(|n| is_elem(*n, "body"))
            .unwrap();
        let options = ConvertOptions::default();
        let num_db = NumberingDb::new(None, options, &MODEL);
        let walker = DocWalker::new(StyleRegistry::empty(), num_db, options, 11907, 16840);
        walker.walk(body_node)
    }

    fn bold_par(text: &str) -> String {
        format!("<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>{text}</w:t></w:r></w:p>")
    }

    fn plain_par(text: &str) -> String {
        format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
    }

    fn data_table(rows: &[&[&str]]) -> String {
        let grid: String = rows[0]
            .iter()
            .map(|_| "<w:gridCol w:w=\"2000\"/>".to_string())
            .collect();
        let body: String = rows
            .iter()
            .map(|row| {
                let cells: String = row
                    .iter()
                    .map(|text| {
                        format!(
                            "<w:tc><w:tcPr><w:tcW w:w=\"2000\" w:type=\"dxa\"/></w:tcPr>\
                             <w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:tc>"
                        )
                    })
                    .collect();
                format!("<w:tr><w:trPr><w:trHeight w:val=\"300\"/></w:trPr>{cells}</w:tr>")
            })
            .collect();
        format!("<w:tbl><w:tblGrid>{grid}</w:tblGrid>{body}</w:tbl>")
    }

    #[test]
    fn empty_body_yields_only_the_root() {
        let stream = walk_body("");
        assert!(stream.is_empty());
    }

    #[test]
    fn empty_paragraphs_are_skipped() {
        let stream = walk_body(&format!("{}<w:p></w:p>{}", plain_par(""), plain_par("text")));
        assert_eq!(stream.paragraphs().count(), 1);
    }

    #[test]
    fn headings_update_the_breadcrumb() {
        let stream = walk_body(&format!(
            "{}{}{}",
            bold_par("1. Введение"),
            bold_par("1.1. Назначение"),
            plain_par("Текст раздела без номера.")
        ));
        let pars: Vec<_> = stream.paragraphs().collect();
        assert_eq!(pars[0].node.depth, 1);
        assert_eq!(pars[0].node.anchor.as_deref(), Some("par1"));
        assert_eq!(pars[0].node.parents.get(&1).map(String::as_str), Some("par1"));

        assert_eq!(pars[1].node.depth, 2);
        assert_eq!(pars[1].node.anchor.as_deref(), Some("par2"));
        assert_eq!(pars[1].node.parents.get(&1).map(String::as_str), Some("par1"));
        assert_eq!(pars[1].node.parents.get(&2).map(String::as_str), Some("par2"));

        assert_eq!(pars[2].node.depth, 0);
        assert_eq!(pars[2].node.anchor, None);
        // body text inherits the full breadcrumb
        assert_eq!(pars[2].node.parents.len(), 2);
    }

    #[test]
    fn sibling_heading_resets_deeper_breadcrumb_levels() {
        let stream = walk_body(&format!(
            "{}{}{}{}",
            bold_par("1. Введение"),
            bold_par("1.1. Назначение"),
            bold_par("2. Требования"),
            plain_par("Текст под вторым разделом.")
        ));
        let pars: Vec<_> = stream.paragraphs().collect();
        // after the depth-1 sibling, the stale depth-2 entry is out of scope
        assert_eq!(pars[3].node.parents.len(), 1);
        assert_eq!(pars[3].node.parents.get(&1).map(String::as_str), Some("par3"));
    }

    #[test]
    fn dotted_leader_rows_are_suppressed() {
        let stream = walk_body(&format!(
            "{}{}{}",
            plain_par("1. Введение ..... 3"),
            plain_par("Приложение ..... 5"),
            bold_par("1. Введение")
        ));
        let pars: Vec<_> = stream.paragraphs().collect();
        assert_eq!(pars[0].node.depth, 0);
        assert_eq!(pars[1].node.depth, 0);
        assert_eq!(pars[2].node.depth, 1);
    }

    #[test]
    fn page_number_tails_are_suppressed_early_in_the_document() {
        let stream = walk_body(&bold_par("2. Состав изделия 17"));
        assert_eq!(stream.paragraphs().next().unwrap().node.depth, 0);
    }

    #[test]
    fn huge_number_tails_are_not_page_numbers() {
        let stream = walk_body(&bold_par("4. Выпуск изделия 2107"));
        assert_eq!(stream.paragraphs().next().unwrap().node.depth, 1);
    }

    #[test]
    fn data_table_is_emitted_with_breadcrumb() {
        let stream = walk_body(&format!(
            "{}{}",
            bold_par("1. Результаты"),
            data_table(&[&["A", "B"], &["1", "2"]])
        ));
        let tables: Vec<_> = stream.tables().collect();
        assert_eq!(tables.len(), 1);
        let table = tables[0];
        assert_eq!(table.node.depth, 2);
        assert_eq!(table.node.source, Some(NumSource::Table));
        assert_eq!(table.node.anchor.as_deref(), Some("table2"));
        assert_eq!(table.node.parents.get(&1).map(String::as_str), Some("par1"));
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn adjacent_tables_with_equal_columns_are_stitched() {
        let stream = walk_body(&format!(
            "{}{}",
            data_table(&[&["A", "B", "C"], &["1", "2", "3"]]),
            data_table(&[&["A", "B", "C"], &["4", "5", "6"]])
        ));
        let tables: Vec<_> = stream.tables().collect();
        assert_eq!(tables.len(), 1, "continuation must splice into one table");
        let rows = &tables[0].rows;
        assert_eq!(rows.len(), 3, "repeated header row must be dropped");
        assert_eq!(rows[2][0].text, "4");
    }

    #[test]
    fn adjacent_tables_with_different_columns_stay_separate() {
        let stream = walk_body(&format!(
            "{}{}",
            data_table(&[&["A", "B", "C"], &["1", "2", "3"]]),
            data_table(&[&["X", "Y"], &["4", "5"]])
        ));
        assert_eq!(stream.tables().count(), 2);
    }

    #[test]
    fn blank_tables_are_discarded() {
        let stream = walk_body(&data_table(&[&["", ""], &["", ""]]));
        assert_eq!(stream.tables().count(), 0);
    }

    #[test]
    fn table_title_slices_from_the_last_caption() {
        let stream = walk_body(&format!(
            "{}{}{}",
            plain_par("Результаты испытаний сведены ниже."),
            plain_par("Таблица 4 — Результаты"),
            data_table(&[&["A", "B"], &["1", "2"]])
        ));
        let table = stream.tables().next().unwrap();
        assert_eq!(table.node.prefix, "Таблица 4 — Результаты");
    }

    #[test]
    fn table_without_captions_gets_the_default_title() {
        let stream = walk_body(&data_table(&[&["A", "B"], &["1", "2"]]));
        assert_eq!(stream.tables().next().unwrap().node.prefix, "Таблица");
    }

    fn frame_table(text: &str) -> String {
        let narrow: String = (0..7)
            .map(|_| {
                "<w:tc><w:tcPr><w:tcW w:w=\"300\" w:type=\"dxa\"/></w:tcPr><w:p/></w:tc>"
                    .to_string()
            })
            .collect();
        let grid: String = (0..7).map(|_| "<w:gridCol w:w=\"300\"/>".to_string()).collect();
        format!(
            "<w:tbl><w:tblGrid>{grid}</w:tblGrid>\
             <w:tr><w:trPr><w:trHeight w:val=\"500\"/></w:trPr>{narrow}</w:tr>\
             <w:tr><w:trPr><w:trHeight w:val=\"15500\"/></w:trPr>\
             <w:tc><w:tcPr><w:tcW w:w=\"10000\" w:type=\"dxa\"/><w:gridSpan w:val=\"7\"/></w:tcPr>\
             {text}</w:tc></w:tr>\
             <w:tr><w:trPr><w:trHeight w:val=\"500\"/></w:trPr>{narrow}</w:tr></w:tbl>"
        )
    }

    #[test]
    fn frame_table_text_is_inlined_as_paragraphs() {
        let before = walk_body("").paragraphs().count();
        let stream = walk_body(&frame_table(&format!(
            "{}{}",
            bold_par("1. Общие сведения"),
            plain_par("Содержимое рамки.")
        )));
        assert_eq!(stream.tables().count(), 0, "frames never emit tables");
        let pars: Vec<_> = stream.paragraphs().collect();
        assert!(pars.len() >= before, "inlining can only add paragraphs");
        assert_eq!(pars.len(), 2);
        assert_eq!(pars[0].node.depth, 1);
        assert_eq!(pars[0].text, "1. Общие сведения");
        assert_eq!(pars[1].node.depth, 0);
        assert_eq!(
            pars[1].node.parents.get(&1).map(String::as_str),
            Some("par1")
        );
    }

    #[test]
    fn reruns_are_deterministic() {
        let body = format!(
            "{}{}{}",
            bold_par("1. Введение"),
            plain_par("Текст."),
            data_table(&[&["A"], &["1"]])
        );
        assert_eq!(walk_body(&body), walk_body(&body));
    }

    #[test]
    fn slice_from_last_is_case_insensitive() {
        assert_eq!(
            slice_from_last("см. ниже Таблица 2 — Размеры", "таблица"),
            Some("Таблица 2 — Размеры".to_string())
        );
        assert_eq!(slice_from_last("нет совпадения", "таблица"), None);
    }
}
