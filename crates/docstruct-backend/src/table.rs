//! Table tabulation, borderless-cell merging and drawing-frame detection
//!
//! Engineering drawings frequently wrap an entire page of free text inside a
//! bordered title-block table. Such "frame" tables must not be emitted as
//! data: the detector finds the interior text cell so the walker can inline
//! its paragraphs back into the stream.
//!
//! Processing phases:
//! 1. tabulate the grid (`w:gridSpan` / `w:vMerge` resolution, row heights)
//! 2. merge borderless neighbours (`w:tcBorders` sides with `w:val="nil"`)
//! 3. classify text cells by page-relative width
//! 4. decide whether the table is a frame
//! 5. extend the text range down to the frame footer strip

use crate::paragraph::ParagraphSource;
use crate::xml::{attr, attr_i64, attr_usize, child, is_elem};
use docstruct_core::{CellItem, ConvertOptions};
use std::collections::HashMap;

/// Which borders of a cell are explicitly `nil`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BorderSet {
    /// Top border is nil
    pub top: bool,
    /// Bottom border is nil
    pub bottom: bool,
    /// Left border is nil
    pub left: bool,
    /// Right border is nil
    pub right: bool,
}

impl BorderSet {
    /// Union of two border sets.
    #[inline]
    #[must_use = "returns the union of the border sets"]
    pub const fn union(self, other: Self) -> Self {
        Self {
            top: self.top || other.top,
            bottom: self.bottom || other.bottom,
            left: self.left || other.left,
            right: self.right || other.right,
        }
    }
}

/// One table cell with grid geometry and its inner paragraphs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCell {
    /// Leftmost grid column
    pub x: usize,
    /// Topmost grid row
    pub y: usize,
    /// Spanned rows
    pub rowspan: usize,
    /// Spanned columns
    pub colspan: usize,
    /// Width in twips (`w:tcW`)
    pub width: i64,
    /// Height in twips, summed over spanned rows
    pub height: i64,
    /// Offset from the table top in twips
    pub top_offset: i64,
    /// Inner paragraphs, kept raw so frame text can re-enter the pipeline
    pub paragraphs: Vec<ParagraphSource>,
    /// Borders explicitly set to nil
    pub no_borders: BorderSet,
    /// Whether the cell spans most of the page width
    pub is_text: bool,
}

impl TableCell {
    /// Trimmed cell text: inner paragraph texts joined with newlines.
    #[must_use = "returns the joined cell text"]
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|par| par.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    /// Convert into the stream cell representation.
    #[must_use = "returns the stream cell item"]
    pub fn to_item(&self) -> CellItem {
        CellItem {
            x: self.x,
            y: self.y,
            rowspan: self.rowspan,
            colspan: self.colspan,
            width: self.width,
            height: self.height,
            top_offset: self.top_offset,
            text: self.text(),
        }
    }
}

/// A tabulated table with its frame verdict
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableHandler {
    /// Rows of merged cells
    pub rows: Vec<Vec<TableCell>>,
    /// Whether the table is a drawing frame
    pub has_frame: bool,
    /// First grid row of the text range (inclusive)
    pub text_row_start: i64,
    /// Last grid row of the text range (exclusive)
    pub text_row_end: i64,
    /// First grid column of the text range (inclusive)
    pub text_col_start: i64,
    /// Last grid column of the text range (exclusive)
    pub text_col_end: i64,
    cols_count: usize,
    height: i64,
    width: i64,
    src_page_width: i64,
    src_page_height: i64,
}

impl TableHandler {
    /// Tabulate a `w:tbl` element against the page dimensions in twips.
    #[must_use = "returns the tabulated table"]
    pub fn new(
        tbl: roxmltree::Node<'_, '_>,
        page_width: i64,
        page_height: i64,
        options: &ConvertOptions,
    ) -> Self {
        let trs: Vec<_> = tbl.children().filter(|n| is_elem(*n, "tr")).collect();
        let rows_heights: Vec<i64> = trs.iter().map(|tr| row_height(*tr)).collect();
        let height: i64 = rows_heights.iter().sum();

        let grid_cols: Vec<i64> = child(tbl, "tblGrid")
            .map(|grid| {
                grid.children()
                    .filter(|n| is_elem(*n, "gridCol"))
                    .map(|col| attr_i64(col, "w").unwrap_or(0))
                    .collect()
            })
            .unwrap_or_default();
        let width: i64 = grid_cols.iter().sum();

        // landscape pages carry their frames sideways
        let (src_page_width, src_page_height) = if width <= page_width {
            (page_width, page_height)
        } else {
            (page_height, page_width)
        };

        let mut handler = Self {
            rows: Vec::new(),
            has_frame: false,
            text_row_start: trs.len() as i64,
            text_row_end: -1,
            text_col_start: 0,
            text_col_end: -1,
            cols_count: 0,
            height,
            width,
            src_page_width,
            src_page_height,
        };

        handler.tabulate(&trs, &rows_heights);
        handler.cols_count = if grid_cols.is_empty() {
            handler
                .rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.colspan).sum())
                .max()
                .unwrap_or(0)
        } else {
            grid_cols.len()
        };
        handler.text_col_start = handler.cols_count as i64;

        handler.merge_no_border_cells();
        handler.detect_text_cells(options.text_cell_min_width_ratio);
        handler.has_frame = handler.detect_frame(options);
        if handler.has_frame {
            handler.text_row_end = handler
                .text_row_end
                .max(handler.footer_start_row(options.frame_footer_min_indent_ratio));
        }
        handler
    }

    /// Whether a cell lies inside the frame's text range.
    #[inline]
    #[must_use = "returns whether the cell is inside the text range"]
    pub fn in_text_range(&self, cell: &TableCell) -> bool {
        let (x, y) = (cell.x as i64, cell.y as i64);
        self.text_col_start <= x
            && x < self.text_col_end
            && self.text_row_start <= y
            && y < self.text_row_end
    }

    fn tabulate(&mut self, trs: &[roxmltree::Node<'_, '_>], rows_heights: &[i64]) {
        // (x, colspan) → location of the latest cell there, for w:vMerge
        let mut latest_at: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
        let mut top_offset = 0i64;

        for (i, tr) in trs.iter().enumerate() {
            let height = rows_heights[i];
            let mut cells: Vec<TableCell> = Vec::new();
            let mut x = 0usize;

            for tc in tr.children().filter(|n| is_elem(*n, "tc")) {
                let tc_pr = child(tc, "tcPr");
                let colspan = tc_pr
                    .and_then(|pr| child(pr, "gridSpan"))
                    .and_then(|n| attr_usize(n, "val"))
                    .unwrap_or(1)
                    .max(1);

                let vmerge = tc_pr.and_then(|pr| child(pr, "vMerge"));
                let continues = vmerge
                    .is_some_and(|n| !matches!(attr(n, "val"), Some("restart")));
                if continues {
                    if let Some(&(ri, ci)) = latest_at.get(&(x, colspan)) {
                        let upper = &mut self.rows[ri][ci];
                        upper.rowspan += 1;
                        upper.height += height;
                        x += colspan;
                        continue;
                    }
                    log::debug!("vMerge continuation without an open cell at column {x}");
                }

                let width = tc_pr
                    .and_then(|pr| child(pr, "tcW"))
                    .and_then(|n| attr_i64(n, "w"))
                    .unwrap_or(0);
                cells.push(TableCell {
                    x,
                    y: i,
                    rowspan: 1,
                    colspan,
                    width,
                    height,
                    top_offset,
                    paragraphs: tc
                        .children()
                        .filter(|n| is_elem(*n, "p"))
                        .map(ParagraphSource::from_node)
                        .collect(),
                    no_borders: nil_borders(tc_pr),
                    is_text: false,
                });
                x += colspan;
            }

            for (ci, cell) in cells.iter().enumerate() {
                latest_at.insert((cell.x, cell.colspan), (i, ci));
            }
            self.rows.push(cells);
            top_offset += height;
        }
    }

    /// Merge borderless neighbours: left-to-right within each row, then
    /// top-to-bottom into textually empty upper cells.
    fn merge_no_border_cells(&mut self) {
        let rows = std::mem::take(&mut self.rows);

        let mut horizontal: Vec<Vec<TableCell>> = Vec::with_capacity(rows.len());
        for row in rows {
            let mut merged: Vec<TableCell> = Vec::new();
            for cell in row {
                match merged.last_mut() {
                    Some(prev) if cell.no_borders.left && prev.rowspan == cell.rowspan => {
                        left_join(prev, cell);
                    }
                    _ => merged.push(cell),
                }
            }
            horizontal.push(merged);
        }

        let mut vertical: Vec<Vec<TableCell>> = Vec::with_capacity(horizontal.len());
        for row in horizontal {
            if vertical.is_empty() {
                vertical.push(row);
                continue;
            }
            let mut new_row: Vec<TableCell> = Vec::new();
            for cell in row {
                let upper = vertical
                    .last_mut()
                    .and_then(|last| {
                        last.iter_mut()
                            .find(|c| c.x == cell.x && c.colspan == cell.colspan)
                    });
                match upper {
                    Some(upper) if cell.no_borders.top && upper.text().is_empty() => {
                        top_join(upper, cell);
                    }
                    _ => new_row.push(cell),
                }
            }
            if !new_row.is_empty() {
                vertical.push(new_row);
            }
        }

        self.rows = vertical;
    }

    fn detect_text_cells(&mut self, min_width_ratio: f64) {
        #[allow(clippy::cast_precision_loss)]
        let page_width = self.src_page_width as f64;
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                #[allow(clippy::cast_precision_loss)]
                let ratio = cell.width as f64 / page_width;
                cell.is_text = ratio > min_width_ratio;
                if cell.is_text {
                    self.text_row_start = self.text_row_start.min(cell.y as i64);
                    self.text_row_end = self.text_row_end.max((cell.y + cell.rowspan) as i64);
                    self.text_col_start = self.text_col_start.min(cell.x as i64);
                    self.text_col_end = self.text_col_end.max((cell.x + cell.colspan) as i64);
                }
            }
        }
    }

    fn detect_frame(&self, options: &ConvertOptions) -> bool {
        #[allow(clippy::cast_precision_loss)]
        let height_ratio = self.height as f64 / self.src_page_height as f64;
        if height_ratio < options.frame_table_min_height_ratio {
            return false;
        }
        if self.cols_count < options.min_frame_columns {
            return false;
        }
        // a frame must hold at least one text cell
        self.text_row_end >= 0
    }

    /// First row whose offset puts it into the bottom footer strip.
    fn footer_start_row(&self, min_indent_ratio: f64) -> i64 {
        #[allow(clippy::cast_precision_loss)]
        let page_height = self.src_page_height as f64;
        for row in &self.rows {
            let Some(first) = row.first() else { continue };
            #[allow(clippy::cast_precision_loss)]
            let indent = first.top_offset as f64 / page_height;
            if indent > min_indent_ratio {
                return first.y as i64;
            }
        }
        0
    }
}

fn row_height(tr: roxmltree::Node<'_, '_>) -> i64 {
    child(tr, "trPr")
        .and_then(|pr| child(pr, "trHeight"))
        .and_then(|n| attr_i64(n, "val"))
        .unwrap_or(0)
}

fn nil_borders(tc_pr: Option<roxmltree::Node<'_, '_>>) -> BorderSet {
    let Some(borders) = tc_pr.and_then(|pr| child(pr, "tcBorders")) else {
        return BorderSet::default();
    };
    let nil = |side: &str| {
        child(borders, side).is_some_and(|n| attr(n, "val") == Some("nil"))
    };
    BorderSet {
        top: nil("top"),
        bottom: nil("bottom"),
        left: nil("left"),
        right: nil("right"),
    }
}

fn left_join(prev: &mut TableCell, cell: TableCell) {
    prev.paragraphs.extend(cell.paragraphs);
    prev.no_borders = prev.no_borders.union(cell.no_borders);
    prev.is_text = prev.is_text || cell.is_text;
    prev.colspan += cell.colspan;
    prev.width += cell.width;
}

fn top_join(upper: &mut TableCell, cell: TableCell) {
    upper.paragraphs.extend(cell.paragraphs);
    upper.no_borders = upper.no_borders.union(cell.no_borders);
    upper.is_text = upper.is_text || cell.is_text;
    upper.rowspan += cell.rowspan;
    upper.height += cell.height;
    upper.top_offset = upper.top_offset.max(cell.top_offset);
}
