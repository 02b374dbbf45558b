//! Paragraph extraction from `w:p` elements
//!
//! A [`ParagraphSource`] is the raw read of one paragraph: run texts and
//! formatting, style id, numbering properties and alignment. The
//! [`ParagraphView`] resolves it against the style registry into the values
//! the classifier consumes: trimmed text, bold flag and maximum font size.

use crate::styles::StyleRegistry;
use crate::xml::{attr, attr_usize, child, is_elem};
use docstruct_core::{Alignment, Node, ParagraphItem};

/// One text run with its formatting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunProps {
    /// Run text (`w:tab` as `\t`, `w:br`/`w:cr` as `\n`)
    pub text: String,
    /// Bold flag (`w:b` not explicitly off)
    pub bold: bool,
    /// Font size in points (`w:sz` half-points)
    pub size_pt: Option<f32>,
}

/// Raw paragraph read from the document body or a table cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphSource {
    /// Trimmed concatenation of run texts
    pub text: String,
    /// Runs in document order
    pub runs: Vec<RunProps>,
    /// Explicit paragraph style id
    pub style_id: Option<String>,
    /// Numbering id from `w:numPr`
    pub num_id: Option<String>,
    /// Indentation level from `w:numPr`
    pub ilvl: Option<usize>,
    /// Explicit alignment from `w:jc`
    pub alignment: Option<Alignment>,
}

impl ParagraphSource {
    /// Read a `w:p` element.
    #[must_use = "returns the extracted paragraph"]
    pub fn from_node(p: roxmltree::Node<'_, '_>) -> Self {
        let mut source = Self::default();

        if let Some(p_pr) = child(p, "pPr") {
            source.style_id = child(p_pr, "pStyle").and_then(|n| attr(n, "val").map(String::from));
            if let Some(num_pr) = child(p_pr, "numPr") {
                source.num_id = child(num_pr, "numId").and_then(|n| attr(n, "val").map(String::from));
                source.ilvl = child(num_pr, "ilvl").and_then(|n| attr_usize(n, "val"));
            }
            source.alignment = child(p_pr, "jc")
                .and_then(|n| attr(n, "val"))
                .and_then(parse_alignment);
        }

        for node in p.children() {
            if is_elem(node, "r") {
                source.runs.push(read_run(node));
            } else if is_elem(node, "hyperlink") {
                for inner in node.children().filter(|n| is_elem(*n, "r")) {
                    source.runs.push(read_run(inner));
                }
            }
        }

        source.text = source
            .runs
            .iter()
            .map(|run| run.text.as_str())
            .collect::<String>()
            .trim()
            .to_string();
        source
    }
}

fn read_run(r: roxmltree::Node<'_, '_>) -> RunProps {
    let mut run = RunProps::default();
    for node in r.children() {
        if is_elem(node, "rPr") {
            if let Some(b) = child(node, "b") {
                run.bold = !matches!(attr(b, "val"), Some("0" | "false"));
            }
            if let Some(half_points) = child(node, "sz")
                .and_then(|n| attr(n, "val"))
                .and_then(|v| v.parse::<f32>().ok())
            {
                run.size_pt = Some(half_points / 2.0);
            }
        } else if is_elem(node, "t") {
            if let Some(text) = node.text() {
                run.text.push_str(text);
            }
        } else if is_elem(node, "tab") {
            run.text.push('\t');
        } else if is_elem(node, "br") || is_elem(node, "cr") {
            run.text.push('\n');
        }
    }
    run
}

fn parse_alignment(val: &str) -> Option<Alignment> {
    match val {
        "left" | "start" => Some(Alignment::Left),
        "right" | "end" => Some(Alignment::Right),
        "center" => Some(Alignment::Center),
        "both" | "justify" => Some(Alignment::Justify),
        _ => None,
    }
}

/// Paragraph resolved against the style registry, ready for classification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphView {
    /// Trimmed paragraph text
    pub text: String,
    /// Style bold, or the bold-run share above the threshold
    pub bold: bool,
    /// Maximum of style and explicit run font sizes, in points
    pub max_font_size: Option<f32>,
    /// Resolved style id
    pub style_id: Option<String>,
    /// Base style id of the resolved style
    pub base_style_id: Option<String>,
    /// Display name of the resolved style
    pub style_name: Option<String>,
    /// Numbering id from the paragraph properties
    pub num_id: Option<String>,
    /// Indentation level from the paragraph properties
    pub ilvl: Option<usize>,
    /// Explicit alignment
    pub alignment: Option<Alignment>,
    /// Structure annotation, filled by the classifier and the walker
    pub node: Node,
}

impl ParagraphView {
    /// Resolve a raw paragraph against the style registry.
    #[must_use = "returns the resolved paragraph view"]
    pub fn new(source: ParagraphSource, styles: &StyleRegistry, bold_runs_threshold: f64) -> Self {
        let style = styles.resolve(source.style_id.as_deref());

        let style_bold = style.and_then(|s| s.font_bold) == Some(true);
        let bold_share = if source.runs.is_empty() {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let share = source.runs.iter().filter(|run| run.bold).count() as f64
                / source.runs.len() as f64;
            share
        };
        let bold = style_bold || bold_share > bold_runs_threshold;

        let max_font_size = style
            .and_then(|s| s.font_size_pt)
            .into_iter()
            .chain(source.runs.iter().filter_map(|run| run.size_pt))
            .fold(None, |acc: Option<f32>, size| {
                Some(acc.map_or(size, |a| a.max(size)))
            });

        Self {
            text: source.text,
            bold,
            max_font_size,
            style_id: style.map(|s| s.style_id.clone()).or(source.style_id),
            base_style_id: style.and_then(|s| s.based_on.clone()),
            style_name: style.and_then(|s| s.name.clone()),
            num_id: source.num_id,
            ilvl: source.ilvl,
            alignment: source.alignment,
            node: Node::default(),
        }
    }

    /// Convert into the stream element representation.
    #[inline]
    #[must_use = "returns the stream paragraph item"]
    pub fn into_item(self) -> ParagraphItem {
        ParagraphItem {
            text: self.text,
            bold: self.bold,
            alignment: self.alignment,
            node: self.node,
        }
    }
}
