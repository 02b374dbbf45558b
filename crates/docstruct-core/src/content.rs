//! Typed element stream produced by the structure-reconstruction walker
//!
//! A converted document is an ordered [`DocumentStream`] of [`Element`]s. Every
//! element carries a [`Node`] annotation: the numbering prefix, the heading
//! depth, the evidence source that established it, a stable anchor and the
//! breadcrumb of ancestor anchors per depth level.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of the synthetic root element that opens every stream.
pub const DOC_START_PREFIX: &str = "[Начало документа]";

/// Anchor of the synthetic root element.
pub const DOC_START_ANCHOR: &str = "default-start-doc";

/// Placeholder prefix for heading-styled paragraphs with no text.
pub const UNNAMED_PREFIX: &str = "[UNNAMED]";

/// Sentinel token carried by prefixes rendered from the synthetic default
/// numbering abstract. Prefixes containing it are never shown to the reader.
pub const DEFAULT_NUM_SENTINEL: &str = "default";

/// Evidence source that assigned a numbering prefix and depth to an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumSource {
    /// OOXML numbering metadata (`w:numPr` on the paragraph)
    Builtin,
    /// Paragraph style linked to a numbering definition
    Style,
    /// Textual numbering prefix matched in the paragraph text
    Regex,
    /// `Heading N` / `Title` paragraph style name
    Heading,
    /// Cyrillic appendix marker ("приложение …")
    Appendix,
    /// Table element
    Table,
    /// Synthetic document root
    Root,
}

impl std::fmt::Display for NumSource {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Builtin => "builtin",
            Self::Style => "style",
            Self::Regex => "regex",
            Self::Heading => "heading",
            Self::Appendix => "appendix",
            Self::Table => "table",
            Self::Root => "root",
        };
        write!(f, "{s}")
    }
}

/// Structure annotation attached to a paragraph or table
///
/// `depth` 0 means body text, 1 a top-level title, 2 and deeper nested
/// subtitles. `parents` maps each live depth level to the anchor of the
/// nearest preceding element at that level; for an element with `depth = d`
/// the map covers levels `1..=d` and `parents[d]` is the element's own anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Textual numbering label (may be empty, `"1."`, `"3.2.1."`, `"Приложение А"`, …)
    pub prefix: String,
    /// Heading depth; 0 for body text
    pub depth: usize,
    /// Evidence source that produced this annotation
    pub source: Option<NumSource>,
    /// Stable identifier, assigned by the walker when `depth > 0` or for tables
    pub anchor: Option<String>,
    /// Depth level → anchor of the nearest preceding element at that level
    pub parents: BTreeMap<usize, String>,
}

impl Node {
    /// Create an annotation with no anchor and no breadcrumb yet.
    #[inline]
    #[must_use = "creates a new node annotation"]
    pub fn new(prefix: impl Into<String>, depth: usize, source: NumSource) -> Self {
        Self {
            prefix: prefix.into(),
            depth,
            source: Some(source),
            anchor: None,
            parents: BTreeMap::new(),
        }
    }

    /// The synthetic root node that opens every document stream.
    #[must_use = "creates the synthetic root node"]
    pub fn root() -> Self {
        Self {
            prefix: DOC_START_PREFIX.to_string(),
            depth: 1,
            source: Some(NumSource::Root),
            anchor: Some(DOC_START_ANCHOR.to_string()),
            parents: BTreeMap::new(),
        }
    }

    /// Whether the prefix was rendered from the synthetic default abstract.
    #[inline]
    #[must_use = "returns whether the prefix carries the default sentinel"]
    pub fn has_default_prefix(&self) -> bool {
        self.prefix.contains(DEFAULT_NUM_SENTINEL)
    }
}

/// Paragraph alignment, as carried by `w:jc`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Left-aligned
    Left,
    /// Right-aligned
    Right,
    /// Centered
    Center,
    /// Justified (`w:jc w:val="both"`)
    Justify,
}

impl Alignment {
    /// CSS `text-align` value.
    #[inline]
    #[must_use = "returns the CSS text-align value"]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Center => "center",
            Self::Justify => "justify",
        }
    }
}

impl std::fmt::Display for Alignment {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_css())
    }
}

/// A processed paragraph in the element stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphItem {
    /// Trimmed paragraph text
    pub text: String,
    /// Whether the paragraph renders bold (style bold or dominant bold runs)
    pub bold: bool,
    /// Paragraph alignment, when explicit
    pub alignment: Option<Alignment>,
    /// Structure annotation
    pub node: Node,
}

impl ParagraphItem {
    /// Reader-facing text: the numbering prefix is prepended only when it came
    /// from document numbering (builtin or style linkage) and is not a
    /// synthesized default. Regex, heading and appendix prefixes already live
    /// inside the paragraph text.
    #[must_use = "returns the rendered paragraph text"]
    pub fn full_text(&self) -> String {
        let from_numbering = !matches!(
            self.node.source,
            Some(NumSource::Heading | NumSource::Regex | NumSource::Appendix)
        );
        if from_numbering && !self.node.prefix.is_empty() && !self.node.has_default_prefix() {
            if self.text.is_empty() {
                self.node.prefix.clone()
            } else {
                format!("{} {}", self.node.prefix, self.text)
            }
        } else {
            self.text.clone()
        }
    }
}

/// A table cell after merging, with its grid geometry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellItem {
    /// Leftmost grid column
    pub x: usize,
    /// Topmost grid row
    pub y: usize,
    /// Number of spanned rows
    pub rowspan: usize,
    /// Number of spanned columns
    pub colspan: usize,
    /// Width in twips
    pub width: i64,
    /// Height in twips
    pub height: i64,
    /// Offset from the table top in twips
    pub top_offset: i64,
    /// Trimmed cell text, inner paragraphs joined with newlines
    pub text: String,
}

/// A processed table in the element stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableItem {
    /// Rows of merged cells, in document order
    pub rows: Vec<Vec<CellItem>>,
    /// Structure annotation; `prefix` carries the inferred table title
    pub node: Node,
}

impl TableItem {
    /// Create an empty table under the given annotation.
    #[inline]
    #[must_use = "creates an empty table item"]
    pub const fn new(node: Node) -> Self {
        Self { rows: Vec::new(), node }
    }

    /// A table with no cell text anywhere is discarded by the walker.
    #[must_use = "returns whether the table holds no text"]
    pub fn is_blank(&self) -> bool {
        self.rows
            .iter()
            .flatten()
            .all(|cell| cell.text.is_empty())
    }
}

/// One element of the converted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// The synthetic document root (always first)
    Root(Node),
    /// A paragraph
    Paragraph(ParagraphItem),
    /// A table
    Table(TableItem),
}

impl Element {
    /// The structure annotation of this element.
    #[inline]
    #[must_use = "returns the element's node annotation"]
    pub const fn node(&self) -> &Node {
        match self {
            Self::Root(node) => node,
            Self::Paragraph(par) => &par.node,
            Self::Table(table) => &table.node,
        }
    }
}

/// Ordered stream of converted elements, starting with the synthetic root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentStream {
    /// Elements in document order
    pub elements: Vec<Element>,
}

impl DocumentStream {
    /// Create a stream holding only the synthetic root.
    #[must_use = "creates a stream with the synthetic root"]
    pub fn new() -> Self {
        Self {
            elements: vec![Element::Root(Node::root())],
        }
    }

    /// Number of elements, the root included.
    #[inline]
    #[must_use = "returns the element count"]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when only the synthetic root is present.
    #[inline]
    #[must_use = "returns whether the stream holds only the root"]
    pub fn is_empty(&self) -> bool {
        self.elements.len() <= 1
    }

    /// Iterate over the paragraphs of the stream.
    pub fn paragraphs(&self) -> impl Iterator<Item = &ParagraphItem> {
        self.elements.iter().filter_map(|element| match element {
            Element::Paragraph(par) => Some(par),
            _ => None,
        })
    }

    /// Iterate over the tables of the stream.
    pub fn tables(&self) -> impl Iterator<Item = &TableItem> {
        self.elements.iter().filter_map(|element| match element {
            Element::Table(table) => Some(table),
            _ => None,
        })
    }
}

impl Default for DocumentStream {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
