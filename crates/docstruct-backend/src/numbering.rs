//! Numbering state and the five-source heading classifier
//!
//! Parses `word/numbering.xml` into abstract numbering definitions, keeps the
//! per-abstract level counters during a single document pass, and decides for
//! each paragraph whether it is a heading and at what depth.
//!
//! Evidence sources, tried in fixed priority, first non-empty prefix wins:
//! 1. OOXML numbering metadata (`w:numPr`)
//! 2. style-linked numbering (`w:pStyle` inside a level definition)
//! 3. textual numbering prefix (`1.`, `3.2.1.`, `А.1`)
//! 4. heading style name (`Heading N` / `Title`)
//! 5. Cyrillic appendix marker
//!
//! ## XML structure
//! ```xml
//! <w:numbering>
//!   <w:abstractNum w:abstractNumId="0">
//!     <w:lvl w:ilvl="0">
//!       <w:start w:val="1"/>
//!       <w:numFmt w:val="decimal"/>
//!       <w:lvlText w:val="%1."/>
//!     </w:lvl>
//!   </w:abstractNum>
//!   <w:num w:numId="1">
//!     <w:abstractNumId w:val="0"/>
//!   </w:num>
//! </w:numbering>
//! ```

use crate::paragraph::ParagraphView;
use crate::plausibility::PlausibilityModel;
use docstruct_core::{
    ConvertOptions, Node, NumSource, DEFAULT_NUM_SENTINEL, UNNAMED_PREFIX,
};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static RE_HEADING_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Heading \d+").expect("regex is compile-time constant"));
static RE_LETTER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w\.)\d").expect("regex is compile-time constant"));
static RE_DECIMAL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.").expect("regex is compile-time constant"));
static RE_TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s").expect("regex is compile-time constant"));

/// Characters that disqualify a prefix from being document numbering:
/// list markers and enumeration punctuation.
const STOP_SYMBOLS: [char; 6] = [')', ':', '-', '–', '—', '−'];

/// Numbering format, from `<w:numFmt w:val="..."/>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumFormat {
    /// 1, 2, 3
    #[default]
    Decimal,
    /// A, B, C
    UpperLetter,
    /// a, b, c
    LowerLetter,
    /// I, II, III
    UpperRoman,
    /// i, ii, iii
    LowerRoman,
}

impl NumFormat {
    /// Parse from the XML `w:val` attribute; unknown formats count decimal.
    #[inline]
    #[must_use = "returns the parsed number format"]
    pub fn parse_format(s: &str) -> Self {
        match s {
            "upperLetter" => Self::UpperLetter,
            "lowerLetter" => Self::LowerLetter,
            "upperRoman" => Self::UpperRoman,
            "lowerRoman" => Self::LowerRoman,
            _ => Self::Decimal,
        }
    }

    /// Render a counter value in this format.
    #[must_use = "returns the rendered counter value"]
    pub fn render(self, value: i64) -> String {
        match self {
            Self::Decimal => value.to_string(),
            Self::UpperLetter => to_letter(value, b'A'),
            Self::LowerLetter => to_letter(value, b'a'),
            Self::UpperRoman => to_roman(value),
            Self::LowerRoman => to_roman(value).to_lowercase(),
        }
    }
}

/// One level of an abstract numbering definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelDef {
    /// Starting value (`w:start`, default 1)
    pub start: i64,
    /// Number format (`w:numFmt`)
    pub num_fmt: NumFormat,
    /// Template with `%1`..`%9` placeholders (`w:lvlText`)
    pub lvl_text: String,
}

impl Default for LevelDef {
    #[inline]
    fn default() -> Self {
        Self {
            start: 1,
            num_fmt: NumFormat::Decimal,
            lvl_text: String::new(),
        }
    }
}

/// Style-linked numbering entry: which abstract and level a style maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleNumRef {
    /// Abstract numbering id
    pub abs_id: String,
    /// Level within the abstract
    pub level: usize,
}

/// Parsed registries of `numbering.xml`
#[derive(Debug, Clone, Default, PartialEq)]
struct NumberingParts {
    levels: HashMap<String, Vec<LevelDef>>,
    num_map: HashMap<String, String>,
    style_links: HashMap<String, StyleNumRef>,
}

fn parse_numbering_xml(xml: &str) -> NumberingParts {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut parts = NumberingParts::default();

    let mut current_abs_id: Option<String> = None;
    let mut current_lvls: Vec<(usize, LevelDef)> = Vec::new();
    let mut current_ilvl: Option<usize> = None;
    let mut current_level: Option<LevelDef> = None;
    let mut current_num_id: Option<String> = None;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:abstractNum" => {
                    current_abs_id = get_attr(e, b"w:abstractNumId");
                    current_lvls.clear();
                }
                b"w:lvl" => {
                    // a pending level means the previous w:lvl was empty
                    if let (Some(ilvl), Some(level)) = (current_ilvl, current_level.take()) {
                        current_lvls.push((ilvl, level));
                    }
                    current_ilvl = get_attr(e, b"w:ilvl").and_then(|v| v.parse().ok());
                    current_level = Some(LevelDef::default());
                }
                b"w:start" => {
                    if let Some(ref mut level) = current_level {
                        if let Some(start) = get_attr(e, b"w:val").and_then(|v| v.parse().ok()) {
                            level.start = start;
                        }
                    }
                }
                b"w:numFmt" => {
                    if let Some(ref mut level) = current_level {
                        if let Some(val) = get_attr(e, b"w:val") {
                            level.num_fmt = NumFormat::parse_format(&val);
                        }
                    }
                }
                b"w:lvlText" => {
                    if let Some(ref mut level) = current_level {
                        level.lvl_text = get_attr(e, b"w:val").unwrap_or_default();
                    }
                }
                b"w:pStyle" => {
                    // numbering entered through a paragraph style
                    if let (Some(abs_id), Some(ilvl), Some(style_id)) =
                        (&current_abs_id, current_ilvl, get_attr(e, b"w:val"))
                    {
                        parts.style_links.insert(
                            style_id,
                            StyleNumRef {
                                abs_id: abs_id.clone(),
                                level: ilvl,
                            },
                        );
                    }
                }
                b"w:num" => {
                    current_num_id = get_attr(e, b"w:numId");
                }
                b"w:abstractNumId" => {
                    if let (Some(num_id), Some(abs_id)) =
                        (current_num_id.take(), get_attr(e, b"w:val"))
                    {
                        parts.num_map.insert(num_id, abs_id);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:lvl" => {
                    if let (Some(ilvl), Some(level)) = (current_ilvl.take(), current_level.take())
                    {
                        current_lvls.push((ilvl, level));
                    }
                }
                b"w:abstractNum" => {
                    if let (Some(ilvl), Some(level)) = (current_ilvl.take(), current_level.take())
                    {
                        current_lvls.push((ilvl, level));
                    }
                    if let Some(abs_id) = current_abs_id.take() {
                        parts
                            .levels
                            .insert(abs_id, ordered_levels(std::mem::take(&mut current_lvls)));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("stopping numbering.xml parse early: {e}");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    parts
}

/// Lay levels out by their declared ilvl, filling gaps with decimal defaults.
fn ordered_levels(mut lvls: Vec<(usize, LevelDef)>) -> Vec<LevelDef> {
    lvls.sort_by_key(|(ilvl, _)| *ilvl);
    let top = lvls.last().map_or(0, |(ilvl, _)| *ilvl);
    let mut ordered = vec![LevelDef::default(); top + 1];
    for (ilvl, level) in lvls {
        ordered[ilvl] = level;
    }
    ordered
}

#[inline]
fn get_attr(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| std::str::from_utf8(&a.value).ok().map(str::to_string))
}

/// Numbering state and classifier for one document conversion
///
/// Owns the counters and the running font-size statistic; both live exactly
/// as long as the conversion. Counters mutate only when a source is accepted.
#[derive(Debug)]
pub struct NumberingDb<'m> {
    levels: HashMap<String, Vec<LevelDef>>,
    counters: HashMap<String, Vec<i64>>,
    num_map: HashMap<String, String>,
    style_links: HashMap<String, StyleNumRef>,
    font_sizes: Vec<f32>,
    synthetic_count: usize,
    options: ConvertOptions,
    model: &'m dyn PlausibilityModel,
}

impl<'m> NumberingDb<'m> {
    /// Build the numbering state from the optional `numbering.xml` part.
    #[must_use = "returns the numbering state"]
    pub fn new(
        numbering_xml: Option<&str>,
        options: ConvertOptions,
        model: &'m dyn PlausibilityModel,
    ) -> Self {
        let mut parts = numbering_xml
            .map(parse_numbering_xml)
            .unwrap_or_default();
        // an abstract without levels cannot render anything; give it the
        // synthetic default so references to it keep working
        for levels in parts.levels.values_mut() {
            if levels.is_empty() {
                *levels = default_abstract(options.default_numbering_levels);
            }
        }
        let counters = parts
            .levels
            .iter()
            .map(|(abs_id, levels)| (abs_id.clone(), vec![0; levels.len()]))
            .collect();
        Self {
            levels: parts.levels,
            counters,
            num_map: parts.num_map,
            style_links: parts.style_links,
            font_sizes: Vec::new(),
            synthetic_count: 0,
            options,
            model,
        }
    }

    /// Classify one paragraph, writing the resulting node into the view.
    /// Also feeds the paragraph's font size into the running statistic.
    pub fn numerize(&mut self, par: &mut ParagraphView) {
        self.font_sizes
            .push(par.max_font_size.unwrap_or(self.options.default_font_size_pt));
        let node = self
            .by_meta(par)
            .or_else(|| self.by_style(par))
            .or_else(|| self.by_text(par))
            .or_else(|| self.by_heading(par))
            .or_else(|| self.by_appendix(par));
        if let Some(node) = node {
            par.node = node;
        }
    }

    /// Source 1: OOXML numbering metadata on the paragraph itself.
    fn by_meta(&mut self, par: &ParagraphView) -> Option<Node> {
        let num_id = par.num_id.clone()?;
        let level = par.ilvl?;
        let abs_id = self.abs_id_for_num(&num_id);
        let mut node = self.count_builtin(&abs_id, level, NumSource::Builtin);
        if node.prefix.is_empty() {
            return None;
        }
        if !self.heading_styled(par) && node.depth == 1 {
            node.depth = 0;
        }
        if stop_symbols_in_prefix(&node.prefix) || stop_symbols_at_start(&par.text) {
            node.depth = 0;
        }
        Some(node)
    }

    /// Source 2: the paragraph's style (or its base style) is linked to a
    /// numbering level. Unlike `by_meta` this source never demotes depth-1
    /// paragraphs that fail the typographic gate.
    fn by_style(&mut self, par: &ParagraphView) -> Option<Node> {
        let link = par
            .style_id
            .as_deref()
            .and_then(|id| self.style_links.get(id))
            .or_else(|| {
                par.base_style_id
                    .as_deref()
                    .and_then(|id| self.style_links.get(id))
            })?
            .clone();
        let node = self.count_builtin(&link.abs_id, link.level, NumSource::Style);
        (!node.prefix.is_empty()).then_some(node)
    }

    /// Source 3: a manual numbering prefix typed into the text.
    fn by_text(&mut self, par: &ParagraphView) -> Option<Node> {
        let (prefix, depth, cleaned) =
            find_manual_numbering(&par.text, self.options.default_numbering_levels);
        if depth == 0 {
            return None;
        }
        if stop_symbols_at_start(&cleaned) {
            return None;
        }
        if !self.heading_styled(par) && depth == 1 {
            return None;
        }
        if !self.model.is_plausible_numeration(&par.text) {
            return None;
        }
        Some(Node::new(prefix, depth, NumSource::Regex))
    }

    /// Source 4: `Heading N` / `Title` paragraph style name.
    fn by_heading(&mut self, par: &ParagraphView) -> Option<Node> {
        let name = par.style_name.as_deref()?;
        if !(RE_HEADING_STYLE.is_match(name) || name == "Title") {
            return None;
        }
        if !self.heading_styled(par) {
            return None;
        }
        if !self.model.is_plausible_heading(&par.text) {
            return None;
        }
        let prefix = if par.text.is_empty() {
            UNNAMED_PREFIX.to_string()
        } else {
            par.text.clone()
        };
        Some(Node::new(prefix, 1, NumSource::Heading))
    }

    /// Source 5: a short Cyrillic appendix marker on the first line.
    fn by_appendix(&self, par: &ParagraphView) -> Option<Node> {
        let first_line = par.text.split('\n').next().unwrap_or("");
        if first_line.to_lowercase().starts_with("приложение")
            && first_line.chars().count() < self.options.appendix_header_max_chars
        {
            return Some(Node::new(first_line, 1, NumSource::Appendix));
        }
        None
    }

    /// Tick the counter of `level`, reset deeper siblings, and render the
    /// level's template. The returned depth is the number of placeholders
    /// actually substituted.
    pub fn count_builtin(&mut self, abs_id: &str, level: usize, source: NumSource) -> Node {
        let Some(defs) = self.levels.get(abs_id).cloned() else {
            return Node::new("", 0, source);
        };
        if defs.is_empty() {
            return Node::new("", 0, source);
        }
        let level = level.min(defs.len() - 1);

        let counters = self
            .counters
            .entry(abs_id.to_string())
            .or_insert_with(|| vec![0; defs.len()]);
        if counters.len() < defs.len() {
            counters.resize(defs.len(), 0);
        }
        counters[level] += 1;
        for deeper in counters.iter_mut().skip(level + 1) {
            *deeper = 0;
        }

        let mut prefix = defs[level].lvl_text.clone();
        let mut depth = 0;
        for (i, def) in defs.iter().enumerate().take(level + 1) {
            let mut value = counters[i] + def.start - 1;
            value = value.max(def.start);
            let placeholder = format!("%{}", i + 1);
            if prefix.contains(&placeholder) {
                depth += 1;
                prefix = prefix.replace(&placeholder, &def.num_fmt.render(value));
            }
        }
        Node::new(prefix, depth, source)
    }

    /// Resolve a `numId` to its abstract, synthesizing a default abstract for
    /// ids the numbering part does not know.
    pub fn abs_id_for_num(&mut self, num_id: &str) -> String {
        if let Some(abs_id) = self.num_map.get(num_id) {
            return abs_id.clone();
        }
        self.synthetic_count += 1;
        let abs_id = format!("synthetic{}", self.synthetic_count);
        log::debug!("unknown numId {num_id}, synthesizing abstract {abs_id}");
        let levels = default_abstract(self.options.default_numbering_levels);
        self.counters.insert(abs_id.clone(), vec![0; levels.len()]);
        self.levels.insert(abs_id.clone(), levels);
        self.num_map.insert(num_id.to_string(), abs_id.clone());
        abs_id
    }

    /// Typographic gate: captions never read as headings; otherwise the
    /// paragraph must be bold or larger than the running median font size.
    pub fn heading_styled(&self, par: &ParagraphView) -> bool {
        let lower = par.text.to_lowercase();
        if lower.starts_with("таблица") || lower.starts_with("рисунок") {
            return false;
        }
        let font_size = par.max_font_size.unwrap_or(self.options.default_font_size_pt);
        par.bold || font_size > self.regular_font_size()
    }

    /// Median of the observed font sizes, or the configured default before
    /// any sample.
    #[must_use = "returns the regular font size estimate"]
    pub fn regular_font_size(&self) -> f32 {
        if self.font_sizes.is_empty() {
            return self.options.default_font_size_pt;
        }
        let mut sizes = self.font_sizes.clone();
        sizes.sort_by(f32::total_cmp);
        let mid = sizes.len() / 2;
        if sizes.len() % 2 == 1 {
            sizes[mid]
        } else {
            (sizes[mid - 1] + sizes[mid]) / 2.0
        }
    }
}

fn stop_symbols_in_prefix(prefix: &str) -> bool {
    prefix.chars().any(|c| STOP_SYMBOLS.contains(&c))
}

fn stop_symbols_at_start(text: &str) -> bool {
    match text.chars().next() {
        Some(first) => STOP_SYMBOLS.contains(&first),
        None => true,
    }
}

/// The synthetic abstract used for unknown numbering ids: decimal levels
/// rendering through a sentinel-tagged template.
fn default_abstract(level_count: usize) -> Vec<LevelDef> {
    let mut template = format!("{DEFAULT_NUM_SENTINEL} ");
    for j in 1..=level_count {
        template.push_str(&format!("%{j}."));
    }
    vec![
        LevelDef {
            start: 1,
            num_fmt: NumFormat::Decimal,
            lvl_text: template,
        };
        level_count
    ]
}

/// Strip a manually typed numbering prefix from the start of the text.
///
/// Consumes, in order: one `letter-dot-digit` lead (`А.1`), repeated
/// `digits-dot` groups (`3.2.1.`), and optionally one bare trailing number
/// (`5 `). Returns the prefix, the depth (one per consumed group) and the
/// remaining text.
#[must_use = "returns the prefix, depth and remaining text"]
pub fn find_manual_numbering(text: &str, max_levels: usize) -> (String, usize, String) {
    let mut prefix = String::new();
    let mut depth = 0;
    let mut rest = text.to_string();

    if let Some(caps) = RE_LETTER_PREFIX.captures(&rest) {
        let lead = caps.get(1).map_or("", |m| m.as_str());
        prefix.push_str(lead);
        depth += 1;
        rest = rest[lead.len()..].to_string();
    }

    for _ in 0..max_levels {
        let Some(m) = RE_DECIMAL_PREFIX.find(&rest) else {
            break;
        };
        depth += 1;
        prefix.push_str(m.as_str());
        rest = rest[m.end()..].to_string();
    }

    let trimmed = rest.trim().to_string();
    if let Some(m) = RE_TRAILING_NUMBER.find(&trimmed) {
        depth += 1;
        prefix.push_str(m.as_str());
        rest = trimmed[m.end()..].to_string();
    } else {
        rest = trimmed;
    }

    (prefix, depth, rest.trim().to_string())
}

/// Convert to Roman numerals (covers 1..=3999)
fn to_roman(mut value: i64) -> String {
    if value <= 0 {
        return String::new();
    }
    let values = [1000, 900, 500, 400, 100, 90, 50, 40, 10, 9, 5, 4, 1];
    let numerals = [
        "M", "CM", "D", "CD", "C", "XC", "L", "XL", "X", "IX", "V", "IV", "I",
    ];
    let mut roman = String::new();
    for (i, &step) in values.iter().enumerate() {
        while value >= step {
            roman.push_str(numerals[i]);
            value -= step;
        }
    }
    roman
}

/// Convert to a letter sequence (a..z, aa, ab, ...)
fn to_letter(mut value: i64, base: u8) -> String {
    if value <= 0 {
        return String::new();
    }
    let mut letters = Vec::new();
    while value > 0 {
        value -= 1;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        letters.insert(0, ((value % 26) as u8 + base) as char);
        value /= 26;
    }
    letters.into_iter().collect()
}
