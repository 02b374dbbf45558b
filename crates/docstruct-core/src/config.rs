//! Conversion policy knobs
//!
//! Every threshold the structure-reconstruction engine consults lives here,
//! with the defaults tuned for specification-style engineering documents.

/// Options for a document conversion
///
/// All fields have working defaults; use the `with_*` setters to override
/// individual knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertOptions {
    /// Fallback page width in twips when `w:sectPr` is missing
    pub default_page_width: i64,
    /// Fallback page height in twips when `w:sectPr` is missing
    pub default_page_height: i64,
    /// A cell wider than this share of the page width is a text cell
    pub text_cell_min_width_ratio: f64,
    /// A table at least this share of the page height may be a drawing frame
    pub frame_table_min_height_ratio: f64,
    /// Minimum column count for a drawing-frame table
    pub min_frame_columns: usize,
    /// Rows offset below this share of the page height form the frame footer
    pub frame_footer_min_indent_ratio: f64,
    /// Maximum character count of an appendix marker line
    pub appendix_header_max_chars: usize,
    /// Level count of the synthetic default numbering abstract
    pub default_numbering_levels: usize,
    /// Assumed font size in points before any sample is observed
    pub default_font_size_pt: f32,
    /// Only the first this-many notional pages may hold a table of contents
    pub max_toc_pages: usize,
    /// Characters per notional page for the TOC window heuristic
    pub avg_page_chars_count: usize,
    /// A trailing integer below this bound reads as a TOC page number
    pub max_doc_pages: u64,
    /// Character budget of TOC and JSON title labels before truncation
    pub toc_header_max_chars: usize,
    /// Deepest HTML heading tag emitted (`h1`..`h9`)
    pub heading_tag_depth_clamp: usize,
    /// Share of bold runs above which a paragraph counts as bold
    pub bold_runs_threshold: f64,
}

impl Default for ConvertOptions {
    #[inline]
    fn default() -> Self {
        Self {
            default_page_width: 11907,
            default_page_height: 16840,
            text_cell_min_width_ratio: 0.8,
            frame_table_min_height_ratio: 0.8,
            min_frame_columns: 7,
            frame_footer_min_indent_ratio: 0.82,
            appendix_header_max_chars: 40,
            default_numbering_levels: 9,
            default_font_size_pt: 12.0,
            max_toc_pages: 10,
            avg_page_chars_count: 1200,
            max_doc_pages: 2000,
            toc_header_max_chars: 35,
            heading_tag_depth_clamp: 9,
            bold_runs_threshold: 0.6,
        }
    }
}

impl ConvertOptions {
    /// Set the fallback page size in twips.
    #[inline]
    #[must_use = "returns options with the fallback page size configured"]
    pub const fn with_default_page_size(mut self, width: i64, height: i64) -> Self {
        self.default_page_width = width;
        self.default_page_height = height;
        self
    }

    /// Set the text-cell width threshold.
    #[inline]
    #[must_use = "returns options with the text-cell threshold configured"]
    pub const fn with_text_cell_min_width_ratio(mut self, ratio: f64) -> Self {
        self.text_cell_min_width_ratio = ratio;
        self
    }

    /// Set the frame-table height threshold.
    #[inline]
    #[must_use = "returns options with the frame height threshold configured"]
    pub const fn with_frame_table_min_height_ratio(mut self, ratio: f64) -> Self {
        self.frame_table_min_height_ratio = ratio;
        self
    }

    /// Set the minimum column count of a drawing frame.
    #[inline]
    #[must_use = "returns options with the frame column bound configured"]
    pub const fn with_min_frame_columns(mut self, columns: usize) -> Self {
        self.min_frame_columns = columns;
        self
    }

    /// Set the frame footer indent threshold.
    #[inline]
    #[must_use = "returns options with the footer indent threshold configured"]
    pub const fn with_frame_footer_min_indent_ratio(mut self, ratio: f64) -> Self {
        self.frame_footer_min_indent_ratio = ratio;
        self
    }

    /// Set the appendix marker length cap.
    #[inline]
    #[must_use = "returns options with the appendix length cap configured"]
    pub const fn with_appendix_header_max_chars(mut self, chars: usize) -> Self {
        self.appendix_header_max_chars = chars;
        self
    }

    /// Set the synthetic default abstract depth.
    #[inline]
    #[must_use = "returns options with the default numbering depth configured"]
    pub const fn with_default_numbering_levels(mut self, levels: usize) -> Self {
        self.default_numbering_levels = levels;
        self
    }

    /// Set the font size assumed before any sample is observed.
    #[inline]
    #[must_use = "returns options with the default font size configured"]
    pub const fn with_default_font_size_pt(mut self, size: f32) -> Self {
        self.default_font_size_pt = size;
        self
    }

    /// Set the TOC detection window in notional pages.
    #[inline]
    #[must_use = "returns options with the TOC window configured"]
    pub const fn with_max_toc_pages(mut self, pages: usize) -> Self {
        self.max_toc_pages = pages;
        self
    }

    /// Set the notional page size in characters.
    #[inline]
    #[must_use = "returns options with the page character count configured"]
    pub const fn with_avg_page_chars_count(mut self, chars: usize) -> Self {
        self.avg_page_chars_count = chars;
        self
    }

    /// Set the upper bound for TOC page-number detection.
    #[inline]
    #[must_use = "returns options with the page-number bound configured"]
    pub const fn with_max_doc_pages(mut self, pages: u64) -> Self {
        self.max_doc_pages = pages;
        self
    }

    /// Set the title truncation budget.
    #[inline]
    #[must_use = "returns options with the title budget configured"]
    pub const fn with_toc_header_max_chars(mut self, chars: usize) -> Self {
        self.toc_header_max_chars = chars;
        self
    }

    /// Set the deepest HTML heading level.
    #[inline]
    #[must_use = "returns options with the heading clamp configured"]
    pub const fn with_heading_tag_depth_clamp(mut self, depth: usize) -> Self {
        self.heading_tag_depth_clamp = depth;
        self
    }

    /// Set the bold-run share threshold.
    #[inline]
    #[must_use = "returns options with the bold threshold configured"]
    pub const fn with_bold_runs_threshold(mut self, threshold: f64) -> Self {
        self.bold_runs_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy() {
        let options = ConvertOptions::default();
        assert_eq!(options.default_page_width, 11907);
        assert_eq!(options.default_page_height, 16840);
        assert!((options.text_cell_min_width_ratio - 0.8).abs() < f64::EPSILON);
        assert_eq!(options.min_frame_columns, 7);
        assert_eq!(options.appendix_header_max_chars, 40);
        assert_eq!(options.default_numbering_levels, 9);
        assert_eq!(options.max_toc_pages, 10);
        assert_eq!(options.avg_page_chars_count, 1200);
        assert_eq!(options.max_doc_pages, 2000);
        assert_eq!(options.toc_header_max_chars, 35);
        assert_eq!(options.heading_tag_depth_clamp, 9);
    }

    #[test]
    fn setters_override_single_knobs() {
        let options = ConvertOptions::default()
            .with_min_frame_columns(5)
            .with_default_page_size(12240, 15840)
            .with_bold_runs_threshold(0.5);
        assert_eq!(options.min_frame_columns, 5);
        assert_eq!(options.default_page_width, 12240);
        assert_eq!(options.default_page_height, 15840);
        assert!((options.bold_runs_threshold - 0.5).abs() < f64::EPSILON);
        // untouched knobs keep their defaults
        assert_eq!(options.max_doc_pages, 2000);
    }
}
