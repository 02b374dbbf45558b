//! Output serializers for the element stream

pub mod html;
pub mod json;

pub use html::{escape_html, HtmlOptions, HtmlSerializer};
pub use json::{
    CellRecord, CellValue, ContentType, ElementContent, JsonElement, JsonOptions, JsonSerializer,
};
