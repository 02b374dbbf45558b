//! # docstruct-core - Document Model and Serializers
//!
//! Core types for the docstruct structure-reconstruction engine. A converted
//! OOXML document is represented as a [`DocumentStream`]: an ordered list of
//! typed elements (paragraphs and tables) annotated with numbering prefixes,
//! heading depths and a breadcrumb of ancestor anchors. The serializers turn
//! that stream into a navigable HTML pair (body + table of contents) or a
//! JSON element list keyed by hierarchical context.
//!
//! Parsing of OOXML packages lives in the `docstruct-backend` crate; this
//! crate has no XML or ZIP dependencies.
//!
//! ## Module organization
//!
//! - [`content`] - element stream types and annotations
//! - [`config`] - conversion policy knobs
//! - [`serializer`] - HTML and JSON output
//! - [`error`] - error types and handling

pub mod config;
pub mod content;
pub mod error;
pub mod serializer;

pub use config::*;
pub use content::*;
pub use error::*;
pub use serializer::*;
