//! # docstruct-backend - OOXML Structure Reconstruction
//!
//! Parses DOCX word-processing packages and reconstructs their logical
//! structure as a `docstruct_core::DocumentStream`: an ordered stream of
//! titles, subtitles, body text and tables, each carrying its numbering
//! prefix, depth and breadcrumb of ancestor anchors.
//!
//! # Architecture
//!
//! ```text
//! DOCX bytes ─▶ DocxPackage ─▶ DocWalker ─▶ DocumentStream
//!               (zip parts)       │
//!                                 ├─ NumberingDb   five-source classifier
//!                                 ├─ StyleRegistry styles.xml registry
//!                                 └─ TableHandler  frame detector + merger
//! ```
//!
//! The pass is single-threaded and synchronous: one conversion owns its
//! counters, font statistics and breadcrumb, and drops them at the end.
//! Dropping the backend mid-conversion cancels it with no partial output.

pub mod backend;
pub mod numbering;
pub mod package;
pub mod paragraph;
pub mod plausibility;
pub mod styles;
pub mod table;
pub mod walker;

mod xml;

pub use backend::DocxBackend;
pub use numbering::{find_manual_numbering, LevelDef, NumFormat, NumberingDb, StyleNumRef};
pub use package::DocxPackage;
pub use paragraph::{ParagraphSource, ParagraphView, RunProps};
pub use plausibility::{HeuristicPlausibility, PlausibilityModel};
pub use styles::{StyleDef, StyleRegistry};
pub use table::{BorderSet, TableCell, TableHandler};
pub use walker::DocWalker;
