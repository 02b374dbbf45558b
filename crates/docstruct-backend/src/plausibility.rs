//! Plausibility predicates for the text-based numbering sources
//!
//! The production system scores candidate headings with external text
//! classifiers. The engine only needs two boolean predicates, so the models
//! sit behind a trait and a deterministic heuristic ships as the default.

/// Text-plausibility predicates consulted by the numbering classifier
pub trait PlausibilityModel: std::fmt::Debug {
    /// Whether a paragraph whose text starts with a numbering-like prefix is
    /// plausibly a numbered heading.
    fn is_plausible_numeration(&self, text: &str) -> bool;

    /// Whether a heading-styled paragraph is plausibly a real heading.
    fn is_plausible_heading(&self, text: &str) -> bool;
}

/// Deterministic default predicates
///
/// Accepts numbered candidates that still carry a few letters after their
/// digits, and heading candidates longer than a word fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeuristicPlausibility;

impl PlausibilityModel for HeuristicPlausibility {
    #[inline]
    fn is_plausible_numeration(&self, text: &str) -> bool {
        text.chars().filter(|c| c.is_alphabetic()).count() >= 3
    }

    #[inline]
    fn is_plausible_heading(&self, text: &str) -> bool {
        text.trim().chars().count() > 3
    }
}
