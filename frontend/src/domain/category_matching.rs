//! Attribution of transactions to plan categories.
//!
//! There is no foreign key between a transaction and a plan row; a
//! transaction counts toward a category when its description matches the
//! category label. Two labels that contain one another, or a label that
//! occurs in many descriptions, attribute the same spend more than once.

/// Decides whether a transaction description belongs to a plan category
pub trait CategoryMatcher: Send + Sync {
    fn matches(&self, category: &str, description: &str) -> bool;
}

/// Case-insensitive substring match of the label inside the description.
///
/// An empty label is a substring of everything and so matches every
/// transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl CategoryMatcher for SubstringMatcher {
    fn matches(&self, category: &str, description: &str) -> bool {
        description.to_lowercase().contains(&category.to_lowercase())
    }
}

/// Case-insensitive equality of label and description, ignoring surrounding
/// whitespace
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl CategoryMatcher for ExactMatcher {
    fn matches(&self, category: &str, description: &str) -> bool {
        category.trim().to_lowercase() == description.trim().to_lowercase()
    }
}
