// 🗂️ Category Index - the category grid
//
// Deduplicated categories in first-seen order, led by a synthetic
// "All categories" entry that means "no filter selected".

use crate::catalog::Category;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Label of the synthetic entry ("All categories")
pub const ALL_CATEGORIES_LABEL: &str = "सर्व श्रेण्या";
pub const ALL_CATEGORIES_ICON: &str = "fas fa-th-large";

// ============================================================================
// GRID ENTRY
// ============================================================================

/// A grid cell. `All` is a separate variant rather than a reserved id, so it
/// can never collide with a real category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryEntry {
    All,
    Category(Category),
}

impl CategoryEntry {
    pub fn label(&self) -> &str {
        match self {
            CategoryEntry::All => ALL_CATEGORIES_LABEL,
            CategoryEntry::Category(c) => &c.name,
        }
    }

    pub fn icon(&self) -> &str {
        match self {
            CategoryEntry::All => ALL_CATEGORIES_ICON,
            CategoryEntry::Category(c) => &c.icon,
        }
    }

    /// Category id this entry filters on (`None` for All)
    pub fn category_id(&self) -> Option<&str> {
        match self {
            CategoryEntry::All => None,
            CategoryEntry::Category(c) => Some(&c.id),
        }
    }
}

// ============================================================================
// DEDUPE
// ============================================================================

/// Drop categories whose id was already seen, keeping first occurrences
pub fn unique_categories(categories: &[Category]) -> Vec<Category> {
    let mut seen = HashSet::new();
    categories
        .iter()
        .filter(|c| seen.insert(c.id.as_str()))
        .cloned()
        .collect()
}

/// Grid order: `All` first, then each distinct category once
pub fn dedupe(categories: &[Category]) -> Vec<CategoryEntry> {
    std::iter::once(CategoryEntry::All)
        .chain(unique_categories(categories).into_iter().map(CategoryEntry::Category))
        .collect()
}

// ============================================================================
// CATEGORY INDEX
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryIndex {
    entries: Vec<CategoryEntry>,
}

impl CategoryIndex {
    pub fn build(categories: &[Category]) -> Self {
        CategoryIndex {
            entries: dedupe(categories),
        }
    }

    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Grid position for a selection; `None` maps to the All entry at 0
    pub fn position_of(&self, category_id: Option<&str>) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.category_id() == category_id)
    }

    pub fn get(&self, position: usize) -> Option<&CategoryEntry> {
        self.entries.get(position)
    }
}

// ============================================================================
// TESTS
// ============================================================================
