// 🔎 Filter Engine - category + free-text over an immutable snapshot
//
// Every keystroke or category click recomputes the whole view from
// (Catalog, FilterState). Nothing is patched incrementally.
//
// Matching is literal, case-insensitive substring containment over
// shop name, owner name and contact number. No ranking, no index.

use crate::catalog::{Business, Catalog};
use serde::{Deserialize, Serialize};

/// Shown instead of an empty list
pub const NO_RESULTS_MESSAGE: &str = "कोणतेही व्यवसाय सापडले नाहीत.";

/// Header for businesses whose category id matches no known category
pub const UNCATEGORIZED_LABEL: &str = "इतर";

// ============================================================================
// FILTER STATE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// `None` is the "All categories" state
    pub selected_category: Option<String>,
    pub search_term: String,
}

impl FilterState {
    pub fn new(selected_category: Option<&str>, search_term: &str) -> Self {
        FilterState {
            selected_category: selected_category.map(|s| s.to_string()),
            search_term: search_term.to_string(),
        }
    }

    /// Builder pattern: replace the selected category
    pub fn with_category(mut self, category: Option<&str>) -> Self {
        self.selected_category = category.map(|s| s.to_string());
        self
    }

    /// Builder pattern: replace the search term
    pub fn with_search(mut self, term: &str) -> Self {
        self.search_term = term.to_string();
        self
    }
}

// ============================================================================
// PREDICATES
// ============================================================================

pub fn matches_category(business: &Business, selected: Option<&str>) -> bool {
    selected.map_or(true, |id| business.category == id)
}

/// `needle` must already be trimmed and lowercased; empty matches everything
pub fn matches_search(business: &Business, needle: &str) -> bool {
    needle.is_empty()
        || [
            &business.shop_name,
            &business.owner_name,
            &business.contact_number,
        ]
        .iter()
        .any(|value| value.to_lowercase().contains(needle))
}

/// Businesses passing both predicates, catalog order preserved
pub fn filter<'a>(
    businesses: &'a [Business],
    selected_category: Option<&str>,
    search_term: &str,
) -> Vec<&'a Business> {
    let needle = search_term.trim().to_lowercase();

    businesses
        .iter()
        .filter(|b| matches_category(b, selected_category) && matches_search(b, &needle))
        .collect()
}

// ============================================================================
// GROUPING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessGroup<'a> {
    pub category_id: String,

    /// Display label; `None` when the id matches no known category
    pub label: Option<String>,
    pub icon: Option<String>,
    pub businesses: Vec<&'a Business>,
}

impl BusinessGroup<'_> {
    pub fn header(&self) -> &str {
        self.label.as_deref().unwrap_or(UNCATEGORIZED_LABEL)
    }
}

/// Group by category, groups ordered by their first business in `filtered`.
/// Unknown category ids keep their own unlabeled group rather than being dropped.
pub fn group_by_category<'a>(catalog: &Catalog, filtered: &[&'a Business]) -> Vec<BusinessGroup<'a>> {
    let mut groups: Vec<BusinessGroup<'a>> = Vec::new();

    for &business in filtered {
        match groups.iter_mut().find(|g| g.category_id == business.category) {
            Some(group) => group.businesses.push(business),
            None => {
                let category = catalog.category_by_id(&business.category);
                groups.push(BusinessGroup {
                    category_id: business.category.clone(),
                    label: category.map(|c| c.name.clone()),
                    icon: category.map(|c| c.icon.clone()),
                    businesses: vec![business],
                });
            }
        }
    }

    groups
}

// ============================================================================
// VIEW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FilterOutcome<'a> {
    /// Nothing matched (including a category with zero businesses)
    NoResults { message: &'static str },

    /// A specific category is selected
    Flat { businesses: Vec<&'a Business> },

    /// "All categories": grouped, headed by category label
    Grouped { groups: Vec<BusinessGroup<'a>> },
}

impl FilterOutcome<'_> {
    pub fn is_empty(&self) -> bool {
        matches!(self, FilterOutcome::NoResults { .. })
    }

    /// Number of businesses across the view
    pub fn count(&self) -> usize {
        match self {
            FilterOutcome::NoResults { .. } => 0,
            FilterOutcome::Flat { businesses } => businesses.len(),
            FilterOutcome::Grouped { groups } => groups.iter().map(|g| g.businesses.len()).sum(),
        }
    }
}

/// Full pipeline: filter, then pick the render mode
pub fn view<'a>(catalog: &'a Catalog, state: &FilterState) -> FilterOutcome<'a> {
    let selected = state.selected_category.as_deref();
    let filtered = filter(&catalog.businesses, selected, &state.search_term);

    if filtered.is_empty() {
        return FilterOutcome::NoResults {
            message: NO_RESULTS_MESSAGE,
        };
    }

    match selected {
        Some(_) => FilterOutcome::Flat { businesses: filtered },
        None => FilterOutcome::Grouped {
            groups: group_by_category(catalog, &filtered),
        },
    }
}

// ============================================================================
// TESTS
// ============================================================================
