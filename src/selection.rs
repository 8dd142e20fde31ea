// 🔗 Selection State Sync - selected category <-> `?cat=<id>`
//
// A shared link reproduces the filtered view. Only the `cat` parameter is
// recognized; everything else in the query string is ignored.
//
// Known limitation: selection changes REPLACE the current history entry.
// There is no entry to go "back" to, so returning to the unfiltered view
// through browser navigation is not supported.

use crate::catalog::{Catalog, Category};
use crate::category_index::CategoryIndex;
use url::{form_urlencoded, Url};

pub const CATEGORY_PARAM: &str = "cat";

// ============================================================================
// ENCODE / DECODE
// ============================================================================

/// `Some(id)` -> `?cat=<id>`; `None` (All categories) -> empty query
pub fn encode(selected_category: Option<&str>) -> String {
    match selected_category {
        Some(id) => format!("?{}={}", CATEGORY_PARAM, urlencoding::encode(id)),
        None => String::new(),
    }
}

/// Raw `cat` value from a query string. First occurrence wins; names and
/// values are form-decoded, so `c%61t=a+b` reads as `cat` = `a b`.
pub fn category_param(query: &str) -> Option<String> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .find(|(name, _)| name == CATEGORY_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Resolve `cat` against the catalog. Missing, empty or unknown values
/// fall back to "All categories" (`None`); a miss is never an error.
pub fn decode<'a>(query: &str, catalog: &'a Catalog) -> Option<&'a Category> {
    let id = category_param(query).filter(|id| !id.is_empty())?;

    let category = catalog.category_by_id(&id);
    if category.is_none() {
        tracing::debug!(cat = %id, "ignoring unknown category in query string");
    }
    category
}

// ============================================================================
// INITIAL SELECTION
// ============================================================================

/// What the page pre-seeds on first load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialSelection<'a> {
    /// `None` = All categories
    pub category: Option<&'a Category>,

    /// Grid entry to mark selected
    pub grid_position: usize,
}

pub fn initial_selection<'a>(
    query: &str,
    catalog: &'a Catalog,
    index: &CategoryIndex,
) -> InitialSelection<'a> {
    let category = decode(query, catalog);
    let grid_position = index
        .position_of(category.map(|c| c.id.as_str()))
        .unwrap_or(0);

    InitialSelection {
        category,
        grid_position,
    }
}

// ============================================================================
// LOCATION + HISTORY
// ============================================================================

/// Page-relative URLs are resolved against this; only path and query are kept
const PLACEHOLDER_ORIGIN: &str = "http://localhost/";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,

    /// Including the leading '?', or empty
    pub query: String,
}

impl Location {
    /// Accepts page-relative (`/index.html?cat=x`) and absolute URLs.
    /// The fragment is dropped. Unparseable input lands on `/`.
    pub fn parse(url: &str) -> Self {
        match Url::parse(PLACEHOLDER_ORIGIN).and_then(|base| base.join(url)) {
            Ok(parsed) => Location::from(&parsed),
            Err(e) => {
                tracing::debug!(%url, error = %e, "unparseable location, using /");
                Location {
                    path: "/".to_string(),
                    query: String::new(),
                }
            }
        }
    }

    pub fn href(&self) -> String {
        format!("{}{}", self.path, self.query)
    }
}

impl From<&Url> for Location {
    fn from(url: &Url) -> Self {
        Location {
            path: url.path().to_string(),
            query: url
                .query()
                .filter(|q| !q.is_empty())
                .map(|q| format!("?{}", q))
                .unwrap_or_default(),
        }
    }
}

/// Address bar seam. Only replacement is offered: selection never creates
/// a history entry.
pub trait History {
    fn location(&self) -> Location;
    fn replace_state(&mut self, url: &str);
}

/// In-memory session history. Starts with the page's own entry; the last
/// entry is the current location.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<Location>,
    replacements: usize,
}

impl MemoryHistory {
    pub fn new(url: &str) -> Self {
        MemoryHistory {
            entries: vec![Location::parse(url)],
            replacements: 0,
        }
    }

    pub fn entries(&self) -> &[Location] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn replacements(&self) -> usize {
        self.replacements
    }
}

impl History for MemoryHistory {
    fn location(&self) -> Location {
        self.entries.last().cloned().unwrap_or_default()
    }

    fn replace_state(&mut self, url: &str) {
        let location = Location::parse(url);
        match self.entries.last_mut() {
            Some(current) => *current = location,
            None => self.entries.push(location),
        }
        self.replacements += 1;
    }
}

/// Write the selection to the address bar. "All categories" clears the
/// query string, leaving the path only.
pub fn sync_selection(history: &mut dyn History, selected_category: Option<&str>) {
    let path = history.location().path;
    let url = format!("{}{}", path, encode(selected_category));
    history.replace_state(&url);
}

// ============================================================================
// TESTS
// ============================================================================
