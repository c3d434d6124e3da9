//! List query state and its query-string mirror.
//!
//! The query is the single source of truth for one listing screen. Every
//! mutation is a pure, synchronous transition; serializing to the location
//! and re-parsing yields the same query back (the filter map is a `BTreeMap`
//! so serialization order is deterministic).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Page sizes the pagination footer offers.
pub const PAGE_SIZES: [u32; 4] = [10, 25, 50, 100];
pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: String,
    pub filters: BTreeMap<String, String>,
    pub page: u32,
    pub page_size: u32,
    pub sort: Option<Sort>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            filters: BTreeMap::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: None,
        }
    }
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snap an arbitrary value onto the allowed page-size set, picking the
    /// nearest member (ties go to the smaller one).
    pub fn snap_page_size(requested: u32) -> u32 {
        let mut best = PAGE_SIZES[0];
        let mut best_distance = best.abs_diff(requested);
        for &candidate in &PAGE_SIZES[1..] {
            let distance = candidate.abs_diff(requested);
            if distance < best_distance {
                best = candidate;
                best_distance = distance;
            }
        }
        best
    }

    /// Build a query from a location query string.
    ///
    /// Unknown keys are ignored; invalid numeric values fall back to their
    /// defaults instead of erroring. Only keys in `filter_keys` land in the
    /// filter map, and empty filter values mean "no filter".
    pub fn parse(query_string: &str, filter_keys: &[&str]) -> Self {
        let mut query = Self::default();
        let mut sort_field: Option<String> = None;
        let mut sort_direction = SortDirection::Asc;

        let trimmed = query_string.trim_start_matches('?');
        for (key, value) in form_urlencoded::parse(trimmed.as_bytes()) {
            match key.as_ref() {
                "search" => query.search = value.into_owned(),
                "page" => {
                    query.page = value.parse::<u32>().ok().filter(|p| *p >= 1).unwrap_or(1);
                }
                "page_size" => {
                    query.page_size = value
                        .parse::<u32>()
                        .map(Self::snap_page_size)
                        .unwrap_or(DEFAULT_PAGE_SIZE);
                }
                "sort" => {
                    if !value.is_empty() {
                        sort_field = Some(value.into_owned());
                    }
                }
                "order" => {
                    if let Some(direction) = SortDirection::parse(&value) {
                        sort_direction = direction;
                    }
                }
                key if filter_keys.contains(&key) => {
                    if !value.is_empty() {
                        query.filters.insert(key.to_string(), value.into_owned());
                    }
                }
                _ => {}
            }
        }

        query.sort = sort_field.map(|field| Sort {
            field,
            direction: sort_direction,
        });
        query
    }

    /// Serialize for the location. Every recognized key is present — filters
    /// included, empty when unset — so screens share one stable contract.
    pub fn to_query_string(&self, filter_keys: &[&str]) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("search", &self.search);
        for key in filter_keys {
            let value = self.filters.get(*key).map(String::as_str).unwrap_or("");
            serializer.append_pair(key, value);
        }
        if let Some(sort) = &self.sort {
            serializer.append_pair("sort", &sort.field);
            serializer.append_pair("order", sort.direction.as_str());
        }
        serializer.append_pair("page", &self.page.to_string());
        serializer.append_pair("page_size", &self.page_size.to_string());
        serializer.finish()
    }

    /// True when the user narrowed the listing somehow; decides which empty
    /// state a screen renders.
    pub fn has_criteria(&self) -> bool {
        !self.search.trim().is_empty() || !self.filters.is_empty()
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
        self.page = 1;
    }

    /// An empty value clears the filter. Either way the page resets.
    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if value.is_empty() {
            self.filters.remove(&key);
        } else {
            self.filters.insert(key, value);
        }
        self.page = 1;
    }

    /// The one transition that leaves every other field alone.
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = Self::snap_page_size(page_size);
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: Option<Sort>) {
        self.sort = sort;
        self.page = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: &[&str] = &["status", "school_id"];

    #[test]
    fn defaults_on_empty_location() {
        let query = ListQuery::parse("", KEYS);
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, DEFAULT_PAGE_SIZE);
        assert!(query.search.is_empty());
        assert!(query.filters.is_empty());
        assert!(query.sort.is_none());
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let query = ListQuery::parse("page=abc&page_size=banana", KEYS);
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, DEFAULT_PAGE_SIZE);

        let query = ListQuery::parse("page=0", KEYS);
        assert_eq!(query.page, 1);
    }

    #[test]
    fn page_size_snaps_to_nearest_allowed() {
        assert_eq!(ListQuery::snap_page_size(10), 10);
        assert_eq!(ListQuery::snap_page_size(0), 10);
        assert_eq!(ListQuery::snap_page_size(30), 25);
        assert_eq!(ListQuery::snap_page_size(40), 50);
        assert_eq!(ListQuery::snap_page_size(1000), 100);
        // equidistant: prefer the smaller member
        assert_eq!(ListQuery::snap_page_size(75), 50);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let query = ListQuery::parse("status=ativo&utm_source=mail&page=2", KEYS);
        assert_eq!(query.filters.get("status").map(String::as_str), Some("ativo"));
        assert!(!query.filters.contains_key("utm_source"));
        assert_eq!(query.page, 2);
    }

    #[test]
    fn serialize_then_parse_is_idempotent() {
        let mut query = ListQuery::new();
        query.set_filter("status", "ativo");
        query.set_search("maria da silva");
        query.set_sort(Some(Sort {
            field: "name".into(),
            direction: SortDirection::Desc,
        }));
        query.set_page_size(50);
        query.set_page(3);

        let serialized = query.to_query_string(KEYS);
        let reparsed = ListQuery::parse(&serialized, KEYS);
        assert_eq!(reparsed, query);

        // and a second round trip changes nothing
        assert_eq!(reparsed.to_query_string(KEYS), serialized);
    }

    #[test]
    fn every_contract_key_is_present_after_serialization() {
        let serialized = ListQuery::new().to_query_string(KEYS);
        for key in ["search=", "status=", "school_id=", "page=1", "page_size=25"] {
            assert!(serialized.contains(key), "{key} missing from {serialized}");
        }
    }

    #[test]
    fn any_change_but_page_resets_the_page() {
        let mut query = ListQuery::new();
        query.set_page(4);
        assert_eq!(query.page, 4);

        query.set_filter("status", "ativo");
        assert_eq!(query.page, 1);

        query.set_page(4);
        query.set_search("ana");
        assert_eq!(query.page, 1);

        query.set_page(4);
        query.set_page_size(10);
        assert_eq!(query.page, 1);

        query.set_page(2);
        query.set_sort(None);
        assert_eq!(query.page, 1);
    }

    #[test]
    fn clearing_a_filter_removes_the_key() {
        let mut query = ListQuery::new();
        query.set_filter("status", "ativo");
        query.set_filter("status", "");
        assert!(query.filters.is_empty());
    }
}
