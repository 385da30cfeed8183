//! Query parameters for dataset requests.

use std::fmt;

/// Default number of rows requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Largest page size the service accepts.
pub const MAX_PAGE_SIZE: u32 = 100_000;

/// Ordered filter predicates, passed through to the service verbatim.
///
/// Field names and predicate syntax (`ge(2021-05-01)`, `in(TX,LA)`,
/// `null`, ...) are defined per dataset by the service, so nothing here is
/// validated. Insertion order is preserved on the wire. Setting a field
/// twice replaces the earlier predicate in place.
///
/// # Example
///
/// ```
/// use enverus_rs::Filters;
///
/// let filters = Filters::new()
///     .with("updateddate", "ge(2021-05-01)")
///     .with("StateProvince", "in(TX,LA,WY)");
/// assert_eq!(filters.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters(Vec<(String, String)>);

impl Filters {
    /// Create an empty filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a predicate and return the filter set.
    pub fn with(mut self, field: impl Into<String>, predicate: impl Into<String>) -> Self {
        self.insert(field, predicate);
        self
    }

    /// Add (or replace) a predicate.
    pub fn insert(&mut self, field: impl Into<String>, predicate: impl Into<String>) {
        let field = field.into();
        let predicate = predicate.into();
        match self.0.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = predicate,
            None => self.0.push((field, predicate)),
        }
    }

    /// Look up the predicate for a field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, predicate)| predicate.as_str())
    }

    /// Number of predicates.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no predicates.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate predicates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (k, v) in iter {
            filters.insert(k, v);
        }
        filters
    }
}

/// A query against one dataset: page size plus filter predicates.
///
/// The pagination cursor is owned by the stream, not the query, so the same
/// `Query` can be reused for `count` and for a fresh `query` run.
///
/// # Example
///
/// ```
/// use enverus_rs::Query;
///
/// let query = Query::new()
///     .page_size(10_000)
///     .filter("deleteddate", "null");
/// assert_eq!(query.page_size, Some(10_000));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Rows per page; falls back to the client's configured page size.
    pub page_size: Option<u32>,
    /// Field predicates.
    pub filters: Filters,
}

impl Query {
    /// Create an unfiltered query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set rows per page.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Add a filter predicate.
    pub fn filter(mut self, field: impl Into<String>, predicate: impl Into<String>) -> Self {
        self.filters.insert(field, predicate);
        self
    }

    /// Replace all filters.
    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    /// Query-string pairs for the first page request.
    pub(crate) fn page_params(&self, page_size: u32) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 1);
        params.push(("pagesize".to_string(), page_size.to_string()));
        params.extend(self.filter_params());
        params
    }

    /// Query-string pairs carrying only the filters.
    pub(crate) fn filter_params(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl From<Filters> for Query {
    fn from(filters: Filters) -> Self {
        Self {
            page_size: None,
            filters,
        }
    }
}

impl fmt::Display for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in self.iter() {
            if !first {
                f.write_str("&")?;
            }
            write!(f, "{}={}", k, v)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_keep_insertion_order() {
        let filters = Filters::new()
            .with("b", "2")
            .with("a", "1")
            .with("c", "3");
        let keys: Vec<_> = filters.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_filters_replace_in_place() {
        let filters = Filters::new()
            .with("deleteddate", "null")
            .with("county", "Reeves")
            .with("deleteddate", "ge(2020-01-01)");
        assert_eq!(filters.len(), 2);
        assert_eq!(filters.get("deleteddate"), Some("ge(2020-01-01)"));
        assert_eq!(filters.to_string(), "deleteddate=ge(2020-01-01)&county=Reeves");
    }

    #[test]
    fn test_page_params() {
        let query = Query::new().filter("deleteddate", "null");
        assert_eq!(
            query.page_params(250),
            vec![
                ("pagesize".to_string(), "250".to_string()),
                ("deleteddate".to_string(), "null".to_string()),
            ]
        );
        assert_eq!(query.filter_params().len(), 1);
    }

    #[test]
    fn test_from_iterator() {
        let filters: Filters = vec![("a", "1"), ("b", "2")].into_iter().collect();
        let query = Query::from(filters);
        assert_eq!(query.filters.get("b"), Some("2"));
        assert_eq!(query.page_size, None);
    }
}
