// ── Filter context ──
//
// The dashboard-wide filter state (date range, exclusions, search term)
// captured as an immutable snapshot. Every fetch holds the `Arc` it was
// started with; the core passes it through without inspecting it.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Immutable filter/query snapshot passed through to every fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    /// Keys excluded from aggregation (e.g. seller or customer codes).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Backend-specific extra parameters, in insertion order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub params: IndexMap<String, serde_json::Value>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    #[must_use]
    pub fn with_exclusions(mut self, exclusions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclusions = exclusions.into_iter().map(Into::into).collect();
        self
    }

    /// Blank search terms are normalized to `None`.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let term = search.into();
        self.search = if term.trim().is_empty() {
            None
        } else {
            Some(term.trim().to_owned())
        };
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// `true` when the range is set and inverted.
    pub fn has_inverted_range(&self) -> bool {
        matches!((self.date_from, self.date_to), (Some(from), Some(to)) if from > to)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn blank_search_is_none() {
        let ctx = QueryContext::new().with_search("   ");
        assert!(ctx.search.is_none());
        let ctx = QueryContext::new().with_search(" acme ");
        assert_eq!(ctx.search.as_deref(), Some("acme"));
    }

    #[test]
    fn inverted_range_detected() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(QueryContext::new().with_date_range(Some(from), Some(to)).has_inverted_range());
        assert!(!QueryContext::new().with_date_range(Some(to), Some(from)).has_inverted_range());
        assert!(!QueryContext::new().with_date_range(Some(from), None).has_inverted_range());
    }

    #[test]
    fn empty_fields_are_skipped_when_serialized() {
        let json = serde_json::to_value(QueryContext::new().with_param("p_region", "north")).unwrap();
        assert_eq!(json, serde_json::json!({ "params": { "p_region": "north" } }));
    }
}
