//! Query string construction.

use crate::models::{LocationFilter, SimulationDate};

/// Ordered query parameters for one request.
///
/// Optional values are omitted entirely when `None` or blank: the backend
/// reads a missing parameter as "no filter" and an empty one as a filter on
/// the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the mandatory `simulation_date`.
    pub fn dated(date: SimulationDate) -> Self {
        Self::new().push("simulation_date", date.as_param())
    }

    pub fn push(mut self, name: &'static str, value: impl ToString) -> Self {
        self.pairs.push((name, value.to_string()));
        self
    }

    pub fn push_opt<V: ToString>(self, name: &'static str, value: Option<V>) -> Self {
        match value.map(|v| v.to_string()) {
            Some(v) if !v.trim().is_empty() => self.push(name, v),
            _ => self,
        }
    }

    /// Add `state` and `district` from a filter, skipping unset fields.
    pub fn location(self, filter: &LocationFilter) -> Self {
        self.push_opt("state", filter.state())
            .push_opt("district", filter.district())
    }

    /// Add only `state`, for endpoints that are not district-aware.
    pub fn state_only(self, filter: &LocationFilter) -> Self {
        self.push_opt("state", filter.state())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_only_filter_omits_district() {
        let date = SimulationDate::default();
        let params = QueryParams::dated(date).location(&LocationFilter::for_state("Odisha"));
        assert_eq!(params.get("state"), Some("Odisha"));
        assert_eq!(params.get("district"), None);
        assert_eq!(params.pairs().len(), 2);
    }

    #[test]
    fn test_blank_and_none_are_omitted() {
        let params = QueryParams::new()
            .push_opt("state", Some(""))
            .push_opt("district", Some("   "))
            .push_opt::<u32>("limit", None)
            .push_opt("top_n", Some(5));
        assert_eq!(params.pairs(), &[("top_n", "5".to_string())]);
    }

    #[test]
    fn test_all_india_has_only_date() {
        let params = QueryParams::dated(SimulationDate::default()).location(&LocationFilter::all_india());
        assert_eq!(params.pairs(), &[("simulation_date", "2025-12-15".to_string())]);
    }
}
