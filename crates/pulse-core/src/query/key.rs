//! Query identity.

use std::collections::BTreeMap;
use std::fmt;

use crate::models::{SimulationDate, ViewContext};

/// Identity of one cacheable request.
///
/// Two keys are equal iff resource, date string, state, district and every
/// extra parameter are equal by value. Only the components a request
/// actually sends belong in its key, so unrelated filter changes do not
/// refetch it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    resource: String,
    date: Option<String>,
    state: Option<String>,
    district: Option<String>,
    params: BTreeMap<String, String>,
}

impl QueryKey {
    /// A key with no date or location, e.g. health or the state list.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            date: None,
            state: None,
            district: None,
            params: BTreeMap::new(),
        }
    }

    /// Date, state and district all taken from the view.
    pub fn scoped(resource: impl Into<String>, view: &ViewContext) -> Self {
        Self::new(resource)
            .date(view.date)
            .state(view.filter.state())
            .district(view.filter.district())
    }

    pub fn date(mut self, date: SimulationDate) -> Self {
        self.date = Some(date.as_param());
        self
    }

    pub fn state(mut self, state: Option<&str>) -> Self {
        self.state = state.filter(|s| !s.trim().is_empty()).map(str::to_string);
        self
    }

    pub fn district(mut self, district: Option<&str>) -> Self {
        self.district = district.filter(|d| !d.trim().is_empty()).map(str::to_string);
        self
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn param_opt<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.resource,
            self.date.as_deref().unwrap_or("-"),
            self.state.as_deref().unwrap_or("-"),
            self.district.as_deref().unwrap_or("-"),
        )?;
        for (k, v) in &self.params {
            write!(f, "|{}={}", k, v)?;
        }
        Ok(())
    }
}
