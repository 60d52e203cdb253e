//! The location context: who is selected, and what can be selected.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::models::LocationFilter;

use super::normalize::{canonical_state_name, normalize_state_list};

/// Source of the state and district option lists.
pub trait LocationSource: Send + Sync {
    fn states(&self) -> BoxFuture<'_, Result<Vec<String>, ApiError>>;

    fn districts<'a>(&'a self, state: &'a str) -> BoxFuture<'a, Result<Vec<String>, ApiError>>;
}

#[derive(Debug, Default)]
struct LocationState {
    filter: LocationFilter,
    states: Vec<String>,
    districts: Vec<String>,
    states_loading: bool,
    districts_loading: bool,
    states_requested: bool,
    /// Bumped on every state change; district lists for an older value are dropped.
    district_generation: u64,
}

/// Read-only view handed to screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationSnapshot {
    pub selected_state: Option<String>,
    pub selected_district: Option<String>,
    pub states: Vec<String>,
    pub districts: Vec<String>,
    pub states_loading: bool,
    pub districts_loading: bool,
    pub location_label: String,
}

/// Single authoritative holder of the active geographic filter.
///
/// Screens read through the accessors and change the selection through
/// `select_state` / `select_district`; the option lists are only written
/// here.
pub struct LocationContext {
    source: Arc<dyn LocationSource>,
    inner: Mutex<LocationState>,
}

impl LocationContext {
    pub fn new(source: Arc<dyn LocationSource>) -> Self {
        Self {
            source,
            inner: Mutex::new(LocationState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LocationState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the state list. Only the first call reaches the network.
    pub async fn init(&self) {
        {
            let mut inner = self.lock();
            if inner.states_requested {
                return;
            }
            inner.states_requested = true;
            inner.states_loading = true;
        }

        let result = self.source.states().await;

        let mut inner = self.lock();
        inner.states_loading = false;
        match result {
            Ok(raw) => {
                inner.states = normalize_state_list(raw);
                debug!(count = inner.states.len(), "State list loaded");
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch state list");
                inner.states.clear();
            }
        }
    }

    /// Change the selected state.
    ///
    /// The district is cleared immediately. A non-empty state then loads its
    /// district list; `None` empties the list without a network call.
    pub async fn select_state(&self, state: Option<String>) {
        let state = state.as_deref().and_then(canonical_state_name);

        let generation = {
            let mut inner = self.lock();
            inner.filter = inner.filter.clone().with_state(state.clone());
            inner.district_generation += 1;
            inner.districts.clear();
            inner.districts_loading = state.is_some();
            inner.district_generation
        };
        info!(state = ?state, "Location state selected");

        let Some(state) = state else {
            return;
        };

        let result = self.source.districts(&state).await;

        let mut inner = self.lock();
        if inner.district_generation != generation {
            debug!(state = %state, "Discarding districts for superseded state");
            return;
        }
        inner.districts_loading = false;
        match result {
            Ok(mut districts) => {
                districts.retain(|d| !d.trim().is_empty());
                districts.sort();
                districts.dedup();
                inner.districts = districts;
            }
            Err(e) => {
                warn!(state = %state, error = %e, "Failed to fetch district list");
            }
        }
    }

    /// Change the selected district. The state is left alone.
    pub fn select_district(&self, district: Option<String>) {
        let mut inner = self.lock();
        inner.filter = inner.filter.clone().with_district(district);
        info!(district = ?inner.filter.district, "Location district selected");
    }

    pub fn filter(&self) -> LocationFilter {
        self.lock().filter.clone()
    }

    pub fn selected_state(&self) -> Option<String> {
        self.lock().filter.state.clone()
    }

    pub fn selected_district(&self) -> Option<String> {
        self.lock().filter.district.clone()
    }

    pub fn location_label(&self) -> String {
        self.lock().filter.label()
    }

    pub fn states(&self) -> Vec<String> {
        self.lock().states.clone()
    }

    pub fn districts(&self) -> Vec<String> {
        self.lock().districts.clone()
    }

    pub fn is_loading_states(&self) -> bool {
        self.lock().states_loading
    }

    pub fn is_loading_districts(&self) -> bool {
        self.lock().districts_loading
    }

    pub fn snapshot(&self) -> LocationSnapshot {
        let inner = self.lock();
        LocationSnapshot {
            selected_state: inner.filter.state.clone(),
            selected_district: inner.filter.district.clone(),
            states: inner.states.clone(),
            districts: inner.districts.clone(),
            states_loading: inner.states_loading,
            districts_loading: inner.districts_loading,
            location_label: inner.filter.label(),
        }
    }
}
