//! Location selection: the active state/district filter and its option lists.
//!
//! - `LocationContext`: single holder of the selected filter, fetched
//!   state/district lists and their loading flags
//! - `LocationSource`: where the lists come from (the API client in
//!   production, a fake in tests)
//! - `normalize`: canonical spelling for state names

pub mod context;
pub mod normalize;

pub use context::{LocationContext, LocationSnapshot, LocationSource};
pub use normalize::{canonical_state_name, normalize_state_list};
