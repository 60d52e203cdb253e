//! Request scoping types: the geographic filter and the as-of date.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Wire format for every date the backend accepts.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Label shown when no state is selected.
pub const ALL_INDIA: &str = "All India";

/// Snapshot date the dashboard opens on.
const DEFAULT_SIMULATION_DATE: (i32, u32, u32) = (2025, 12, 15);

/// The logical "as-of" date selecting which backend snapshot is served.
///
/// Equality and hashing go through the calendar day, so two values built
/// independently for the same day are interchangeable as cache key parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SimulationDate(NaiveDate);

impl SimulationDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Canonical `yyyy-MM-dd` form used in query strings and cache keys.
    pub fn as_param(&self) -> String {
        self.0.format(DATE_FORMAT).to_string()
    }
}

impl Default for SimulationDate {
    fn default() -> Self {
        let (y, m, d) = DEFAULT_SIMULATION_DATE;
        Self(NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
    }
}

impl fmt::Display for SimulationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for SimulationDate {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map(Self)
    }
}

impl TryFrom<String> for SimulationDate {
    type Error = chrono::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SimulationDate> for String {
    fn from(value: SimulationDate) -> Self {
        value.as_param()
    }
}

/// Geographic scope of a query.
///
/// `district` only means something while `state` is set; `with_state`
/// always clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LocationFilter {
    pub state: Option<String>,
    pub district: Option<String>,
}

impl LocationFilter {
    /// No filter at all.
    pub fn all_india() -> Self {
        Self::default()
    }

    pub fn for_state(state: impl Into<String>) -> Self {
        Self::default().with_state(Some(state.into()))
    }

    /// Replace the state and drop any district that belonged to the old one.
    pub fn with_state(self, state: Option<String>) -> Self {
        Self {
            state: non_blank(state),
            district: None,
        }
    }

    pub fn with_district(self, district: Option<String>) -> Self {
        Self {
            state: self.state,
            district: non_blank(district),
        }
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn district(&self) -> Option<&str> {
        self.district.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn is_all_india(&self) -> bool {
        self.state().is_none() && self.district().is_none()
    }

    /// Display label: `"District, State"`, `"State"`, or `"All India"`.
    pub fn label(&self) -> String {
        match (self.state(), self.district()) {
            (Some(state), Some(district)) => format!("{}, {}", district, state),
            (None, Some(district)) => district.to_string(),
            (Some(state), None) => state.to_string(),
            (None, None) => ALL_INDIA.to_string(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Everything a screen needs to build its query keys.
///
/// Passed explicitly into the dashboard facade instead of being read from
/// ambient state, so keys are a pure function of this value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ViewContext {
    pub date: SimulationDate,
    pub filter: LocationFilter,
}

impl ViewContext {
    pub fn new(date: SimulationDate, filter: LocationFilter) -> Self {
        Self { date, filter }
    }

    pub fn label(&self) -> String {
        self.filter.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_date_parse_and_display() {
        let date: SimulationDate = "2025-12-15".parse().unwrap();
        assert_eq!(date.to_string(), "2025-12-15");
        assert_eq!(date.as_param(), "2025-12-15");
        assert_eq!(date, SimulationDate::default());

        assert!("15/12/2025".parse::<SimulationDate>().is_err());
        assert!("2025-13-01".parse::<SimulationDate>().is_err());
    }

    #[test]
    fn test_simulation_date_equal_for_same_day() {
        let a = SimulationDate::from_ymd(2025, 3, 1).unwrap();
        let b: SimulationDate = " 2025-03-01 ".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_simulation_date_serde_as_string() {
        let date = SimulationDate::from_ymd(2024, 1, 9).unwrap();
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"2024-01-09\"");
        let back: SimulationDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, date);
    }

    #[test]
    fn test_with_state_clears_district() {
        let filter = LocationFilter::for_state("Odisha").with_district(Some("Khordha".into()));
        assert_eq!(filter.district(), Some("Khordha"));

        let filter = filter.with_state(Some("Kerala".into()));
        assert_eq!(filter.state(), Some("Kerala"));
        assert_eq!(filter.district(), None);
    }

    #[test]
    fn test_with_district_keeps_state() {
        let filter = LocationFilter::for_state("Kerala").with_district(Some("Idukki".into()));
        assert_eq!(filter.state(), Some("Kerala"));
    }

    #[test]
    fn test_blank_values_mean_no_filter() {
        let filter = LocationFilter::all_india().with_state(Some("  ".into()));
        assert!(filter.is_all_india());
    }

    #[test]
    fn test_label() {
        assert_eq!(LocationFilter::all_india().label(), "All India");
        assert_eq!(LocationFilter::for_state("Odisha").label(), "Odisha");
        let filter = LocationFilter::for_state("Odisha").with_district(Some("Puri".into()));
        assert_eq!(filter.label(), "Puri, Odisha");
    }
}
