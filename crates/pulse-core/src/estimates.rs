//! Client-side approximations.
//!
//! These figures are derived locally from a single backend total using fixed
//! ratios. They are not backend output and every value produced here is
//! marked `estimated` so screens can label it as such.

use crate::models::MbuProjection;

/// Assumed split of mandatory biometric updates between the two cohorts
/// when the backend only reports a total.
pub const AGE_5_SHARE: f64 = 0.58;
pub const AGE_15_SHARE: f64 = 0.42;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbuCohort {
    /// First update, due at age 5.
    Age5,
    /// Second update, due at age 15.
    Age15,
}

impl MbuCohort {
    pub fn label(&self) -> &'static str {
        match self {
            MbuCohort::Age5 => "Age 5 (first MBU)",
            MbuCohort::Age15 => "Age 15 (second MBU)",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CohortShare {
    pub cohort: MbuCohort,
    pub count: f64,
    pub share_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CohortBreakdown {
    pub cohorts: Vec<CohortShare>,
    pub total: f64,
    /// True when the split was derived from fixed ratios rather than reported.
    pub estimated: bool,
}

/// `part` as a percentage of `whole`, or 0 when `whole` is not positive.
pub fn share_percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 && whole.is_finite() {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Split `total_due` across cohorts using the fixed ratios.
pub fn estimate_mbu_cohorts(total_due: f64) -> CohortBreakdown {
    let total = total_due.max(0.0);
    let cohorts = [(MbuCohort::Age5, AGE_5_SHARE), (MbuCohort::Age15, AGE_15_SHARE)]
        .into_iter()
        .map(|(cohort, ratio)| CohortShare {
            cohort,
            count: (total * ratio).round(),
            share_percent: ratio * 100.0,
        })
        .collect();

    CohortBreakdown {
        cohorts,
        total,
        estimated: true,
    }
}

/// Cohort breakdown for one projection: the reported split when the backend
/// sent one, otherwise the fixed-ratio estimate of its total.
pub fn mbu_breakdown(projection: &MbuProjection) -> CohortBreakdown {
    let reported = projection.due_age_5 + projection.due_age_15;
    if reported <= 0.0 {
        return estimate_mbu_cohorts(projection.total_due);
    }

    let total = if projection.total_due > 0.0 {
        projection.total_due
    } else {
        reported
    };
    let cohorts = [
        (MbuCohort::Age5, projection.due_age_5),
        (MbuCohort::Age15, projection.due_age_15),
    ]
    .into_iter()
    .map(|(cohort, count)| CohortShare {
        cohort,
        count,
        share_percent: share_percent(count, total),
    })
    .collect();

    CohortBreakdown {
        cohorts,
        total,
        estimated: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratios_cover_whole() {
        assert!((AGE_5_SHARE + AGE_15_SHARE - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_from_total() {
        let breakdown = estimate_mbu_cohorts(1000.0);
        assert!(breakdown.estimated);
        assert_eq!(breakdown.cohorts[0].count, 580.0);
        assert_eq!(breakdown.cohorts[1].count, 420.0);
        assert!((breakdown.cohorts[1].share_percent - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_total_clamped() {
        let breakdown = estimate_mbu_cohorts(-5.0);
        assert_eq!(breakdown.total, 0.0);
        assert!(breakdown.cohorts.iter().all(|c| c.count == 0.0));
    }

    #[test]
    fn test_reported_split_preferred() {
        let projection = MbuProjection {
            state: "Kerala".into(),
            district: "Idukki".into(),
            due_age_5: 300.0,
            due_age_15: 100.0,
            total_due: 400.0,
        };
        let breakdown = mbu_breakdown(&projection);
        assert!(!breakdown.estimated);
        assert_eq!(breakdown.cohorts[0].share_percent, 75.0);
        assert_eq!(breakdown.cohorts[1].count, 100.0);
    }

    #[test]
    fn test_total_only_projection_estimated() {
        let projection = MbuProjection {
            total_due: 50.0,
            ..Default::default()
        };
        assert!(mbu_breakdown(&projection).estimated);
    }

    #[test]
    fn test_share_percent_zero_whole() {
        assert_eq!(share_percent(5.0, 0.0), 0.0);
        assert_eq!(share_percent(1.0, 4.0), 25.0);
    }
}
