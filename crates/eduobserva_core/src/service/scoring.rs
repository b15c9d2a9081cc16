//! Scoring engine and dashboard summary.
//!
//! # Responsibility
//! - Aggregate present scores per dimension across a set of observations.
//! - Derive the overall average and dashboard counters.
//!
//! # Invariants
//! - A dimension average is the flat mean of every present score for its
//!   criteria across all inputs; absent scores count in neither numerator
//!   nor denominator.
//! - A dimension with no present scores averages exactly `0.0`.
//! - Every average lies in `[0, 5]`.
//! - The overall average is the plain mean of dimension averages, so
//!   zero-sample dimensions pull it down with their `0.0`.
//! - All functions are pure.

use crate::model::observation::TeacherObservation;
use crate::model::rubric::Rubric;
use serde::Serialize;
use std::collections::BTreeSet;

/// Aggregated score for one dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionAverage {
    pub dimension_id: String,
    pub dimension_title: String,
    pub average: f64,
    pub sample_count: u32,
}

/// Averages present scores per dimension, in rubric order.
pub fn aggregate(observations: &[TeacherObservation], rubric: &Rubric) -> Vec<DimensionAverage> {
    rubric
        .dimensions()
        .iter()
        .map(|dimension| {
            let mut total: u32 = 0;
            let mut sample_count: u32 = 0;
            for observation in observations {
                for criterion in &dimension.criteria {
                    if let Some(score) = observation.score_for(&criterion.id) {
                        total += u32::from(score.value());
                        sample_count += 1;
                    }
                }
            }

            let average = if sample_count == 0 {
                0.0
            } else {
                f64::from(total) / f64::from(sample_count)
            };

            DimensionAverage {
                dimension_id: dimension.id.clone(),
                dimension_title: dimension.title.clone(),
                average,
                sample_count,
            }
        })
        .collect()
}

/// Mean of the per-dimension averages; `0.0` for an empty slice.
pub fn overall_average(aggregated: &[DimensionAverage]) -> f64 {
    if aggregated.is_empty() {
        return 0.0;
    }
    let sum: f64 = aggregated.iter().map(|entry| entry.average).sum();
    sum / aggregated.len() as f64
}

/// Rounds for one-decimal display (dashboard bars and cards).
pub fn rounded_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Values rendered by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub observation_count: usize,
    /// Distinct school names (exact match after trimming).
    pub school_count: usize,
    pub dimensions: Vec<DimensionAverage>,
    pub overall_average: f64,
}

impl DashboardSummary {
    pub fn compute(observations: &[TeacherObservation], rubric: &Rubric) -> Self {
        let dimensions = aggregate(observations, rubric);
        let overall_average = overall_average(&dimensions);
        let school_count = observations
            .iter()
            .map(|observation| observation.school_name.trim())
            .collect::<BTreeSet<_>>()
            .len();

        Self {
            observation_count: observations.len(),
            school_count,
            dimensions,
            overall_average,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{overall_average, rounded_one_decimal, DimensionAverage};

    fn entry(average: f64) -> DimensionAverage {
        DimensionAverage {
            dimension_id: "d".to_string(),
            dimension_title: "D".to_string(),
            average,
            sample_count: 1,
        }
    }

    #[test]
    fn overall_average_of_nothing_is_zero() {
        assert_eq!(overall_average(&[]), 0.0);
    }

    #[test]
    fn overall_average_includes_zero_dimensions() {
        assert_eq!(overall_average(&[entry(4.0), entry(0.0)]), 2.0);
    }

    #[test]
    fn rounding_keeps_one_decimal() {
        assert_eq!(rounded_one_decimal(3.6666), 3.7);
        assert_eq!(rounded_one_decimal(4.0), 4.0);
    }
}
