//! NaN-aware summaries of derived fields

use crate::types::Field;
use serde::{Deserialize, Serialize};

/// Summary statistics over the valid (finite) cells of a field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub total_cells: usize,
    pub valid_cells: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl FieldSummary {
    pub fn of(field: &Field) -> Self {
        let mut values = valid_values(field);
        let valid_cells = values.len();

        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        Self {
            total_cells: field.len(),
            valid_cells,
            mean: mean_of(&values),
            median: median_of(&mut values),
            min: if valid_cells > 0 { min } else { f64::NAN },
            max: if valid_cells > 0 { max } else { f64::NAN },
        }
    }

    /// Fraction of cells that carry a value, 0 for an empty field
    pub fn valid_fraction(&self) -> f64 {
        if self.total_cells == 0 {
            0.0
        } else {
            self.valid_cells as f64 / self.total_cells as f64
        }
    }
}

/// Mean of the finite cells, NaN when there are none
pub fn nan_mean(field: &Field) -> f64 {
    mean_of(&valid_values(field))
}

/// Median of the finite cells, NaN when there are none
pub fn nan_median(field: &Field) -> f64 {
    median_of(&mut valid_values(field))
}

fn valid_values(field: &Field) -> Vec<f64> {
    field.iter().copied().filter(|v| v.is_finite()).collect()
}

fn mean_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median_of(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_nan_aware_mean_and_median() {
        let field = array![[1.0, f64::NAN, 3.0], [10.0, f64::INFINITY, 2.0]];
        assert_eq!(nan_mean(&field), 4.0);
        assert_eq!(nan_median(&field), 2.5);
    }

    #[test]
    fn test_all_missing() {
        let field = Field::from_elem((2, 2), f64::NAN);
        assert!(nan_mean(&field).is_nan());
        assert!(nan_median(&field).is_nan());
        let summary = FieldSummary::of(&field);
        assert_eq!(summary.valid_cells, 0);
        assert_eq!(summary.valid_fraction(), 0.0);
        assert!(summary.min.is_nan());
    }

    #[test]
    fn test_summary() {
        let field = array![[5.0, 1.0], [f64::NAN, 3.0]];
        let summary = FieldSummary::of(&field);
        assert_eq!(summary.total_cells, 4);
        assert_eq!(summary.valid_cells, 3);
        assert_eq!(summary.mean, 3.0);
        assert_eq!(summary.median, 3.0);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 5.0);
        assert_eq!(summary.valid_fraction(), 0.75);
    }
}
