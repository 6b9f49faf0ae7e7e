//! Circular standard deviation for angular data in degrees.
//!
//! Angles are shifted by -180° before conversion, matching the +180° offset of
//! [`aspect`](crate::core::slope_aspect::aspect), so an aspect field can be
//! fed in directly. The shift is a rotation and does not change the spread.

use crate::types::Field;
use ndarray::{Array1, Axis};
use std::f64::consts::PI;

/// `sqrt(-2 ln R)` in degrees, where `R` is the mean resultant length of the
/// unit vectors of `angles`.
///
/// Non-finite angles are skipped; with no valid angle the result is NaN.
pub fn circular_std<'a, I>(angles: I) -> f64
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut sum_cos = 0.0;
    let mut sum_sin = 0.0;
    let mut count = 0usize;

    for &angle in angles {
        if !angle.is_finite() {
            continue;
        }
        let phase = (angle - 180.0) * PI / 180.0;
        sum_cos += phase.cos();
        sum_sin += phase.sin();
        count += 1;
    }

    if count == 0 {
        return f64::NAN;
    }

    let x = sum_cos / count as f64;
    let y = sum_sin / count as f64;
    let resultant = (x * x + y * y).sqrt().min(1.0);
    (-2.0 * resultant.ln()).sqrt() * 180.0 / PI
}

/// Circular standard deviation along `axis` of a field of angles
pub fn circular_std_axis(angles: &Field, axis: Axis) -> Array1<f64> {
    angles.map_axis(axis, |lane| circular_std(lane.iter()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_identical_angles_have_zero_spread() {
        assert_abs_diff_eq!(circular_std(&[42.0, 42.0, 42.0]), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_cluster_across_branch_cut() {
        let angles = [359.0, 1.0, 0.0];
        let circ = circular_std(&angles);
        assert!(circ < 1.0, "circular std {} should be about 0.8", circ);

        // A linear standard deviation sees a spread of ~170°
        let mean = angles.iter().sum::<f64>() / 3.0;
        let linear = (angles.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / 3.0).sqrt();
        assert!(linear > 100.0 * circ);
    }

    #[test]
    fn test_invariant_under_full_turns() {
        let angles = [10.0, 35.0, 80.0, 300.0];
        let shifted: Vec<f64> = angles.iter().map(|a| a + 360.0).collect();
        assert_abs_diff_eq!(circular_std(&angles), circular_std(&shifted), epsilon = 1e-9);
    }

    #[test]
    fn test_missing_angles_are_skipped() {
        assert!(circular_std(&[f64::NAN]).is_nan());
        let empty: [f64; 0] = [];
        assert!(circular_std(&empty).is_nan());
        assert_abs_diff_eq!(
            circular_std(&[10.0, f64::NAN, 20.0]),
            circular_std(&[10.0, 20.0]),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_axis_reduction() {
        let angles = array![[90.0, 0.0], [90.0, 180.0]];
        let per_column = circular_std_axis(&angles, Axis(0));
        assert_eq!(per_column.len(), 2);
        assert_abs_diff_eq!(per_column[0], 0.0, epsilon = 1e-5);
        // Opposite directions: resultant length ~0, spread blows up
        assert!(per_column[1] > 300.0);
    }
}
