//! Terrain slope and aspect in degrees.
//!
//! Axis convention: `dy` is the derivative along increasing row index and `dx`
//! the derivative along increasing column index (see [`GradientPair`]).
//! Aspect is `atan2(dy, dx) + 180°`, i.e. the direction of steepest descent
//! `-∇z` measured from the +column axis toward the +row axis, in `[0, 360)`.
//! A surface rising toward +column has aspect 180°, one rising toward +row
//! has aspect 270°. Passing a transposed field (or swapping the gradient
//! components) silently reflects the aspect, so keep rows as y.

use crate::core::gradient::gradient;
use crate::core::operator::{map_cells, FieldOperator};
use crate::types::{DemResult, Field, GradientPair, Spacing};
use std::f64::consts::PI;

const DEGREES: f64 = 180.0 / PI;

/// Slope angle in degrees for a single gradient, range `[0, 90)`
#[inline]
pub fn slope_from_gradient(dy: f64, dx: f64) -> f64 {
    (dx * dx + dy * dy).sqrt().atan() * DEGREES
}

/// Aspect in degrees for a single gradient, range `[0, 360)`.
///
/// Flat cells (`dx = dy = 0`) have no defined direction and return NaN.
#[inline]
pub fn aspect_from_gradient(dy: f64, dx: f64) -> f64 {
    if dx == 0.0 && dy == 0.0 {
        return f64::NAN;
    }
    let aspect = dy.atan2(dx) * DEGREES + 180.0;
    if aspect >= 360.0 {
        aspect - 360.0
    } else {
        aspect
    }
}

/// Slope field from a precomputed gradient
pub fn slope_from(gradient: &GradientPair) -> Field {
    map_cells(gradient.d_row.dim(), |i, j| {
        slope_from_gradient(gradient.d_row[[i, j]], gradient.d_col[[i, j]])
    })
}

/// Aspect field from a precomputed gradient
pub fn aspect_from(gradient: &GradientPair) -> Field {
    map_cells(gradient.d_row.dim(), |i, j| {
        aspect_from_gradient(gradient.d_row[[i, j]], gradient.d_col[[i, j]])
    })
}

/// Slope in degrees
pub fn slope(z: &Field, spacing: Spacing) -> DemResult<Field> {
    Ok(slope_from(&gradient(z, spacing)?))
}

/// Aspect in degrees (see the module docs for the axis convention)
pub fn aspect(z: &Field, spacing: Spacing) -> DemResult<Field> {
    Ok(aspect_from(&gradient(z, spacing)?))
}

/// Slope and aspect from a single gradient pass
pub fn slope_aspect(z: &Field, spacing: Spacing) -> DemResult<(Field, Field)> {
    let grad = gradient(z, spacing)?;
    Ok((slope_from(&grad), aspect_from(&grad)))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Slope;

impl FieldOperator for Slope {
    fn name(&self) -> &'static str {
        "slope"
    }

    fn apply(&self, field: &Field, spacing: Spacing) -> DemResult<Field> {
        slope(field, spacing)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Aspect;

impl FieldOperator for Aspect {
    fn name(&self) -> &'static str {
        "aspect"
    }

    fn apply(&self, field: &Field, spacing: Spacing) -> DemResult<Field> {
        aspect(field, spacing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn spacing(d: f64) -> Spacing {
        Spacing::new(d).unwrap()
    }

    fn plane(rows: usize, cols: usize, a: f64, b: f64, d: f64) -> Field {
        Field::from_shape_fn((rows, cols), |(i, j)| a * j as f64 * d + b * i as f64 * d)
    }

    #[test]
    fn test_flat_field() {
        let z = Field::from_elem((5, 5), 12.5);
        let (slp, asp) = slope_aspect(&z, spacing(1.0)).unwrap();
        assert!(slp.iter().all(|&s| s == 0.0));
        assert!(asp.iter().all(|a| a.is_nan()));
    }

    #[test]
    fn test_tilted_plane_slope() {
        let (a, b) = (0.4, 0.3);
        let z = plane(7, 9, a, b, 0.5);
        let slp = slope(&z, spacing(0.5)).unwrap();
        let expected = (a * a + b * b).sqrt().atan().to_degrees();
        for i in 1..6 {
            for j in 1..8 {
                assert_abs_diff_eq!(slp[[i, j]], expected, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_aspect_convention() {
        // Rising toward +column: steepest descent points along -column
        assert_abs_diff_eq!(aspect_from_gradient(0.0, 1.0), 180.0, epsilon = 1e-9);
        // Rising toward +row
        assert_abs_diff_eq!(aspect_from_gradient(1.0, 0.0), 270.0, epsilon = 1e-9);
        // Rising toward -column
        assert_abs_diff_eq!(aspect_from_gradient(0.0, -1.0), 0.0, epsilon = 1e-9);
        // Rising toward -row
        assert_abs_diff_eq!(aspect_from_gradient(-1.0, 0.0), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_aspect_range() {
        let z = Field::from_shape_fn((8, 8), |(i, j)| {
            let (x, y) = (j as f64 - 3.5, i as f64 - 3.5);
            (-(x * x + y * y) / 4.0).exp()
        });
        let asp = aspect(&z, spacing(1.0)).unwrap();
        for a in asp.iter().filter(|a| a.is_finite()) {
            assert!((0.0..360.0).contains(a), "aspect {} out of range", a);
        }
    }

    #[test]
    fn test_slope_range() {
        let z = plane(4, 4, 1e6, 0.0, 1.0);
        let slp = slope(&z, spacing(1.0)).unwrap();
        assert!(slp.iter().all(|&s| (0.0..90.0).contains(&s)));
    }

    #[test]
    fn test_missing_center_propagates() {
        let mut z = plane(5, 5, 0.2, 0.1, 1.0);
        z[[2, 2]] = f64::NAN;
        let (slp, asp) = slope_aspect(&z, spacing(1.0)).unwrap();
        for &(i, j) in &[(2, 2), (1, 2), (3, 2), (2, 1), (2, 3)] {
            assert!(slp[[i, j]].is_nan());
            assert!(asp[[i, j]].is_nan());
        }
        assert!(slp[[0, 0]].is_finite());
    }
}
