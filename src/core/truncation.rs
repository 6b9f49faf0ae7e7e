//! Truncation error of the central-difference gradient.
//!
//! The central difference `(z[k+1] - z[k-1]) / 2d` differs from the true
//! derivative by the third-order Taylor term `e = d²/6 · ∂³z`. The third
//! derivative is estimated by differencing the gradient field two more times,
//! so the estimate amplifies noise in `z` by roughly `1/d²`: on noisy DEMs at
//! fine spacing the truncation error field is dominated by that noise. This is
//! a property of the method, not of the implementation.
//!
//! The slope and aspect errors are half the difference between the angles at
//! `∇z + e` and `∇z - e`, written in closed form to avoid cancellation; the
//! sign comes from the raw perturbed-angle difference.

use crate::core::gradient::{derivative, gradient, EdgeOrder};
use crate::core::operator::{map_cells, sign, FieldOperator};
use crate::types::{ensure_support, DemResult, Field, GradientPair, Spacing};
use ndarray::{Axis, Zip};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const DEGREES: f64 = 180.0 / PI;

/// Smallest grid (along each axis) the three-pass stencil is evaluated on
pub const MIN_TRUNCATION_CELLS: usize = 5;

/// Width of the perimeter band whose third derivative reads a one-sided
/// difference: pass three at index 2 uses pass two at index 1, which uses
/// the one-sided first pass at index 0
pub const PERIMETER_BAND: usize = 3;

/// Treatment of the perimeter band where the third derivative falls back to
/// one-sided differences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TruncationEdge {
    /// Keep the reduced-order estimate from one-sided differences
    #[default]
    OneSided,
    /// Report the three-cell perimeter band as missing, keeping only cells
    /// whose three passes are all central differences
    Missing,
}

/// Gradient together with the third-order Taylor perturbations `(ex, ey)`
#[derive(Debug, Clone)]
pub struct TaylorPerturbation {
    pub gradient: GradientPair,
    /// d²/6 · ∂³z/∂x³
    pub ex: Field,
    /// d²/6 · ∂³z/∂y³
    pub ey: Field,
}

impl TaylorPerturbation {
    /// Run the three gradient passes for `z`
    pub fn compute(z: &Field, spacing: Spacing) -> DemResult<Self> {
        ensure_support(z, "truncation error", MIN_TRUNCATION_CELLS)?;

        let grad = gradient(z, spacing)?;
        let ddx = derivative(&grad.d_col, spacing, Axis(1), EdgeOrder::First)?;
        let dddx = derivative(&ddx, spacing, Axis(1), EdgeOrder::First)?;
        let ddy = derivative(&grad.d_row, spacing, Axis(0), EdgeOrder::First)?;
        let dddy = derivative(&ddy, spacing, Axis(0), EdgeOrder::First)?;

        let d = spacing.get();
        let scale = d * d / 6.0;

        Ok(Self {
            gradient: grad,
            ex: dddx.mapv(|v| v * scale),
            ey: dddy.mapv(|v| v * scale),
        })
    }

    /// Signed slope truncation error in degrees
    pub fn slope_error(&self, edge: TruncationEdge) -> Field {
        self.map_terms(edge, trunc_slope_cell)
    }

    /// Signed aspect truncation error in degrees
    pub fn aspect_error(&self, edge: TruncationEdge) -> Field {
        self.map_terms(edge, trunc_aspect_cell)
    }

    fn map_terms<F>(&self, edge: TruncationEdge, cell: F) -> Field
    where
        F: Fn(f64, f64, f64, f64) -> f64 + Sync + Send,
    {
        let (rows, cols) = self.ex.dim();
        let grad = &self.gradient;

        map_cells((rows, cols), |i, j| {
            if edge == TruncationEdge::Missing && in_perimeter_band(i, j, rows, cols) {
                return f64::NAN;
            }
            cell(grad.d_row[[i, j]], grad.d_col[[i, j]], self.ey[[i, j]], self.ex[[i, j]])
        })
    }

    /// Largest perturbation magnitude, a quick noise diagnostic
    pub fn max_perturbation(&self) -> f64 {
        Zip::from(&self.ex)
            .and(&self.ey)
            .fold(0.0_f64, |acc, &ex, &ey| {
                let m = (ex * ex + ey * ey).sqrt();
                if m.is_finite() {
                    acc.max(m)
                } else {
                    acc
                }
            })
    }
}

#[inline]
fn in_perimeter_band(i: usize, j: usize, rows: usize, cols: usize) -> bool {
    i < PERIMETER_BAND
        || j < PERIMETER_BAND
        || i + PERIMETER_BAND >= rows
        || j + PERIMETER_BAND >= cols
}

/// Slope truncation error (degrees) for one cell.
///
/// At a vanishing gradient the two perturbed slopes coincide and the error
/// is zero.
pub fn trunc_slope_cell(dy: f64, dx: f64, ey: f64, ex: f64) -> f64 {
    if !(dx.is_finite() && dy.is_finite() && ex.is_finite() && ey.is_finite()) {
        return f64::NAN;
    }

    let plus = ((dx + ex).powi(2) + (dy + ey).powi(2)).sqrt().atan();
    let minus = ((dx - ex).powi(2) + (dy - ey).powi(2)).sqrt().atan();
    let direction = sign(plus - minus);
    if direction == 0.0 {
        return 0.0;
    }

    let g2 = dx * dx + dy * dy;
    // sqrt[(dx²ex² + dy²ey² + 2dxdyexey) / (g²(1+g²)²)]
    direction * (dx * ex + dy * ey).abs() / (g2.sqrt() * (1.0 + g2)) * DEGREES
}

/// Aspect truncation error (degrees) for one cell; missing when `dx = 0`
pub fn trunc_aspect_cell(dy: f64, dx: f64, ey: f64, ex: f64) -> f64 {
    if !(dx.is_finite() && dy.is_finite() && ex.is_finite() && ey.is_finite()) || dx == 0.0 {
        return f64::NAN;
    }

    let mut delta = (dy + ey).atan2(dx + ex) - (dy - ey).atan2(dx - ex);
    if delta > PI {
        delta -= 2.0 * PI;
    } else if delta <= -PI {
        delta += 2.0 * PI;
    }
    let direction = sign(delta);
    if direction == 0.0 {
        return 0.0;
    }

    let v = dy / dx;
    let cos_aspect = dy.atan2(dx).cos();
    let u2 = cos_aspect.powi(4);
    // (ex²dy²/dx² + ey² - 2·dy/dx·ex·ey) = (ex·dy/dx - ey)²
    let spread = (ex * v - ey).powi(2);
    direction * (u2 * spread / (dx * dx)).sqrt() * DEGREES
}

/// Slope truncation error in degrees (one-sided perimeter)
pub fn trunc_err_slope(z: &Field, spacing: Spacing) -> DemResult<Field> {
    trunc_err_slope_with(z, spacing, TruncationEdge::default())
}

/// Slope truncation error in degrees with an explicit perimeter policy
pub fn trunc_err_slope_with(z: &Field, spacing: Spacing, edge: TruncationEdge) -> DemResult<Field> {
    Ok(TaylorPerturbation::compute(z, spacing)?.slope_error(edge))
}

/// Aspect truncation error in degrees (one-sided perimeter)
pub fn trunc_err_aspect(z: &Field, spacing: Spacing) -> DemResult<Field> {
    trunc_err_aspect_with(z, spacing, TruncationEdge::default())
}

/// Aspect truncation error in degrees with an explicit perimeter policy
pub fn trunc_err_aspect_with(z: &Field, spacing: Spacing, edge: TruncationEdge) -> DemResult<Field> {
    Ok(TaylorPerturbation::compute(z, spacing)?.aspect_error(edge))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TruncationSlope {
    pub edge: TruncationEdge,
}

impl FieldOperator for TruncationSlope {
    fn name(&self) -> &'static str {
        "trunc_err_slope"
    }

    fn apply(&self, field: &Field, spacing: Spacing) -> DemResult<Field> {
        trunc_err_slope_with(field, spacing, self.edge)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TruncationAspect {
    pub edge: TruncationEdge,
}

impl FieldOperator for TruncationAspect {
    fn name(&self) -> &'static str {
        "trunc_err_aspect"
    }

    fn apply(&self, field: &Field, spacing: Spacing) -> DemResult<Field> {
        trunc_err_aspect_with(field, spacing, self.edge)
    }
}
