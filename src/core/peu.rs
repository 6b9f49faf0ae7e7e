//! Propagated elevation uncertainty (PEU) of slope and aspect.
//!
//! Slope and aspect are treated as functions of the four elevations entering
//! the central-difference stencil (east, west, north, south neighbours). With
//! independent neighbour errors the first-order (delta method) variance is
//!
//! ```text
//! σ_f² = Σ_k (∂f/∂z_k)² σ_k²
//! ```
//!
//! "North" is the neighbour at row `i + 1` and "south" the one at row `i - 1`,
//! matching the `dy` direction of the gradient. Neighbours outside the grid
//! contribute zero, so PEU on the perimeter is an underestimate; this damps
//! edge cells rather than inventing uncertainty for samples that do not exist.

use crate::core::gradient::gradient;
use crate::core::operator::{map_cells, FieldOperator};
use crate::types::{ensure_same_shape, DemResult, Field, GradientPair, Spacing};
use std::f64::consts::{PI, SQRT_2};

/// Squared standard deviations of the stencil neighbours of one cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighbourVariance {
    /// σ_E² + σ_W²
    pub east_west: f64,
    /// σ_N² + σ_S²
    pub north_south: f64,
}

impl NeighbourVariance {
    /// Gather neighbour variances around `(i, j)`; out-of-grid neighbours are zero
    pub fn at(std: &Field, i: usize, j: usize) -> Self {
        let (rows, cols) = std.dim();
        let east = if j + 1 < cols { std[[i, j + 1]] } else { 0.0 };
        let west = if j > 0 { std[[i, j - 1]] } else { 0.0 };
        let north = if i + 1 < rows { std[[i + 1, j]] } else { 0.0 };
        let south = if i > 0 { std[[i - 1, j]] } else { 0.0 };

        Self {
            east_west: east * east + west * west,
            north_south: north * north + south * south,
        }
    }

    fn is_finite(&self) -> bool {
        self.east_west.is_finite() && self.north_south.is_finite()
    }
}

/// Slope standard deviation (degrees) for one cell.
///
/// At a vanishing gradient the slope is not differentiable and the propagated
/// value depends on the direction of approach; the worst direction is used,
/// which is zero when every neighbour sigma is zero.
pub fn peu_slope_cell(dy: f64, dx: f64, spacing: f64, var: NeighbourVariance) -> f64 {
    if !(dx.is_finite() && dy.is_finite() && var.is_finite()) {
        return f64::NAN;
    }

    let scale = 90.0 / PI / spacing;
    let g2 = dx * dx + dy * dy;
    if g2 == 0.0 {
        return scale * var.east_west.max(var.north_south).sqrt();
    }

    let g = g2.sqrt();
    scale / (g * (1.0 + g2)) * (dx * dx * var.east_west + dy * dy * var.north_south).sqrt()
}

/// Aspect standard deviation (degrees) for one cell; missing when `dx = 0`
pub fn peu_aspect_cell(dy: f64, dx: f64, spacing: f64, var: NeighbourVariance) -> f64 {
    if !(dx.is_finite() && dy.is_finite() && var.is_finite()) || dx == 0.0 {
        return f64::NAN;
    }

    let v = dy / dx;
    let cos_aspect = dy.atan2(dx).cos();
    let scale = cos_aspect * cos_aspect * 90.0 / PI / spacing / dx.abs();
    scale * (v * v * var.east_west + var.north_south).sqrt()
}

/// Per-cell slope standard deviation from a per-cell elevation std field
pub fn peu_slope_field(z: &Field, spacing: Spacing, std: &Field) -> DemResult<Field> {
    ensure_same_shape(z, std)?;
    peu_slope_from_gradient(&gradient(z, spacing)?, spacing, std)
}

/// Per-cell aspect standard deviation from a per-cell elevation std field
pub fn peu_aspect_field(z: &Field, spacing: Spacing, std: &Field) -> DemResult<Field> {
    ensure_same_shape(z, std)?;
    peu_aspect_from_gradient(&gradient(z, spacing)?, spacing, std)
}

/// Slope PEU from an already computed gradient of the elevation field
pub fn peu_slope_from_gradient(grad: &GradientPair, spacing: Spacing, std: &Field) -> DemResult<Field> {
    propagate(grad, spacing, std, peu_slope_cell)
}

/// Aspect PEU from an already computed gradient of the elevation field
pub fn peu_aspect_from_gradient(grad: &GradientPair, spacing: Spacing, std: &Field) -> DemResult<Field> {
    propagate(grad, spacing, std, peu_aspect_cell)
}

fn propagate<F>(grad: &GradientPair, spacing: Spacing, std: &Field, cell: F) -> DemResult<Field>
where
    F: Fn(f64, f64, f64, NeighbourVariance) -> f64 + Sync + Send,
{
    ensure_same_shape(&grad.d_row, std)?;
    let d = spacing.get();

    Ok(map_cells(std.dim(), |i, j| {
        if !std[[i, j]].is_finite() {
            return f64::NAN;
        }
        let var = NeighbourVariance::at(std, i, j);
        cell(grad.d_row[[i, j]], grad.d_col[[i, j]], d, var)
    }))
}

/// Slope PEU per unit elevation standard deviation (every neighbour σ = 1)
pub fn peu_slope_unit(z: &Field, spacing: Spacing) -> DemResult<Field> {
    let grad = gradient(z, spacing)?;
    let d = spacing.get();

    Ok(map_cells(z.dim(), |i, j| {
        let (dy, dx) = (grad.d_row[[i, j]], grad.d_col[[i, j]]);
        let g2 = dx * dx + dy * dy;
        180.0 / PI / (SQRT_2 * d * (1.0 + g2))
    }))
}

/// Aspect PEU per unit elevation standard deviation; missing when `dx = 0`
pub fn peu_aspect_unit(z: &Field, spacing: Spacing) -> DemResult<Field> {
    let grad = gradient(z, spacing)?;
    let d = spacing.get();

    Ok(map_cells(z.dim(), |i, j| {
        let (dy, dx) = (grad.d_row[[i, j]], grad.d_col[[i, j]]);
        if dx == 0.0 {
            return f64::NAN;
        }
        let v = dy / dx;
        180.0 / PI / (d * (2.0 + 2.0 * v * v).sqrt()) / dx.abs()
    }))
}

/// Slope PEU as a field operator bound to an elevation std field
#[derive(Debug, Clone, Copy)]
pub struct PeuSlope<'a> {
    pub std: &'a Field,
}

impl FieldOperator for PeuSlope<'_> {
    fn name(&self) -> &'static str {
        "peu_slope"
    }

    fn apply(&self, field: &Field, spacing: Spacing) -> DemResult<Field> {
        peu_slope_field(field, spacing, self.std)
    }
}

/// Aspect PEU as a field operator bound to an elevation std field
#[derive(Debug, Clone, Copy)]
pub struct PeuAspect<'a> {
    pub std: &'a Field,
}

impl FieldOperator for PeuAspect<'_> {
    fn name(&self) -> &'static str {
        "peu_aspect"
    }

    fn apply(&self, field: &Field, spacing: Spacing) -> DemResult<Field> {
        peu_aspect_field(field, spacing, self.std)
    }
}
