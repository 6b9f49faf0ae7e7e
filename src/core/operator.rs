//! Shared field-operator capability and per-cell evaluation helpers.
//!
//! Every derived quantity in this crate (gradient components, slope, aspect,
//! propagated uncertainty, truncation error) is a function of a local stencil
//! around each cell. The helpers here fix the common policy once:
//!
//! * cells are evaluated independently, in parallel when the `parallel`
//!   feature is enabled;
//! * any non-finite result is stored as NaN (missing);
//! * a masked cell behaves exactly like a missing one: the analysis pipeline
//!   blanks it in the inputs and again in every output.

use crate::types::{ensure_same_shape, DemResult, Field, Mask, Spacing};
use ndarray::Zip;

/// A numerical operator mapping a gridded field at a known spacing to a
/// derived field of the same shape.
pub trait FieldOperator: Send + Sync {
    /// Short operator name used in logs and errors
    fn name(&self) -> &'static str;

    /// Evaluate the operator over the whole field
    fn apply(&self, field: &Field, spacing: Spacing) -> DemResult<Field>;

    /// Evaluate, then remove masked cells from the output
    fn apply_masked(&self, field: &Field, spacing: Spacing, mask: &Mask) -> DemResult<Field> {
        let output = self.apply(field, spacing)?;
        apply_mask(&output, mask)
    }
}

/// Evaluate `cell(row, col)` for every cell of a grid of the given shape.
pub(crate) fn map_cells<F>(shape: (usize, usize), cell: F) -> Field
where
    F: Fn(usize, usize) -> f64 + Sync + Send,
{
    let mut output = Field::zeros(shape);

    #[cfg(feature = "parallel")]
    Zip::indexed(&mut output).par_for_each(|(i, j), value| *value = finite_or_missing(cell(i, j)));

    #[cfg(not(feature = "parallel"))]
    Zip::indexed(&mut output).for_each(|(i, j), value| *value = finite_or_missing(cell(i, j)));

    output
}

/// Collapse infinities and NaN into the missing marker
#[inline]
pub(crate) fn finite_or_missing(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::NAN
    }
}

/// Sign with `sign(0) = 0`, unlike `f64::signum`
#[inline]
pub(crate) fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Copy of `field` with masked cells set to NaN
pub fn apply_mask(field: &Field, mask: &Mask) -> DemResult<Field> {
    ensure_same_shape(field, mask)?;
    Ok(Zip::from(field)
        .and(mask)
        .map_collect(|&value, &excluded| if excluded { f64::NAN } else { value }))
}

/// Mask of cells that are already missing in `field`
pub fn missing_mask(field: &Field) -> Mask {
    field.mapv(|value| !value.is_finite())
}

/// Mask of cells strictly below `threshold` (e.g. water surfaces)
pub fn mask_below(field: &Field, threshold: f64) -> Mask {
    field.mapv(|value| value < threshold)
}

/// Union of two masks of the same shape
pub fn union_mask(a: &Mask, b: &Mask) -> DemResult<Mask> {
    ensure_same_shape(a, b)?;
    Ok(Zip::from(a).and(b).map_collect(|&x, &y| x || y))
}
