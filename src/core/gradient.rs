use crate::core::operator::{map_cells, FieldOperator};
use crate::types::{ensure_support, DemResult, Field, GradientPair, Spacing};
use ndarray::Axis;
use serde::{Deserialize, Serialize};

/// Accuracy of the one-sided differences used on the first and last row/column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EdgeOrder {
    /// Two-point forward/backward difference
    #[default]
    First,
    /// Three-point second-order forward/backward difference
    Second,
}

impl EdgeOrder {
    fn min_cells(self) -> usize {
        match self {
            EdgeOrder::First => 2,
            EdgeOrder::Second => 3,
        }
    }
}

/// Derivative of `field` along one axis.
///
/// Interior cells use the central difference `(f[k+1] - f[k-1]) / 2d`; the
/// first and last cell along the axis use a one-sided difference of the
/// requested order. A cell whose own value or any stencil value is missing
/// is missing in the output.
pub fn derivative(field: &Field, spacing: Spacing, axis: Axis, edge_order: EdgeOrder) -> DemResult<Field> {
    ensure_support(field, "gradient", edge_order.min_cells())?;

    let d = spacing.get();
    let n = field.len_of(axis);

    Ok(map_cells(field.dim(), |i, j| {
        if !field[[i, j]].is_finite() {
            return f64::NAN;
        }

        let at = |k: usize| match axis {
            Axis(0) => field[[k, j]],
            _ => field[[i, k]],
        };
        let k = if axis == Axis(0) { i } else { j };

        if k > 0 && k + 1 < n {
            (at(k + 1) - at(k - 1)) / (2.0 * d)
        } else if k == 0 {
            match edge_order {
                EdgeOrder::First => (at(1) - at(0)) / d,
                EdgeOrder::Second => (-3.0 * at(0) + 4.0 * at(1) - at(2)) / (2.0 * d),
            }
        } else {
            match edge_order {
                EdgeOrder::First => (at(n - 1) - at(n - 2)) / d,
                EdgeOrder::Second => (3.0 * at(n - 1) - 4.0 * at(n - 2) + at(n - 3)) / (2.0 * d),
            }
        }
    }))
}

/// Partial derivatives `(dz/dy, dz/dx)` with first-order edges
pub fn gradient(field: &Field, spacing: Spacing) -> DemResult<GradientPair> {
    gradient_with(field, spacing, EdgeOrder::First)
}

/// Partial derivatives `(dz/dy, dz/dx)` with the given edge order
pub fn gradient_with(field: &Field, spacing: Spacing, edge_order: EdgeOrder) -> DemResult<GradientPair> {
    Ok(GradientPair {
        d_row: derivative(field, spacing, Axis(0), edge_order)?,
        d_col: derivative(field, spacing, Axis(1), edge_order)?,
    })
}

/// dz/dy as a field operator
#[derive(Debug, Clone, Copy, Default)]
pub struct RowDerivative {
    pub edge_order: EdgeOrder,
}

impl FieldOperator for RowDerivative {
    fn name(&self) -> &'static str {
        "row_derivative"
    }

    fn apply(&self, field: &Field, spacing: Spacing) -> DemResult<Field> {
        derivative(field, spacing, Axis(0), self.edge_order)
    }
}

/// dz/dx as a field operator
#[derive(Debug, Clone, Copy, Default)]
pub struct ColDerivative {
    pub edge_order: EdgeOrder,
}

impl FieldOperator for ColDerivative {
    fn name(&self) -> &'static str {
        "col_derivative"
    }

    fn apply(&self, field: &Field, spacing: Spacing) -> DemResult<Field> {
        derivative(field, spacing, Axis(1), self.edge_order)
    }
}
