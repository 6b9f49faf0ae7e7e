use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Real-valued gridded field (rows = y, columns = x). Missing cells are NaN.
pub type Field = Array2<f64>;

/// Exclusion mask; `true` marks a cell removed from every derived output
pub type Mask = Array2<bool>;

/// Uniform grid spacing shared by both axes
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Spacing(f64);

impl Spacing {
    /// Validate a raw spacing value (finite and strictly positive)
    pub fn new(value: f64) -> DemResult<Self> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(DemError::InvalidSpacing(value))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Spacing {
    type Error = DemError;

    fn try_from(value: f64) -> DemResult<Self> {
        Self::new(value)
    }
}

impl std::fmt::Display for Spacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terrain quantity derived from the elevation gradient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantity {
    Slope,
    Aspect,
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quantity::Slope => write!(f, "slope"),
            Quantity::Aspect => write!(f, "aspect"),
        }
    }
}

/// Partial derivatives of a field, same shape as the field
#[derive(Debug, Clone)]
pub struct GradientPair {
    /// dz/dy, derivative along increasing row index
    pub d_row: Field,
    /// dz/dx, derivative along increasing column index
    pub d_col: Field,
}

/// Gridded elevation and its per-cell standard deviation at one spacing.
///
/// This is what an external grid builder (point-cloud binning) hands over.
/// Bins with too few samples are expected to be NaN in both fields.
#[derive(Debug, Clone)]
pub struct GriddedSurface {
    pub elevation: Field,
    pub std: Field,
    pub spacing: Spacing,
}

impl GriddedSurface {
    /// Bundle elevation and std fields, rejecting mismatched shapes
    pub fn new(elevation: Field, std: Field, spacing: Spacing) -> DemResult<Self> {
        ensure_same_shape(&elevation, &std)?;
        Ok(Self {
            elevation,
            std,
            spacing,
        })
    }
}

/// Error types for DEM uncertainty processing
#[derive(Debug, thiserror::Error)]
pub enum DemError {
    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Invalid grid spacing: {0} (must be finite and > 0)")]
    InvalidSpacing(f64),

    #[error("Insufficient support: {operator} needs at least {required}x{required} cells, got {rows}x{cols}")]
    InsufficientSupport {
        operator: &'static str,
        required: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for DEM operations
pub type DemResult<T> = Result<T, DemError>;

/// Fail fast when two fields that must line up cell-for-cell do not
pub fn ensure_same_shape<A, B>(expected: &Array2<A>, found: &Array2<B>) -> DemResult<()> {
    if expected.dim() != found.dim() {
        return Err(DemError::ShapeMismatch {
            expected: expected.dim(),
            found: found.dim(),
        });
    }
    Ok(())
}

/// Fail when a field is smaller than `required` cells along either axis
pub fn ensure_support(field: &Field, operator: &'static str, required: usize) -> DemResult<()> {
    let (rows, cols) = field.dim();
    if rows < required || cols < required {
        return Err(DemError::InsufficientSupport {
            operator,
            required,
            rows,
            cols,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spacing_validation() {
        assert!(Spacing::new(0.5).is_ok());
        assert!(matches!(Spacing::new(0.0), Err(DemError::InvalidSpacing(_))));
        assert!(Spacing::new(-1.0).is_err());
        assert!(Spacing::new(f64::NAN).is_err());
        assert!(Spacing::try_from(f64::INFINITY).is_err());
    }

    #[test]
    fn test_gridded_surface_rejects_mismatched_shapes() {
        let spacing = Spacing::new(1.0).unwrap();
        let result = GriddedSurface::new(Field::zeros((4, 4)), Field::zeros((4, 5)), spacing);
        match result {
            Err(DemError::ShapeMismatch { expected, found }) => {
                assert_eq!(expected, (4, 4));
                assert_eq!(found, (4, 5));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_support_check() {
        let field = Field::zeros((4, 6));
        assert!(ensure_support(&field, "test", 4).is_ok());
        let err = ensure_support(&field, "test", 5).unwrap_err();
        assert!(err.to_string().contains("5x5"));
    }
}
