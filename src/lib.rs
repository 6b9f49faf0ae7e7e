//! demres: slope and aspect uncertainty of gridded elevation models
//!
//! Computes slope and aspect from a DEM together with two error estimates per
//! cell: the propagated elevation uncertainty (PEU) and the truncation error of
//! the finite-difference gradient. Both are folded into a Quality Ratio that is
//! used to choose the grid spacing at which the DEM should be built.

pub mod types;
pub mod core;
pub mod synthetic;

// Re-export main types and functions for easier access
pub use types::{DemError, DemResult, Field, GradientPair, GriddedSurface, Mask, Quantity, Spacing};

pub use crate::core::{
    AnalysisParams, FieldOperator, FieldReport, ResolutionSearch, ScalarMinimizer, SurfaceSource,
    TruncationEdge, UncertaintyAnalyzer,
};

#[cfg(feature = "python")]
mod python {
    use crate::core::{
        circular, gradient as grad, peu, quality, slope_aspect, truncation,
    };
    use crate::types::{DemError, Spacing};
    use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2, PyReadonlyArrayDyn};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    impl From<DemError> for PyErr {
        fn from(err: DemError) -> PyErr {
            PyValueError::new_err(err.to_string())
        }
    }

    /// Python module definition
    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(gradient, m)?)?;
        m.add_function(wrap_pyfunction!(slope, m)?)?;
        m.add_function(wrap_pyfunction!(aspect, m)?)?;
        m.add_function(wrap_pyfunction!(peu_slope_field, m)?)?;
        m.add_function(wrap_pyfunction!(peu_aspect_field, m)?)?;
        m.add_function(wrap_pyfunction!(trunc_err_slope, m)?)?;
        m.add_function(wrap_pyfunction!(trunc_err_aspect, m)?)?;
        m.add_function(wrap_pyfunction!(quality_ratio, m)?)?;
        m.add_function(wrap_pyfunction!(circular_std, m)?)?;
        Ok(())
    }

    /// Returns `(dy, dx)`: derivatives along rows and along columns
    #[pyfunction]
    fn gradient<'py>(
        py: Python<'py>,
        z: PyReadonlyArray2<'py, f64>,
        spacing: f64,
    ) -> PyResult<(&'py PyArray2<f64>, &'py PyArray2<f64>)> {
        let g = grad::gradient(&z.as_array().to_owned(), Spacing::new(spacing)?)?;
        Ok((g.d_row.into_pyarray(py), g.d_col.into_pyarray(py)))
    }

    #[pyfunction]
    fn slope<'py>(py: Python<'py>, z: PyReadonlyArray2<'py, f64>, spacing: f64) -> PyResult<&'py PyArray2<f64>> {
        Ok(slope_aspect::slope(&z.as_array().to_owned(), Spacing::new(spacing)?)?.into_pyarray(py))
    }

    #[pyfunction]
    fn aspect<'py>(py: Python<'py>, z: PyReadonlyArray2<'py, f64>, spacing: f64) -> PyResult<&'py PyArray2<f64>> {
        Ok(slope_aspect::aspect(&z.as_array().to_owned(), Spacing::new(spacing)?)?.into_pyarray(py))
    }

    #[pyfunction]
    fn peu_slope_field<'py>(
        py: Python<'py>,
        z: PyReadonlyArray2<'py, f64>,
        spacing: f64,
        std: PyReadonlyArray2<'py, f64>,
    ) -> PyResult<&'py PyArray2<f64>> {
        let out = peu::peu_slope_field(
            &z.as_array().to_owned(),
            Spacing::new(spacing)?,
            &std.as_array().to_owned(),
        )?;
        Ok(out.into_pyarray(py))
    }

    #[pyfunction]
    fn peu_aspect_field<'py>(
        py: Python<'py>,
        z: PyReadonlyArray2<'py, f64>,
        spacing: f64,
        std: PyReadonlyArray2<'py, f64>,
    ) -> PyResult<&'py PyArray2<f64>> {
        let out = peu::peu_aspect_field(
            &z.as_array().to_owned(),
            Spacing::new(spacing)?,
            &std.as_array().to_owned(),
        )?;
        Ok(out.into_pyarray(py))
    }

    #[pyfunction]
    fn trunc_err_slope<'py>(
        py: Python<'py>,
        z: PyReadonlyArray2<'py, f64>,
        spacing: f64,
    ) -> PyResult<&'py PyArray2<f64>> {
        Ok(truncation::trunc_err_slope(&z.as_array().to_owned(), Spacing::new(spacing)?)?.into_pyarray(py))
    }

    #[pyfunction]
    fn trunc_err_aspect<'py>(
        py: Python<'py>,
        z: PyReadonlyArray2<'py, f64>,
        spacing: f64,
    ) -> PyResult<&'py PyArray2<f64>> {
        Ok(truncation::trunc_err_aspect(&z.as_array().to_owned(), Spacing::new(spacing)?)?.into_pyarray(py))
    }

    #[pyfunction]
    #[pyo3(signature = (trunc_err, peu, mask=None))]
    fn quality_ratio<'py>(
        py: Python<'py>,
        trunc_err: PyReadonlyArray2<'py, f64>,
        peu: PyReadonlyArray2<'py, f64>,
        mask: Option<PyReadonlyArray2<'py, bool>>,
    ) -> PyResult<&'py PyArray2<f64>> {
        let mask = mask.map(|m| m.as_array().to_owned());
        let out = quality::quality_ratio_field(
            &trunc_err.as_array().to_owned(),
            &peu.as_array().to_owned(),
            mask.as_ref(),
        )?;
        Ok(out.into_pyarray(py))
    }

    /// Circular standard deviation (degrees) of all angles in the array
    #[pyfunction]
    fn circular_std(angles: PyReadonlyArrayDyn<'_, f64>) -> f64 {
        circular::circular_std(angles.as_array().iter())
    }
}
