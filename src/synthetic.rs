//! Analytic test surfaces.
//!
//! Surfaces are sampled at cell centres of a regular grid whose edges run
//! from the lower bound in steps of `width`, stopping short of the upper bound.

use crate::types::{DemError, DemResult, Field, GriddedSurface, Spacing};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Largest node count per axis accepted by [`gaussian_hill_nodes`]
pub const MAX_NODES_PER_AXIS: usize = 100_000;

/// Rectangular extent of a synthetic grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            x_min: -2.5,
            x_max: 2.5,
            y_min: -2.5,
            y_max: 2.5,
        }
    }
}

/// Sampled surface with its cell edges
#[derive(Debug, Clone)]
pub struct SyntheticDem {
    pub spacing: Spacing,
    pub x_edges: Array1<f64>,
    pub y_edges: Array1<f64>,
    /// `y_edges.len() - 1` rows by `x_edges.len() - 1` columns
    pub z: Field,
}

impl SyntheticDem {
    /// Pair the elevations with a uniform elevation standard deviation
    pub fn into_surface(self, sigma: f64) -> DemResult<GriddedSurface> {
        let std = Field::from_elem(self.z.dim(), sigma);
        GriddedSurface::new(self.z, std, self.spacing)
    }

    fn centres(edges: &Array1<f64>, width: f64) -> Array1<f64> {
        edges
            .slice(ndarray::s![..-1])
            .mapv(|e| e + width / 2.0)
    }
}

/// `exp(-r²)` sampled at cell centres
pub fn gaussian_hill_dem(width: f64, bounds: Bounds) -> DemResult<SyntheticDem> {
    let spacing = Spacing::new(width)?;
    let (x_edges, y_edges) = edges(width, &bounds)?;
    let xc = SyntheticDem::centres(&x_edges, width);
    let yc = SyntheticDem::centres(&y_edges, width);

    let z = Field::from_shape_fn((yc.len(), xc.len()), |(i, j)| {
        let r2 = xc[j] * xc[j] + yc[i] * yc[i];
        (-r2).exp()
    });

    Ok(SyntheticDem {
        spacing,
        x_edges,
        y_edges,
        z,
    })
}

/// Upper hemisphere of radius `r0` (the largest cell-centre y), missing beyond
/// `r0 - 2·width` where the surface becomes near-vertical
pub fn sphere_dem(width: f64, bounds: Bounds) -> DemResult<SyntheticDem> {
    let spacing = Spacing::new(width)?;
    let (x_edges, y_edges) = edges(width, &bounds)?;
    let xc = SyntheticDem::centres(&x_edges, width);
    let yc = SyntheticDem::centres(&y_edges, width);

    let r0 = yc.fold(f64::NEG_INFINITY, |m, &y| m.max(y));
    if !(r0 > 0.0) {
        return Err(DemError::InvalidInput(format!(
            "sphere needs cell centres with y > 0, largest is {}",
            r0
        )));
    }
    let cutoff = r0 - 2.0 * width;

    let z = Field::from_shape_fn((yc.len(), xc.len()), |(i, j)| {
        let r = (xc[j] * xc[j] + yc[i] * yc[i]).sqrt();
        if r > cutoff {
            f64::NAN
        } else {
            r0 * (r / r0).acos().sin()
        }
    });

    Ok(SyntheticDem {
        spacing,
        x_edges,
        y_edges,
        z,
    })
}

/// `exp(-r²)` sampled on nodes spanning `[-half_extent, half_extent]` on both
/// axes; with an odd node count the centre cell sits exactly on the summit.
pub fn gaussian_hill_nodes(spacing: Spacing, half_extent: f64) -> DemResult<SyntheticDem> {
    if !(half_extent.is_finite() && half_extent > 0.0) {
        return Err(DemError::InvalidInput(format!(
            "half extent must be finite and > 0, got {}",
            half_extent
        )));
    }
    let d = spacing.get();
    let intervals = (2.0 * half_extent / d).round();
    if !(intervals.is_finite() && intervals < MAX_NODES_PER_AXIS as f64) {
        return Err(DemError::InvalidInput(format!(
            "half extent {} at spacing {} needs more than {} nodes per axis",
            half_extent, d, MAX_NODES_PER_AXIS
        )));
    }
    let n = intervals as usize + 1;
    let c = (n as f64 - 1.0) / 2.0;

    let nodes = Array1::from_shape_fn(n, |k| (k as f64 - c) * d);
    let edges = Array1::from_shape_fn(n + 1, |k| (k as f64 - c - 0.5) * d);
    let z = Field::from_shape_fn((n, n), |(i, j)| {
        let r2 = nodes[j] * nodes[j] + nodes[i] * nodes[i];
        (-r2).exp()
    });

    Ok(SyntheticDem {
        spacing,
        x_edges: edges.clone(),
        y_edges: edges,
        z,
    })
}

fn edges(width: f64, bounds: &Bounds) -> DemResult<(Array1<f64>, Array1<f64>)> {
    let x = axis_edges(bounds.x_min, bounds.x_max, width)?;
    let y = axis_edges(bounds.y_min, bounds.y_max, width)?;
    Ok((x, y))
}

fn axis_edges(min: f64, max: f64, width: f64) -> DemResult<Array1<f64>> {
    if !(min.is_finite() && max.is_finite() && min < max) {
        return Err(DemError::InvalidInput(format!("invalid bounds [{}, {}]", min, max)));
    }
    // Guard against (max - min) / width landing a hair above an integer
    let count = ((max - min) / width - 1e-9).ceil() as usize;
    if count < 2 {
        return Err(DemError::InvalidInput(format!(
            "width {} leaves fewer than one cell in [{}, {}]",
            width, min, max
        )));
    }
    Ok(Array1::from_shape_fn(count, |k| min + k as f64 * width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_gaussian_hill_layout() {
        let dem = gaussian_hill_dem(0.5, Bounds::default()).unwrap();
        // Edges -2.5, -2.0, ..., 2.0
        assert_eq!(dem.x_edges.len(), 10);
        assert_eq!(dem.z.dim(), (9, 9));
        // Centres -2.25 .. 1.75: the four cells nearest the summit sit at |x| = |y| = 0.25
        let peak = dem.z.fold(0.0f64, |m, &v| m.max(v));
        assert_abs_diff_eq!(peak, (-2.0f64 * 0.25 * 0.25).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_masked_rim() {
        let dem = sphere_dem(0.1, Bounds::default()).unwrap();
        let (rows, cols) = dem.z.dim();
        assert!(dem.z[[0, 0]].is_nan());
        assert!(dem.z[[rows / 2, cols / 2]].is_finite());
        assert!(dem.z.iter().filter(|v| v.is_finite()).all(|&v| v > 0.0));
    }

    #[test]
    fn test_nodes_centre_on_origin() {
        let dem = gaussian_hill_nodes(Spacing::new(1.0).unwrap(), 2.0).unwrap();
        assert_eq!(dem.z.dim(), (5, 5));
        assert_eq!(dem.z[[2, 2]], 1.0);
        assert_abs_diff_eq!(dem.z[[2, 4]], (-4.0f64).exp(), epsilon = 1e-15);
        assert_eq!(dem.x_edges.len(), 6);
    }

    #[test]
    fn test_invalid_width() {
        assert!(gaussian_hill_dem(0.0, Bounds::default()).is_err());
        assert!(gaussian_hill_dem(10.0, Bounds::default()).is_err());
        assert!(gaussian_hill_nodes(Spacing::new(0.1).unwrap(), -1.0).is_err());
    }

    #[test]
    fn test_node_count_is_bounded() {
        let result = gaussian_hill_nodes(Spacing::new(1e-300).unwrap(), 1.0);
        assert!(matches!(result, Err(DemError::InvalidInput(_))));
        let result = gaussian_hill_nodes(Spacing::new(1e-3).unwrap(), f64::MAX);
        assert!(matches!(result, Err(DemError::InvalidInput(_))));
    }

    #[test]
    fn test_into_surface() {
        let surface = gaussian_hill_dem(0.25, Bounds::default())
            .unwrap()
            .into_surface(0.02)
            .unwrap();
        assert_eq!(surface.std.dim(), surface.elevation.dim());
        assert_eq!(surface.spacing.get(), 0.25);
    }
}
