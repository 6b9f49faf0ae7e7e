use crate::core::operator::{apply_mask, mask_below, missing_mask, union_mask, FieldOperator};
use crate::core::peu::{peu_aspect_from_gradient, peu_slope_from_gradient};
use crate::core::quality::{quality_ratio_field, scaled_quality_ratio_field};
use crate::core::slope_aspect::{aspect_from, slope_from};
use crate::core::stats::{nan_median, FieldSummary};
use crate::core::gradient::gradient;
use crate::core::truncation::{TaylorPerturbation, TruncationEdge, MIN_TRUNCATION_CELLS};
use crate::types::{DemError, DemResult, Field, GriddedSurface, Mask, Quantity, Spacing};
use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// Parameters for slope/aspect uncertainty analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Treatment of the perimeter band in the truncation error estimate
    pub truncation_edge: TruncationEdge,
    /// Aspect errors are divided by this before entering the Quality Ratio
    pub aspect_error_scale: f64,
    /// Elevations below this level are masked (e.g. water surfaces)
    pub mask_below: Option<f64>,
    /// Valid-cell fraction below which a warning is logged
    pub min_valid_fraction: f64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            truncation_edge: TruncationEdge::OneSided,
            aspect_error_scale: 4.0, // divisor used by the resolution study
            mask_below: None,
            min_valid_fraction: 0.5,
        }
    }
}

/// Derived fields of one gridded surface.
///
/// The first six fields are the canonical set consumed by reporting layers;
/// slope, aspect and both Quality Ratios come along for convenience.
#[derive(Debug, Clone)]
pub struct FieldReport {
    pub spacing: Spacing,
    pub elevation: Field,
    pub std: Field,
    pub peu_aspect: Field,
    pub peu_slope: Field,
    pub trunc_aspect: Field,
    pub trunc_slope: Field,
    pub slope: Field,
    pub aspect: Field,
    pub quality_slope: Field,
    pub quality_aspect: Field,
    /// Cells excluded from every derived field
    pub mask: Mask,
}

impl FieldReport {
    /// The six canonical fields with display labels, in reporting order
    pub fn canonical_fields(&self) -> [(&'static str, &Field); 6] {
        [
            ("Mean elevation [m]", &self.elevation),
            ("Elevation STD [m]", &self.std),
            ("Aspect PEU [deg]", &self.peu_aspect),
            ("Slope PEU [deg]", &self.peu_slope),
            ("Aspect truncation error [deg]", &self.trunc_aspect),
            ("Slope truncation error [deg]", &self.trunc_slope),
        ]
    }

    pub fn quality(&self, quantity: Quantity) -> &Field {
        match quantity {
            Quantity::Slope => &self.quality_slope,
            Quantity::Aspect => &self.quality_aspect,
        }
    }

    /// Mean Quality Ratio over valid cells
    pub fn mean_quality(&self, quantity: Quantity) -> f64 {
        FieldSummary::of(self.quality(quantity)).mean
    }

    /// Median of `PEU + |truncation error|` over valid cells
    pub fn median_uncertainty(&self, quantity: Quantity) -> f64 {
        let (peu, trunc) = match quantity {
            Quantity::Slope => (&self.peu_slope, &self.trunc_slope),
            Quantity::Aspect => (&self.peu_aspect, &self.trunc_aspect),
        };
        let combined = Zip::from(peu).and(trunc).map_collect(|&p, &t| p + t.abs());
        nan_median(&combined)
    }
}

/// Analysis context: holds the parameters every stage of the pipeline shares.
///
/// All state lives in the analyzer and in the surfaces passed to it; nothing
/// is kept between calls, so one analyzer can serve many threads.
#[derive(Debug, Clone, Default)]
pub struct UncertaintyAnalyzer {
    params: AnalysisParams,
}

impl UncertaintyAnalyzer {
    pub fn new(params: AnalysisParams) -> Self {
        Self { params }
    }

    /// Analyzer with default parameters
    pub fn standard() -> Self {
        Self::new(AnalysisParams::default())
    }

    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    /// Exclusion mask for a surface: missing elevation or std, plus cells
    /// below the configured water level
    pub fn exclusion_mask(&self, surface: &GriddedSurface) -> DemResult<Mask> {
        let mut mask = union_mask(&missing_mask(&surface.elevation), &missing_mask(&surface.std))?;
        if let Some(level) = self.params.mask_below {
            mask = union_mask(&mask, &mask_below(&surface.elevation, level))?;
        }
        Ok(mask)
    }

    /// Run a single operator on a surface's elevation under this context's mask
    pub fn apply_operator(&self, operator: &dyn FieldOperator, surface: &GriddedSurface) -> DemResult<Field> {
        log::debug!("Applying {} at spacing {}", operator.name(), surface.spacing);
        let mask = self.exclusion_mask(surface)?;
        let elevation = apply_mask(&surface.elevation, &mask)?;
        operator.apply_masked(&elevation, surface.spacing, &mask)
    }

    /// Compute every derived field for one surface.
    ///
    /// Slope, aspect and PEU need a grid of at least 2x2 cells. The truncation
    /// error needs 5x5; on smaller grids both truncation fields and both
    /// Quality Ratios are reported as missing instead of failing the report.
    pub fn analyze(&self, surface: &GriddedSurface) -> DemResult<FieldReport> {
        let scale = self.params.aspect_error_scale;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(DemError::InvalidInput(format!(
                "aspect error scale must be finite and > 0, got {}",
                scale
            )));
        }

        let (rows, cols) = surface.elevation.dim();
        let spacing = surface.spacing;
        log::info!("Analyzing {}x{} surface at spacing {}", rows, cols, spacing);

        let mask = self.exclusion_mask(surface)?;
        let elevation = apply_mask(&surface.elevation, &mask)?;
        let std = apply_mask(&surface.std, &mask)?;

        let edge = self.params.truncation_edge;
        let (grad, trunc_slope, trunc_aspect) = if rows >= MIN_TRUNCATION_CELLS && cols >= MIN_TRUNCATION_CELLS {
            log::debug!("Computing gradient and third-order perturbations ({:?} perimeter)", edge);
            let terms = TaylorPerturbation::compute(&elevation, spacing)?;
            log::debug!("Largest Taylor perturbation: {:.3e}", terms.max_perturbation());
            let trunc_slope = terms.slope_error(edge);
            let trunc_aspect = terms.aspect_error(edge);
            (terms.gradient, trunc_slope, trunc_aspect)
        } else {
            log::warn!(
                "{}x{} grid is below {}x{}; truncation error left missing",
                rows,
                cols,
                MIN_TRUNCATION_CELLS,
                MIN_TRUNCATION_CELLS
            );
            let missing = Field::from_elem((rows, cols), f64::NAN);
            (gradient(&elevation, spacing)?, missing.clone(), missing)
        };
        let trunc_slope = apply_mask(&trunc_slope, &mask)?;
        let trunc_aspect = apply_mask(&trunc_aspect, &mask)?;

        log::debug!("Computing slope and aspect");
        let slope = apply_mask(&slope_from(&grad), &mask)?;
        let aspect = apply_mask(&aspect_from(&grad), &mask)?;

        log::debug!("Propagating elevation uncertainty");
        let peu_slope = apply_mask(&peu_slope_from_gradient(&grad, spacing, &std)?, &mask)?;
        let peu_aspect = apply_mask(&peu_aspect_from_gradient(&grad, spacing, &std)?, &mask)?;

        log::debug!("Combining Quality Ratios");
        let quality_slope = quality_ratio_field(&trunc_slope, &peu_slope, Some(&mask))?;
        let quality_aspect = scaled_quality_ratio_field(&trunc_aspect, &peu_aspect, scale, Some(&mask))?;

        let report = FieldReport {
            spacing,
            elevation,
            std,
            peu_aspect,
            peu_slope,
            trunc_aspect,
            trunc_slope,
            slope,
            aspect,
            quality_slope,
            quality_aspect,
            mask,
        };

        let slope_summary = FieldSummary::of(&report.quality_slope);
        if slope_summary.valid_fraction() < self.params.min_valid_fraction {
            log::warn!(
                "Only {:.1}% of cells carry a slope Quality Ratio at spacing {}",
                100.0 * slope_summary.valid_fraction(),
                spacing
            );
        }
        log::info!(
            "Analysis complete at spacing {}: mean QR slope {:.4}, aspect {:.4}",
            spacing,
            slope_summary.mean,
            report.mean_quality(Quantity::Aspect)
        );

        Ok(report)
    }
}
