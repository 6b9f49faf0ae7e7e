//! Grid-resolution search.
//!
//! Two strategies are offered: a discrete search that ranks prepared candidate
//! grids by mean Quality Ratio, and a continuous one that hands the median
//! total uncertainty to an external bounded scalar minimizer. Building grids
//! from point clouds and the minimizer itself live outside the crate and plug
//! in through [`SurfaceSource`] and [`ScalarMinimizer`].

use crate::core::pipeline::{AnalysisParams, UncertaintyAnalyzer};
use crate::types::{DemError, DemResult, GriddedSurface, Quantity, Spacing};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Produces a gridded surface for a requested spacing.
///
/// Bins with too few samples must already be missing (`NaN`).
pub trait SurfaceSource: Sync {
    fn surface_at(&self, spacing: Spacing) -> DemResult<GriddedSurface>;
}

/// Bounded one-dimensional minimizer
pub trait ScalarMinimizer {
    /// Return the argument in `bounds` minimizing `objective`
    fn minimize(&self, objective: &mut dyn FnMut(f64) -> f64, bounds: (f64, f64)) -> DemResult<f64>;
}

/// Mean Quality Ratios of one candidate grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolutionScores {
    pub spacing: f64,
    pub mean_quality_slope: f64,
    pub mean_quality_aspect: f64,
}

impl ResolutionScores {
    pub fn mean_quality(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Slope => self.mean_quality_slope,
            Quantity::Aspect => self.mean_quality_aspect,
        }
    }
}

/// Outcome of a discrete search over candidate grids
#[derive(Debug, Clone, PartialEq)]
pub struct QualitySearch {
    /// Scores in candidate order
    pub scores: Vec<ResolutionScores>,
    /// Spacing with the highest mean slope Quality Ratio, if any candidate had one
    pub best_slope: Option<Spacing>,
    /// Spacing with the highest mean aspect Quality Ratio, if any candidate had one
    pub best_aspect: Option<Spacing>,
}

/// Resolution search driver
#[derive(Debug, Clone, Default)]
pub struct ResolutionSearch {
    analyzer: UncertaintyAnalyzer,
}

impl ResolutionSearch {
    pub fn new(params: AnalysisParams) -> Self {
        Self {
            analyzer: UncertaintyAnalyzer::new(params),
        }
    }

    pub fn analyzer(&self) -> &UncertaintyAnalyzer {
        &self.analyzer
    }

    /// Score every candidate grid and pick the spacing maximizing each mean
    /// Quality Ratio. Ties go to the earlier candidate; candidates without a
    /// valid cell are skipped.
    pub fn best_by_quality(&self, candidates: &[GriddedSurface]) -> DemResult<QualitySearch> {
        if candidates.is_empty() {
            return Err(DemError::InvalidInput("no candidate grids to search".to_string()));
        }
        log::info!("Scoring {} candidate grids", candidates.len());

        #[cfg(feature = "parallel")]
        let scored: Vec<DemResult<ResolutionScores>> =
            candidates.par_iter().map(|surface| self.score(surface)).collect();
        #[cfg(not(feature = "parallel"))]
        let scored: Vec<DemResult<ResolutionScores>> =
            candidates.iter().map(|surface| self.score(surface)).collect();

        let scores = scored.into_iter().collect::<DemResult<Vec<_>>>()?;

        let best_slope = best_spacing(&scores, Quantity::Slope)?;
        let best_aspect = best_spacing(&scores, Quantity::Aspect)?;
        match (best_slope, best_aspect) {
            (Some(s), Some(a)) => log::info!("Best spacing by quality: slope {}, aspect {}", s, a),
            _ => log::warn!("No candidate produced a valid Quality Ratio for both slope and aspect"),
        }

        Ok(QualitySearch {
            scores,
            best_slope,
            best_aspect,
        })
    }

    fn score(&self, surface: &GriddedSurface) -> DemResult<ResolutionScores> {
        let report = self.analyzer.analyze(surface)?;
        let scores = ResolutionScores {
            spacing: surface.spacing.get(),
            mean_quality_slope: report.mean_quality(Quantity::Slope),
            mean_quality_aspect: report.mean_quality(Quantity::Aspect),
        };
        log::debug!(
            "Spacing {}: mean QR slope {:.4}, aspect {:.4}",
            scores.spacing,
            scores.mean_quality_slope,
            scores.mean_quality_aspect
        );
        if scores.mean_quality_slope.is_nan() && scores.mean_quality_aspect.is_nan() {
            log::warn!("Candidate at spacing {} has no valid cells", scores.spacing);
        }
        Ok(scores)
    }

    /// Median of `PEU + |truncation error|` for one surface
    pub fn median_uncertainty(&self, surface: &GriddedSurface, quantity: Quantity) -> DemResult<f64> {
        Ok(self.analyzer.analyze(surface)?.median_uncertainty(quantity))
    }

    /// Spacing in `bounds` minimizing the median total uncertainty of
    /// `quantity`, as found by `minimizer`.
    ///
    /// Spacings the source cannot grid, or grids without valid cells, score
    /// `+inf` so the minimizer steers away from them.
    pub fn optimal_spacing<S, M>(
        &self,
        source: &S,
        minimizer: &M,
        bounds: (f64, f64),
        quantity: Quantity,
    ) -> DemResult<Spacing>
    where
        S: SurfaceSource + ?Sized,
        M: ScalarMinimizer + ?Sized,
    {
        let (lo, hi) = bounds;
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && lo < hi) {
            return Err(DemError::InvalidInput(format!(
                "spacing bounds must satisfy 0 < lo < hi, got ({}, {})",
                lo, hi
            )));
        }
        log::info!("Searching {} spacing in [{}, {}]", quantity, lo, hi);

        let mut evaluations = 0usize;
        let mut objective = |width: f64| -> f64 {
            evaluations += 1;
            let value = Spacing::new(width)
                .and_then(|spacing| source.surface_at(spacing))
                .and_then(|surface| self.median_uncertainty(&surface, quantity));
            match value {
                Ok(v) if v.is_finite() => {
                    log::debug!("Spacing {:.4}: median {} uncertainty {:.4}", width, quantity, v);
                    v
                }
                Ok(_) => {
                    log::debug!("Spacing {:.4}: no valid cells", width);
                    f64::INFINITY
                }
                Err(e) => {
                    log::debug!("Spacing {:.4} rejected: {}", width, e);
                    f64::INFINITY
                }
            }
        };

        let best = minimizer.minimize(&mut objective, bounds)?;
        let spacing = Spacing::new(best)?;
        log::info!(
            "Optimal {} spacing {} after {} evaluations",
            quantity,
            spacing,
            evaluations
        );
        Ok(spacing)
    }

    /// Spacing satisfying both optima: the coarser of the two
    pub fn combined_spacing(slope: Spacing, aspect: Spacing) -> Spacing {
        if aspect.get() > slope.get() {
            aspect
        } else {
            slope
        }
    }
}

/// Median of `PEU + |truncation error|` under default analysis parameters
pub fn median_uncertainty(surface: &GriddedSurface, quantity: Quantity) -> DemResult<f64> {
    ResolutionSearch::default().median_uncertainty(surface, quantity)
}

fn best_spacing(scores: &[ResolutionScores], quantity: Quantity) -> DemResult<Option<Spacing>> {
    let mut best: Option<&ResolutionScores> = None;
    for candidate in scores {
        let value = candidate.mean_quality(quantity);
        if value.is_nan() {
            continue;
        }
        if best.map_or(true, |b| value > b.mean_quality(quantity)) {
            best = Some(candidate);
        }
    }
    best.map(|b| Spacing::new(b.spacing)).transpose()
}
