//! Core field operators and the analysis pipeline built on them

pub mod operator;
pub mod gradient;
pub mod slope_aspect;
pub mod peu;
pub mod truncation;
pub mod quality;
pub mod circular;
pub mod stats;
pub mod pipeline;
pub mod resolution;

// Re-export main types
pub use operator::{apply_mask, mask_below, missing_mask, union_mask, FieldOperator};
pub use gradient::{derivative, gradient, gradient_with, ColDerivative, EdgeOrder, RowDerivative};
pub use slope_aspect::{aspect, slope, slope_aspect, Aspect, Slope};
pub use peu::{peu_aspect_field, peu_aspect_unit, peu_slope_field, peu_slope_unit, PeuAspect, PeuSlope};
pub use truncation::{
    trunc_err_aspect, trunc_err_aspect_with, trunc_err_slope, trunc_err_slope_with, TaylorPerturbation,
    TruncationAspect, TruncationEdge, TruncationSlope,
};
pub use quality::{quality_ratio, quality_ratio_field, scaled_quality_ratio_field};
pub use circular::{circular_std, circular_std_axis};
pub use stats::{nan_mean, nan_median, FieldSummary};
pub use pipeline::{AnalysisParams, FieldReport, UncertaintyAnalyzer};
pub use resolution::{
    median_uncertainty, QualitySearch, ResolutionScores, ResolutionSearch, ScalarMinimizer, SurfaceSource,
};
