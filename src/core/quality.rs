use crate::types::{ensure_same_shape, DemResult, Field, Mask};
use ndarray::Zip;

/// Quality Ratio of one cell: `1/(1+|t|) · 1/(1+|p|)`.
///
/// Lies in `(0, 1]`, equals 1 only when both errors are zero and decreases
/// strictly in either magnitude. Missing input gives a missing ratio.
#[inline]
pub fn quality_ratio(trunc_err: f64, peu: f64) -> f64 {
    if !(trunc_err.is_finite() && peu.is_finite()) {
        return f64::NAN;
    }
    (1.0 / (1.0 + trunc_err.abs())) * (1.0 / (1.0 + peu.abs()))
}

/// Cell-wise Quality Ratio of a truncation error field and a PEU field.
///
/// Masked cells (`true`) and cells missing in either input are NaN; missing
/// data is ordinary terrain (water, shadow) and never an error.
pub fn quality_ratio_field(trunc_err: &Field, peu: &Field, mask: Option<&Mask>) -> DemResult<Field> {
    ensure_same_shape(trunc_err, peu)?;

    let ratio = Zip::from(trunc_err)
        .and(peu)
        .map_collect(|&t, &p| quality_ratio(t, p));

    match mask {
        Some(mask) => crate::core::operator::apply_mask(&ratio, mask),
        None => Ok(ratio),
    }
}

/// Quality Ratio with both error fields divided by `scale` first
pub fn scaled_quality_ratio_field(
    trunc_err: &Field,
    peu: &Field,
    scale: f64,
    mask: Option<&Mask>,
) -> DemResult<Field> {
    if scale == 1.0 {
        return quality_ratio_field(trunc_err, peu, mask);
    }
    quality_ratio_field(&(trunc_err / scale), &(peu / scale), mask)
}
