//! Finite-difference stencils over any fallible scalar function
//!
//! ```text
//! first:        (f(x+h) − f(x−h)) / 2h                                   O(h²)
//! second, 3pt:  (f(x+h) − 2f(x) + f(x−h)) / h²                           O(h²)
//! second, 5pt:  (−f(x+2h) + 16f(x+h) − 30f(x) + 16f(x−h) − f(x−2h)) / 12h²  O(h⁴)
//! mixed:        (f(+h,+h) − f(+h,−h) − f(−h,+h) + f(−h,−h)) / 4h²
//! ```

use ess_common::{AccuracyLevel, Result};

/// Step for the selection gradient
pub const GRADIENT_STEP: f64 = 1e-6;

/// Step for the 3-point curvature stencil
pub const LOW_ACCURACY_STEP: f64 = 1e-6;

/// Step for the 5-point curvature stencil
pub const HIGH_ACCURACY_STEP: f64 = 1e-5;

/// Default step for an accuracy level
#[inline]
pub fn default_step(level: AccuracyLevel) -> f64 {
    match level {
        AccuracyLevel::Low => LOW_ACCURACY_STEP,
        AccuracyLevel::High => HIGH_ACCURACY_STEP,
    }
}

/// Central first difference
pub fn first_central<F>(mut f: F, x: f64, h: f64) -> Result<f64>
where
    F: FnMut(f64) -> Result<f64>,
{
    let forward = f(x + h)?;
    let backward = f(x - h)?;
    Ok((forward - backward) / (2.0 * h))
}

/// 3-point second difference, O(h²)
pub fn second_three_point<F>(mut f: F, x: f64, h: f64) -> Result<f64>
where
    F: FnMut(f64) -> Result<f64>,
{
    let f_p = f(x + h)?;
    let f_0 = f(x)?;
    let f_m = f(x - h)?;
    Ok((f_p - 2.0 * f_0 + f_m) / (h * h))
}

/// 5-point second difference, O(h⁴)
pub fn second_five_point<F>(mut f: F, x: f64, h: f64) -> Result<f64>
where
    F: FnMut(f64) -> Result<f64>,
{
    let f_p2 = f(x + 2.0 * h)?;
    let f_p1 = f(x + h)?;
    let f_0 = f(x)?;
    let f_m1 = f(x - h)?;
    let f_m2 = f(x - 2.0 * h)?;
    Ok((-f_p2 + 16.0 * f_p1 - 30.0 * f_0 + 16.0 * f_m1 - f_m2) / (12.0 * h * h))
}

/// Second difference at the given accuracy
pub fn second<F>(f: F, x: f64, h: f64, level: AccuracyLevel) -> Result<f64>
where
    F: FnMut(f64) -> Result<f64>,
{
    match level {
        AccuracyLevel::Low => second_three_point(f, x, h),
        AccuracyLevel::High => second_five_point(f, x, h),
    }
}

/// 4-point mixed partial ∂²f/∂x∂y
pub fn mixed_four_point<F>(mut f: F, x: f64, y: f64, h: f64) -> Result<f64>
where
    F: FnMut(f64, f64) -> Result<f64>,
{
    let f_pp = f(x + h, y + h)?;
    let f_pm = f(x + h, y - h)?;
    let f_mp = f(x - h, y + h)?;
    let f_mm = f(x - h, y - h)?;
    Ok((f_pp - f_pm - f_mp + f_mm) / (4.0 * h * h))
}
