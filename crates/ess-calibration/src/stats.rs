//! Closed-form fit and summary statistics used by the calibrator

/// Least-squares coefficient of `y ≈ a·x` over the given sample indices
///
/// `None` when Σx² is zero (the sample carries no information about `a`).
pub fn through_origin_slope(x: &[f64], y: &[f64], indices: impl IntoIterator<Item = usize>) -> Option<f64> {
    let (sxy, sxx) = indices
        .into_iter()
        .fold((0.0, 0.0), |(sxy, sxx), i| (sxy + x[i] * y[i], sxx + x[i] * x[i]));
    if sxx == 0.0 {
        None
    } else {
        Some(sxy / sxx)
    }
}

/// Percentile with linear interpolation between closest ranks
///
/// `sorted` must be ascending and non-empty; `q` is in [0, 1].
pub fn percentile_linear(sorted: &[f64], q: f64) -> f64 {
    let last = sorted.len() - 1;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Sort a copy ascending (total order, NaN last)
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

pub fn mean_absolute_error(predicted: &[f64], observed: &[f64]) -> f64 {
    let n = predicted.len().max(1) as f64;
    predicted
        .iter()
        .zip(observed)
        .map(|(p, o)| (p - o).abs())
        .sum::<f64>()
        / n
}

/// Coefficient of determination; 0 when the observations have no variance
pub fn r_squared(predicted: &[f64], observed: &[f64]) -> f64 {
    let n = observed.len().max(1) as f64;
    let mean = observed.iter().sum::<f64>() / n;
    let ss_tot: f64 = observed.iter().map(|o| (o - mean) * (o - mean)).sum();
    if ss_tot == 0.0 {
        return 0.0;
    }
    let ss_res: f64 = predicted
        .iter()
        .zip(observed)
        .map(|(p, o)| (o - p) * (o - p))
        .sum();
    1.0 - ss_res / ss_tot
}
