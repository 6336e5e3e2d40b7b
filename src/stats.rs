/// Compute the change between consecutive values, `x[i + 1] - x[i]`.
pub fn daily_change(series: &[f64]) -> Vec<f64> {
    series.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Find the first maximum of a time series, ignoring NaN values.
pub fn peak(series: &[f64]) -> Option<(usize, f64)> {
    series
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, val)| !val.is_nan())
        .fold(None, |best, (idx, val)| match best {
            Some((_, best_val)) if best_val >= val => best,
            _ => Some((idx, val)),
        })
}
