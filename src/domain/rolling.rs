//! Trailing-window helpers shared by the feature and signal stages.
//!
//! All windows are trailing and require a full window of present values:
//! the first `window - 1` outputs are always `None`, as is any output whose
//! window contains a missing value.

/// Trailing mean over `window` observations.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        out.push(full_window(values, i, window).map(|w| w.iter().sum::<f64>() / window as f64));
    }
    out
}

/// Trailing percentile rank of the newest value within its window.
///
/// Ties receive their average rank; the rank is divided by the window length,
/// so the result lies in `(0, 1]`.
pub fn rolling_pct_rank(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        out.push(full_window(values, i, window).map(|w| {
            let current = w[w.len() - 1];
            let below = w.iter().filter(|&&v| v < current).count() as f64;
            let equal = w.iter().filter(|&&v| v == current).count() as f64;
            (below + (equal + 1.0) / 2.0) / window as f64
        }));
    }
    out
}

/// Shift a series one step later, filling the vacated first slot.
pub fn lag<T: Copy>(values: &[T], fill: T) -> Vec<T> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(fill);
    out.extend_from_slice(&values[..values.len() - 1]);
    out
}

fn full_window(values: &[Option<f64>], end: usize, window: usize) -> Option<Vec<f64>> {
    if window == 0 || end + 1 < window {
        return None;
    }
    values[end + 1 - window..=end].iter().copied().collect()
}
