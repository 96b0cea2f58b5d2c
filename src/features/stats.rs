//! Small numeric helpers

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Least-squares slope of `ys` against `xs`.
///
/// NaN for no points; 0 when all `xs` coincide.
pub fn linear_slope(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return f64::NAN;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mx = mean(xs);
    let my = mean(ys);

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        sxx += (x - mx) * (x - mx);
        sxy += (x - mx) * (y - my);
    }
    if sxx == 0.0 {
        return 0.0;
    }
    sxy / sxx
}

/// Slope of the running event count (1, 2, 3, ...) against event time.
pub fn cumulative_count_slope(epochs: &[f64]) -> f64 {
    let counts: Vec<f64> = (1..=epochs.len()).map(|i| i as f64).collect();
    linear_slope(epochs, &counts)
}

pub fn binary(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}
