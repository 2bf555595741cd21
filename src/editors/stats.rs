//! Small numeric helpers for the indicator editor.

/// Least-squares fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
}

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    Some(values.iter().sum::<f64>() / n)
}

/// Ordinary least squares over `(x, y)` points.
///
/// Returns `None` with fewer than two points or when every x is equal.
#[must_use]
pub fn linear_regression(points: &[(f64, f64)]) -> Option<Regression> {
    if points.len() < 2 {
        return None;
    }
    let xs: Vec<f64> = points.iter().map(|(x, _)| *x).collect();
    let ys: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
    let mean_x = mean(&xs)?;
    let mean_y = mean(&ys)?;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (x, y) in points {
        let dx = x - mean_x;
        covariance += dx * (y - mean_y);
        variance += dx * dx;
    }
    if variance.abs() < f64::EPSILON {
        return None;
    }

    let slope = covariance / variance;
    Some(Regression { slope, intercept: mean_y - slope * mean_x })
}

#[cfg(test)]
#[path = "stats_test.rs"]
mod tests;
