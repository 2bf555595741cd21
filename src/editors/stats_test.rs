use super::*;

#[test]
fn mean_of_empty_is_none() {
    assert!(mean(&[]).is_none());
}

#[test]
fn mean_of_values() {
    let m = mean(&[2.0, 4.0, 9.0]).unwrap();
    assert!((m - 5.0).abs() < 1e-12);
}

#[test]
fn regression_needs_two_points() {
    assert!(linear_regression(&[(1.0, 1.0)]).is_none());
}

#[test]
fn regression_rejects_vertical_points() {
    assert!(linear_regression(&[(3.0, 1.0), (3.0, 5.0)]).is_none());
}

#[test]
fn regression_exact_line() {
    let fit = linear_regression(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)]).unwrap();
    assert!((fit.slope - 2.0).abs() < 1e-12);
    assert!((fit.intercept - 1.0).abs() < 1e-12);
    assert!((fit.slope * 10.0 + fit.intercept - 21.0).abs() < 1e-9);
}

#[test]
fn regression_noisy_decreasing() {
    let fit = linear_regression(&[(0.0, 10.0), (1.0, 9.0), (2.0, 7.5), (3.0, 7.0)]).unwrap();
    assert!(fit.slope < 0.0);
}

#[test]
fn regression_flat_line_has_zero_slope() {
    let fit = linear_regression(&[(0.0, 4.0), (5.0, 4.0), (9.0, 4.0)]).unwrap();
    assert!(fit.slope.abs() < 1e-12);
    assert!((fit.intercept - 4.0).abs() < 1e-12);
}
