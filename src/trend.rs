/// Ordinary least-squares slope of `scores` against their 0-based index.
///
/// Fewer than two points carry no trend and yield 0.0, as does a zero index variance.
pub fn estimate_trend<T>(scores: &[T]) -> f64
where
    T: Copy + Into<f64>,
{
    let n = scores.len();
    if n < 2 {
        return 0.0;
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = scores.iter().map(|&y| y.into()).sum::<f64>() / n as f64;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, &y) in scores.iter().enumerate() {
        let dx = i as f64 - x_mean;
        numerator += dx * (y.into() - y_mean);
        denominator += dx * dx;
    }

    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_single_have_no_trend() {
        assert_eq!(estimate_trend::<f64>(&[]), 0.0);
        assert_eq!(estimate_trend(&[42u8]), 0.0);
        assert_eq!(estimate_trend(&[100.0]), 0.0);
    }

    #[test]
    fn linear_series_slope_is_exact() {
        assert_eq!(estimate_trend(&[10u8, 20, 30, 40]), 10.0);
        assert_eq!(estimate_trend(&[40u8, 30, 20, 10]), -10.0);
    }

    #[test]
    fn flat_series_is_zero() {
        assert_eq!(estimate_trend(&[50u8, 50, 50]), 0.0);
    }

    #[test]
    fn hand_computed_regressions() {
        // x_mean 1, y_mean 71.67: ((-1)(-11.67) + (1)(13.33)) / 2
        assert!((estimate_trend(&[60u8, 70, 85]) - 12.5).abs() < 1e-9);
        // two points: plain difference
        assert_eq!(estimate_trend(&[55u8, 62]), 7.0);
        // centered x is -2..=2, so the slope is (-140 - 80 + 72 + 152) / 10
        assert!((estimate_trend(&[70u8, 80, 74, 72, 76]) - 0.4).abs() < 1e-9);
    }
}
