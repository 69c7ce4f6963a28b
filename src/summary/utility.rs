/// Mean and population standard deviation of daily totals.
///
/// Returns `(0.0, 0.0)` for empty input.
pub fn mean_and_stddev(totals: &[u64]) -> (f64, f64) {
    if totals.is_empty() {
        return (0.0, 0.0);
    }
    let n = totals.len() as f64;
    let mean = totals.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = totals
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;

    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_totals() {
        assert_eq!(mean_and_stddev(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_two_days() {
        assert_eq!(mean_and_stddev(&[10, 20]), (15.0, 5.0));
    }

    #[test]
    fn test_single_day_has_no_spread() {
        assert_eq!(mean_and_stddev(&[42]), (42.0, 0.0));
    }
}
