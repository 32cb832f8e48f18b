//! Statistical utility functions shared by the ensemble and risk engines.
//!
//! All helpers ignore non-finite inputs where noted, so a forecast step that a
//! model left as `NaN` does not poison the statistic.

/// Tolerance below which a magnitude is treated as zero.
pub const EPSILON: f64 = 1e-10;

/// Tolerance for "sums to one" checks on weight vectors.
pub const SUM_TOLERANCE: f64 = 1e-6;

/// Arithmetic mean of the finite values, or `None` if there are none.
///
/// # Examples
///
/// ```
/// use vigia_traits::stats::mean;
///
/// assert_eq!(mean(&[1.0, f64::NAN, 3.0]), Some(2.0));
/// assert_eq!(mean(&[]), None);
/// ```
pub fn mean(values: &[f64]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .filter(|x| x.is_finite())
        .fold((0.0, 0usize), |(s, n), &x| (s + x, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Population variance (N denominator) of the finite values.
///
/// Returns `0.0` for fewer than two finite values.
pub fn variance(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if finite.len() < 2 {
        return 0.0;
    }
    let mu = finite.iter().sum::<f64>() / finite.len() as f64;
    finite.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / finite.len() as f64
}

/// Population standard deviation of the finite values.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Weighted mean over `(value, weight)` pairs, skipping non-finite values.
///
/// The weights are renormalized over the pairs that survive, so missing
/// values simply drop out. Returns `None` if no positive weight remains.
pub fn weighted_mean(pairs: impl IntoIterator<Item = (f64, f64)>) -> Option<f64> {
    let (num, den) = pairs
        .into_iter()
        .filter(|(v, w)| v.is_finite() && *w > 0.0)
        .fold((0.0, 0.0), |(num, den), (v, w)| (num + v * w, den + w));
    (den > EPSILON).then(|| num / den)
}

/// Weighted variance of `(value, weight)` pairs around `center`.
///
/// Non-finite values are skipped and weights renormalized; an empty set
/// yields `0.0`.
pub fn weighted_variance(pairs: impl IntoIterator<Item = (f64, f64)>, center: f64) -> f64 {
    let (num, den) = pairs
        .into_iter()
        .filter(|(v, w)| v.is_finite() && *w > 0.0)
        .fold((0.0, 0.0), |(num, den), (v, w)| {
            (num + w * (v - center).powi(2), den + w)
        });
    if den > EPSILON { num / den } else { 0.0 }
}

/// Conformal quantile of a set of non-negative scores.
///
/// Uses the finite-sample corrected rank `ceil((n + 1) * (1 - alpha))`,
/// capped at `n`, over the ascending order statistics. Returns `None` on an
/// empty input.
///
/// # Examples
///
/// ```
/// use vigia_traits::stats::conformal_quantile;
///
/// let residuals = [0.1, 0.4, 0.2, 0.3];
/// // rank = ceil(5 * 0.5) = 3 -> third smallest
/// assert_eq!(conformal_quantile(&residuals, 0.5), Some(0.3));
/// ```
pub fn conformal_quantile(scores: &[f64], alpha: f64) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let rank = ((n + 1) as f64 * (1.0 - alpha)).ceil() as usize;
    let idx = rank.clamp(1, n) - 1;
    Some(sorted[idx])
}

/// Clamp to the unit interval, mapping `NaN` to zero.
#[must_use]
pub fn unit_clamp(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_skips_nan() {
        assert_relative_eq!(mean(&[1.0, 2.0, f64::NAN, 3.0]).unwrap(), 2.0);
        assert!(mean(&[f64::NAN]).is_none());
    }

    #[test]
    fn test_variance_population() {
        // mean 2.5, squared deviations 2.25 + 0.25 + 0.25 + 2.25 = 5
        assert_relative_eq!(variance(&[1.0, 2.0, 3.0, 4.0]), 1.25);
        assert_relative_eq!(variance(&[7.0]), 0.0);
        assert_relative_eq!(std_dev(&[2.0, 2.0, 2.0]), 0.0);
    }

    #[test]
    fn test_weighted_mean_renormalizes() {
        let m = weighted_mean([(10.0, 0.5), (f64::NAN, 0.3), (20.0, 0.2)]).unwrap();
        // (5 + 4) / 0.7
        assert_relative_eq!(m, 9.0 / 0.7, epsilon = 1e-12);
        assert!(weighted_mean([(f64::NAN, 1.0)]).is_none());
    }

    #[test]
    fn test_weighted_variance() {
        let v = weighted_variance([(1.0, 0.5), (3.0, 0.5)], 2.0);
        assert_relative_eq!(v, 1.0);
        assert_relative_eq!(weighted_variance(std::iter::empty(), 0.0), 0.0);
    }

    #[test]
    fn test_conformal_quantile() {
        let scores = [0.5, 0.1, 0.3, 0.2, 0.4];
        // rank = ceil(6 * 0.9) = 6 -> capped to 5 -> max
        assert_relative_eq!(conformal_quantile(&scores, 0.1).unwrap(), 0.5);
        // rank = ceil(6 * 0.5) = 3
        assert_relative_eq!(conformal_quantile(&scores, 0.5).unwrap(), 0.3);
        assert!(conformal_quantile(&[], 0.1).is_none());
    }

    #[test]
    fn test_unit_clamp() {
        assert_relative_eq!(unit_clamp(1.7), 1.0);
        assert_relative_eq!(unit_clamp(-0.2), 0.0);
        assert_relative_eq!(unit_clamp(f64::NAN), 0.0);
    }
}
