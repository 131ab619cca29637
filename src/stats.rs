//! Summary statistics over per-step and per-flow samples.

/// Arithmetic mean, or `None` for an empty sample.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// The `p`-th percentile (`0..=100`), interpolating linearly between the two nearest ranks.
pub fn percentile(samples: &[f64], p: f64) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_samples() {
        assert_eq!(mean(&[]), None);
        assert_eq!(percentile(&[], 99.0), None);
    }

    #[test]
    fn mean_of_samples() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 6.0]), Some(3.0));
    }

    #[test]
    fn percentile_interpolates() {
        let samples = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(percentile(&samples, 0.0), Some(1.0));
        assert_eq!(percentile(&samples, 50.0), Some(3.0));
        assert_eq!(percentile(&samples, 100.0), Some(5.0));
        // rank 3.96 between 4 and 5
        let p99 = percentile(&samples, 99.0).unwrap();
        assert!((p99 - 4.96).abs() < 1e-12);
    }

    #[test]
    fn percentile_of_one() {
        assert_eq!(percentile(&[7.5], 99.0), Some(7.5));
    }
}
