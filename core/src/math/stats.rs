pub struct StatsHelper;

impl StatsHelper {
    /// RMS over the finite entries of a partially masked trace.
    pub fn rms_finite(samples: &[f64]) -> f64 {
        let mut sum_sq = 0.0;
        let mut count = 0usize;
        for &v in samples {
            if v.is_finite() {
                sum_sq += v * v;
                count += 1;
            }
        }
        if count == 0 {
            return 0.0;
        }
        (sum_sq / count as f64).sqrt()
    }

    pub fn finite_count(samples: &[f64]) -> usize {
        samples.iter().filter(|v| v.is_finite()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_empty_or_fully_masked_yields_zero() {
        assert_eq!(StatsHelper::rms_finite(&[]), 0.0);
        assert_eq!(StatsHelper::rms_finite(&[f64::NAN, f64::NAN]), 0.0);
    }

    #[test]
    fn rms_skips_masked_samples() {
        assert_eq!(StatsHelper::rms_finite(&[3.0, f64::NAN, 4.0]), 12.5f64.sqrt());
        assert_eq!(StatsHelper::rms_finite(&[4.0]), 4.0);
    }

    #[test]
    fn finite_count_counts_unmasked() {
        assert_eq!(StatsHelper::finite_count(&[1.0, f64::NAN, 2.0]), 2);
    }
}
