use std::f64::consts::PI;

/// Slow sinusoidal baseline drift sampled at `index` of a trace of `length`.
pub fn drift_wave(index: usize, length: usize, cycles: f64) -> f64 {
    if length == 0 {
        return 0.0;
    }
    ((index as f64 / length as f64) * 2.0 * PI * cycles).sin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_wave_starts_at_zero_and_stays_bounded() {
        assert_eq!(drift_wave(0, 1000, 3.0), 0.0);
        for i in 0..1000 {
            assert!(drift_wave(i, 1000, 3.0).abs() <= 1.0);
        }
    }

    #[test]
    fn zero_length_trace_yields_zero() {
        assert_eq!(drift_wave(5, 0, 2.0), 0.0);
    }
}
