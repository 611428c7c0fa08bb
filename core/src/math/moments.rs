use crate::prelude::{FitOrder, StageError, StageResult};

/// Sliding-window power sums and the closed-form least-squares solve that
/// turns them into local polynomial coefficients.
///
/// The fit window spans `2 * tau + 1` samples centered on an anchor index.
/// The T-moments (sums of even powers of the window offsets) depend only on
/// `tau`; odd T-moments vanish by symmetry. Because the even and odd degree
/// terms decouple over a symmetric window, the cubic solve reduces to two
/// independent 2x2 systems with fixed denominators.
pub struct MomentTracker {
    order: FitOrder,
    t0: f64,
    t2: f64,
    t4: f64,
    t6: f64,
    fact02: f64,
    fact13: f64,
    x0: f64,
    x1: f64,
    x2: f64,
    x3: f64,
    alpha: [f64; 4],
    tau: usize,
    tau_plus_1: f64,
    tau_plus_1_sq: f64,
    tau_plus_1_cu: f64,
    minus_tau: f64,
    minus_tau_sq: f64,
    minus_tau_cu: f64,
}

impl MomentTracker {
    /// Precomputes the T-moments and solve denominators for `tau`.
    ///
    /// Fails when either denominator vanishes: `tau = 0` always, and
    /// `tau = 1` for the cubic odd-moment system.
    pub fn new(tau: usize, order: FitOrder) -> StageResult<Self> {
        let mut t0 = 0.0;
        let mut t2 = 0.0;
        let mut t4 = 0.0;
        let mut t6 = 0.0;
        for t in -(tau as i64)..=tau as i64 {
            let tf = t as f64;
            let tf2 = tf * tf;
            t0 += 1.0;
            t2 += tf2;
            t4 += tf2 * tf2;
            t6 += tf2 * tf2 * tf2;
        }

        let den02 = t0 * t4 - t2 * t2;
        if den02 == 0.0 {
            return Err(StageError::DegenerateWindow(tau));
        }
        let fact13 = match order {
            FitOrder::Cubic => {
                let den13 = t2 * t6 - t4 * t4;
                if den13 == 0.0 {
                    return Err(StageError::DegenerateWindow(tau));
                }
                1.0 / den13
            }
            FitOrder::Linear => 0.0,
        };

        let tau_plus_1 = tau as f64 + 1.0;
        let minus_tau = -(tau as f64);
        Ok(Self {
            order,
            t0,
            t2,
            t4,
            t6,
            fact02: 1.0 / den02,
            fact13,
            x0: 0.0,
            x1: 0.0,
            x2: 0.0,
            x3: 0.0,
            alpha: [0.0; 4],
            tau,
            tau_plus_1,
            tau_plus_1_sq: tau_plus_1 * tau_plus_1,
            tau_plus_1_cu: tau_plus_1 * tau_plus_1 * tau_plus_1,
            minus_tau,
            minus_tau_sq: minus_tau * minus_tau,
            minus_tau_cu: minus_tau * minus_tau * minus_tau,
        })
    }

    /// Full recomputation of X0..X3 over the window centered on `anchor`.
    /// The window must lie within the signal; callers route boundary cases
    /// through the state machine instead.
    pub fn recompute(&mut self, signal: &[f64], anchor: usize) {
        debug_assert!(anchor >= self.tau && anchor + self.tau < signal.len());
        self.x0 = 0.0;
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.x3 = 0.0;
        for t in -(self.tau as i64)..=self.tau as i64 {
            let y = signal[(anchor as i64 + t) as usize];
            let tf = t as f64;
            self.x0 += y;
            self.x1 += tf * y;
            self.x2 += tf * tf * y;
            self.x3 += tf * tf * tf * y;
        }
    }

    /// Advances the window center by one index, to `anchor`, updating all
    /// four sums in O(1). The correction terms come from the binomial
    /// expansion of the offset shift; the result matches `recompute` at the
    /// new anchor up to floating-point associativity.
    pub fn slide_forward(&mut self, signal: &[f64], anchor: usize) {
        debug_assert!(anchor > self.tau && anchor + self.tau < signal.len());
        let y_new = signal[anchor + self.tau];
        let y_old = signal[anchor - self.tau - 1];
        self.x0 += y_new - y_old;
        self.x1 += self.tau_plus_1 * y_new - self.minus_tau * y_old - self.x0;
        self.x2 += self.tau_plus_1_sq * y_new - self.minus_tau_sq * y_old - self.x0
            - 2.0 * self.x1;
        self.x3 += self.tau_plus_1_cu * y_new - self.minus_tau_cu * y_old - self.x0
            - 3.0 * self.x1
            - 3.0 * self.x2;
    }

    /// Solves for the local polynomial coefficients from the current sums.
    pub fn fit(&mut self) {
        self.alpha[0] = self.fact02 * (self.t4 * self.x0 - self.t2 * self.x2);
        self.alpha[2] = self.fact02 * (self.t0 * self.x2 - self.t2 * self.x0);
        match self.order {
            FitOrder::Cubic => {
                self.alpha[1] = self.fact13 * (self.t6 * self.x1 - self.t4 * self.x3);
                self.alpha[3] = self.fact13 * (self.t2 * self.x3 - self.t4 * self.x1);
            }
            FitOrder::Linear => {
                self.alpha[1] = self.x1 / self.t2;
                self.alpha[3] = 0.0;
            }
        }
    }

    /// Cheap mean-level estimate used once per sample in steady tracking,
    /// where the full solve is unnecessary.
    pub fn quick_alpha0(&self) -> f64 {
        self.fact02 * (self.t4 * self.x0 - self.t2 * self.x2)
    }

    /// Evaluates the fitted polynomial at offset `dt` from the anchor.
    pub fn eval(&self, dt: i64) -> f64 {
        let dt = dt as f64;
        self.alpha[0] + dt * (self.alpha[1] + dt * (self.alpha[2] + dt * self.alpha[3]))
    }

    pub fn coefficients(&self) -> [f64; 4] {
        self.alpha
    }

    pub fn sums(&self) -> [f64; 4] {
        [self.x0, self.x1, self.x2, self.x3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn cubic_signal(len: usize, center: usize, c: [f64; 4]) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let dt = i as f64 - center as f64;
                c[0] + c[1] * dt + c[2] * dt * dt + c[3] * dt * dt * dt
            })
            .collect()
    }

    #[test]
    fn zero_tau_is_degenerate() {
        assert!(matches!(
            MomentTracker::new(0, FitOrder::Linear),
            Err(StageError::DegenerateWindow(0))
        ));
    }

    #[test]
    fn tau_one_is_degenerate_for_cubic_only() {
        assert!(MomentTracker::new(1, FitOrder::Cubic).is_err());
        assert!(MomentTracker::new(1, FitOrder::Linear).is_ok());
    }

    #[test]
    fn fit_recovers_exact_cubic_coefficients() {
        let c = [0.5, -1.25, 0.75, 0.03];
        let signal = cubic_signal(21, 10, c);
        let mut tracker = MomentTracker::new(5, FitOrder::Cubic).unwrap();
        tracker.recompute(&signal, 10);
        tracker.fit();
        let alpha = tracker.coefficients();
        for k in 0..4 {
            assert!((alpha[k] - c[k]).abs() < 1e-9, "alpha{} = {}", k, alpha[k]);
        }
        assert!((tracker.eval(0) - c[0]).abs() < 1e-9);
    }

    #[test]
    fn linear_fit_recovers_quadratic_without_cubic_term() {
        let c = [2.0, 0.5, -0.125, 0.0];
        let signal = cubic_signal(31, 15, c);
        let mut tracker = MomentTracker::new(6, FitOrder::Linear).unwrap();
        tracker.recompute(&signal, 15);
        tracker.fit();
        let alpha = tracker.coefficients();
        assert!((alpha[0] - c[0]).abs() < 1e-9);
        assert!((alpha[1] - c[1]).abs() < 1e-9);
        assert!((alpha[2] - c[2]).abs() < 1e-9);
        assert_eq!(alpha[3], 0.0);
    }

    #[test]
    fn quick_alpha0_on_constant_signal_is_the_constant() {
        let signal = vec![5.0; 41];
        let mut tracker = MomentTracker::new(10, FitOrder::Cubic).unwrap();
        tracker.recompute(&signal, 20);
        assert!((tracker.quick_alpha0() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn slide_forward_matches_recompute() {
        let mut rng = StdRng::seed_from_u64(42);
        let signal: Vec<f64> = (0..200).map(|_| rng.gen_range(-3.0..3.0)).collect();

        let tau = 12;
        let mut slid = MomentTracker::new(tau, FitOrder::Cubic).unwrap();
        slid.recompute(&signal, tau);
        let mut fresh = MomentTracker::new(tau, FitOrder::Cubic).unwrap();

        for anchor in tau + 1..signal.len() - tau {
            slid.slide_forward(&signal, anchor);
            fresh.recompute(&signal, anchor);
            let a = slid.sums();
            let b = fresh.sums();
            for k in 0..4 {
                let scale = b[k].abs().max(1.0);
                assert!(
                    (a[k] - b[k]).abs() / scale < 1e-9,
                    "X{} diverged at anchor {}: {} vs {}",
                    k,
                    anchor,
                    a[k],
                    b[k]
                );
            }
        }
    }
}
