use crate::math::moments::MomentTracker;
use crate::prelude::{DesaturationConfig, FitStatistic, Rails, StageError, StageResult};

/// Consecutive below-threshold fit evaluations required before a fit is
/// accepted and the machine leaves `PoorFit`.
const POOR_FIT_BUDGET: i32 = 5;

/// Scale factor relating the asymmetry bound to its accept-and-exit bound.
/// The exit test deliberately uses `bound / 3.92` while the accept test uses
/// the full bound; the two are not algebraically interchangeable.
const ASYM_SCALE: f64 = 3.92;

/// Position of the machine within the desaturation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// Steady baseline subtraction, window sliding with the cursor.
    Tracking,
    /// A peg is ahead; extrapolating the frozen fit up to the window edge.
    EnteringPeg,
    /// Inside or just past a saturated region, no usable fit.
    Pegged,
    /// A candidate fit exists but has not yet passed the fit test.
    PoorFit,
    /// Fit accepted; extrapolating backward until the cursor meets the anchor.
    Recovering,
    /// Masking up to a recorded boundary, then re-entering `Pegged`.
    ForcedMask,
    /// Mandatory blank right after a fit is re-accepted.
    BlankAfterRecovery,
}

/// Streaming desaturation filter.
///
/// Removes saturation artifacts from a sampled trace and detrends the
/// surrounding baseline with locally fitted low-order polynomials. Masked
/// samples are emitted as NaN. One instance owns exactly one run at a time;
/// `apply` is a pure function of the signal and the configuration.
pub struct Desaturator {
    tau: usize,
    t_ahead: usize,
    t_blankdepeg: usize,
    t_chi2: usize,
    rails: Rails,
    statistic: FitStatistic,
    /// Primary statistic bound; `None` disables the fit test entirely.
    stat_bound: Option<f64>,
    moments: MomentTracker,
    state: FilterState,
    t_stream: usize,
    t0: usize,
    t_peg: usize,
    poor_fit_left: i32,
    below_baseline: bool,
}

impl Desaturator {
    pub fn new(config: &DesaturationConfig) -> StageResult<Self> {
        if config.t_chi2 == 0 {
            return Err(StageError::InvalidConfig(
                "t_chi2 must be positive".into(),
            ));
        }
        if config.t_blankdepeg > config.tau {
            return Err(StageError::InvalidConfig(format!(
                "t_blankdepeg {} must not exceed tau {}",
                config.t_blankdepeg, config.tau
            )));
        }
        if let (Some(lo), Some(hi)) = (config.rails.lo, config.rails.hi) {
            if lo >= hi {
                return Err(StageError::InvalidConfig(format!(
                    "rail interval [{}, {}] is empty",
                    lo, hi
                )));
            }
        }
        if let Some(y) = config.y_threshold {
            if !(y > 0.0) || !y.is_finite() {
                return Err(StageError::InvalidConfig(format!(
                    "y_threshold {} must be positive and finite",
                    y
                )));
            }
        }

        let moments = MomentTracker::new(config.tau, config.fit_order)?;
        let stat_bound = config.y_threshold.map(|y| match config.statistic {
            FitStatistic::Asymmetry => ASYM_SCALE * config.t_chi2 as f64 * y * y,
            FitStatistic::SumOfSquares => (config.t_chi2 as f64 - 4.0) * y * y,
        });

        Ok(Self {
            tau: config.tau,
            t_ahead: config.t_ahead,
            t_blankdepeg: config.t_blankdepeg,
            t_chi2: config.t_chi2,
            rails: config.rails,
            statistic: config.statistic,
            stat_bound,
            moments,
            state: FilterState::Pegged,
            t_stream: 0,
            t0: 0,
            t_peg: 0,
            poor_fit_left: POOR_FIT_BUDGET,
            below_baseline: false,
        })
    }

    /// Rewinds the cursor to `t_start`. The run is considered invalid until
    /// the machine establishes a first good fit.
    pub fn reset(&mut self, t_start: usize) {
        self.t_stream = t_start;
        self.t_peg = t_start;
        self.t0 = 0;
        self.state = FilterState::Pegged;
        self.poor_fit_left = POOR_FIT_BUDGET;
        self.below_baseline = false;
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Boundary of the most recently closed tracked segment.
    pub fn last_peg(&self) -> usize {
        self.t_peg
    }

    /// One-shot entry point: conditions the whole signal and returns the
    /// NaN-masked output, same length as the input.
    pub fn apply(&mut self, signal: &[f64]) -> Vec<f64> {
        let mut dest = vec![f64::NAN; signal.len()];
        self.reset(0);
        self.process(signal, &mut dest, signal.len());
        dest
    }

    /// Like `apply`, writing into a caller-provided buffer.
    pub fn apply_into(&mut self, signal: &[f64], dest: &mut [f64]) -> StageResult<()> {
        if dest.len() != signal.len() {
            return Err(StageError::InvalidInput(format!(
                "output length {} does not match input length {}",
                dest.len(),
                signal.len()
            )));
        }
        dest.fill(f64::NAN);
        self.reset(0);
        self.process(signal, dest, signal.len());
        Ok(())
    }

    /// Runs the state machine until the cursor reaches `t_limit` (clamped to
    /// the signal length). Returns the cursor position.
    pub fn process(&mut self, signal: &[f64], dest: &mut [f64], t_limit: usize) -> usize {
        let t_limit = t_limit.min(signal.len()).min(dest.len());
        while self.t_stream < t_limit {
            self.state = self.step(signal, dest);
        }
        self.t_stream
    }

    /// Externally imposed mask over `[from, to)`, for artifact windows the
    /// rail test cannot detect. Catches up normally to `from - tau`, closes
    /// out a tracked segment through `EnteringPeg`, then masks the span and
    /// leaves the machine ready to resume at `to`.
    pub fn force_mask(
        &mut self,
        signal: &[f64],
        dest: &mut [f64],
        from: usize,
        to: usize,
    ) -> usize {
        self.process(signal, dest, from.saturating_sub(self.tau));
        if self.state == FilterState::Tracking {
            // The tracking step has already slid the window to the cursor;
            // the close-out anchor is one sample behind it, so the sums must
            // be re-anchored before the fit.
            self.t0 = self.t_stream.saturating_sub(1);
            self.moments.recompute(signal, self.t0);
            self.moments.fit();
            self.state = FilterState::EnteringPeg;
            self.process(signal, dest, from);
        }
        self.t0 = to;
        self.state = FilterState::ForcedMask;
        self.process(signal, dest, to)
    }

    fn step(&mut self, signal: &[f64], dest: &mut [f64]) -> FilterState {
        match self.state {
            FilterState::Tracking => self.step_tracking(signal, dest),
            FilterState::EnteringPeg => self.step_entering_peg(signal, dest),
            FilterState::Pegged => self.step_pegged(signal, dest),
            FilterState::PoorFit => self.step_poor_fit(signal, dest),
            FilterState::Recovering => self.step_recovering(signal, dest),
            FilterState::ForcedMask => self.step_forced_mask(dest),
            FilterState::BlankAfterRecovery => self.step_blank(signal, dest),
        }
    }

    fn step_tracking(&mut self, signal: &[f64], dest: &mut [f64]) -> FilterState {
        dest[self.t_stream] = signal[self.t_stream] - self.moments.quick_alpha0();
        self.t_stream += 1;
        let look = self.t_stream + self.tau + self.t_ahead;
        if look >= signal.len() || self.rails.is_pegged(signal[look]) {
            self.t0 = self.t_stream - 1;
            self.moments.fit();
            return FilterState::EnteringPeg;
        }
        self.moments.slide_forward(signal, self.t_stream);
        FilterState::Tracking
    }

    fn step_entering_peg(&mut self, signal: &[f64], dest: &mut [f64]) -> FilterState {
        if self.t_stream >= self.t0 + self.tau {
            self.t_peg = self.t_stream;
            return FilterState::Pegged;
        }
        let dt = self.t_stream as i64 - self.t0 as i64;
        dest[self.t_stream] = signal[self.t_stream] - self.moments.eval(dt);
        self.t_stream += 1;
        FilterState::EnteringPeg
    }

    fn step_pegged(&mut self, signal: &[f64], dest: &mut [f64]) -> FilterState {
        if self.rails.is_pegged(signal[self.t_stream]) {
            dest[self.t_stream] = f64::NAN;
            self.t_stream += 1;
            return FilterState::Pegged;
        }
        // A full fit window plus slack must be clean before a candidate fit
        // is attempted; anything less forces the whole span to be masked.
        for dt in 1..=2 * self.tau {
            let t = self.t_stream + dt;
            if t >= signal.len() || self.rails.is_pegged(signal[t]) {
                self.t0 = t;
                return FilterState::ForcedMask;
            }
        }
        self.t0 = self.t_stream + self.tau;
        self.moments.recompute(signal, self.t0);
        self.moments.fit();
        self.poor_fit_left = POOR_FIT_BUDGET;
        FilterState::PoorFit
    }

    fn step_poor_fit(&mut self, signal: &[f64], dest: &mut [f64]) -> FilterState {
        match self.statistic {
            FitStatistic::Asymmetry => {
                let mut asym = 0.0;
                for i in 0..self.t_chi2 {
                    let t = self.t_stream + i;
                    if t >= signal.len() {
                        self.t0 = t;
                        return FilterState::ForcedMask;
                    }
                    let dt = t as i64 - self.t0 as i64;
                    asym += self.moments.eval(dt) - signal[t];
                }
                let stat = asym * asym;
                if within_bound(stat, self.stat_bound) {
                    self.poor_fit_left -= 1;
                    if self.poor_fit_left <= 0
                        && within_bound(stat, self.stat_bound.map(|b| b / ASYM_SCALE))
                    {
                        self.capture_baseline_side(signal);
                        return FilterState::BlankAfterRecovery;
                    }
                } else {
                    self.poor_fit_left = POOR_FIT_BUDGET;
                }
            }
            FitStatistic::SumOfSquares => {
                let mut chi2 = 0.0;
                for i in 0..self.t_chi2 {
                    let t = self.t_stream + self.t_blankdepeg + i;
                    if t >= signal.len() {
                        self.t0 = t;
                        return FilterState::ForcedMask;
                    }
                    let dt = t as i64 - self.t0 as i64;
                    let dy = self.moments.eval(dt) - signal[t];
                    chi2 += dy * dy;
                }
                if within_bound(chi2, self.stat_bound) {
                    self.capture_baseline_side(signal);
                    return FilterState::BlankAfterRecovery;
                }
            }
        }

        dest[self.t_stream] = f64::NAN;
        self.t_stream += 1;
        self.t0 += 1;
        let edge = self.t0 + self.tau;
        if edge >= signal.len() || self.rails.is_pegged(signal[edge]) {
            self.t0 += self.tau;
            return FilterState::ForcedMask;
        }
        self.moments.recompute(signal, self.t0);
        self.moments.fit();
        FilterState::PoorFit
    }

    fn step_blank(&mut self, signal: &[f64], dest: &mut [f64]) -> FilterState {
        if self.t_stream + self.tau >= self.t0 + self.t_blankdepeg {
            return FilterState::Recovering;
        }
        // Premature exit: once the residual crosses the baseline, the
        // artifact tail has decayed and the remaining blank is unnecessary.
        let dt = self.t_stream as i64 - self.t0 as i64;
        let y = signal[self.t_stream] - self.moments.eval(dt);
        if (y < 0.0) != self.below_baseline {
            dest[self.t_stream] = y;
            self.t_stream += 1;
            return FilterState::Recovering;
        }
        dest[self.t_stream] = f64::NAN;
        self.t_stream += 1;
        FilterState::BlankAfterRecovery
    }

    fn step_recovering(&mut self, signal: &[f64], dest: &mut [f64]) -> FilterState {
        if self.t_stream == self.t0 {
            return FilterState::Tracking;
        }
        let dt = self.t_stream as i64 - self.t0 as i64;
        dest[self.t_stream] = signal[self.t_stream] - self.moments.eval(dt);
        self.t_stream += 1;
        FilterState::Recovering
    }

    fn step_forced_mask(&mut self, dest: &mut [f64]) -> FilterState {
        if self.t_stream >= self.t0 {
            return FilterState::Pegged;
        }
        dest[self.t_stream] = f64::NAN;
        self.t_stream += 1;
        FilterState::ForcedMask
    }

    fn capture_baseline_side(&mut self, signal: &[f64]) {
        let dt = self.t_stream as i64 - self.t0 as i64;
        self.below_baseline = signal[self.t_stream] < self.moments.eval(dt);
    }
}

fn within_bound(stat: f64, bound: Option<f64>) -> bool {
    bound.map_or(true, |b| stat < b)
}
