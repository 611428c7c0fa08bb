use serde::{Deserialize, Serialize};

/// Saturation rails. A sample is pegged when it sits at or beyond either
/// bound; an absent bound disables detection on that side.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Rails {
    pub lo: Option<f64>,
    pub hi: Option<f64>,
}

impl Rails {
    pub fn between(lo: f64, hi: f64) -> Self {
        Self {
            lo: Some(lo),
            hi: Some(hi),
        }
    }

    pub fn is_pegged(&self, v: f64) -> bool {
        self.lo.map_or(false, |r| v <= r) || self.hi.map_or(false, |r| v >= r)
    }
}

/// Goodness-of-fit statistic evaluated over forthcoming samples while the
/// machine decides whether a fit is trustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStatistic {
    /// Squared signed residual sum, compared against `3.92 * t_chi2 * y^2`.
    Asymmetry,
    /// Residual sum of squares, compared against `(t_chi2 - 4) * y^2`.
    SumOfSquares,
}

/// Order of the local polynomial baseline fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitOrder {
    Cubic,
    Linear,
}

/// Configuration for the desaturation filter, fixed for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DesaturationConfig {
    /// Fit-window half width; the window spans `2 * tau + 1` samples.
    pub tau: usize,
    /// Lookahead beyond the window edge while tracking.
    pub t_ahead: usize,
    /// Blank duration after a fit is re-accepted.
    pub t_blankdepeg: usize,
    /// Length of the goodness-of-fit evaluation window.
    pub t_chi2: usize,
    /// Residual amplitude threshold; absent disables the fit test.
    pub y_threshold: Option<f64>,
    pub rails: Rails,
    pub statistic: FitStatistic,
    pub fit_order: FitOrder,
}

impl Default for DesaturationConfig {
    fn default() -> Self {
        Self {
            tau: 30,
            t_ahead: 5,
            t_blankdepeg: 5,
            t_chi2: 15,
            y_threshold: None,
            rails: Rails::default(),
            statistic: FitStatistic::Asymmetry,
            fit_order: FitOrder::Cubic,
        }
    }
}

/// Shared configuration for a conditioning stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub desaturation: DesaturationConfig,
    /// Caller-known artifact windows masked regardless of rail detection.
    pub forced_spans: Vec<crate::recording::MaskSpan>,
}

/// Input payload for a conditioning stage.
#[derive(Debug, Clone)]
pub struct StageInput {
    pub samples: Vec<f64>,
    pub timestamp: Option<f64>,
}

/// Output produced by each stage.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub samples: Vec<f64>,
    pub metadata: StageMetadata,
}

/// Metadata used for chaining stages and telemetry.
#[derive(Debug, Clone, Default)]
pub struct StageMetadata {
    pub masked_count: Option<usize>,
    pub mask_spans: Vec<crate::recording::MaskSpan>,
    pub residual_rms: Option<f64>,
    pub notes: Vec<String>,
}

/// Common error type for stage execution.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("degenerate fit window for tau = {0}")]
    DegenerateWindow(usize),
    #[error("buffer exhaustion: {0}")]
    BufferExhaustion(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type StageResult<T> = Result<T, StageError>;

/// Trait describing object-oriented signal-conditioning stages.
pub trait ConditioningStage {
    fn initialize(&mut self, config: &StageConfig) -> StageResult<()>;
    fn execute(&mut self, input: StageInput) -> StageResult<StageOutput>;
    fn cleanup(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rails_never_peg() {
        let rails = Rails::default();
        assert!(!rails.is_pegged(f64::MAX));
        assert!(!rails.is_pegged(f64::MIN));
    }

    #[test]
    fn rails_peg_at_and_beyond_bounds() {
        let rails = Rails::between(-10.0, 10.0);
        assert!(rails.is_pegged(10.0));
        assert!(rails.is_pegged(12.5));
        assert!(rails.is_pegged(-10.0));
        assert!(!rails.is_pegged(9.999));
    }

    #[test]
    fn one_sided_rail_pegs_one_side_only() {
        let rails = Rails {
            lo: None,
            hi: Some(5.0),
        };
        assert!(rails.is_pegged(5.0));
        assert!(!rails.is_pegged(-1.0e12));
    }
}
