use crate::math::stats::StatsHelper;
use crate::prelude::{
    ConditioningStage, StageConfig, StageError, StageInput, StageMetadata, StageOutput,
    StageResult,
};
use crate::processing::buffer_pool::BufferPool;
use crate::processing::desaturate::Desaturator;
use crate::recording::spans_from_output;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::{MetricsRecorder, MetricsSnapshot};

/// Conditioning stage that wraps the desaturation filter for pipeline use.
///
/// Forced spans from the stage configuration are applied in stream order
/// before ordinary processing resumes, matching how stimulus windows are
/// blanked in acquisition pipelines.
pub struct DesaturationStage {
    pool: BufferPool,
    config: Option<StageConfig>,
    filter: Option<Desaturator>,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl DesaturationStage {
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool: BufferPool::with_capacity(pool_size),
            config: None,
            filter: None,
            logger: LogManager::for_stage("desaturation"),
            metrics: MetricsRecorder::new(),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl ConditioningStage for DesaturationStage {
    fn initialize(&mut self, config: &StageConfig) -> StageResult<()> {
        self.filter = Some(Desaturator::new(&config.desaturation)?);
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, input: StageInput) -> StageResult<StageOutput> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| StageError::Internal("stage not initialized".into()))?;
        let filter = self
            .filter
            .as_mut()
            .ok_or_else(|| StageError::Internal("stage not initialized".into()))?;

        if input.samples.is_empty() {
            return Err(StageError::InvalidInput("no samples to condition".into()));
        }

        let len = input.samples.len();
        let mut buffer = self.pool.checkout(len, f64::NAN)?;

        let mut forced = config.forced_spans.clone();
        forced.sort_by_key(|span| span.start);

        filter.reset(0);
        for span in &forced {
            if span.is_empty() {
                continue;
            }
            filter.force_mask(&input.samples, &mut buffer, span.start, span.end);
        }
        filter.process(&input.samples, &mut buffer, len);

        let mask_spans = spans_from_output(&buffer);
        let masked_count: usize = mask_spans.iter().map(|span| span.len()).sum();
        let residual_rms = StatsHelper::rms_finite(&buffer);

        self.metrics.record_trace(masked_count);
        self.logger.record(&format!(
            "masked {} of {} samples across {} spans",
            masked_count,
            len,
            mask_spans.len()
        ));

        let metadata = StageMetadata {
            masked_count: Some(masked_count),
            mask_spans,
            residual_rms: Some(residual_rms),
            notes: vec![
                format!("residual RMS {:.4}", residual_rms),
                format!("last peg boundary {}", filter.last_peg()),
            ],
        };

        Ok(StageOutput {
            samples: self.pool.detach(buffer),
            metadata,
        })
    }

    fn cleanup(&mut self) {
        self.pool.reset();
        self.config = None;
        self.filter = None;
    }
}
