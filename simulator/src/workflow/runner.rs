use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use salpacore::prelude::{ConditioningStage, StageInput};
use salpacore::processing::DesaturationStage;
use salpacore::recording::{MaskSpan, TracePayload};
use serde::Serialize;

/// Summary of one offline conditioning run, serialized into the report.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub sample_count: usize,
    pub masked_count: usize,
    pub mask_spans: Vec<MaskSpan>,
    pub residual_rms: f64,
    pub notes: Vec<String>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self, payload: &TracePayload) -> anyhow::Result<WorkflowResult> {
        let stage_config = self.config.to_stage_config();

        let mut stage = DesaturationStage::new(1);
        stage
            .initialize(&stage_config)
            .context("initializing desaturation stage")?;
        let output = stage
            .execute(StageInput {
                samples: payload.samples.clone(),
                timestamp: Some(payload.ancillary.timestamp),
            })
            .context("executing desaturation stage")?;
        stage.cleanup();

        Ok(WorkflowResult {
            sample_count: output.samples.len(),
            masked_count: output.metadata.masked_count.unwrap_or(0),
            mask_spans: output.metadata.mask_spans,
            residual_rms: output.metadata.residual_rms.unwrap_or(0.0),
            notes: output.metadata.notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::build_trace_payload;

    #[test]
    fn runner_executes_workflow_on_a_synthetic_trace() {
        let cfg = WorkflowConfig::from_args(4_000, 11, 10.0, Some(1.0));
        let runner = Runner::new(cfg.clone());
        let payload = build_trace_payload(&cfg.generator).unwrap();
        let result = runner.execute(&payload).unwrap();

        assert_eq!(result.sample_count, 4_000);
        // At least one full artifact run must be masked (runs may overlap).
        assert!(
            result.masked_count >= cfg.generator.artifact_width,
            "masked only {} samples",
            result.masked_count
        );
        assert!(!result.mask_spans.is_empty());
    }

    #[test]
    fn runner_applies_forced_spans() {
        let mut cfg = WorkflowConfig::from_args(2_000, 5, 10.0, None);
        cfg.generator.artifact_count = 0;
        cfg.forced_spans = vec![MaskSpan::new(500, 560)];
        let runner = Runner::new(cfg.clone());
        let payload = build_trace_payload(&cfg.generator).unwrap();
        let result = runner.execute(&payload).unwrap();
        assert!(result
            .mask_spans
            .iter()
            .any(|span| span.start <= 500 && span.end >= 560));
    }
}
