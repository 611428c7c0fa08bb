use anyhow::Context;
use salpacore::prelude::{DesaturationConfig, Rails, StageConfig};
use salpacore::recording::MaskSpan;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::generator::profile::GeneratorConfig;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub generator: GeneratorConfig,
    pub desaturation: DesaturationConfig,
    pub forced_spans: Vec<MaskSpan>,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(length: usize, seed: u64, rail: f64, threshold: Option<f64>) -> Self {
        Self {
            generator: GeneratorConfig {
                length,
                seed,
                rail_lo: -rail,
                rail_hi: rail,
                ..Default::default()
            },
            desaturation: DesaturationConfig {
                rails: Rails::between(-rail, rail),
                y_threshold: threshold,
                ..Default::default()
            },
            forced_spans: Vec::new(),
        }
    }

    pub fn to_stage_config(&self) -> StageConfig {
        StageConfig {
            desaturation: self.desaturation.clone(),
            forced_spans: self.forced_spans.clone(),
        }
    }
}
