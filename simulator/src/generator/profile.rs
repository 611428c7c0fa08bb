use anyhow::ensure;
use rand::{rngs::StdRng, Rng, SeedableRng};
use salpacore::recording::{SessionMetadata, TraceAncillary, TraceKind, TracePayload};
use serde::{Deserialize, Serialize};

use crate::generator::template::drift_wave;

/// Configuration for generating synthetic raw traces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub length: usize,
    pub sample_rate_hz: f64,
    pub drift_cycles: f64,
    pub drift_amplitude: f64,
    pub noise: f64,
    pub seed: u64,
    /// Number of rail-clipped artifact runs injected into the trace.
    pub artifact_count: usize,
    pub artifact_width: usize,
    pub rail_lo: f64,
    pub rail_hi: f64,
    pub kind: TraceKind,
    pub description: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            length: 20_000,
            sample_rate_hz: 10_000.0,
            drift_cycles: 3.0,
            drift_amplitude: 2.0,
            noise: 0.05,
            seed: 0,
            artifact_count: 4,
            artifact_width: 40,
            rail_lo: -10.0,
            rail_hi: 10.0,
            kind: TraceKind::Synthetic,
            description: None,
        }
    }
}

fn build_sample_vector(config: &GeneratorConfig) -> anyhow::Result<Vec<f64>> {
    ensure!(
        config.rail_lo < config.rail_hi,
        "rail interval [{}, {}] is empty",
        config.rail_lo,
        config.rail_hi
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut samples = Vec::with_capacity(config.length);

    for index in 0..config.length {
        let baseline = config.drift_amplitude * drift_wave(index, config.length, config.drift_cycles);
        let jitter = if config.noise > 0.0 {
            rng.gen_range(-config.noise..config.noise)
        } else {
            0.0
        };
        samples.push(baseline + jitter);
    }

    if config.artifact_width > 0 && config.length > config.artifact_width {
        for run in 0..config.artifact_count {
            let start = rng.gen_range(0..config.length - config.artifact_width);
            let rail = if run % 2 == 0 {
                config.rail_hi
            } else {
                config.rail_lo
            };
            for sample in &mut samples[start..start + config.artifact_width] {
                *sample = rail;
            }
        }
    }

    Ok(samples)
}

pub fn build_trace_payload(config: &GeneratorConfig) -> anyhow::Result<TracePayload> {
    let samples = build_sample_vector(config)?;
    let metadata = config.description.as_ref().map(|description| SessionMetadata {
        name: "synthetic".into(),
        preparation: "generator".into(),
        stimulus: None,
        description: Some(description.clone()),
        timestamp_start: None,
    });
    let ancillary = TraceAncillary {
        timestamp: 0.0,
        kind: config.kind,
        channel: 0,
        sample_rate_hz: config.sample_rate_hz,
        metadata,
    };

    Ok(TracePayload::new(samples, ancillary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_builds_expected_sample_count() {
        let payload = build_trace_payload(&GeneratorConfig::default()).unwrap();
        assert_eq!(payload.samples.len(), 20_000);
        assert_eq!(payload.ancillary.kind, TraceKind::Synthetic);
    }

    #[test]
    fn generator_is_deterministic_for_a_seed() {
        let config = GeneratorConfig {
            length: 2_000,
            seed: 13,
            ..Default::default()
        };
        let a = build_trace_payload(&config).unwrap();
        let b = build_trace_payload(&config).unwrap();
        assert_eq!(a.samples, b.samples);
    }

    #[test]
    fn artifact_runs_sit_on_the_rails() {
        let config = GeneratorConfig {
            length: 5_000,
            artifact_count: 3,
            artifact_width: 25,
            ..Default::default()
        };
        let payload = build_trace_payload(&config).unwrap();
        let pegged = payload
            .samples
            .iter()
            .filter(|&&v| v <= config.rail_lo || v >= config.rail_hi)
            .count();
        assert!(pegged >= config.artifact_width, "pegged = {}", pegged);
    }

    #[test]
    fn inverted_rails_are_rejected() {
        let config = GeneratorConfig {
            rail_lo: 10.0,
            rail_hi: -10.0,
            ..Default::default()
        };
        assert!(build_trace_payload(&config).is_err());
    }
}
