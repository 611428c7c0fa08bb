use anyhow::Context;
use clap::Parser;
use generator::profile::build_trace_payload;
use std::fs;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline driver for the Rust SALPA conditioning core")]
struct Args {
    /// Run one synthetic trace through the conditioning workflow
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 20_000)]
    length: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Symmetric saturation rail magnitude
    #[arg(long, default_value_t = 10.0)]
    rail: f64,
    /// Residual amplitude threshold for the goodness-of-fit test
    #[arg(long)]
    threshold: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.length, args.seed, args.rail, args.threshold)
    };

    let runner = Runner::new(config.clone());
    let payload = build_trace_payload(&config.generator)?;

    if args.offline {
        let result = runner.execute(&payload)?;

        println!(
            "Offline run -> masked {} of {} samples across {} spans, residual RMS {:.4}",
            result.masked_count,
            result.sample_count,
            result.mask_spans.len(),
            result.residual_rms
        );

        let report =
            serde_json::to_string_pretty(&result).context("serializing workflow summary")?;
        let report_path = PathBuf::from("tools/data/offline_conditioning.json");
        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&report_path, report)
            .with_context(|| format!("writing {}", report_path.display()))?;
        log::info!(
            "offline conditioning masked {} of {} samples, report at {}",
            result.masked_count,
            result.sample_count,
            report_path.display()
        );
    }

    Ok(())
}
