//! Signal-conditioning core for the Rust SALPA platform.
//!
//! The central piece is a streaming desaturation filter that removes
//! saturation ("pegging") artifacts from a sampled trace and detrends the
//! surrounding baseline with locally fitted low-order polynomials. The
//! modules wrap it with stage, telemetry, and recording abstractions so it
//! slots into a larger acquisition pipeline.

pub mod math;
pub mod prelude;
pub mod processing;
pub mod recording;
pub mod telemetry;

pub use prelude::{ConditioningStage, DesaturationConfig, StageInput, StageOutput};
pub use processing::{Desaturator, DesaturationStage};
