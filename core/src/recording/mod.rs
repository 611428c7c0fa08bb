pub mod mask;
pub mod trace;

pub use mask::{spans_from_output, MaskSpan};
pub use trace::{SessionMetadata, TraceAncillary, TraceKind, TracePayload};
