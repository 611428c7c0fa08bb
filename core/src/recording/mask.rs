use serde::{Deserialize, Serialize};

/// Half-open index range `[start, end)` invalidated in a conditioned trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskSpan {
    pub start: usize,
    pub end: usize,
}

impl MaskSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Collects the NaN runs of a conditioned trace as mask spans.
pub fn spans_from_output(output: &[f64]) -> Vec<MaskSpan> {
    let mut spans = Vec::new();
    let mut run_start = None;
    for (idx, value) in output.iter().enumerate() {
        match (run_start, value.is_nan()) {
            (None, true) => run_start = Some(idx),
            (Some(start), false) => {
                spans.push(MaskSpan::new(start, idx));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        spans.push(MaskSpan::new(start, output.len()));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_cover_nan_runs() {
        let output = [f64::NAN, f64::NAN, 1.0, 2.0, f64::NAN, 3.0];
        let spans = spans_from_output(&output);
        assert_eq!(spans, vec![MaskSpan::new(0, 2), MaskSpan::new(4, 5)]);
    }

    #[test]
    fn trailing_run_is_closed_at_end() {
        let output = [1.0, f64::NAN];
        assert_eq!(spans_from_output(&output), vec![MaskSpan::new(1, 2)]);
    }

    #[test]
    fn clean_output_yields_no_spans() {
        assert!(spans_from_output(&[0.0, 1.0]).is_empty());
        assert!(spans_from_output(&[]).is_empty());
    }
}
