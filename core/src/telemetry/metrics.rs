use std::sync::Mutex;

/// Running counters over a conditioning session.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

struct Metrics {
    traces_processed: usize,
    samples_masked: usize,
    errors: usize,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub traces_processed: usize,
    pub samples_masked: usize,
    pub errors: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics {
                traces_processed: 0,
                samples_masked: 0,
                errors: 0,
            }),
        }
    }

    pub fn record_trace(&self, samples_masked: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.traces_processed += 1;
            metrics.samples_masked += samples_masked;
        }
    }

    pub fn record_error(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.errors += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            MetricsSnapshot {
                traces_processed: metrics.traces_processed,
                samples_masked: metrics.samples_masked,
                errors: metrics.errors,
            }
        } else {
            MetricsSnapshot {
                traces_processed: 0,
                samples_masked: 0,
                errors: 0,
            }
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_traces() {
        let recorder = MetricsRecorder::new();
        recorder.record_trace(12);
        recorder.record_trace(3);
        recorder.record_error();
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.traces_processed, 2);
        assert_eq!(snapshot.samples_masked, 15);
        assert_eq!(snapshot.errors, 1);
    }
}
