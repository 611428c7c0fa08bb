use crate::prelude::StageError;

/// Simple scoped buffer pool that bounds simultaneous checkouts and
/// prevents unbounded allocations.
pub struct BufferPool {
    buffers: Vec<Vec<f64>>,
    max_capacity: usize,
    outstanding: usize,
}

impl BufferPool {
    pub fn with_capacity(max_capacity: usize) -> Self {
        Self {
            buffers: Vec::with_capacity(max_capacity),
            max_capacity,
            outstanding: 0,
        }
    }

    /// Allocates a buffer from the pool or creates one if there is room.
    /// Conditioned-output buffers start from the NaN sentinel, so the fill
    /// value is the caller's choice.
    pub fn checkout(&mut self, length: usize, fill: f64) -> Result<Vec<f64>, StageError> {
        if self.outstanding >= self.max_capacity {
            return Err(StageError::BufferExhaustion("pool depleted".to_string()));
        }
        self.outstanding += 1;
        if let Some(mut buffer) = self.buffers.pop() {
            buffer.clear();
            buffer.resize(length, fill);
            Ok(buffer)
        } else {
            Ok(vec![fill; length])
        }
    }

    /// Returns a buffer back to the pool for reuse.
    pub fn release(&mut self, mut buffer: Vec<f64>) {
        self.outstanding = self.outstanding.saturating_sub(1);
        buffer.clear();
        if self.buffers.len() < self.max_capacity {
            self.buffers.push(buffer);
        }
    }

    /// Hands a checked-out buffer over to the caller for good, freeing its
    /// slot without retaining the allocation.
    pub fn detach(&mut self, buffer: Vec<f64>) -> Vec<f64> {
        self.outstanding = self.outstanding.saturating_sub(1);
        buffer
    }

    pub fn reset(&mut self) {
        self.buffers.clear();
        self.outstanding = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_fills_with_requested_sentinel() {
        let mut pool = BufferPool::with_capacity(2);
        let buffer = pool.checkout(4, f64::NAN).unwrap();
        assert_eq!(buffer.len(), 4);
        assert!(buffer.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn released_buffers_are_reused_with_fresh_fill() {
        let mut pool = BufferPool::with_capacity(2);
        let buffer = pool.checkout(3, 1.0).unwrap();
        pool.release(buffer);
        let buffer = pool.checkout(5, 0.0).unwrap();
        assert_eq!(buffer, vec![0.0; 5]);
    }

    #[test]
    fn exhaustion_bounds_simultaneous_checkouts() {
        let mut pool = BufferPool::with_capacity(1);
        let held = pool.checkout(2, 0.0).unwrap();
        assert!(matches!(
            pool.checkout(2, 0.0),
            Err(StageError::BufferExhaustion(_))
        ));
        let handed_off = pool.detach(held);
        assert_eq!(handed_off.len(), 2);
        assert!(pool.checkout(2, 0.0).is_ok());
    }

    #[test]
    fn zero_capacity_pool_rejects_every_checkout() {
        let mut pool = BufferPool::with_capacity(0);
        assert!(pool.checkout(1, 0.0).is_err());
    }
}
