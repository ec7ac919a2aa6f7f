use parking_lot::Mutex;
use ringbuf::{traits::*, HeapRb};
use std::sync::Arc;

/// Thread-safe ring buffer between the capture callback and the
/// recognition worker. The callback pushes at device pace; the worker
/// pops fixed-size chunks at its own pace. When full, the oldest
/// samples are dropped so capture never blocks the audio thread.
pub struct CaptureBuffer {
    inner: Arc<Mutex<HeapRb<f32>>>,
}

impl CaptureBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HeapRb::new(capacity))),
        }
    }

    /// Push samples, evicting the oldest on overflow.
    pub fn push(&self, samples: &[f32]) {
        let mut rb = self.inner.lock();
        for &sample in samples {
            if rb.try_push(sample).is_err() {
                let _ = rb.try_pop();
                let _ = rb.try_push(sample);
            }
        }
    }

    /// Pop exactly `count` samples, or None if fewer are buffered.
    pub fn pop_chunk(&self, count: usize) -> Option<Vec<f32>> {
        let mut rb = self.inner.lock();
        if rb.occupied_len() < count {
            return None;
        }
        let mut chunk = Vec::with_capacity(count);
        for _ in 0..count {
            match rb.try_pop() {
                Some(sample) => chunk.push(sample),
                None => break,
            }
        }
        Some(chunk)
    }

    /// Number of samples available to pop.
    pub fn len(&self) -> usize {
        self.inner.lock().occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity().get()
    }
}

impl Clone for CaptureBuffer {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_chunk() {
        let buffer = CaptureBuffer::new(1024);
        let data: Vec<f32> = (0..100).map(|i| i as f32).collect();

        buffer.push(&data);
        assert_eq!(buffer.len(), 100);

        let chunk = buffer.pop_chunk(100).unwrap();
        assert_eq!(chunk, data);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_chunk_not_returned() {
        let buffer = CaptureBuffer::new(1024);
        buffer.push(&[0.1, 0.2, 0.3]);

        assert!(buffer.pop_chunk(4).is_none());
        // The buffered samples stay available
        assert_eq!(buffer.len(), 3);
        assert!(buffer.pop_chunk(3).is_some());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let buffer = CaptureBuffer::new(10);
        let data: Vec<f32> = (0..20).map(|i| i as f32).collect();

        buffer.push(&data);
        assert_eq!(buffer.len(), 10);

        let chunk = buffer.pop_chunk(10).unwrap();
        // Oldest half was evicted
        assert_eq!(chunk[0], 10.0);
        assert_eq!(chunk[9], 19.0);
    }

    #[test]
    fn test_shared_across_clones() {
        let buffer = CaptureBuffer::new(64);
        let writer = buffer.clone();

        writer.push(&[1.0, 2.0]);
        assert_eq!(buffer.len(), 2);

        buffer.clear();
        assert!(writer.is_empty());
    }
}
