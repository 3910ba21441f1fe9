//! Peak level sharing between the audio callback and the control surface

use std::sync::atomic::{AtomicU32, Ordering};

/// Per-channel peak of the last rendered block, stored as f32 bits
///
/// The callback stores after each block; readers poll at their own pace.
/// Mono streams report the same value on both sides.
#[derive(Debug, Default)]
pub struct PeakMeter {
    left: AtomicU32,
    right: AtomicU32,
}

impl PeakMeter {
    #[inline]
    pub fn store(&self, left: f32, right: f32) {
        self.left.store(left.to_bits(), Ordering::Relaxed);
        self.right.store(right.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self) -> (f32, f32) {
        (
            f32::from_bits(self.left.load(Ordering::Relaxed)),
            f32::from_bits(self.right.load(Ordering::Relaxed)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_silent() {
        let meter = PeakMeter::default();
        assert_eq!(meter.load(), (0.0, 0.0));
    }

    #[test]
    fn test_store_load() {
        let meter = PeakMeter::default();
        meter.store(0.5, 0.25);
        assert_eq!(meter.load(), (0.5, 0.25));
    }
}
