//! Gain kernel - scales every sample by the current gain value

use crate::effect::{Effect, ScopedFlushToZero};
use crate::param::ParamHandle;
use crate::types::AudioBlock;

/// Multiplies each sample of a block by the gain parameter
///
/// The gain value is read once per block through its wait-free handle
/// and applied uniformly, with no smoothing across or within blocks. A
/// mid-block change committed by the control surface takes effect at the
/// next block boundary.
#[derive(Debug, Clone)]
pub struct GainEffect {
    gain: ParamHandle,
}

impl GainEffect {
    /// Build the kernel around a handle to the gain parameter
    pub fn new(gain: ParamHandle) -> Self {
        Self { gain }
    }

    /// The gain value the next block will be scaled by
    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain.get()
    }
}

impl Effect for GainEffect {
    fn name(&self) -> &'static str {
        "Gain"
    }

    fn prepare(&mut self, _sample_rate: u32, _max_block_frames: usize) {
        // Stateless kernel; nothing depends on stream facts
    }

    fn process(&mut self, block: &mut AudioBlock<'_>) {
        let _ftz = ScopedFlushToZero::engage();
        let gain = self.gain.get();
        for sample in block.samples_mut() {
            *sample *= gain;
        }
    }

    fn reset(&mut self) {}
}
