//! Effect kernels - per-block transforms on interleaved audio
//!
//! An [`Effect`] owns everything it needs before the stream starts and
//! touches no locks or allocator inside `process`. Kernels read their
//! control values through wait-free parameter handles.

mod denormals;
mod gain;

pub use denormals::ScopedFlushToZero;
pub use gain::GainEffect;

use crate::types::AudioBlock;

/// A real-time safe audio transform
///
/// `process` runs on the audio thread. Implementations must not
/// allocate, block, or panic there; anything that needs setup happens in
/// `prepare` before the stream starts.
pub trait Effect: Send {
    /// Short display name
    fn name(&self) -> &'static str;

    /// Called once before processing starts and again whenever the
    /// stream shape changes
    fn prepare(&mut self, sample_rate: u32, max_block_frames: usize);

    /// Transform one block in place
    fn process(&mut self, block: &mut AudioBlock<'_>);

    /// Clear any carried state without touching parameter values
    fn reset(&mut self);
}
