//! Common types for fader
//!
//! The fundamental audio types shared by the effect kernel and the host
//! adapters: the sample type, the borrowed block view one processing call
//! operates on, and an owned block buffer for adapters and tests.

/// Audio sample type (32-bit float throughout the processing path)
pub type Sample = f32;

/// A transient view over one block of interleaved multichannel audio
///
/// Frames are interleaved `[L, R, L, R, ...]` as delivered by the device
/// callback. The view is borrowed from the host adapter for the duration
/// of a single processing call and never retained past it.
///
/// Construction validates the shape: the slice must hold a whole number
/// of frames. A slice that does not is the block-shape contract breach
/// the processor reports, so `new` returns `None` instead of panicking.
#[derive(Debug)]
pub struct AudioBlock<'a> {
    data: &'a mut [Sample],
    channels: usize,
}

impl<'a> AudioBlock<'a> {
    /// Create a block view over interleaved samples
    ///
    /// Returns `None` if `channels` is zero or `data.len()` is not a
    /// multiple of `channels`.
    pub fn new(data: &'a mut [Sample], channels: usize) -> Option<Self> {
        if channels == 0 || data.len() % channels != 0 {
            return None;
        }
        Some(Self { data, channels })
    }

    /// Number of channels in the block
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of frames (samples per channel) in the block
    #[inline]
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels
    }

    /// All samples of the block, flat interleaved
    #[inline]
    pub fn samples(&self) -> &[Sample] {
        self.data
    }

    /// Mutable access to all samples, flat interleaved
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [Sample] {
        self.data
    }

    /// Iterate over frames, one `&mut [Sample]` of `channels()` samples each
    #[inline]
    pub fn frames_mut(&mut self) -> std::slice::ChunksExactMut<'_, Sample> {
        self.data.chunks_exact_mut(self.channels)
    }
}

/// An owned, pre-allocatable block of interleaved audio
///
/// Host adapters keep one of these sized for the largest block the stream
/// can deliver and re-borrow it as an [`AudioBlock`] each callback.
#[derive(Debug, Clone)]
pub struct BlockBuffer {
    data: Vec<Sample>,
    channels: usize,
}

impl BlockBuffer {
    /// Create a silent buffer of `frames` frames
    pub fn silence(channels: usize, frames: usize) -> Self {
        assert!(channels > 0, "BlockBuffer needs at least one channel");
        Self {
            data: vec![0.0; channels * frames],
            channels,
        }
    }

    /// Create a buffer from interleaved samples
    ///
    /// Panics if the slice is not a whole number of frames.
    pub fn from_interleaved(channels: usize, interleaved: &[Sample]) -> Self {
        assert!(channels > 0, "BlockBuffer needs at least one channel");
        assert!(
            interleaved.len() % channels == 0,
            "Interleaved length must be a multiple of the channel count"
        );
        Self {
            data: interleaved.to_vec(),
            channels,
        }
    }

    /// Number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of frames currently exposed
    #[inline]
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels
    }

    /// Set the working length in frames without allocating (real-time safe)
    ///
    /// Use for pre-allocated buffers only; newly exposed frames are
    /// silenced.
    #[inline]
    pub fn set_frames_from_capacity(&mut self, frames: usize) {
        let new_len = frames * self.channels;
        if new_len > self.data.len() {
            // Growing: fill new samples with silence (capacity already exists)
            debug_assert!(
                new_len <= self.data.capacity(),
                "set_frames_from_capacity called with frames > capacity"
            );
            self.data.resize(new_len, 0.0);
        } else {
            // Shrinking: just truncate (no dealloc)
            self.data.truncate(new_len);
        }
    }

    /// Fill the buffer with silence
    pub fn fill_silence(&mut self) {
        self.data.fill(0.0);
    }

    /// Flat interleaved view of the samples
    #[inline]
    pub fn as_slice(&self) -> &[Sample] {
        &self.data
    }

    /// Mutable flat interleaved view of the samples
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Sample] {
        &mut self.data
    }

    /// Re-borrow the buffer as a block view for one processing call
    pub fn as_block(&mut self) -> AudioBlock<'_> {
        AudioBlock {
            data: &mut self.data,
            channels: self.channels,
        }
    }

    /// Peak amplitude across all channels
    pub fn peak(&self) -> Sample {
        self.data.iter().map(|s| s.abs()).fold(0.0, Sample::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_shape_validation() {
        let mut data = [0.0f32; 8];
        assert!(AudioBlock::new(&mut data, 2).is_some());
        assert!(AudioBlock::new(&mut data, 0).is_none());

        let mut ragged = [0.0f32; 7];
        assert!(AudioBlock::new(&mut ragged, 2).is_none());
    }

    #[test]
    fn test_block_dimensions() {
        let mut data = [0.0f32; 12];
        let block = AudioBlock::new(&mut data, 2).unwrap();
        assert_eq!(block.channels(), 2);
        assert_eq!(block.frames(), 6);

        let mut mono = [0.0f32; 5];
        let block = AudioBlock::new(&mut mono, 1).unwrap();
        assert_eq!(block.frames(), 5);
    }

    #[test]
    fn test_block_frame_iteration() {
        let mut data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut block = AudioBlock::new(&mut data, 2).unwrap();
        for frame in block.frames_mut() {
            assert_eq!(frame.len(), 2);
            frame[0] = 0.0;
        }
        assert_eq!(data, [0.0, 2.0, 0.0, 4.0, 0.0, 6.0]);
    }

    #[test]
    fn test_block_buffer_working_length() {
        let mut buffer = BlockBuffer::silence(2, 8);
        assert_eq!(buffer.frames(), 8);

        buffer.set_frames_from_capacity(3);
        assert_eq!(buffer.frames(), 3);
        assert_eq!(buffer.as_slice().len(), 6);

        buffer.set_frames_from_capacity(8);
        assert_eq!(buffer.frames(), 8);
        assert!(buffer.as_slice().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_block_buffer_as_block() {
        let mut buffer = BlockBuffer::from_interleaved(2, &[0.5, -0.5, 0.25, -0.25]);
        let block = buffer.as_block();
        assert_eq!(block.channels(), 2);
        assert_eq!(block.frames(), 2);
        assert_eq!(buffer.peak(), 0.5);
    }
}
