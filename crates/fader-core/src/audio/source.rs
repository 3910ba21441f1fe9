//! Test signal generation for the live output path
//!
//! The live host has no audio input; it feeds the effect from a built-in
//! generator so the gain parameter is audible immediately. Generation
//! runs inside the audio callback and is allocation-free.

use crate::types::Sample;

/// Generator amplitude, leaving headroom for the full gain range
pub const SOURCE_LEVEL: f32 = 0.2;

/// What the generator produces
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceKind {
    Silence,
    /// Sine wave at the given frequency in Hz
    Tone { freq: f32 },
    /// White noise
    Noise,
}

impl Default for SourceKind {
    fn default() -> Self {
        SourceKind::Tone { freq: 440.0 }
    }
}

/// Block-based signal generator
///
/// Writes the same value to every channel of a frame so stereo output
/// stays centered.
#[derive(Debug)]
pub struct SignalSource {
    kind: SourceKind,
    sample_rate: u32,
    /// Tone phase in cycles, kept in [0, 1)
    phase: f32,
    /// xorshift32 state for the noise source
    rng: u32,
}

impl SignalSource {
    pub fn new(kind: SourceKind, sample_rate: u32) -> Self {
        Self {
            kind,
            sample_rate: sample_rate.max(1),
            phase: 0.0,
            rng: 0x9e37_79b9,
        }
    }

    /// Switch what is generated, restarting the tone phase
    pub fn set_kind(&mut self, kind: SourceKind) {
        self.kind = kind;
        self.phase = 0.0;
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Fill an interleaved buffer with the current signal
    pub fn fill(&mut self, data: &mut [Sample], channels: usize) {
        match self.kind {
            SourceKind::Silence => data.fill(0.0),
            SourceKind::Tone { freq } => {
                let step = freq / self.sample_rate as f32;
                for frame in data.chunks_mut(channels) {
                    let value = (self.phase * std::f32::consts::TAU).sin() * SOURCE_LEVEL;
                    frame.fill(value);
                    self.phase += step;
                    if self.phase >= 1.0 {
                        self.phase -= 1.0;
                    }
                }
            }
            SourceKind::Noise => {
                for frame in data.chunks_mut(channels) {
                    frame.fill(self.next_noise());
                }
            }
        }
    }

    fn next_noise(&mut self) -> Sample {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        // Map the full u32 range onto [-SOURCE_LEVEL, SOURCE_LEVEL]
        (x as f32 / u32::MAX as f32 * 2.0 - 1.0) * SOURCE_LEVEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_zeros() {
        let mut source = SignalSource::new(SourceKind::Silence, 48000);
        let mut data = vec![1.0f32; 64];
        source.fill(&mut data, 2);
        assert!(data.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_tone_is_bounded_and_audible() {
        let mut source = SignalSource::new(SourceKind::Tone { freq: 440.0 }, 48000);
        let mut data = vec![0.0f32; 4800];
        source.fill(&mut data, 2);
        assert!(data.iter().all(|&s| s.abs() <= SOURCE_LEVEL + 1e-6));
        assert!(data.iter().any(|&s| s.abs() > SOURCE_LEVEL * 0.5));
    }

    #[test]
    fn test_noise_is_bounded_and_varies() {
        let mut source = SignalSource::new(SourceKind::Noise, 48000);
        let mut data = vec![0.0f32; 256];
        source.fill(&mut data, 1);
        assert!(data.iter().all(|&s| s.abs() <= SOURCE_LEVEL + 1e-6));
        let first = data[0];
        assert!(data.iter().any(|&s| s != first));
    }

    #[test]
    fn test_frames_match_across_channels() {
        let mut source = SignalSource::new(SourceKind::Noise, 48000);
        let mut data = vec![0.0f32; 32];
        source.fill(&mut data, 2);
        for frame in data.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }
}
