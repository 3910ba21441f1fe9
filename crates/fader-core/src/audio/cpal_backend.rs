//! Live audio output
//!
//! Opens a cpal output stream and drives the processor from its
//! callback. The callback owns everything it touches: the processor, a
//! pre-allocated scratch block, the signal generator, and the consumer
//! end of a lock-free command queue. Control threads talk to it only
//! through that queue and through the shared parameter atomics, so the
//! audio thread never blocks on a lock.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig, SupportedStreamConfig};
use rtrb::{Consumer, Producer, RingBuffer};

use super::config::{AudioConfig, BufferSize, DEFAULT_SAMPLE_RATE, MAX_BLOCK_FRAMES};
use super::device;
use super::error::{AudioError, AudioResult};
use super::meter::PeakMeter;
use super::source::{SignalSource, SourceKind};
use crate::processor::{FaderProcessor, Processor};
use crate::types::BlockBuffer;

/// Capacity of the control-to-audio command queue
const COMMAND_QUEUE_SIZE: usize = 64;

/// Commands the audio callback picks up between blocks
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostCommand {
    SetSource(SourceKind),
}

/// Producer half of the command queue
///
/// Returns the rejected command when the queue is full; the caller
/// decides whether to drop or retry.
pub struct CommandSender {
    producer: Producer<HostCommand>,
}

impl CommandSender {
    pub fn send(&mut self, command: HostCommand) -> Result<(), HostCommand> {
        match self.producer.push(command) {
            Ok(()) => Ok(()),
            Err(rtrb::PushError::Full(command)) => Err(command),
        }
    }
}

/// A running output stream plus the handles to talk to it
///
/// Dropping this stops audio.
pub struct LiveOutput {
    _stream: Stream,
    pub command_sender: CommandSender,
    pub peaks: Arc<PeakMeter>,
    /// Processor contract-violation counter, readable off-thread
    pub violations: Arc<AtomicU64>,
    pub sample_rate: u32,
    pub buffer_frames: u32,
    pub channels: u16,
    pub latency_ms: f32,
    pub device_name: String,
}

/// Everything the output callback owns
struct AudioCallbackState {
    processor: FaderProcessor,
    command_rx: Consumer<HostCommand>,
    source: SignalSource,
    scratch: BlockBuffer,
    /// Channels the processor runs at; device channels beyond this are
    /// written as silence
    proc_channels: usize,
    peaks: Arc<PeakMeter>,
}

impl AudioCallbackState {
    /// Generate and process `n_frames` frames into the scratch buffer
    ///
    /// `n_frames` must not exceed the scratch capacity the state was
    /// built with.
    fn render(&mut self, n_frames: usize) {
        debug_assert!(n_frames <= MAX_BLOCK_FRAMES);
        self.drain_commands();
        self.scratch.set_frames_from_capacity(n_frames);
        self.source.fill(self.scratch.as_mut_slice(), self.proc_channels);
        self.processor
            .process_interleaved(self.scratch.as_mut_slice(), self.proc_channels);
        self.update_peaks();
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.command_rx.pop() {
            match command {
                HostCommand::SetSource(kind) => self.source.set_kind(kind),
            }
        }
    }

    fn update_peaks(&self) {
        let channels = self.proc_channels;
        let mut left = 0.0f32;
        let mut right = 0.0f32;
        for frame in self.scratch.as_slice().chunks_exact(channels) {
            left = left.max(frame[0].abs());
            right = right.max(frame[channels - 1].abs());
        }
        self.peaks.store(left, right);
    }
}

/// Open the configured (or default) output device and start processing
pub fn start_live_output(
    mut processor: FaderProcessor,
    config: &AudioConfig,
) -> AudioResult<LiveOutput> {
    let cpal_device = match &config.device {
        Some(id) => device::find_device_by_id(id)?,
        None => device::get_cpal_default_device()?,
    };
    let device_name = cpal_device
        .name()
        .unwrap_or_else(|_| "Unknown device".to_string());
    log::info!("Opening output device: {}", device_name);

    let (supported, buffer_frames) = get_output_config(&cpal_device, config)?;
    let sample_rate = supported.sample_rate().0;
    let dev_channels = supported.channels();
    let proc_channels = (dev_channels as usize).clamp(1, 2);

    let stream_config = StreamConfig {
        channels: dev_channels,
        sample_rate: SampleRate(sample_rate),
        buffer_size: match config.buffer_size {
            BufferSize::Default => cpal::BufferSize::Default,
            BufferSize::Fixed(_) => cpal::BufferSize::Fixed(buffer_frames),
        },
    };

    // Prepare for the largest slice the callback will ever hand over,
    // not the requested buffer size; drivers round buffers up.
    processor.prepare(sample_rate, MAX_BLOCK_FRAMES);
    processor.reset();

    let peaks = Arc::new(PeakMeter::default());
    let violations = processor.violation_counter();
    let (command_tx, command_rx) = RingBuffer::new(COMMAND_QUEUE_SIZE);

    let state = AudioCallbackState {
        processor,
        command_rx,
        source: SignalSource::new(SourceKind::default(), sample_rate),
        scratch: BlockBuffer::silence(proc_channels, MAX_BLOCK_FRAMES),
        proc_channels,
        peaks: Arc::clone(&peaks),
    };

    let stream = build_output_stream(&cpal_device, &stream_config, state)?;
    stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

    let latency_ms = buffer_frames as f32 * 1000.0 / sample_rate as f32;
    log::info!(
        "Audio config: {} channels, {}Hz, {} frames (~{:.1}ms latency)",
        dev_channels,
        sample_rate,
        buffer_frames,
        latency_ms
    );

    Ok(LiveOutput {
        _stream: stream,
        command_sender: CommandSender {
            producer: command_tx,
        },
        peaks,
        violations,
        sample_rate,
        buffer_frames,
        channels: dev_channels,
        latency_ms,
        device_name,
    })
}

/// Pick a supported f32 output config and the buffer size to request
fn get_output_config(
    device: &Device,
    config: &AudioConfig,
) -> AudioResult<(SupportedStreamConfig, u32)> {
    let supported: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();

    let target_rate = config.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);

    let rate_match = |range: &cpal::SupportedStreamConfigRange| {
        range.min_sample_rate().0 <= target_rate && range.max_sample_rate().0 >= target_rate
    };

    // Prefer stereo f32 at the target rate, then mono, then any f32
    let range = supported
        .iter()
        .filter(|r| r.sample_format() == SampleFormat::F32)
        .find(|r| r.channels() >= 2 && rate_match(r))
        .or_else(|| {
            supported
                .iter()
                .filter(|r| r.sample_format() == SampleFormat::F32)
                .find(|r| rate_match(r))
        })
        .or_else(|| {
            supported
                .iter()
                .find(|r| r.sample_format() == SampleFormat::F32)
        })
        .ok_or_else(|| {
            AudioError::UnsupportedFormat("device offers no f32 output".to_string())
        })?;

    let min_rate = range.min_sample_rate().0;
    let max_rate = range.max_sample_rate().0;
    let rate = if (min_rate..=max_rate).contains(&target_rate) {
        target_rate
    } else {
        log::warn!(
            "Sample rate {}Hz unavailable (device supports {}-{}Hz), using {}Hz",
            target_rate,
            min_rate,
            max_rate,
            max_rate
        );
        max_rate
    };
    let stream_config = range.clone().with_sample_rate(SampleRate(rate));

    let buffer_frames = match config.buffer_size {
        BufferSize::Default => config.buffer_size.as_frames(),
        BufferSize::Fixed(frames) => {
            let clamped = frames.clamp(64, MAX_BLOCK_FRAMES as u32);
            if clamped != frames {
                log::warn!("Buffer size {} out of range, using {}", frames, clamped);
            }
            clamped
        }
    };
    log::debug!(
        "Selected output config: {} channels, {}Hz, {} frame buffers",
        stream_config.channels(),
        rate,
        buffer_frames
    );

    Ok((stream_config, buffer_frames))
}

fn build_output_stream(
    device: &Device,
    stream_config: &StreamConfig,
    mut state: AudioCallbackState,
) -> AudioResult<Stream> {
    let dev_channels = stream_config.channels as usize;

    device
        .build_output_stream(
            stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let total_frames = data.len() / dev_channels;
                let mut offset = 0;
                while offset < total_frames {
                    let n_frames = (total_frames - offset).min(MAX_BLOCK_FRAMES);
                    state.render(n_frames);

                    let rendered = state.scratch.as_slice();
                    let start = offset * dev_channels;
                    let out = &mut data[start..start + n_frames * dev_channels];
                    for (frame, src) in out
                        .chunks_mut(dev_channels)
                        .zip(rendered.chunks(state.proc_channels))
                    {
                        for (ch, sample) in frame.iter_mut().enumerate() {
                            *sample = if ch < state.proc_channels { src[ch] } else { 0.0 };
                        }
                    }
                    offset += n_frames;
                }
                // Anything past the last whole frame stays silent
                for sample in &mut data[total_frames * dev_channels..] {
                    *sample = 0.0;
                }
            },
            |e| log::error!("Audio stream error: {}", e),
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::GAIN_PARAM;

    fn callback_state(proc_channels: usize) -> (AudioCallbackState, CommandSender) {
        let mut processor = FaderProcessor::new().unwrap();
        processor.prepare(48_000, MAX_BLOCK_FRAMES);
        let (command_tx, command_rx) = RingBuffer::new(COMMAND_QUEUE_SIZE);
        let state = AudioCallbackState {
            processor,
            command_rx,
            source: SignalSource::new(SourceKind::Tone { freq: 440.0 }, 48_000),
            scratch: BlockBuffer::silence(proc_channels, MAX_BLOCK_FRAMES),
            proc_channels,
            peaks: Arc::new(PeakMeter::default()),
        };
        (
            state,
            CommandSender {
                producer: command_tx,
            },
        )
    }

    #[test]
    fn test_render_applies_gain() {
        let (mut state, _sender) = callback_state(2);
        state.processor.store().set(GAIN_PARAM, 0.0);
        state.render(128);
        assert_eq!(state.scratch.frames(), 128);
        assert!(state.scratch.as_slice().iter().all(|&s| s == 0.0));
        assert_eq!(state.peaks.load(), (0.0, 0.0));
    }

    #[test]
    fn test_render_updates_peaks() {
        use crate::audio::source::SOURCE_LEVEL;

        let (mut state, _sender) = callback_state(2);
        state.render(512);
        let (left, right) = state.peaks.load();
        assert!(left > 0.0 && left <= SOURCE_LEVEL + 1e-6);
        assert_eq!(left, right);
    }

    #[test]
    fn test_source_switch_applies_next_render() {
        let (mut state, mut sender) = callback_state(1);
        sender
            .send(HostCommand::SetSource(SourceKind::Silence))
            .unwrap();
        state.render(64);
        assert_eq!(state.source.kind(), SourceKind::Silence);
        assert!(state.scratch.as_slice().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_command_queue_reports_full() {
        let (_state, mut sender) = callback_state(1);
        let command = HostCommand::SetSource(SourceKind::Noise);
        for _ in 0..COMMAND_QUEUE_SIZE {
            sender.send(command).unwrap();
        }
        assert_eq!(sender.send(command), Err(command));
    }
}
