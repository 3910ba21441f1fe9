//! Offline rendering - run the processor over a WAV file
//!
//! Reads a whole file into memory, pushes it through the processor in
//! fixed-size blocks, and writes a 32-bit float WAV with the source's
//! channel count and sample rate. Integer input is converted to float on
//! read; output is always float so processed peaks above full scale
//! survive the trip to disk.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use thiserror::Error;

use crate::processor::{FaderProcessor, Processor};
use crate::types::Sample;

/// Block size used for offline processing
pub const RENDER_BLOCK_FRAMES: usize = 512;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Unsupported channel layout: {0} channels")]
    UnsupportedLayout(u16),
}

/// Summary of one offline render
#[derive(Debug, Clone, Copy)]
pub struct RenderStats {
    pub frames: usize,
    pub channels: u16,
    pub sample_rate: u32,
    pub peak_in: Sample,
    pub peak_out: Sample,
}

/// Process `input` through the processor and write the result to `output`
pub fn render_wav_file(
    processor: &mut FaderProcessor,
    input: &Path,
    output: &Path,
) -> Result<RenderStats, RenderError> {
    let mut reader = WavReader::open(input)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if !processor.supports_layout(channels) {
        return Err(RenderError::UnsupportedLayout(spec.channels));
    }

    let mut samples = read_samples(&mut reader)?;
    let peak_in = peak(&samples);

    processor.prepare(spec.sample_rate, RENDER_BLOCK_FRAMES);
    processor.reset();
    // Chunk boundaries are whole frames: the chunk size is a multiple
    // of the channel count and hound yields complete frames.
    for chunk in samples.chunks_mut(RENDER_BLOCK_FRAMES * channels) {
        processor.process_interleaved(chunk, channels);
    }
    let peak_out = peak(&samples);

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let out_spec = WavSpec {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(output, out_spec)?;
    for &sample in &samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    let frames = samples.len() / channels;
    log::info!(
        "Rendered {} frames ({} channels at {}Hz), peak {:.3} -> {:.3}",
        frames,
        spec.channels,
        spec.sample_rate,
        peak_in,
        peak_out
    );

    Ok(RenderStats {
        frames,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        peak_in,
        peak_out,
    })
}

fn read_samples<R: std::io::Read>(reader: &mut WavReader<R>) -> Result<Vec<Sample>, RenderError> {
    let spec = reader.spec();
    match spec.sample_format {
        SampleFormat::Float => Ok(reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?),
        SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            Ok(reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?)
        }
    }
}

fn peak(samples: &[Sample]) -> Sample {
    samples.iter().map(|s| s.abs()).fold(0.0, Sample::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::GAIN_PARAM;
    use std::path::PathBuf;

    fn write_f32_wav(path: &Path, channels: u16, samples: &[f32]) {
        let spec = WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn read_f32_wav(path: &Path) -> (WavSpec, Vec<f32>) {
        let mut reader = WavReader::open(path).unwrap();
        let spec = reader.spec();
        let samples = reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        (spec, samples)
    }

    fn paths(dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
        (dir.path().join("in.wav"), dir.path().join("out.wav"))
    }

    #[test]
    fn test_render_applies_gain() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = paths(&dir);
        write_f32_wav(&input, 2, &[0.5, -0.25, 1.0, -1.0, 0.125, 0.0]);

        let mut processor = FaderProcessor::new().unwrap();
        processor.store().set(GAIN_PARAM, 0.5);
        let stats = render_wav_file(&mut processor, &input, &output).unwrap();

        assert_eq!(stats.frames, 3);
        assert_eq!(stats.channels, 2);
        assert_eq!(stats.sample_rate, 44100);
        assert_eq!(stats.peak_in, 1.0);
        assert_eq!(stats.peak_out, 0.5);

        let (spec, samples) = read_f32_wav(&output);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.sample_format, SampleFormat::Float);
        assert_eq!(samples, vec![0.25, -0.125, 0.5, -0.5, 0.0625, 0.0]);
    }

    #[test]
    fn test_render_converts_int_input() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = paths(&dir);

        let spec = WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&input, spec).unwrap();
        for v in [16384i16, -32768, 0, 8192] {
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();

        let mut processor = FaderProcessor::new().unwrap();
        let stats = render_wav_file(&mut processor, &input, &output).unwrap();
        assert_eq!(stats.frames, 4);

        let (_, samples) = read_f32_wav(&output);
        assert_eq!(samples, vec![0.5, -1.0, 0.0, 0.25]);
    }

    #[test]
    fn test_render_rejects_wide_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = paths(&dir);
        write_f32_wav(&input, 3, &[0.0; 9]);

        let mut processor = FaderProcessor::new().unwrap();
        let err = render_wav_file(&mut processor, &input, &output).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedLayout(3)));
        assert!(!output.exists());
    }

    #[test]
    fn test_render_spans_many_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = paths(&dir);
        // More frames than one block, with a ragged tail
        let frames = RENDER_BLOCK_FRAMES * 2 + 37;
        let source: Vec<f32> = (0..frames).map(|i| ((i % 7) as f32 - 3.0) / 8.0).collect();
        write_f32_wav(&input, 1, &source);

        let mut processor = FaderProcessor::new().unwrap();
        processor.store().set(GAIN_PARAM, 2.0);
        let stats = render_wav_file(&mut processor, &input, &output).unwrap();
        assert_eq!(stats.frames, frames);
        assert_eq!(processor.violation_count(), 0);

        let (_, samples) = read_f32_wav(&output);
        for (rendered, original) in samples.iter().zip(&source) {
            assert_eq!(*rendered, original * 2.0);
        }
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (input, output) = paths(&dir);
        let mut processor = FaderProcessor::new().unwrap();
        assert!(render_wav_file(&mut processor, &input, &output).is_err());
    }
}
