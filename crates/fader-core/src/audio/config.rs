//! Audio output configuration types

use serde::{Deserialize, Serialize};

/// Largest block the processor is prepared for
///
/// Callback slices longer than this are processed in chunks, so the
/// prepare contract holds no matter what the device driver delivers.
pub const MAX_BLOCK_FRAMES: usize = 8192;

/// Default requested buffer size in frames
pub const DEFAULT_BLOCK_FRAMES: u32 = 512;

/// Sample rate used when the device reports nothing usable
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Requested stream buffer sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferSize {
    /// Let the device pick
    Default,
    /// Request a specific frame count per callback
    Fixed(u32),
}

impl Default for BufferSize {
    fn default() -> Self {
        BufferSize::Fixed(DEFAULT_BLOCK_FRAMES)
    }
}

impl BufferSize {
    /// Frames this setting resolves to
    pub fn as_frames(&self) -> u32 {
        match self {
            BufferSize::Default => DEFAULT_BLOCK_FRAMES,
            BufferSize::Fixed(frames) => *frames,
        }
    }

    /// Approximate one-way latency at the given sample rate
    pub fn latency_ms(&self, sample_rate: u32) -> f32 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.as_frames() as f32 * 1000.0 / sample_rate as f32
    }
}

/// Identifies an output device across restarts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the driver
    pub name: String,
    /// Host API the device belongs to (e.g. "ALSA", "JACK"); `None`
    /// matches the first host that knows the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: Some(host.into()),
        }
    }

    /// Label for logs and device listings
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Output stream settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AudioConfig {
    /// Preferred output device; `None` uses the system default
    pub device: Option<DeviceId>,
    pub buffer_size: BufferSize,
    /// Preferred sample rate; `None` lets the device decide
    pub sample_rate: Option<u32>,
}

impl AudioConfig {
    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_size_latency() {
        assert_eq!(BufferSize::Fixed(480).latency_ms(48000), 10.0);
        assert_eq!(BufferSize::Fixed(480).latency_ms(0), 0.0);
        assert_eq!(BufferSize::Default.as_frames(), DEFAULT_BLOCK_FRAMES);
    }

    #[test]
    fn test_device_id_labels() {
        assert_eq!(DeviceId::new("Speakers").display_label(), "Speakers");
        assert_eq!(
            DeviceId::with_host("hw:0", "ALSA").display_label(),
            "[ALSA] hw:0"
        );
    }

    #[test]
    fn test_config_builders() {
        let config = AudioConfig::default()
            .with_device(DeviceId::new("Speakers"))
            .with_buffer_frames(256)
            .with_sample_rate(44100);
        assert_eq!(config.device.as_ref().unwrap().name, "Speakers");
        assert_eq!(config.buffer_size, BufferSize::Fixed(256));
        assert_eq!(config.sample_rate, Some(44100));
    }
}
