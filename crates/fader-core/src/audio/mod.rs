//! Audio output subsystem
//!
//! Device enumeration, stream configuration, and the live cpal-backed
//! output that hosts the processor in real time.

pub mod config;
pub mod cpal_backend;
pub mod device;
pub mod error;
pub mod meter;
pub mod source;

pub use config::{
    AudioConfig, BufferSize, DeviceId, DEFAULT_BLOCK_FRAMES, DEFAULT_SAMPLE_RATE, MAX_BLOCK_FRAMES,
};
pub use cpal_backend::{start_live_output, CommandSender, HostCommand, LiveOutput};
pub use device::{get_output_devices, AudioDevice};
pub use error::{AudioError, AudioResult};
pub use meter::PeakMeter;
pub use source::{SignalSource, SourceKind};
