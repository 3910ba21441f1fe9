//! Fader Core - parameterized real-time gain effect
//!
//! The effect unit itself (parameter store, gain kernel, state codec)
//! plus the host adapters that run it: a live cpal output stream and an
//! offline WAV renderer. Hosts drive everything through the
//! [`processor::Processor`] boundary.

pub mod audio;
pub mod effect;
pub mod param;
pub mod processor;
pub mod render;
pub mod state;
pub mod types;

pub use types::*;
