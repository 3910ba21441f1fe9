//! The effect unit behind the host-facing [`Processor`] boundary
//!
//! [`FaderProcessor`] wires the parameter store, the gain kernel, and
//! state persistence into one object a host drives through four calls:
//! prepare, process, encode state, decode state. Everything a host needs
//! lives behind the [`Processor`] trait so adapters stay ignorant of the
//! unit's internals.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::effect::{Effect, GainEffect};
use crate::param::{ParamError, ParamSpec, ParamStore};
use crate::state::{self, Restore, StateError};
use crate::types::{AudioBlock, Sample};

/// Identifier of the gain parameter
pub const GAIN_PARAM: &str = "gain";

fn gain_spec() -> ParamSpec {
    ParamSpec::new(GAIN_PARAM, "Gain", 1.0).with_range(0.0, 2.0, 0.01)
}

/// Host-facing boundary of an effect unit
///
/// The lifecycle contract: `prepare` before the first `process`, and
/// again whenever the sample rate or maximum block size changes.
/// `process` is the only call made from the real-time thread; the state
/// calls run in control context.
pub trait Processor: Send {
    /// Display name of the unit
    fn name(&self) -> &'static str;

    /// Whether the unit can process this interleaved channel count
    fn supports_layout(&self, channels: usize) -> bool;

    /// Fix the stream facts before processing starts
    fn prepare(&mut self, sample_rate: u32, max_block_frames: usize);

    /// Drop carried audio state, keeping parameter values
    fn reset(&mut self);

    /// Transform one interleaved block in place (real-time safe)
    fn process(&mut self, block: &mut AudioBlock<'_>);

    /// Serialize current parameter values
    fn encode_state(&self) -> Result<Vec<u8>, StateError>;

    /// Apply previously serialized values; malformed input degrades to
    /// [`Restore::Ignored`] and never fails
    fn decode_state(&mut self, bytes: &[u8]) -> Restore;
}

/// Stream facts fixed by `prepare`
#[derive(Debug, Clone, Copy)]
struct StreamFacts {
    sample_rate: u32,
    max_block_frames: usize,
}

/// The gain effect unit
///
/// Construction declares the parameter set; the store is shared behind
/// an `Arc` so control surfaces write parameters directly while the
/// audio thread reads them through the kernel's handles.
pub struct FaderProcessor {
    store: Arc<ParamStore>,
    kernel: GainEffect,
    facts: Option<StreamFacts>,
    /// Count of process calls rejected for breaking the prepare/layout
    /// contract; shared so adapters can report without stopping audio
    violations: Arc<AtomicU64>,
}

impl FaderProcessor {
    /// Build a processor with its parameters at default values
    pub fn new() -> Result<Self, ParamError> {
        let mut store = ParamStore::new();
        let gain = store.declare(gain_spec())?;
        Ok(Self {
            store: Arc::new(store),
            kernel: GainEffect::new(gain),
            facts: None,
            violations: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Shared handle to the parameter store
    pub fn store(&self) -> Arc<ParamStore> {
        Arc::clone(&self.store)
    }

    /// Shared handle to the contract-violation counter
    pub fn violation_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.violations)
    }

    /// Number of rejected process calls so far
    pub fn violation_count(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }

    /// Process a raw interleaved buffer
    ///
    /// Convenience for callers that hold a flat slice. A buffer whose
    /// length is not a whole number of frames counts as a contract
    /// violation and is left untouched.
    pub fn process_interleaved(&mut self, data: &mut [Sample], channels: usize) {
        match AudioBlock::new(data, channels) {
            Some(mut block) => self.process(&mut block),
            None => self.note_violation(),
        }
    }

    #[inline]
    fn note_violation(&self) {
        self.violations.fetch_add(1, Ordering::Relaxed);
    }
}

impl Processor for FaderProcessor {
    fn name(&self) -> &'static str {
        "Fader"
    }

    fn supports_layout(&self, channels: usize) -> bool {
        matches!(channels, 1 | 2)
    }

    fn prepare(&mut self, sample_rate: u32, max_block_frames: usize) {
        if sample_rate == 0 || max_block_frames == 0 {
            log::warn!(
                "Rejecting prepare with sample_rate={} max_block_frames={}",
                sample_rate,
                max_block_frames
            );
            self.facts = None;
            return;
        }
        self.facts = Some(StreamFacts {
            sample_rate,
            max_block_frames,
        });
        self.kernel.prepare(sample_rate, max_block_frames);
        log::debug!(
            "Prepared for {}Hz, blocks up to {} frames",
            sample_rate,
            max_block_frames
        );
    }

    fn reset(&mut self) {
        self.kernel.reset();
    }

    fn process(&mut self, block: &mut AudioBlock<'_>) {
        // Contract violations leave the block untouched; the adapter
        // sees them through the shared counter and reports off-thread.
        let Some(facts) = self.facts else {
            self.note_violation();
            return;
        };
        if block.frames() > facts.max_block_frames || !self.supports_layout(block.channels()) {
            self.note_violation();
            return;
        }
        self.kernel.process(block);
    }

    fn encode_state(&self) -> Result<Vec<u8>, StateError> {
        state::encode(&self.store)
    }

    fn decode_state(&mut self, bytes: &[u8]) -> Restore {
        state::decode(bytes, &self.store)
    }
}
