//! Parameter store - named, bounded control values with atomic reads
//!
//! Parameters are declared once at processor construction and live for
//! the instance's lifetime. The control surface writes values through
//! [`ParamStore::set`]; the real-time path reads them wait-free through a
//! [`ParamHandle`] captured at declaration, so a `process` call never
//! does a string lookup.
//!
//! Values are stored as `f32` bit patterns in an `AtomicU32` with relaxed
//! ordering: each parameter is an independent cell with a single writer
//! (the control surface) and any number of readers. Every write is
//! clamped into the declared range, so a stored value can never be out of
//! bounds or non-finite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Errors from parameter declaration
///
/// Both variants are initialization-time programming errors, surfaced at
/// startup rather than handled.
#[derive(Error, Debug)]
pub enum ParamError {
    /// A parameter with this identifier is already declared
    #[error("Parameter '{0}' is already declared")]
    DuplicateIdentifier(String),

    /// The declared range or default is unusable
    #[error("Invalid declaration for parameter '{id}': {reason}")]
    InvalidSpec { id: String, reason: String },
}

/// Static description of one parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Identifier, unique within a store (e.g., "gain")
    pub id: String,
    /// Human-readable name for display
    pub name: String,
    /// Minimum value (inclusive)
    pub min: f32,
    /// Maximum value (inclusive)
    pub max: f32,
    /// Increment granularity for control surfaces; writes are clamped,
    /// never snapped to this grid
    pub step: f32,
    /// Default value, also the fallback for NaN writes
    pub default: f32,
}

impl ParamSpec {
    /// Create a spec with a unit range and the given default
    pub fn new(id: impl Into<String>, name: impl Into<String>, default: f32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            min: 0.0,
            max: 1.0,
            step: 0.0,
            default,
        }
    }

    /// Set the value range and step size
    pub fn with_range(mut self, min: f32, max: f32, step: f32) -> Self {
        self.min = min;
        self.max = max;
        self.step = step;
        self
    }

    /// Clamp a proposed value into this spec's range
    ///
    /// Infinities clamp to the nearer bound; NaN falls back to the
    /// default so the stored value can never leave `[min, max]`.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }

    fn validate(&self) -> Result<(), ParamError> {
        let fail = |reason: &str| ParamError::InvalidSpec {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        if self.id.is_empty() {
            return Err(fail("empty identifier"));
        }
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(fail("range bounds must be finite"));
        }
        if self.min >= self.max {
            return Err(fail("min must be less than max"));
        }
        if !self.default.is_finite() || self.default < self.min || self.default > self.max {
            return Err(fail("default outside [min, max]"));
        }
        if !self.step.is_finite() || self.step < 0.0 {
            return Err(fail("step must be finite and non-negative"));
        }
        Ok(())
    }
}

/// One parameter's spec plus its atomically readable current value
#[derive(Debug)]
struct ParamSlot {
    spec: ParamSpec,
    /// Current value as f32 bits; single writer, many readers
    bits: AtomicU32,
}

impl ParamSlot {
    fn new(spec: ParamSpec) -> Self {
        let bits = AtomicU32::new(spec.default.to_bits());
        Self { spec, bits }
    }

    #[inline]
    fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    #[inline]
    fn store_clamped(&self, value: f32) -> f32 {
        let clamped = self.spec.clamp(value);
        self.bits.store(clamped.to_bits(), Ordering::Relaxed);
        clamped
    }
}

/// Wait-free accessor for one parameter
///
/// Cheap to clone; the real-time path keeps one per parameter it reads.
/// The handle stays valid for the life of the store that declared it.
#[derive(Debug, Clone)]
pub struct ParamHandle {
    slot: Arc<ParamSlot>,
}

impl ParamHandle {
    /// Read the most recently committed value (wait-free)
    #[inline]
    pub fn get(&self) -> f32 {
        self.slot.load()
    }

    /// Identifier of the parameter this handle reads
    pub fn id(&self) -> &str {
        &self.slot.spec.id
    }

    /// The parameter's static spec
    pub fn spec(&self) -> &ParamSpec {
        &self.slot.spec
    }
}

/// Ordered collection of parameters, keyed by identifier
///
/// Declaration happens once during construction (`&mut self`); after
/// that the store is shared behind an `Arc` and all access is `&self`.
/// Identifiers are never added or removed at runtime.
#[derive(Debug, Default)]
pub struct ParamStore {
    /// Slots in declaration order (snapshot and display order)
    slots: Vec<Arc<ParamSlot>>,
    /// Identifier to slot index
    index: HashMap<String, usize>,
    /// Bumped on every committed write; observers poll it to notice
    /// external changes without locking
    revision: AtomicU64,
}

impl ParamStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter
    ///
    /// Initialization-time only. Fails if the identifier is already
    /// taken or the declaration is unusable; both are fatal startup
    /// errors.
    pub fn declare(&mut self, spec: ParamSpec) -> Result<ParamHandle, ParamError> {
        spec.validate()?;
        if self.index.contains_key(&spec.id) {
            return Err(ParamError::DuplicateIdentifier(spec.id));
        }
        log::debug!(
            "Declared parameter '{}' range [{}, {}] default {}",
            spec.id,
            spec.min,
            spec.max,
            spec.default
        );
        let slot = Arc::new(ParamSlot::new(spec));
        self.index.insert(slot.spec.id.clone(), self.slots.len());
        self.slots.push(Arc::clone(&slot));
        Ok(ParamHandle { slot })
    }

    /// Write a parameter value, clamped into its declared range
    ///
    /// Returns the committed value, or `None` if the identifier is not
    /// declared (the write is then a no-op). Never blocks; safe to call
    /// concurrently with real-time reads.
    pub fn set(&self, id: &str, value: f32) -> Option<f32> {
        let slot = self.index.get(id).map(|&i| &self.slots[i])?;
        let committed = slot.store_clamped(value);
        self.revision.fetch_add(1, Ordering::Relaxed);
        Some(committed)
    }

    /// Read a parameter's current value
    ///
    /// Wait-free; `None` if the identifier is not declared.
    #[inline]
    pub fn get(&self, id: &str) -> Option<f32> {
        self.index.get(id).map(|&i| self.slots[i].load())
    }

    /// Get a wait-free handle for one parameter
    pub fn handle(&self, id: &str) -> Option<ParamHandle> {
        self.index.get(id).map(|&i| ParamHandle {
            slot: Arc::clone(&self.slots[i]),
        })
    }

    /// Point-in-time view of all (identifier, value) pairs in
    /// declaration order
    ///
    /// Save/load are control-context operations; this allocates.
    pub fn snapshot(&self) -> Vec<(String, f32)> {
        self.slots
            .iter()
            .map(|slot| (slot.spec.id.clone(), slot.load()))
            .collect()
    }

    /// Iterate the declared specs in declaration order
    pub fn specs(&self) -> impl Iterator<Item = &ParamSpec> {
        self.slots.iter().map(|slot| &slot.spec)
    }

    /// Number of declared parameters
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if nothing is declared
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current change counter
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Relaxed)
    }
}
