//! Parameter state persistence
//!
//! Encodes a store's parameter values into a small versioned JSON
//! envelope and restores them later. Decoding is deliberately forgiving:
//! malformed bytes, unknown identifiers, and missing entries never fail
//! a load. Whatever cannot be applied is skipped and the affected
//! parameters keep their current (default-initialized) values, so a host
//! always comes up in a playable state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::param::ParamStore;

/// Envelope version written by [`encode`]
///
/// Readers apply any recognizable envelope regardless of its version;
/// the number exists so a future format break can be detected.
pub const STATE_VERSION: u32 = 1;

/// Errors from state encoding
///
/// Decoding has no error type: a bad blob degrades to [`Restore::Ignored`].
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to serialize parameter state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What a decode actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restore {
    /// The envelope parsed; this many parameter values were applied
    Applied(usize),
    /// The bytes were empty or unreadable; nothing changed
    Ignored,
}

impl Restore {
    /// True if the envelope parsed, even when zero values matched
    pub fn is_applied(&self) -> bool {
        matches!(self, Restore::Applied(_))
    }
}

/// On-disk/on-wire shape of saved state
///
/// `BTreeMap` keeps the key order stable so identical values encode to
/// identical bytes.
#[derive(Debug, Serialize, Deserialize)]
struct StateEnvelope {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    params: BTreeMap<String, f32>,
}

fn default_version() -> u32 {
    STATE_VERSION
}

/// Encode the store's current parameter values
pub fn encode(store: &ParamStore) -> Result<Vec<u8>, StateError> {
    let envelope = StateEnvelope {
        version: STATE_VERSION,
        params: store.snapshot().into_iter().collect(),
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Apply a previously encoded envelope to the store
///
/// Each recognized identifier is written through the store's normal
/// clamping path; unknown identifiers are skipped and identifiers absent
/// from the envelope keep their current values. Unreadable bytes leave
/// the store untouched.
pub fn decode(bytes: &[u8], store: &ParamStore) -> Restore {
    if bytes.is_empty() {
        log::debug!("Empty state blob, keeping current parameter values");
        return Restore::Ignored;
    }

    let envelope: StateEnvelope = match serde_json::from_slice(bytes) {
        Ok(envelope) => envelope,
        Err(e) => {
            log::warn!("Ignoring malformed parameter state: {}", e);
            return Restore::Ignored;
        }
    };

    if envelope.version > STATE_VERSION {
        log::debug!(
            "Parameter state has newer version {} (current {}), applying what matches",
            envelope.version,
            STATE_VERSION
        );
    }

    let mut applied = 0;
    for (id, value) in &envelope.params {
        if store.set(id, *value).is_some() {
            applied += 1;
        } else {
            log::debug!("Skipping unknown parameter '{}' in saved state", id);
        }
    }
    Restore::Applied(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamSpec;

    fn store_with_gain() -> ParamStore {
        let mut store = ParamStore::new();
        store
            .declare(ParamSpec::new("gain", "Gain", 1.0).with_range(0.0, 2.0, 0.01))
            .unwrap();
        store
    }

    #[test]
    fn test_round_trip_restores_values() {
        let store = store_with_gain();
        store.set("gain", 0.73);
        let bytes = encode(&store).unwrap();

        let restored = store_with_gain();
        assert_eq!(decode(&bytes, &restored), Restore::Applied(1));
        assert_eq!(restored.get("gain"), Some(0.73));
    }

    #[test]
    fn test_empty_bytes_keep_current_values() {
        let store = store_with_gain();
        store.set("gain", 1.5);
        assert_eq!(decode(b"", &store), Restore::Ignored);
        assert_eq!(store.get("gain"), Some(1.5));
    }

    #[test]
    fn test_garbage_bytes_keep_current_values() {
        let store = store_with_gain();
        store.set("gain", 0.4);
        assert_eq!(decode(b"not json at all {", &store), Restore::Ignored);
        assert_eq!(store.get("gain"), Some(0.4));
    }

    #[test]
    fn test_unknown_identifier_skipped() {
        let store = store_with_gain();
        let blob = br#"{"version":1,"params":{"gain":0.5,"wet":0.9}}"#;
        assert_eq!(decode(blob, &store), Restore::Applied(1));
        assert_eq!(store.get("gain"), Some(0.5));
        assert_eq!(store.get("wet"), None);
    }

    #[test]
    fn test_missing_identifier_keeps_default() {
        let store = store_with_gain();
        let blob = br#"{"version":1,"params":{}}"#;
        assert_eq!(decode(blob, &store), Restore::Applied(0));
        assert_eq!(store.get("gain"), Some(1.0));
    }

    #[test]
    fn test_older_blob_into_wider_store() {
        // Bytes written before "drive" existed leave it at its default
        let mut store = store_with_gain();
        store
            .declare(ParamSpec::new("drive", "Drive", 0.3))
            .unwrap();
        let blob = br#"{"version":1,"params":{"gain":0.5}}"#;
        assert_eq!(decode(blob, &store), Restore::Applied(1));
        assert_eq!(store.get("gain"), Some(0.5));
        assert_eq!(store.get("drive"), Some(0.3));
    }

    #[test]
    fn test_non_numeric_value_ignores_blob() {
        let store = store_with_gain();
        store.set("gain", 0.9);
        let blob = br#"{"version":1,"params":{"gain":"loud"}}"#;
        assert_eq!(decode(blob, &store), Restore::Ignored);
        assert_eq!(store.get("gain"), Some(0.9));
    }

    #[test]
    fn test_saved_value_clamped_on_load() {
        let store = store_with_gain();
        let blob = br#"{"version":1,"params":{"gain":5.0}}"#;
        assert_eq!(decode(blob, &store), Restore::Applied(1));
        assert_eq!(store.get("gain"), Some(2.0));
    }

    #[test]
    fn test_newer_version_still_applies() {
        let store = store_with_gain();
        let blob = br#"{"version":9,"params":{"gain":0.25,"future":1.0}}"#;
        assert_eq!(decode(blob, &store), Restore::Applied(1));
        assert_eq!(store.get("gain"), Some(0.25));
    }

    #[test]
    fn test_unknown_envelope_keys_ignored() {
        let store = store_with_gain();
        let blob = br#"{"version":1,"params":{"gain":0.5},"meta":{"saved_by":"x"}}"#;
        assert_eq!(decode(blob, &store), Restore::Applied(1));
        assert_eq!(store.get("gain"), Some(0.5));
    }

    #[test]
    fn test_version_defaults_when_absent() {
        let store = store_with_gain();
        let blob = br#"{"params":{"gain":0.1}}"#;
        assert_eq!(decode(blob, &store), Restore::Applied(1));
        assert_eq!(store.get("gain"), Some(0.1));
    }

    #[test]
    fn test_encode_is_byte_stable() {
        let store = store_with_gain();
        store.set("gain", 0.5);
        assert_eq!(encode(&store).unwrap(), encode(&store).unwrap());
        assert_eq!(
            encode(&store).unwrap(),
            br#"{"version":1,"params":{"gain":0.5}}"#
        );
    }
}
