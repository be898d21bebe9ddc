//! Normalization of loosely-typed PRF extension results.
//!
//! Platforms report `prf.results.first` as an `ArrayBuffer`, a typed array,
//! a Node `Buffer`, or (after a JSON hop) a base64url string. Everything is
//! funnelled into [`PrfOutput`] here; nothing past this module looks at the
//! raw shape.

use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::{Map, Value};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// PRF evaluation output. Secret; zeroed on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrfOutput(Vec<u8>);

impl PrfOutput {
    pub fn new(bytes: Vec<u8>) -> Option<Self> {
        if bytes.is_empty() {
            None
        } else {
            Some(Self(bytes))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for PrfOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrfOutput([REDACTED; {}])", self.0.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrfExtraction {
    Output(PrfOutput),
    Unsupported,
}

impl PrfExtraction {
    pub fn into_output(self) -> Option<PrfOutput> {
        match self {
            PrfExtraction::Output(out) => Some(out),
            PrfExtraction::Unsupported => None,
        }
    }
}

/// Pull `prf.results.first` out of client extension results.
pub fn extract_first(extension_results: &Value) -> PrfExtraction {
    extension_results
        .get("prf")
        .and_then(|prf| prf.get("results"))
        .and_then(|results| results.get("first"))
        .and_then(normalize_bytes)
        .and_then(PrfOutput::new)
        .map_or(PrfExtraction::Unsupported, PrfExtraction::Output)
}

/// Whether a creation ceremony reported PRF availability.
///
/// Some platforms only set `prf.enabled`, others skip it and return results directly.
pub fn is_enabled(extension_results: &Value) -> bool {
    let Some(prf) = extension_results.get("prf") else {
        return false;
    };
    prf.get("enabled").and_then(Value::as_bool).unwrap_or(false)
        || matches!(extract_first(extension_results), PrfExtraction::Output(_))
}

/// Coerce any of the byte encodings a platform may produce into a byte vector.
pub fn normalize_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Array(items) => bytes_from_array(items),
        Value::String(s) => URL_SAFE_NO_PAD
            .decode(s.trim_end_matches('='))
            .or_else(|_| URL_SAFE.decode(s))
            .or_else(|_| STANDARD.decode(s))
            .ok(),
        Value::Object(map) => bytes_from_object(map),
        _ => None,
    }
}

fn bytes_from_array(items: &[Value]) -> Option<Vec<u8>> {
    items
        .iter()
        .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

fn bytes_from_object(map: &Map<String, Value>) -> Option<Vec<u8>> {
    // Node Buffer#toJSON
    if map.get("type").and_then(Value::as_str) == Some("Buffer") {
        return map.get("data").and_then(Value::as_array).and_then(|d| bytes_from_array(d));
    }

    // Typed array serialized by index: {"0": 12, "1": 34, ...}
    let mut out = vec![0u8; map.len()];
    for (key, value) in map {
        let idx: usize = key.parse().ok()?;
        let byte = value.as_u64().and_then(|n| u8::try_from(n).ok())?;
        *out.get_mut(idx)? = byte;
    }
    Some(out)
}
