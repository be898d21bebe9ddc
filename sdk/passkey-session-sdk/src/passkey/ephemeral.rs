//! Non-biometric session keys.
//!
//! Keys are random, held only in a store the caller owns, and gone once the
//! store is cleared or dropped.

use crate::error::{Result, SessionSdkError};
use crate::passkey::derive::DerivedKey;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct EphemeralKeyStore {
    keys: HashMap<String, DerivedKey>,
}

impl EphemeralKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The key for `scope`, generated on first use.
    pub fn key_for(&mut self, scope: &str) -> Result<DerivedKey> {
        if let Some(key) = self.keys.get(scope) {
            return Ok(key.clone());
        }
        let key = DerivedKey::new(None, random_key()?);
        self.keys.insert(scope.to_string(), key.clone());
        Ok(key)
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.keys.contains_key(scope)
    }

    /// Forget one scope. Returns whether a key was held.
    pub fn remove(&mut self, scope: &str) -> bool {
        self.keys.remove(scope).is_some()
    }

    /// Forget every key. Dropped keys zero themselves.
    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn random_key() -> Result<[u8; 32]> {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    if key.iter().all(|b| *b == 0) {
        return Err(SessionSdkError::InsufficientEntropy);
    }
    Ok(key)
}
