//! Deterministic session-key derivation from passkey PRF output.
//!
//! key = SHA-256(PRF(credential, "{domain}:{address}:{purpose}:{window}"))

use crate::core::authenticator::CredentialId;
use crate::core::constants::SALT_SEPARATOR;
use crate::error::{Result, SessionSdkError};
use crate::logger::{Logger, NoopLogger};
use crate::passkey::credential::{user_handle, CredentialStore, Discovery};
use crate::passkey::prf::PrfOutput;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// 32-byte secp256k1 secret for the session account. Never persisted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    /// `None` for keys from the random-key store
    #[zeroize(skip)]
    credential_id: Option<CredentialId>,
    private_key: [u8; 32],
}

impl DerivedKey {
    pub fn new(credential_id: Option<CredentialId>, private_key: [u8; 32]) -> Self {
        Self {
            credential_id,
            private_key,
        }
    }

    pub fn credential_id(&self) -> Option<&CredentialId> {
        self.credential_id.as_ref()
    }

    pub fn private_key(&self) -> &[u8; 32] {
        &self.private_key
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("credential_id", &self.credential_id)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// The tuple a session key is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SaltComponents {
    pub domain: String,
    pub address: String,
    pub purpose: String,
    pub window_number: u64,
}

impl SaltComponents {
    pub fn new(
        domain: impl Into<String>,
        address: impl Into<String>,
        purpose: impl Into<String>,
        window_number: u64,
    ) -> Self {
        Self {
            domain: domain.into(),
            address: address.into(),
            purpose: purpose.into(),
            window_number,
        }
    }
}

impl fmt::Display for SaltComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}",
            self.domain,
            self.address,
            self.purpose,
            self.window_number,
            sep = SALT_SEPARATOR
        )
    }
}

/// Where the PRF bytes for a derivation come from
#[derive(Debug, Clone)]
pub enum PrfSource {
    /// Output already produced by an earlier ceremony for the same salt
    Output {
        credential_id: CredentialId,
        output: PrfOutput,
    },
    /// Run an id-scoped ceremony against this credential
    Credential(CredentialId),
}

/// One-way hash from PRF output to key bytes.
pub fn hash_prf_output(output: &PrfOutput) -> [u8; 32] {
    Sha256::digest(output.as_bytes()).into()
}

pub struct KeyDeriver {
    store: CredentialStore,
    logger: Arc<dyn Logger>,
}

impl KeyDeriver {
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            logger: Arc::new(NoopLogger),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn salt(&self, address: &str, purpose: &str, window_number: u64) -> SaltComponents {
        SaltComponents::new(
            self.store.relying_party().domain(),
            address,
            purpose,
            window_number,
        )
    }

    /// Turn a PRF source into key bytes, prompting at most once.
    pub async fn derive(&self, source: PrfSource, salt: &SaltComponents) -> Result<DerivedKey> {
        match source {
            PrfSource::Output {
                credential_id,
                output,
            } => Ok(DerivedKey::new(
                Some(credential_id),
                hash_prf_output(&output),
            )),
            PrfSource::Credential(credential_id) => {
                let output = self
                    .store
                    .evaluate_prf(&credential_id, &salt.to_string())
                    .await?;
                Ok(DerivedKey::new(
                    Some(credential_id),
                    hash_prf_output(&output),
                ))
            },
        }
    }

    /// Full find-or-create flow for one (address, purpose, window).
    ///
    /// Discovery evaluates PRF over the final salt, so a found credential
    /// usually costs exactly one biometric prompt.
    pub async fn derive_session_key(
        &self,
        address: &str,
        purpose: &str,
        window_number: u64,
    ) -> Result<DerivedKey> {
        if address.trim().is_empty() {
            return Err(SessionSdkError::InvalidAddress(
                "primary address is empty".to_string(),
            ));
        }
        user_handle(address)?;
        self.store.ensure_available()?;

        let salt = self.salt(address, purpose, window_number);
        let salt_string = salt.to_string();

        let (credential_id, prf_output) = match self.store.find_existing(address, &salt_string).await? {
            Discovery::Found {
                credential_id,
                prf_output,
                ..
            } => (credential_id, prf_output),
            Discovery::NotFound | Discovery::Cancelled(_) | Discovery::TransientError(_) => {
                let display_name = format!("{} ({})", address, purpose);
                let created = self
                    .store
                    .create(address, &display_name, Some(&salt_string))
                    .await?;
                (created.credential_id, created.prf_output)
            },
        };

        let source = match prf_output {
            Some(output) => PrfSource::Output {
                credential_id,
                output,
            },
            None => PrfSource::Credential(credential_id),
        };
        let key = self.derive(source, &salt).await?;

        self.logger.info(
            "Derived session key",
            Some(&log_context! {
                "address" => address,
                "purpose" => purpose,
                "window" => window_number,
            }),
        );
        Ok(key)
    }
}
