//! Find-or-create over the platform authenticator.

use crate::core::authenticator::{
    AssertionRequest, CeremonyError, CeremonyErrorKind, CreationRequest, CredentialId,
    PlatformAuthenticator, ResidentKey, UserVerification,
};
use crate::core::constants::{CHALLENGE_LEN, MAX_USER_HANDLE_LEN};
use crate::error::{Result, SessionSdkError};
use crate::logger::{Logger, NoopLogger};
use crate::passkey::prf::{self, PrfOutput};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;

/// ES256 then RS256
const PUB_KEY_CRED_PARAMS: [i64; 2] = [-7, -257];

//=============================================================================
// Relying party
//=============================================================================

/// A validated relying-party id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    id: String,
    name: String,
}

impl RelyingParty {
    /// `id` may be empty, meaning "let the platform use the current origin".
    pub fn new(id: &str, name: &str) -> Result<Self> {
        validate_hostname(id)?;
        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
        })
    }

    /// The id as passed to a ceremony
    pub fn ceremony_id(&self) -> Option<String> {
        if self.id.is_empty() {
            None
        } else {
            Some(self.id.clone())
        }
    }

    /// The domain component of derivation salts
    pub fn domain(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Alphanumerics, dots and hyphens only. The empty string is accepted.
pub fn validate_hostname(hostname: &str) -> Result<()> {
    let valid = hostname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(SessionSdkError::InvalidHostname(hostname.to_string()))
    }
}

//=============================================================================
// Challenge entropy
//=============================================================================

/// Source of ceremony challenges
pub trait ChallengeSource: Send + Sync {
    fn fill(&self, buf: &mut [u8]);
}

/// The operating system CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsChallengeSource;

impl ChallengeSource for OsChallengeSource {
    fn fill(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }
}

/// WebAuthn `user.id` for `address`: its UTF-8 bytes, at most 64 of them.
pub fn user_handle(address: &str) -> Result<Vec<u8>> {
    if address.len() > MAX_USER_HANDLE_LEN {
        return Err(SessionSdkError::InvalidAddress(format!(
            "{} is longer than the {}-byte passkey user handle",
            address, MAX_USER_HANDLE_LEN
        )));
    }
    Ok(address.as_bytes().to_vec())
}

/// Draw a fresh challenge, refusing an all-zero buffer.
pub fn generate_challenge(source: &dyn ChallengeSource) -> Result<Vec<u8>> {
    let mut challenge = vec![0u8; CHALLENGE_LEN];
    source.fill(&mut challenge);
    if challenge.iter().all(|b| *b == 0) {
        return Err(SessionSdkError::InsufficientEntropy);
    }
    Ok(challenge)
}

//=============================================================================
// Credential store
//=============================================================================

/// Outcome of a discovery ceremony. Only `Found` is used directly; every other
/// variant leads the caller to enroll a new credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Found {
        credential_id: CredentialId,
        prf_supported: bool,
        /// PRF output for the salt the discovery ceremony was asked to evaluate
        prf_output: Option<PrfOutput>,
    },
    NotFound,
    Cancelled(String),
    TransientError(String),
}

/// A newly enrolled credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub credential_id: CredentialId,
    pub user_handle: Vec<u8>,
    /// Set when the platform evaluated PRF during creation
    pub prf_output: Option<PrfOutput>,
}

pub struct CredentialStore {
    authenticator: Arc<dyn PlatformAuthenticator>,
    relying_party: RelyingParty,
    challenges: Arc<dyn ChallengeSource>,
    timeout: Duration,
    logger: Arc<dyn Logger>,
}

impl CredentialStore {
    pub fn new(authenticator: Arc<dyn PlatformAuthenticator>, relying_party: RelyingParty) -> Self {
        Self {
            authenticator,
            relying_party,
            challenges: Arc::new(OsChallengeSource),
            timeout: crate::core::constants::DEFAULT_CEREMONY_TIMEOUT,
            logger: Arc::new(NoopLogger),
        }
    }

    pub fn with_challenge_source(mut self, source: Arc<dyn ChallengeSource>) -> Self {
        self.challenges = source;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn relying_party(&self) -> &RelyingParty {
        &self.relying_party
    }

    pub fn ensure_available(&self) -> Result<()> {
        if self.authenticator.is_available() {
            Ok(())
        } else {
            Err(SessionSdkError::WebAuthnNotSupported)
        }
    }

    /// Discovery-mode assertion evaluating PRF over `salt`.
    ///
    /// Never fails on ceremony errors; those become non-`Found` variants.
    /// Only input and entropy problems are returned as errors.
    pub async fn find_existing(&self, address: &str, salt: &str) -> Result<Discovery> {
        let request = AssertionRequest {
            rp_id: self.relying_party.ceremony_id(),
            challenge: generate_challenge(self.challenges.as_ref())?,
            allow_credentials: Vec::new(),
            user_verification: UserVerification::Required,
            timeout: self.timeout,
            prf_eval_first: salt.as_bytes().to_vec(),
        };

        let response = match self.authenticator.get_assertion(&request).await {
            Ok(Some(response)) => response,
            Ok(None) => return Ok(Discovery::NotFound),
            Err(e) => return Ok(self.classify_discovery_error(e)),
        };

        if let Some(handle) = &response.user_handle {
            if !handle.is_empty() && handle.as_slice() != address.as_bytes() {
                self.logger.warn(
                    "Discovered credential belongs to a different account",
                    Some(&log_context! { "address" => address }),
                );
                return Ok(Discovery::NotFound);
            }
        }

        let prf_output = prf::extract_first(&response.client_extension_results).into_output();
        let prf_supported =
            prf_output.is_some() || prf::is_enabled(&response.client_extension_results);

        self.logger.debug(
            "Found existing passkey",
            Some(&log_context! {
                "credentialId" => response.credential_id.to_base64url(),
                "prfOutputReturned" => prf_output.is_some(),
            }),
        );

        Ok(Discovery::Found {
            credential_id: response.credential_id,
            prf_supported,
            prf_output,
        })
    }

    fn classify_discovery_error(&self, e: CeremonyError) -> Discovery {
        match e.kind {
            CeremonyErrorKind::NotAllowed | CeremonyErrorKind::Abort => {
                self.logger.info(
                    "Passkey discovery cancelled or matched nothing",
                    Some(&log_context! { "reason" => e.message.clone() }),
                );
                Discovery::Cancelled(e.message)
            },
            _ => {
                self.logger.warn(
                    "Passkey discovery failed",
                    Some(&log_context! {
                        "kind" => format!("{:?}", e.kind),
                        "reason" => e.message.clone(),
                    }),
                );
                Discovery::TransientError(e.message)
            },
        }
    }

    /// Enroll a discoverable, PRF-capable credential for `user_name`.
    ///
    /// `prf_salt` is evaluated at creation when the platform supports it.
    pub async fn create(
        &self,
        user_name: &str,
        display_name: &str,
        prf_salt: Option<&str>,
    ) -> Result<Credential> {
        let request = CreationRequest {
            rp_id: self.relying_party.ceremony_id(),
            rp_name: self.relying_party.name().to_string(),
            user_id: user_handle(user_name)?,
            user_name: user_name.to_string(),
            user_display_name: display_name.to_string(),
            challenge: generate_challenge(self.challenges.as_ref())?,
            pub_key_cred_params: PUB_KEY_CRED_PARAMS.to_vec(),
            resident_key: ResidentKey::Required,
            user_verification: UserVerification::Required,
            timeout: self.timeout,
            prf_eval_first: prf_salt.map(|s| s.as_bytes().to_vec()),
        };

        let response = match self.authenticator.create_credential(&request).await {
            Ok(Some(response)) => response,
            Ok(None) => {
                return Err(SessionSdkError::PasskeyCreationFailed(
                    "platform returned no credential".to_string(),
                ))
            },
            Err(e) if e.is_cancellation() => {
                return Err(SessionSdkError::UserCancelled { message: e.message })
            },
            Err(e) if e.kind == CeremonyErrorKind::NotSupported => {
                return Err(SessionSdkError::WebAuthnNotSupported)
            },
            Err(e) => return Err(SessionSdkError::PasskeyCreationFailed(e.message)),
        };

        if !prf::is_enabled(&response.client_extension_results) {
            self.logger.error(
                "Created passkey does not support PRF",
                Some(&log_context! { "credentialId" => response.credential_id.to_base64url() }),
            );
            return Err(SessionSdkError::PrfNotSupported);
        }

        self.logger.info(
            "Created passkey",
            Some(&log_context! { "credentialId" => response.credential_id.to_base64url() }),
        );

        Ok(Credential {
            prf_output: prf::extract_first(&response.client_extension_results).into_output(),
            credential_id: response.credential_id,
            user_handle: request.user_id,
        })
    }

    /// Id-scoped assertion evaluating PRF over `salt`.
    ///
    /// Cancellation here is surfaced as `UserCancelled`; it must not trigger enrollment.
    pub async fn evaluate_prf(&self, credential_id: &CredentialId, salt: &str) -> Result<PrfOutput> {
        let request = AssertionRequest {
            rp_id: self.relying_party.ceremony_id(),
            challenge: generate_challenge(self.challenges.as_ref())?,
            allow_credentials: vec![credential_id.clone()],
            user_verification: UserVerification::Required,
            timeout: self.timeout,
            prf_eval_first: salt.as_bytes().to_vec(),
        };

        let response = match self.authenticator.get_assertion(&request).await {
            Ok(Some(response)) => response,
            Ok(None) => {
                return Err(SessionSdkError::PasskeyAuthenticationFailed(
                    "platform returned no assertion".to_string(),
                ))
            },
            Err(e) if e.is_cancellation() => {
                return Err(SessionSdkError::UserCancelled { message: e.message })
            },
            Err(e) => return Err(SessionSdkError::PasskeyAuthenticationFailed(e.message)),
        };

        prf::extract_first(&response.client_extension_results)
            .into_output()
            .ok_or(SessionSdkError::PrfNotSupported)
    }
}
