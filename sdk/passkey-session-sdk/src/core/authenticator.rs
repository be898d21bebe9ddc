use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Raw credential id as returned by the authenticator
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CredentialId(pub Vec<u8>);

impl CredentialId {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Unpadded base64url, the form credential ids take in WebAuthn JSON.
    pub fn to_base64url(&self) -> String {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        URL_SAFE_NO_PAD.encode(&self.0)
    }
}

impl fmt::Debug for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialId({})", self.to_base64url())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserVerification {
    Required,
    Preferred,
    Discouraged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidentKey {
    Required,
    Preferred,
    Discouraged,
}

/// `navigator.credentials.get` options
#[derive(Debug, Clone)]
pub struct AssertionRequest {
    /// `None` lets the platform use the current origin
    pub rp_id: Option<String>,
    pub challenge: Vec<u8>,
    /// Empty for a discovery ceremony
    pub allow_credentials: Vec<CredentialId>,
    pub user_verification: UserVerification,
    pub timeout: Duration,
    /// PRF `eval.first` input
    pub prf_eval_first: Vec<u8>,
}

impl AssertionRequest {
    pub fn is_discovery(&self) -> bool {
        self.allow_credentials.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AssertionResponse {
    pub credential_id: CredentialId,
    pub user_handle: Option<Vec<u8>>,
    /// `getClientExtensionResults()`, loosely typed
    pub client_extension_results: Value,
}

/// `navigator.credentials.create` options
#[derive(Debug, Clone)]
pub struct CreationRequest {
    pub rp_id: Option<String>,
    pub rp_name: String,
    pub user_id: Vec<u8>,
    pub user_name: String,
    pub user_display_name: String,
    pub challenge: Vec<u8>,
    /// COSE algorithm identifiers in preference order
    pub pub_key_cred_params: Vec<i64>,
    pub resident_key: ResidentKey,
    pub user_verification: UserVerification,
    pub timeout: Duration,
    /// Request the PRF extension, optionally evaluating `eval.first` at creation
    pub prf_eval_first: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct AttestationResponse {
    pub credential_id: CredentialId,
    pub client_extension_results: Value,
}

/// Platform error names surfaced by a ceremony
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyErrorKind {
    /// User cancelled, timed out, or no credential matched
    NotAllowed,
    Abort,
    Security,
    InvalidState,
    NotSupported,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CeremonyError {
    pub kind: CeremonyErrorKind,
    pub message: String,
}

impl CeremonyError {
    pub fn new(kind: CeremonyErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(
            self.kind,
            CeremonyErrorKind::NotAllowed | CeremonyErrorKind::Abort
        )
    }
}

impl fmt::Display for CeremonyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CeremonyError {}

/// Abstraction over a WebAuthn-class platform authenticator.
/// This allows the SDK to work with:
/// 1. Browser `navigator.credentials` bindings (WASM)
/// 2. Native platform authenticators (CTAP2 hmac-secret)
/// 3. Scripted authenticators in tests
#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    /// Whether any WebAuthn authenticator is usable at all.
    fn is_available(&self) -> bool;

    /// Run an assertion ceremony. `Ok(None)` means the platform returned no credential.
    async fn get_assertion(
        &self,
        request: &AssertionRequest,
    ) -> Result<Option<AssertionResponse>, CeremonyError>;

    /// Run a creation ceremony. `Ok(None)` means the platform returned no credential.
    async fn create_credential(
        &self,
        request: &CreationRequest,
    ) -> Result<Option<AttestationResponse>, CeremonyError>;
}
