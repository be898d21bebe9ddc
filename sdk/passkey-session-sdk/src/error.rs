use serde_json::{json, Map, Value};
use thiserror::Error;

/// Boxed error returned by injected collaborators (chain transport, connectors).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stable, machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    WebAuthnNotSupported,
    PrfNotSupported,
    UserCancelled,
    PasskeyCreationFailed,
    PasskeyAuthenticationFailed,
    InvalidHostname,
    InsufficientEntropy,
    InvalidRpcUrl,
    InvalidAddress,
    InvalidAmount,
    InvalidWindow,
    ClientInitializationFailed,
    TransactionFailed,
    BroadcastFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::WebAuthnNotSupported => "WEBAUTHN_NOT_SUPPORTED",
            ErrorCode::PrfNotSupported => "PRF_NOT_SUPPORTED",
            ErrorCode::UserCancelled => "USER_CANCELLED",
            ErrorCode::PasskeyCreationFailed => "PASSKEY_CREATION_FAILED",
            ErrorCode::PasskeyAuthenticationFailed => "PASSKEY_AUTHENTICATION_FAILED",
            ErrorCode::InvalidHostname => "INVALID_HOSTNAME",
            ErrorCode::InsufficientEntropy => "INSUFFICIENT_ENTROPY",
            ErrorCode::InvalidRpcUrl => "INVALID_RPC_URL",
            ErrorCode::InvalidAddress => "INVALID_ADDRESS",
            ErrorCode::InvalidAmount => "INVALID_AMOUNT",
            ErrorCode::InvalidWindow => "INVALID_WINDOW",
            ErrorCode::ClientInitializationFailed => "CLIENT_INITIALIZATION_FAILED",
            ErrorCode::TransactionFailed => "TRANSACTION_FAILED",
            ErrorCode::BroadcastFailed => "BROADCAST_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SDK-specific error types for session signer operations
#[derive(Debug, Error)]
pub enum SessionSdkError {
    /// The platform exposes no WebAuthn authenticator
    #[error("WebAuthn is not supported on this platform")]
    WebAuthnNotSupported,

    /// The credential or authenticator does not evaluate the PRF extension
    #[error("Passkey does not support the PRF extension")]
    PrfNotSupported,

    /// The user cancelled or aborted a ceremony. Carries the platform message verbatim.
    #[error("{message}")]
    UserCancelled { message: String },

    /// Creation ceremony returned nothing or failed outright
    #[error("Passkey creation failed: {0}")]
    PasskeyCreationFailed(String),

    /// Assertion ceremony during key derivation failed for a reason other than cancellation
    #[error("Passkey authentication failed: {0}")]
    PasskeyAuthenticationFailed(String),

    /// Relying-party id contains characters outside `[A-Za-z0-9.-]`
    #[error("Invalid hostname: {0:?}")]
    InvalidHostname(String),

    /// Random source produced an all-zero buffer
    #[error("Insufficient entropy from random source")]
    InsufficientEntropy,

    /// RPC URL could not be parsed or uses a scheme other than http/https
    #[error("Invalid RPC URL {url:?}: {reason}")]
    InvalidRpcUrl { url: String, reason: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Window length is zero, negative, or not representable in milliseconds
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// Connecting the session key to the chain client failed
    #[error("Client initialization failed: {0}")]
    ClientInitializationFailed(String),

    /// The chain accepted the transaction but returned a non-zero result code
    #[error("Transaction {tx_hash} failed with code {code}: {raw_log}")]
    TransactionFailed {
        code: u32,
        tx_hash: String,
        raw_log: String,
        signer: String,
        /// Fee granter, set for delegated execution
        granter: Option<String>,
    },

    /// Simulation or broadcast did not reach a result
    #[error("Broadcast failed: {reason}")]
    BroadcastFailed {
        reason: String,
        signer: String,
        granter: Option<String>,
    },
}

impl SessionSdkError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionSdkError::WebAuthnNotSupported => ErrorCode::WebAuthnNotSupported,
            SessionSdkError::PrfNotSupported => ErrorCode::PrfNotSupported,
            SessionSdkError::UserCancelled { .. } => ErrorCode::UserCancelled,
            SessionSdkError::PasskeyCreationFailed(_) => ErrorCode::PasskeyCreationFailed,
            SessionSdkError::PasskeyAuthenticationFailed(_) => {
                ErrorCode::PasskeyAuthenticationFailed
            },
            SessionSdkError::InvalidHostname(_) => ErrorCode::InvalidHostname,
            SessionSdkError::InsufficientEntropy => ErrorCode::InsufficientEntropy,
            SessionSdkError::InvalidRpcUrl { .. } => ErrorCode::InvalidRpcUrl,
            SessionSdkError::InvalidAddress(_) => ErrorCode::InvalidAddress,
            SessionSdkError::InvalidAmount(_) => ErrorCode::InvalidAmount,
            SessionSdkError::InvalidWindow(_) => ErrorCode::InvalidWindow,
            SessionSdkError::ClientInitializationFailed(_) => {
                ErrorCode::ClientInitializationFailed
            },
            SessionSdkError::TransactionFailed { .. } => ErrorCode::TransactionFailed,
            SessionSdkError::BroadcastFailed { .. } => ErrorCode::BroadcastFailed,
        }
    }

    /// Non-secret diagnostic fields for this error, if any.
    pub fn context(&self) -> Option<Map<String, Value>> {
        let value = match self {
            SessionSdkError::InvalidHostname(hostname) => json!({ "hostname": hostname }),
            SessionSdkError::InvalidRpcUrl { url, reason } => {
                json!({ "rpcUrl": url, "reason": reason })
            },
            SessionSdkError::InvalidAddress(address) => json!({ "address": address }),
            SessionSdkError::InvalidAmount(reason)
            | SessionSdkError::PasskeyAuthenticationFailed(reason)
            | SessionSdkError::ClientInitializationFailed(reason) => json!({ "reason": reason }),
            SessionSdkError::TransactionFailed {
                code,
                tx_hash,
                raw_log,
                signer,
                granter,
            } => json!({
                "code": code,
                "txHash": tx_hash,
                "rawLog": raw_log,
                "signer": signer,
                "granter": granter,
            }),
            SessionSdkError::BroadcastFailed {
                reason,
                signer,
                granter,
            } => json!({ "reason": reason, "signer": signer, "granter": granter }),
            _ => return None,
        };
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Whether re-invoking the whole flow may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionSdkError::UserCancelled { .. }
                | SessionSdkError::ClientInitializationFailed(_)
                | SessionSdkError::BroadcastFailed { .. }
        )
    }
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, SessionSdkError>;
