use std::time::Duration;

//=============================================================================
// Message type URLs
//=============================================================================

pub const MSG_SEND_TYPE_URL: &str = "/cosmos.bank.v1beta1.MsgSend";
pub const MSG_EXEC_TYPE_URL: &str = "/cosmos.authz.v1beta1.MsgExec";
pub const MSG_GRANT_TYPE_URL: &str = "/cosmos.authz.v1beta1.MsgGrant";
pub const MSG_REVOKE_TYPE_URL: &str = "/cosmos.authz.v1beta1.MsgRevoke";
pub const MSG_GRANT_ALLOWANCE_TYPE_URL: &str = "/cosmos.feegrant.v1beta1.MsgGrantAllowance";
pub const MSG_REVOKE_ALLOWANCE_TYPE_URL: &str = "/cosmos.feegrant.v1beta1.MsgRevokeAllowance";

pub const SEND_AUTHORIZATION_TYPE_URL: &str = "/cosmos.bank.v1beta1.SendAuthorization";
pub const GENERIC_AUTHORIZATION_TYPE_URL: &str = "/cosmos.authz.v1beta1.GenericAuthorization";
pub const BASIC_ALLOWANCE_TYPE_URL: &str = "/cosmos.feegrant.v1beta1.BasicAllowance";

//=============================================================================
// Chain defaults
//=============================================================================

pub const DEFAULT_CHAIN_ID: &str = "atomone-1";
pub const DEFAULT_ADDRESS_PREFIX: &str = "atone";
pub const DEFAULT_FEE_DENOM: &str = "uphoton";
pub const DEFAULT_GAS_PRICE: f64 = 0.025;
pub const DEFAULT_GAS_MULTIPLIER: f64 = 1.4;

/// Default spend-authorization ceiling, in the fee denom.
pub const DEFAULT_SPEND_LIMIT_AMOUNT: u128 = 1_000_000;
/// Default fee-allowance ceiling, always in the fee denom.
pub const DEFAULT_FEE_ALLOWANCE_AMOUNT: u128 = 500_000;
/// Grants expire this long after they are built unless overridden.
pub const DEFAULT_GRANT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

//=============================================================================
// Key derivation
//=============================================================================

pub const DEFAULT_PURPOSE: &str = "session";
pub const DEFAULT_WINDOW_HOURS: f64 = 24.0;
pub const DEFAULT_RP_NAME: &str = "Passkey Session";
pub const DEFAULT_CEREMONY_TIMEOUT: Duration = Duration::from_secs(60);
pub const CHALLENGE_LEN: usize = 32;
/// WebAuthn caps `user.id` at 64 bytes
pub const MAX_USER_HANDLE_LEN: usize = 64;
pub const SALT_SEPARATOR: char = ':';
pub const MS_PER_HOUR: u64 = 3_600_000;

//=============================================================================
// Grant queries
//=============================================================================

pub const RPC_PORT: u16 = 26657;
pub const REST_PORT: u16 = 1317;
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;
