use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A denominated token amount. Amounts are decimal integer strings, as on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.to_string(),
        }
    }
}

/// An account known to a chain client's signing identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    pub address: String,
    /// Compressed secp256k1 public key
    pub pubkey: Vec<u8>,
}

/// Explicit transaction fee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fee {
    pub amount: Vec<Coin>,
    pub gas: u64,
    /// Account whose fee allowance pays for this transaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

/// Fee argument for `sign_and_broadcast`
#[derive(Debug, Clone, PartialEq)]
pub enum FeeOption {
    /// Let the chain client simulate and price the transaction itself
    Auto,
    Explicit(Fee),
}

/// Broadcast result as reported by the chain client
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliverTxResponse {
    pub code: u32,
    pub transaction_hash: String,
    pub height: u64,
    pub gas_used: u64,
    pub gas_wanted: u64,
    pub raw_log: Option<String>,
}

/// Successful delegated execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResult {
    pub transaction_hash: String,
    pub height: u64,
    pub gas_used: u64,
    pub gas_wanted: u64,
}

impl From<DeliverTxResponse> for TxResult {
    fn from(res: DeliverTxResponse) -> Self {
        Self {
            transaction_hash: res.transaction_hash,
            height: res.height,
            gas_used: res.gas_used,
            gas_wanted: res.gas_wanted,
        }
    }
}

/// An authz grant found on-chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantInfo {
    /// `@type` of the authorization, e.g. `/cosmos.bank.v1beta1.SendAuthorization`
    pub authorization_type: String,
    /// `None` means the grant never expires
    pub expiration: Option<DateTime<Utc>>,
    /// Only set for send authorizations
    pub spend_limit: Vec<Coin>,
    pub allow_list: Option<Vec<String>>,
}

impl GrantInfo {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.map_or(false, |exp| exp <= now)
    }
}

/// A fee allowance found on-chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeegrantInfo {
    /// `@type` of the outermost allowance
    pub allowance_type: String,
    /// `None` means the allowance never expires
    pub expiration: Option<DateTime<Utc>>,
    pub spend_limit: Vec<Coin>,
}

impl FeegrantInfo {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.map_or(false, |exp| exp <= now)
    }
}

/// A fixed-length key-rotation window. `start_ms <= now < end_ms` for the
/// window computed from `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowBoundaries {
    pub window_number: u64,
    /// Unix milliseconds, inclusive
    pub start_ms: u64,
    /// Unix milliseconds, exclusive
    pub end_ms: u64,
}

impl WindowBoundaries {
    pub fn length_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    pub fn contains_ms(&self, instant_ms: u64) -> bool {
        self.start_ms <= instant_ms && instant_ms < self.end_ms
    }

    /// The window immediately before this one, if any.
    pub fn previous(&self) -> Option<WindowBoundaries> {
        let len = self.length_ms();
        let window_number = self.window_number.checked_sub(1)?;
        Some(WindowBoundaries {
            window_number,
            start_ms: self.start_ms - len,
            end_ms: self.start_ms,
        })
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.start_ms as i64).single()
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.end_ms as i64).single()
    }
}
