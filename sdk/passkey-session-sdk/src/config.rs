use crate::core::constants::*;
use crate::error::{Result, SessionSdkError};
use crate::passkey::credential::RelyingParty;
use crate::passkey::window::WindowScheduler;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum price per unit of gas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasPrice {
    pub amount: f64,
    pub denom: String,
}

impl Default for GasPrice {
    fn default() -> Self {
        Self {
            amount: DEFAULT_GAS_PRICE,
            denom: DEFAULT_FEE_DENOM.to_string(),
        }
    }
}

/// Chain-level settings shared by every session signer on that chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub chain_id: String,
    /// Bech32 human-readable prefix, e.g. `atone`
    pub address_prefix: String,
    /// The chain's designated fee token. Fee allowances are always in this denom.
    pub fee_denom: String,
    pub gas_price: GasPrice,
    /// Applied to simulated gas before pricing
    pub gas_multiplier: f64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            address_prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
            fee_denom: DEFAULT_FEE_DENOM.to_string(),
            gas_price: GasPrice::default(),
            gas_multiplier: DEFAULT_GAS_MULTIPLIER,
        }
    }
}

impl ChainConfig {
    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = chain_id.into();
        self
    }

    pub fn with_address_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.address_prefix = prefix.into();
        self
    }

    /// Set the fee token. Execution fees are priced in it too.
    pub fn with_fee_denom(mut self, denom: impl Into<String>) -> Self {
        self.fee_denom = denom.into();
        self.gas_price.denom = self.fee_denom.clone();
        self
    }

    pub fn with_gas_price(mut self, amount: f64, denom: impl Into<String>) -> Self {
        self.gas_price = GasPrice {
            amount,
            denom: denom.into(),
        };
        self
    }

    pub fn with_gas_multiplier(mut self, multiplier: f64) -> Self {
        self.gas_multiplier = multiplier;
        self
    }

    /// Delegated execution spends the fee allowance, so both must share a denom.
    pub fn validate(&self) -> Result<()> {
        if self.gas_price.denom != self.fee_denom {
            return Err(SessionSdkError::InvalidAmount(format!(
                "gas price denom {:?} does not match fee denom {:?}",
                self.gas_price.denom, self.fee_denom
            )));
        }
        Ok(())
    }
}

/// Settings for deriving and connecting a session key.
///
/// Deserializable so applications can keep it next to their own config:
///
/// ```
/// # use passkey_session_sdk::config::SessionConfig;
/// let config: SessionConfig = serde_json::from_str(
///     r#"{ "rp_id": "wallet.example.com", "window_hours": 12.0 }"#,
/// ).unwrap();
/// assert_eq!(config.purpose, "session");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Relying-party id (hostname). Empty means the platform's current origin.
    pub rp_id: String,
    pub rp_name: String,
    /// Purpose label mixed into the derivation salt
    pub purpose: String,
    pub window_hours: f64,
    pub ceremony_timeout_ms: u64,
    pub chain: ChainConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rp_id: String::new(),
            rp_name: DEFAULT_RP_NAME.to_string(),
            purpose: DEFAULT_PURPOSE.to_string(),
            window_hours: DEFAULT_WINDOW_HOURS,
            ceremony_timeout_ms: DEFAULT_CEREMONY_TIMEOUT.as_millis() as u64,
            chain: ChainConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rp_id(mut self, rp_id: impl Into<String>) -> Self {
        self.rp_id = rp_id.into();
        self
    }

    pub fn with_rp_name(mut self, rp_name: impl Into<String>) -> Self {
        self.rp_name = rp_name.into();
        self
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = purpose.into();
        self
    }

    pub fn with_window_hours(mut self, hours: f64) -> Self {
        self.window_hours = hours;
        self
    }

    pub fn with_ceremony_timeout(mut self, timeout: Duration) -> Self {
        self.ceremony_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_chain(mut self, chain: ChainConfig) -> Self {
        self.chain = chain;
        self
    }

    pub fn ceremony_timeout(&self) -> Duration {
        Duration::from_millis(self.ceremony_timeout_ms)
    }

    pub fn relying_party(&self) -> Result<RelyingParty> {
        RelyingParty::new(&self.rp_id, &self.rp_name)
    }

    pub fn scheduler(&self) -> Result<WindowScheduler> {
        WindowScheduler::from_hours(self.window_hours)
    }

    /// Fail fast on settings that would otherwise surface mid-ceremony.
    pub fn validate(&self) -> Result<()> {
        self.relying_party()?;
        self.scheduler()?;
        self.chain.validate()
    }
}
