#[macro_use]
pub mod logger;

pub mod advanced;
pub mod basic;
pub mod config;
pub mod core;
pub mod error;
pub mod passkey;
pub mod types;
pub mod utils;

pub use crate::basic::delegation::{AuthorizationKind, DelegationBuilder, DelegationConfig, GrantLookup};
pub use crate::basic::grants::GrantStateClient;
pub use crate::basic::session::{SessionSigner, SessionSignerBuilder};
pub use crate::config::{ChainConfig, GasPrice, SessionConfig};
pub use crate::core::authenticator::PlatformAuthenticator;
pub use crate::core::connection::{ChainClient, ChainConnector};
pub use crate::error::{ErrorCode, Result, SessionSdkError};
pub use crate::logger::{Logger, NoopLogger, TracingLogger};
pub use crate::passkey::derive::DerivedKey;
pub use crate::passkey::ephemeral::EphemeralKeyStore;
pub use crate::passkey::window::WindowScheduler;
pub use crate::types::{Coin, FeegrantInfo, GrantInfo, TxResult, WindowBoundaries};
pub use crate::utils::rpc_to_rest_url;
