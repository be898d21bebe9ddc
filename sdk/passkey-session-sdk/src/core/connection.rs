use crate::advanced::messages::Msg;
use crate::config::{ChainConfig, GasPrice};
use crate::error::BoxError;
use crate::passkey::derive::DerivedKey;
use crate::types::{AccountData, DeliverTxResponse, FeeOption};
use async_trait::async_trait;

/// A connected signing client for one chain.
///
/// Protobuf encoding, signing and broadcast are owned by the implementation;
/// the SDK only hands it typed messages.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Tendermint/CometBFT RPC endpoint the client is connected to
    fn rpc_url(&self) -> &str;

    fn gas_price(&self) -> Option<GasPrice>;

    /// Accounts of the client's signing identity, first one is the signer
    async fn accounts(&self) -> Result<Vec<AccountData>, BoxError>;

    /// Returns gas used
    async fn simulate(&self, signer: &str, msgs: &[Msg], memo: &str) -> Result<u64, BoxError>;

    async fn sign_and_broadcast(
        &self,
        signer: &str,
        msgs: &[Msg],
        fee: FeeOption,
        memo: &str,
    ) -> Result<DeliverTxResponse, BoxError>;
}

/// Builds a signing identity from raw key material and connects it.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    type Client: ChainClient;

    async fn connect_with_key(
        &self,
        rpc_url: &str,
        key: &DerivedKey,
        chain: &ChainConfig,
    ) -> Result<Self::Client, BoxError>;
}

#[async_trait]
impl<T: ChainClient + ?Sized> ChainClient for std::sync::Arc<T> {
    fn rpc_url(&self) -> &str {
        (**self).rpc_url()
    }

    fn gas_price(&self) -> Option<GasPrice> {
        (**self).gas_price()
    }

    async fn accounts(&self) -> Result<Vec<AccountData>, BoxError> {
        (**self).accounts().await
    }

    async fn simulate(&self, signer: &str, msgs: &[Msg], memo: &str) -> Result<u64, BoxError> {
        (**self).simulate(signer, msgs, memo).await
    }

    async fn sign_and_broadcast(
        &self,
        signer: &str,
        msgs: &[Msg],
        fee: FeeOption,
        memo: &str,
    ) -> Result<DeliverTxResponse, BoxError> {
        (**self).sign_and_broadcast(signer, msgs, fee, memo).await
    }
}
