//! The session signer: one derived key, connected, plus delegation helpers.

use crate::advanced::messages::{self, Msg};
use crate::basic::delegation::{DelegationBuilder, DelegationConfig};
use crate::basic::grants::GrantStateClient;
use crate::config::{GasPrice, SessionConfig};
use crate::core::authenticator::{CredentialId, PlatformAuthenticator};
use crate::core::connection::{ChainClient, ChainConnector};
use crate::error::{Result, SessionSdkError};
use crate::logger::{Logger, NoopLogger};
use crate::passkey::credential::{ChallengeSource, CredentialStore};
use crate::passkey::derive::{DerivedKey, KeyDeriver};
use crate::types::{
    Coin, DeliverTxResponse, Fee, FeeOption, FeegrantInfo, GrantInfo, TxResult, WindowBoundaries,
};
use crate::utils::{validate_address, validate_amount};
use std::sync::Arc;

/// Builder for [`SessionSigner`].
///
/// Key material comes from the passkey (`with_authenticator`) or from a
/// caller-held [`EphemeralKeyStore`](crate::passkey::ephemeral::EphemeralKeyStore)
/// (`with_derived_key`). Nothing is connected until [`connect`](Self::connect).
pub struct SessionSignerBuilder<K: ChainConnector> {
    connector: K,
    config: SessionConfig,
    authenticator: Option<Arc<dyn PlatformAuthenticator>>,
    challenges: Option<Arc<dyn ChallengeSource>>,
    derived_key: Option<DerivedKey>,
    window_number: Option<u64>,
    logger: Arc<dyn Logger>,
}

impl<K: ChainConnector> SessionSignerBuilder<K> {
    pub fn new(connector: K) -> Self {
        Self {
            connector,
            config: SessionConfig::default(),
            authenticator: None,
            challenges: None,
            derived_key: None,
            window_number: None,
            logger: Arc::new(NoopLogger),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn PlatformAuthenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn with_challenge_source(mut self, source: Arc<dyn ChallengeSource>) -> Self {
        self.challenges = Some(source);
        self
    }

    /// Skip passkey derivation and use this key.
    pub fn with_derived_key(mut self, key: DerivedKey) -> Self {
        self.derived_key = Some(key);
        self
    }

    /// Derive for a specific window instead of the current one.
    pub fn with_window_number(mut self, window_number: u64) -> Self {
        self.window_number = Some(window_number);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Derive the session key for `primary`'s first account and connect it.
    pub async fn connect<P: ChainClient + ?Sized>(
        self,
        primary: &P,
    ) -> Result<SessionSigner<K::Client>> {
        self.config.validate()?;
        let window = self.config.scheduler()?.boundaries(self.window_number)?;

        let primary_address = first_address(primary, "primary").await?;
        validate_address(&primary_address)?;

        let key = match self.derived_key {
            Some(key) => key,
            None => {
                let authenticator = self
                    .authenticator
                    .ok_or(SessionSdkError::WebAuthnNotSupported)?;
                let mut store = CredentialStore::new(authenticator, self.config.relying_party()?)
                    .with_timeout(self.config.ceremony_timeout())
                    .with_logger(self.logger.clone());
                if let Some(source) = self.challenges {
                    store = store.with_challenge_source(source);
                }
                KeyDeriver::new(store)
                    .with_logger(self.logger.clone())
                    .derive_session_key(&primary_address, &self.config.purpose, window.window_number)
                    .await?
            },
        };

        let rpc_url = primary.rpc_url().to_string();
        let client = self
            .connector
            .connect_with_key(&rpc_url, &key, &self.config.chain)
            .await
            .map_err(|e| SessionSdkError::ClientInitializationFailed(e.to_string()))?;
        let session_address = first_address(&client, "session").await?;

        let grants = GrantStateClient::new(rpc_url)?.with_logger(self.logger.clone());
        let delegation =
            DelegationBuilder::new(self.config.chain.clone()).with_logger(self.logger.clone());

        self.logger.info(
            "Session signer connected",
            Some(&log_context! {
                "primaryAddress" => primary_address,
                "sessionAddress" => session_address,
                "window" => window.window_number,
            }),
        );

        Ok(SessionSigner {
            primary_address,
            session_address,
            credential_id: key.credential_id().cloned(),
            window,
            client,
            config: self.config,
            delegation,
            grants,
            logger: self.logger,
        })
    }
}

async fn first_address<C: ChainClient + ?Sized>(client: &C, role: &str) -> Result<String> {
    let accounts = client.accounts().await.map_err(|e| {
        SessionSdkError::ClientInitializationFailed(format!("{} accounts unavailable: {}", role, e))
    })?;
    accounts
        .into_iter()
        .next()
        .map(|a| a.address)
        .ok_or_else(|| {
            SessionSdkError::ClientInitializationFailed(format!("{} client has no accounts", role))
        })
}

/// A connected session identity acting for one primary account.
///
/// Both addresses are fixed for the signer's lifetime. Authorization state is
/// never cached; ask the chain with [`has_authz_grant`](Self::has_authz_grant).
pub struct SessionSigner<C: ChainClient> {
    primary_address: String,
    session_address: String,
    credential_id: Option<CredentialId>,
    window: WindowBoundaries,
    client: C,
    config: SessionConfig,
    delegation: DelegationBuilder,
    grants: GrantStateClient,
    logger: Arc<dyn Logger>,
}

impl<C: ChainClient> SessionSigner<C> {
    pub fn builder<K: ChainConnector<Client = C>>(connector: K) -> SessionSignerBuilder<K> {
        SessionSignerBuilder::new(connector)
    }

    pub fn primary_address(&self) -> &str {
        &self.primary_address
    }

    pub fn session_address(&self) -> &str {
        &self.session_address
    }

    /// `None` for signers built from a random key
    pub fn credential_id(&self) -> Option<&CredentialId> {
        self.credential_id.as_ref()
    }

    pub fn window(&self) -> WindowBoundaries {
        self.window
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn grants(&self) -> &GrantStateClient {
        &self.grants
    }

    //=========================================================================
    // Delegation
    //=========================================================================

    pub async fn has_authz_grant(&self, msg_type_url: Option<&str>) -> Result<Option<GrantInfo>> {
        self.grants
            .has_authz_grant(&self.primary_address, &self.session_address, msg_type_url)
            .await
    }

    pub async fn has_feegrant(&self) -> Result<Option<FeegrantInfo>> {
        self.grants
            .has_feegrant(&self.primary_address, &self.session_address)
            .await
    }

    /// `[MsgGrant, MsgGrantAllowance]`, to be signed by the primary account.
    pub fn generate_delegation_messages(&self, config: &DelegationConfig) -> Result<Vec<Msg>> {
        self.delegation
            .build_grant_messages(&self.primary_address, &self.session_address, config)
    }

    /// Grant messages for whichever grants are missing on-chain.
    pub async fn generate_conditional_delegation_messages(
        &self,
        config: &DelegationConfig,
    ) -> Result<Vec<Msg>> {
        self.delegation
            .build_conditional_grant_messages(
                &self.grants,
                &self.primary_address,
                &self.session_address,
                config,
            )
            .await
    }

    pub fn revoke_delegation_messages(&self, msg_type_url: Option<&str>) -> Result<Vec<Msg>> {
        self.delegation.build_revocation_messages(
            &self.primary_address,
            &self.session_address,
            msg_type_url,
        )
    }

    /// Issue any missing grants with the primary client.
    ///
    /// Returns `None` when both grants already exist.
    pub async fn authorize<P: ChainClient + ?Sized>(
        &self,
        primary: &P,
        config: &DelegationConfig,
    ) -> Result<Option<TxResult>> {
        let msgs = self.generate_conditional_delegation_messages(config).await?;
        if msgs.is_empty() {
            return Ok(None);
        }
        let res = primary
            .sign_and_broadcast(&self.primary_address, &msgs, FeeOption::Auto, "")
            .await
            .map_err(|e| SessionSdkError::BroadcastFailed {
                reason: e.to_string(),
                signer: self.primary_address.clone(),
                granter: None,
            })?;
        let tx = self.check_delivery(res, &self.primary_address, None)?;
        self.logger.info(
            "Delegation granted",
            Some(&log_context! {
                "granter" => self.primary_address,
                "grantee" => self.session_address,
                "messages" => msgs.len(),
                "txHash" => tx.transaction_hash,
            }),
        );
        Ok(Some(tx))
    }

    //=========================================================================
    // Delegated execution
    //=========================================================================

    /// Bank send from the primary account, executed by the session key.
    pub async fn send(&self, recipient: &str, amount: Vec<Coin>, memo: &str) -> Result<TxResult> {
        validate_address(recipient)?;
        validate_amount(&amount)?;
        let msg = messages::send(&self.primary_address, recipient, amount);
        self.custom(vec![msg], memo).await
    }

    /// Wrap `msgs` in a `MsgExec` and broadcast it with primary as fee granter.
    ///
    /// Inner messages must name the primary account as their signer.
    pub async fn custom(&self, msgs: Vec<Msg>, memo: &str) -> Result<TxResult> {
        let exec = [messages::exec(&self.session_address, msgs)];
        let fee = self.estimate_fee(&exec, memo).await?;

        let res = self
            .client
            .sign_and_broadcast(&self.session_address, &exec, FeeOption::Explicit(fee), memo)
            .await
            .map_err(|e| self.delegated_broadcast_error(e.to_string()))?;
        let tx = self.check_delivery(res, &self.session_address, Some(&self.primary_address))?;
        self.logger.debug(
            "Delegated execution succeeded",
            Some(&log_context! {
                "txHash" => tx.transaction_hash,
                "height" => tx.height,
                "gasUsed" => tx.gas_used,
            }),
        );
        Ok(tx)
    }

    async fn estimate_fee(&self, msgs: &[Msg], memo: &str) -> Result<Fee> {
        let gas_used = self
            .client
            .simulate(&self.session_address, msgs, memo)
            .await
            .map_err(|e| self.delegated_broadcast_error(format!("simulation failed: {}", e)))?;
        // The allowance only covers the chain's fee denom.
        let gas_price = self
            .client
            .gas_price()
            .filter(|price| price.denom == self.config.chain.fee_denom)
            .unwrap_or_else(|| self.config.chain.gas_price.clone());
        Ok(compute_fee(
            gas_used,
            self.config.chain.gas_multiplier,
            &gas_price,
            &self.primary_address,
        ))
    }

    fn delegated_broadcast_error(&self, reason: String) -> SessionSdkError {
        SessionSdkError::BroadcastFailed {
            reason,
            signer: self.session_address.clone(),
            granter: Some(self.primary_address.clone()),
        }
    }

    fn check_delivery(
        &self,
        res: DeliverTxResponse,
        signer: &str,
        granter: Option<&str>,
    ) -> Result<TxResult> {
        if res.code != 0 {
            let raw_log = res.raw_log.unwrap_or_default();
            self.logger.error(
                "Transaction failed on-chain",
                Some(&log_context! {
                    "code" => res.code,
                    "txHash" => res.transaction_hash,
                    "rawLog" => raw_log,
                    "signer" => signer,
                }),
            );
            return Err(SessionSdkError::TransactionFailed {
                code: res.code,
                tx_hash: res.transaction_hash,
                raw_log,
                signer: signer.to_string(),
                granter: granter.map(str::to_string),
            });
        }
        Ok(res.into())
    }
}

/// Fee for `gas_used` simulated gas, paid from `granter`'s allowance.
pub fn compute_fee(gas_used: u64, multiplier: f64, gas_price: &GasPrice, granter: &str) -> Fee {
    let gas = (gas_used as f64 * multiplier).ceil() as u64;
    let amount = (gas as f64 * gas_price.amount).ceil() as u128;
    Fee {
        amount: vec![Coin::new(amount, &gas_price.denom)],
        gas,
        granter: Some(granter.to_string()),
        payer: None,
    }
}
