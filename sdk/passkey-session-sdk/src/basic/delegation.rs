//! Construction of the primary→session authz grant and fee allowance.

use crate::advanced::messages::{self, Authorization, FeeAllowance, Msg};
use crate::config::ChainConfig;
use crate::core::constants::*;
use crate::error::{Result, SessionSdkError};
use crate::logger::{Logger, NoopLogger};
use crate::types::{Coin, FeegrantInfo, GrantInfo};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// What the spend authorization permits
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthorizationKind {
    /// Bank sends capped by `spend_limit`, optionally to `allowed_recipients` only
    #[default]
    Send,
    /// Any message of this type, uncapped
    Generic { msg_type: String },
}

impl AuthorizationKind {
    pub fn msg_type_url(&self) -> &str {
        match self {
            AuthorizationKind::Send => MSG_SEND_TYPE_URL,
            AuthorizationKind::Generic { msg_type } => msg_type,
        }
    }
}

/// Parameters for the grant pair. Unset fields take chain defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelegationConfig {
    /// Defaults to 24h after the messages are built
    pub expiration: Option<DateTime<Utc>>,
    /// Spend-authorization cap. Defaults to the fee denom.
    pub spend_limit: Option<Vec<Coin>>,
    /// Fee-allowance cap, always denominated in the chain fee denom
    pub gas_limit: Option<u128>,
    /// `Some(vec![])` encodes an explicit empty allow-list
    pub allowed_recipients: Option<Vec<String>>,
    pub authorization: AuthorizationKind,
}

impl DelegationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn with_spend_limit(mut self, spend_limit: Vec<Coin>) -> Self {
        self.spend_limit = Some(spend_limit);
        self
    }

    pub fn with_gas_limit(mut self, amount: u128) -> Self {
        self.gas_limit = Some(amount);
        self
    }

    pub fn with_allowed_recipients(mut self, recipients: Vec<String>) -> Self {
        self.allowed_recipients = Some(recipients);
        self
    }

    pub fn with_authorization(mut self, kind: AuthorizationKind) -> Self {
        self.authorization = kind;
        self
    }
}

/// Read access to the two grants, as needed by the conditional path.
#[async_trait]
pub trait GrantLookup: Send + Sync {
    async fn has_authz_grant(
        &self,
        granter: &str,
        grantee: &str,
        msg_type_url: Option<&str>,
    ) -> Result<Option<GrantInfo>>;

    async fn has_feegrant(&self, granter: &str, grantee: &str) -> Result<Option<FeegrantInfo>>;
}

#[derive(Clone)]
pub struct DelegationBuilder {
    chain: ChainConfig,
    logger: Arc<dyn Logger>,
}

impl DelegationBuilder {
    pub fn new(chain: ChainConfig) -> Self {
        Self {
            chain,
            logger: Arc::new(NoopLogger),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    fn default_expiration() -> DateTime<Utc> {
        Utc::now() + chrono::Duration::seconds(DEFAULT_GRANT_TTL.as_secs() as i64)
    }

    /// The spend authorization described by `config`
    pub fn authorization(&self, config: &DelegationConfig) -> Authorization {
        match &config.authorization {
            AuthorizationKind::Send => Authorization::Send {
                spend_limit: config.spend_limit.clone().unwrap_or_else(|| {
                    vec![Coin::new(DEFAULT_SPEND_LIMIT_AMOUNT, &self.chain.fee_denom)]
                }),
                allow_list: config.allowed_recipients.clone(),
            },
            AuthorizationKind::Generic { msg_type } => Authorization::Generic {
                msg: msg_type.clone(),
            },
        }
    }

    /// The fee allowance described by `config`. Always in the fee denom.
    pub fn fee_allowance(&self, config: &DelegationConfig, expiration: DateTime<Utc>) -> FeeAllowance {
        FeeAllowance::Basic {
            spend_limit: vec![Coin::new(
                config.gas_limit.unwrap_or(DEFAULT_FEE_ALLOWANCE_AMOUNT),
                &self.chain.fee_denom,
            )],
            expiration: Some(expiration),
        }
    }

    fn authz_grant_msg(
        &self,
        primary: &str,
        session: &str,
        config: &DelegationConfig,
        expiration: DateTime<Utc>,
    ) -> Msg {
        messages::grant(
            primary,
            session,
            self.authorization(config),
            Some(expiration),
        )
    }

    fn feegrant_msg(
        &self,
        primary: &str,
        session: &str,
        config: &DelegationConfig,
        expiration: DateTime<Utc>,
    ) -> Msg {
        messages::grant_allowance(primary, session, self.fee_allowance(config, expiration))
    }

    /// `[MsgGrant, MsgGrantAllowance]` from `primary` to `session`.
    pub fn build_grant_messages(
        &self,
        primary: &str,
        session: &str,
        config: &DelegationConfig,
    ) -> Result<Vec<Msg>> {
        check_pair(primary, session)?;
        let expiration = config.expiration.unwrap_or_else(Self::default_expiration);
        Ok(vec![
            self.authz_grant_msg(primary, session, config, expiration),
            self.feegrant_msg(primary, session, config, expiration),
        ])
    }

    /// `[MsgRevoke, MsgRevokeAllowance]`. `msg_type_url` defaults to bank send.
    pub fn build_revocation_messages(
        &self,
        primary: &str,
        session: &str,
        msg_type_url: Option<&str>,
    ) -> Result<Vec<Msg>> {
        check_pair(primary, session)?;
        Ok(vec![
            messages::revoke(primary, session, msg_type_url.unwrap_or(MSG_SEND_TYPE_URL)),
            messages::revoke_allowance(primary, session),
        ])
    }

    /// Grant messages for whichever of the two grants is currently absent.
    ///
    /// Both lookups run concurrently. Expired grants count as absent.
    pub async fn build_conditional_grant_messages(
        &self,
        lookup: &dyn GrantLookup,
        primary: &str,
        session: &str,
        config: &DelegationConfig,
    ) -> Result<Vec<Msg>> {
        check_pair(primary, session)?;
        let msg_type = config.authorization.msg_type_url();

        let (authz, feegrant) = tokio::join!(
            lookup.has_authz_grant(primary, session, Some(msg_type)),
            lookup.has_feegrant(primary, session),
        );
        let now = Utc::now();
        let authz_present = authz?.map_or(false, |g| !g.is_expired_at(now));
        let feegrant_present = feegrant?.map_or(false, |g| !g.is_expired_at(now));

        let expiration = config.expiration.unwrap_or_else(Self::default_expiration);
        let mut msgs = Vec::with_capacity(2);
        if !authz_present {
            msgs.push(self.authz_grant_msg(primary, session, config, expiration));
        }
        if !feegrant_present {
            msgs.push(self.feegrant_msg(primary, session, config, expiration));
        }

        self.logger.debug(
            "Built conditional delegation messages",
            Some(&log_context! {
                "granter" => primary,
                "grantee" => session,
                "authzPresent" => authz_present,
                "feegrantPresent" => feegrant_present,
                "messages" => msgs.len(),
            }),
        );
        Ok(msgs)
    }
}

fn check_pair(primary: &str, session: &str) -> Result<()> {
    if primary.trim().is_empty() {
        return Err(SessionSdkError::InvalidAddress(
            "granter address is empty".to_string(),
        ));
    }
    if session.trim().is_empty() {
        return Err(SessionSdkError::InvalidAddress(
            "grantee address is empty".to_string(),
        ));
    }
    Ok(())
}
