//! Typed ledger messages and raw constructors.
//!
//! Values follow the camelCase `EncodeObject` shape (`{ typeUrl, value }`)
//! expected by chain clients; protobuf encoding happens in the client.

use crate::core::constants::*;
use crate::types::Coin;
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Permission carried by an authz grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "typeUrl", content = "value")]
pub enum Authorization {
    /// Bank sends up to `spend_limit`, optionally only to `allow_list`
    #[serde(rename = "/cosmos.bank.v1beta1.SendAuthorization", rename_all = "camelCase")]
    Send {
        spend_limit: Vec<Coin>,
        #[serde(skip_serializing_if = "Option::is_none")]
        allow_list: Option<Vec<String>>,
    },
    /// Unrestricted for one message type
    #[serde(rename = "/cosmos.authz.v1beta1.GenericAuthorization")]
    Generic { msg: String },
}

impl Authorization {
    pub fn type_url(&self) -> &'static str {
        match self {
            Authorization::Send { .. } => SEND_AUTHORIZATION_TYPE_URL,
            Authorization::Generic { .. } => GENERIC_AUTHORIZATION_TYPE_URL,
        }
    }

    /// The message type this authorization lets the grantee execute
    pub fn msg_type_url(&self) -> &str {
        match self {
            Authorization::Send { .. } => MSG_SEND_TYPE_URL,
            Authorization::Generic { msg } => msg,
        }
    }
}

/// Fee allowance carried by a feegrant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "typeUrl", content = "value")]
pub enum FeeAllowance {
    #[serde(rename = "/cosmos.feegrant.v1beta1.BasicAllowance", rename_all = "camelCase")]
    Basic {
        spend_limit: Vec<Coin>,
        #[serde(skip_serializing_if = "Option::is_none")]
        expiration: Option<DateTime<Utc>>,
    },
}

impl FeeAllowance {
    pub fn type_url(&self) -> &'static str {
        match self {
            FeeAllowance::Basic { .. } => BASIC_ALLOWANCE_TYPE_URL,
        }
    }

    pub fn spend_limit(&self) -> &[Coin] {
        match self {
            FeeAllowance::Basic { spend_limit, .. } => spend_limit,
        }
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        match self {
            FeeAllowance::Basic { expiration, .. } => *expiration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub authorization: Authorization,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgGrant {
    pub granter: String,
    pub grantee: String,
    pub grant: Grant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgRevoke {
    pub granter: String,
    pub grantee: String,
    pub msg_type_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgGrantAllowance {
    pub granter: String,
    pub grantee: String,
    pub allowance: FeeAllowance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgRevokeAllowance {
    pub granter: String,
    pub grantee: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgSend {
    pub from_address: String,
    pub to_address: String,
    pub amount: Vec<Coin>,
}

/// Delegated-execution envelope: `grantee` runs `msgs` as their signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgExec {
    pub grantee: String,
    pub msgs: Vec<Msg>,
}

/// Any message the SDK has no typed form for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnyMsg {
    pub type_url: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    Grant(MsgGrant),
    Revoke(MsgRevoke),
    GrantAllowance(MsgGrantAllowance),
    RevokeAllowance(MsgRevokeAllowance),
    Send(MsgSend),
    Exec(MsgExec),
    Any(AnyMsg),
}

impl Msg {
    pub fn type_url(&self) -> &str {
        match self {
            Msg::Grant(_) => MSG_GRANT_TYPE_URL,
            Msg::Revoke(_) => MSG_REVOKE_TYPE_URL,
            Msg::GrantAllowance(_) => MSG_GRANT_ALLOWANCE_TYPE_URL,
            Msg::RevokeAllowance(_) => MSG_REVOKE_ALLOWANCE_TYPE_URL,
            Msg::Send(_) => MSG_SEND_TYPE_URL,
            Msg::Exec(_) => MSG_EXEC_TYPE_URL,
            Msg::Any(any) => &any.type_url,
        }
    }
}

impl Serialize for Msg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Msg", 2)?;
        state.serialize_field("typeUrl", self.type_url())?;
        match self {
            Msg::Grant(m) => state.serialize_field("value", m)?,
            Msg::Revoke(m) => state.serialize_field("value", m)?,
            Msg::GrantAllowance(m) => state.serialize_field("value", m)?,
            Msg::RevokeAllowance(m) => state.serialize_field("value", m)?,
            Msg::Send(m) => state.serialize_field("value", m)?,
            Msg::Exec(m) => state.serialize_field("value", m)?,
            Msg::Any(m) => state.serialize_field("value", &m.value)?,
        }
        state.end()
    }
}

//=============================================================================
// Raw constructors
//=============================================================================

pub fn grant(
    granter: &str,
    grantee: &str,
    authorization: Authorization,
    expiration: Option<DateTime<Utc>>,
) -> Msg {
    Msg::Grant(MsgGrant {
        granter: granter.to_string(),
        grantee: grantee.to_string(),
        grant: Grant {
            authorization,
            expiration,
        },
    })
}

pub fn revoke(granter: &str, grantee: &str, msg_type_url: &str) -> Msg {
    Msg::Revoke(MsgRevoke {
        granter: granter.to_string(),
        grantee: grantee.to_string(),
        msg_type_url: msg_type_url.to_string(),
    })
}

pub fn grant_allowance(granter: &str, grantee: &str, allowance: FeeAllowance) -> Msg {
    Msg::GrantAllowance(MsgGrantAllowance {
        granter: granter.to_string(),
        grantee: grantee.to_string(),
        allowance,
    })
}

pub fn revoke_allowance(granter: &str, grantee: &str) -> Msg {
    Msg::RevokeAllowance(MsgRevokeAllowance {
        granter: granter.to_string(),
        grantee: grantee.to_string(),
    })
}

pub fn send(from_address: &str, to_address: &str, amount: Vec<Coin>) -> Msg {
    Msg::Send(MsgSend {
        from_address: from_address.to_string(),
        to_address: to_address.to_string(),
        amount,
    })
}

pub fn exec(grantee: &str, msgs: Vec<Msg>) -> Msg {
    Msg::Exec(MsgExec {
        grantee: grantee.to_string(),
        msgs,
    })
}

pub fn any(type_url: impl Into<String>, value: Value) -> Msg {
    Msg::Any(AnyMsg {
        type_url: type_url.into(),
        value,
    })
}
