//! Best-effort lookups of the two grants over the chain's REST API.
//!
//! Every failure except a bad RPC URL resolves to "no grant": callers go on
//! to (re)issue the grant, which is always safe.

use crate::basic::delegation::GrantLookup;
use crate::core::constants::{MAX_RESPONSE_BYTES, MSG_SEND_TYPE_URL, QUERY_TIMEOUT};
use crate::error::{Result, SessionSdkError};
use crate::logger::{Logger, NoopLogger};
use crate::types::{Coin, FeegrantInfo, GrantInfo};
use crate::utils::rpc_to_rest_url;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

const ALLOWED_MSG_ALLOWANCE_TYPE_URL: &str = "/cosmos.feegrant.v1beta1.AllowedMsgAllowance";
const PERIODIC_ALLOWANCE_TYPE_URL: &str = "/cosmos.feegrant.v1beta1.PeriodicAllowance";

pub struct GrantStateClient {
    rpc_url: String,
    http: reqwest::Client,
    logger: Arc<dyn Logger>,
}

impl GrantStateClient {
    pub fn new(rpc_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(QUERY_TIMEOUT)
            .redirect(Policy::none())
            .build()
            .map_err(|e| SessionSdkError::ClientInitializationFailed(e.to_string()))?;
        Ok(Self {
            rpc_url: rpc_url.into(),
            http,
            logger: Arc::new(NoopLogger),
        })
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn rest_url(&self) -> Result<String> {
        rpc_to_rest_url(&self.rpc_url)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let rest = self.rest_url()?;
        let mut url = Url::parse(&rest).map_err(|e| SessionSdkError::InvalidRpcUrl {
            url: self.rpc_url.clone(),
            reason: e.to_string(),
        })?;
        url.path_segments_mut()
            .map_err(|_| SessionSdkError::InvalidRpcUrl {
                url: self.rpc_url.clone(),
                reason: "URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// The authz grant from `granter` to `grantee` for `msg_type_url` (default: bank send).
    pub async fn has_authz_grant(
        &self,
        granter: &str,
        grantee: &str,
        msg_type_url: Option<&str>,
    ) -> Result<Option<GrantInfo>> {
        let msg_type_url = msg_type_url.unwrap_or(MSG_SEND_TYPE_URL);
        let mut url = self.endpoint(&["cosmos", "authz", "v1beta1", "grants"])?;
        url.query_pairs_mut()
            .append_pair("granter", granter)
            .append_pair("grantee", grantee)
            .append_pair("msg_type_url", msg_type_url);

        let grant = self.get_json(url).await.and_then(|body| parse_authz_grant(&body));
        self.logger.debug(
            "Queried authz grant",
            Some(&log_context! {
                "granter" => granter,
                "grantee" => grantee,
                "msgType" => msg_type_url,
                "found" => grant.is_some(),
            }),
        );
        Ok(grant)
    }

    /// The fee allowance from `granter` to `grantee`.
    pub async fn has_feegrant(&self, granter: &str, grantee: &str) -> Result<Option<FeegrantInfo>> {
        let url = self.endpoint(&[
            "cosmos",
            "feegrant",
            "v1beta1",
            "allowance",
            granter,
            grantee,
        ])?;

        let allowance = self
            .get_json(url)
            .await
            .and_then(|body| parse_feegrant(&body));
        self.logger.debug(
            "Queried fee allowance",
            Some(&log_context! {
                "granter" => granter,
                "grantee" => grantee,
                "found" => allowance.is_some(),
            }),
        );
        Ok(allowance)
    }

    /// GET a JSON document, or `None` for any transport, status, type or size problem.
    async fn get_json(&self, url: Url) -> Option<Value> {
        let path = url.path().to_string();
        let mut response = match self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.logger.warn(
                    "Grant query failed",
                    Some(&log_context! {
                        "path" => path,
                        "timeout" => e.is_timeout(),
                        "error" => e.to_string(),
                    }),
                );
                return None;
            },
        };

        let status = response.status();
        if !status.is_success() {
            self.logger.debug(
                "Grant query returned non-success status",
                Some(&log_context! { "path" => path, "status" => status.as_u16() }),
            );
            return None;
        }

        if !is_json_content_type(response.headers().get(CONTENT_TYPE)) {
            self.logger.warn(
                "Grant query returned non-JSON content",
                Some(&log_context! { "path" => path, "status" => status.as_u16() }),
            );
            return None;
        }

        if response
            .content_length()
            .map_or(false, |len| len > MAX_RESPONSE_BYTES as u64)
        {
            self.logger.warn(
                "Grant query response exceeds size ceiling",
                Some(&log_context! { "path" => path, "limit" => MAX_RESPONSE_BYTES }),
            );
            return None;
        }

        let mut body = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if body.len() + chunk.len() > MAX_RESPONSE_BYTES {
                        self.logger.warn(
                            "Grant query response exceeds size ceiling",
                            Some(&log_context! { "path" => path, "limit" => MAX_RESPONSE_BYTES }),
                        );
                        return None;
                    }
                    body.extend_from_slice(&chunk);
                },
                Ok(None) => break,
                Err(e) => {
                    self.logger.warn(
                        "Grant query body could not be read",
                        Some(&log_context! { "path" => path, "error" => e.to_string() }),
                    );
                    return None;
                },
            }
        }

        serde_json::from_slice(&body).ok()
    }
}

#[async_trait]
impl GrantLookup for GrantStateClient {
    async fn has_authz_grant(
        &self,
        granter: &str,
        grantee: &str,
        msg_type_url: Option<&str>,
    ) -> Result<Option<GrantInfo>> {
        GrantStateClient::has_authz_grant(self, granter, grantee, msg_type_url).await
    }

    async fn has_feegrant(&self, granter: &str, grantee: &str) -> Result<Option<FeegrantInfo>> {
        GrantStateClient::has_feegrant(self, granter, grantee).await
    }
}

fn is_json_content_type(value: Option<&reqwest::header::HeaderValue>) -> bool {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map_or(false, |media| {
            media.trim().eq_ignore_ascii_case("application/json")
        })
}

//=============================================================================
// Response Parsing
//=============================================================================

/// `Some(None)` for an absent/null expiration, `None` for an unparseable one.
fn parse_expiration(value: Option<&Value>) -> Option<Option<DateTime<Utc>>> {
    match value {
        None | Some(Value::Null) => Some(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| Some(t.with_timezone(&Utc))),
        Some(_) => None,
    }
}

fn parse_coins(value: Option<&Value>) -> Vec<Coin> {
    value
        .and_then(Value::as_array)
        .map(|coins| {
            coins
                .iter()
                .filter_map(|c| serde_json::from_value(c.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// First grant of a `QueryGrantsResponse`
pub fn parse_authz_grant(body: &Value) -> Option<GrantInfo> {
    let grant = body.get("grants")?.as_array()?.first()?;
    let authorization = grant.get("authorization")?;
    let authorization_type = authorization.get("@type")?.as_str()?.to_string();
    let expiration = parse_expiration(grant.get("expiration"))?;
    let allow_list = authorization
        .get("allow_list")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|a| a.as_str().map(str::to_string))
                .collect()
        });

    Some(GrantInfo {
        authorization_type,
        expiration,
        spend_limit: parse_coins(authorization.get("spend_limit")),
        allow_list,
    })
}

/// `QueryAllowanceResponse`, looking through wrapper allowances for the effective limit
pub fn parse_feegrant(body: &Value) -> Option<FeegrantInfo> {
    let allowance = body.get("allowance")?.get("allowance")?;
    let allowance_type = allowance.get("@type")?.as_str()?.to_string();

    let mut effective = allowance;
    loop {
        match effective.get("@type").and_then(Value::as_str) {
            Some(ALLOWED_MSG_ALLOWANCE_TYPE_URL) => effective = effective.get("allowance")?,
            Some(PERIODIC_ALLOWANCE_TYPE_URL) => effective = effective.get("basic")?,
            _ => break,
        }
    }

    Some(FeegrantInfo {
        allowance_type,
        expiration: parse_expiration(effective.get("expiration"))?,
        spend_limit: parse_coins(effective.get("spend_limit")),
    })
}
