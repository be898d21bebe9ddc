#![allow(dead_code)]

use async_trait::async_trait;
use passkey_session_sdk::{
    advanced::messages::Msg,
    basic::delegation::GrantLookup,
    config::{ChainConfig, GasPrice},
    core::{
        authenticator::{
            AssertionRequest, AssertionResponse, AttestationResponse, CeremonyError,
            CeremonyErrorKind, CreationRequest, CredentialId, PlatformAuthenticator,
        },
        connection::{ChainClient, ChainConnector},
    },
    error::BoxError,
    passkey::derive::DerivedKey,
    types::{AccountData, DeliverTxResponse, FeeOption, FeegrantInfo, GrantInfo},
};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const PRIMARY: &str = "atone1primary";
pub const SESSION: &str = "atone1session";
pub const CANCEL_MESSAGE: &str =
    "The operation either timed out or was not allowed. See: https://www.w3.org/TR/webauthn-2/#sctn-privacy-considerations-client.";

//=============================================================================
// Chain client
//=============================================================================

#[derive(Debug, Clone)]
pub struct Broadcast {
    pub signer: String,
    pub msgs: Vec<Msg>,
    pub fee: FeeOption,
    pub memo: String,
}

pub struct MockChainClient {
    pub rpc_url: String,
    pub address: String,
    pub gas_price: Option<GasPrice>,
    pub simulated_gas: u64,
    pub response: DeliverTxResponse,
    pub fail_transport: bool,
    pub simulations: AtomicUsize,
    pub broadcasts: Mutex<Vec<Broadcast>>,
}

impl MockChainClient {
    pub fn new(rpc_url: &str, address: &str) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            address: address.to_string(),
            gas_price: None,
            simulated_gas: 100_000,
            response: DeliverTxResponse {
                code: 0,
                transaction_hash: "A1B2C3".to_string(),
                height: 42,
                gas_used: 90_000,
                gas_wanted: 140_000,
                raw_log: None,
            },
            fail_transport: false,
            simulations: AtomicUsize::new(0),
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, response: DeliverTxResponse) -> Self {
        self.response = response;
        self
    }

    pub fn with_transport_failure(mut self) -> Self {
        self.fail_transport = true;
        self
    }

    pub fn simulation_count(&self) -> usize {
        self.simulations.load(Ordering::SeqCst)
    }

    pub async fn broadcasts(&self) -> Vec<Broadcast> {
        self.broadcasts.lock().await.clone()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    fn gas_price(&self) -> Option<GasPrice> {
        self.gas_price.clone()
    }

    async fn accounts(&self) -> Result<Vec<AccountData>, BoxError> {
        if self.address.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![AccountData {
            address: self.address.clone(),
            pubkey: vec![0x02; 33],
        }])
    }

    async fn simulate(&self, _signer: &str, _msgs: &[Msg], _memo: &str) -> Result<u64, BoxError> {
        self.simulations.fetch_add(1, Ordering::SeqCst);
        if self.fail_transport {
            return Err("connection refused".into());
        }
        Ok(self.simulated_gas)
    }

    async fn sign_and_broadcast(
        &self,
        signer: &str,
        msgs: &[Msg],
        fee: FeeOption,
        memo: &str,
    ) -> Result<DeliverTxResponse, BoxError> {
        if self.fail_transport {
            return Err("connection refused".into());
        }
        self.broadcasts.lock().await.push(Broadcast {
            signer: signer.to_string(),
            msgs: msgs.to_vec(),
            fee,
            memo: memo.to_string(),
        });
        Ok(self.response.clone())
    }
}

//=============================================================================
// Connector
//=============================================================================

/// Connects every key as `session_address`, recording the keys it saw.
pub struct MockConnector {
    pub session_address: String,
    pub fail: bool,
    pub keys: Arc<Mutex<Vec<[u8; 32]>>>,
}

impl MockConnector {
    pub fn new(session_address: &str) -> Self {
        Self {
            session_address: session_address.to_string(),
            fail: false,
            keys: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(SESSION)
        }
    }
}

#[async_trait]
impl ChainConnector for MockConnector {
    type Client = MockChainClient;

    async fn connect_with_key(
        &self,
        rpc_url: &str,
        key: &DerivedKey,
        _chain: &ChainConfig,
    ) -> Result<MockChainClient, BoxError> {
        if self.fail {
            return Err("unable to reach node".into());
        }
        self.keys.lock().await.push(*key.private_key());
        Ok(MockChainClient::new(rpc_url, &self.session_address))
    }
}

//=============================================================================
// Authenticator
//=============================================================================

/// Software authenticator with a fixed PRF secret and scripted failures.
pub struct ScriptedAuthenticator {
    pub available: bool,
    pub secret: [u8; 32],
    pub prf_enabled: bool,
    pub prf_on_discovery: bool,
    pub prf_on_create: bool,
    pub discovery_error: Option<CeremonyError>,
    pub assertion_error: Option<CeremonyError>,
    pub create_error: Option<CeremonyError>,
    pub credentials: std::sync::Mutex<Vec<(CredentialId, Vec<u8>)>>,
    pub assertions: AtomicUsize,
    pub creations: AtomicUsize,
}

impl ScriptedAuthenticator {
    pub fn new() -> Self {
        Self {
            available: true,
            secret: [7u8; 32],
            prf_enabled: true,
            prf_on_discovery: true,
            prf_on_create: true,
            discovery_error: None,
            assertion_error: None,
            create_error: None,
            credentials: std::sync::Mutex::new(Vec::new()),
            assertions: AtomicUsize::new(0),
            creations: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Pre-enroll a credential for `user_handle`.
    pub fn with_credential(self, id: &[u8], user_handle: &str) -> Self {
        self.credentials
            .lock()
            .unwrap()
            .push((CredentialId(id.to_vec()), user_handle.as_bytes().to_vec()));
        self
    }

    pub fn prf(&self, credential_id: &CredentialId, salt: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(self.secret);
        hasher.update(credential_id.as_bytes());
        hasher.update(salt);
        hasher.finalize().to_vec()
    }

    fn prf_results(&self, credential_id: &CredentialId, salt: &[u8]) -> Value {
        json!({ "prf": { "results": { "first": self.prf(credential_id, salt) } } })
    }

    pub fn assertion_count(&self) -> usize {
        self.assertions.load(Ordering::SeqCst)
    }

    pub fn creation_count(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.lock().unwrap().len()
    }
}

#[async_trait]
impl PlatformAuthenticator for ScriptedAuthenticator {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn get_assertion(
        &self,
        request: &AssertionRequest,
    ) -> Result<Option<AssertionResponse>, CeremonyError> {
        self.assertions.fetch_add(1, Ordering::SeqCst);
        let credentials = self.credentials.lock().unwrap().clone();

        if request.is_discovery() {
            if let Some(e) = &self.discovery_error {
                return Err(e.clone());
            }
            let Some((id, handle)) = credentials.into_iter().next() else {
                return Err(CeremonyError::new(CeremonyErrorKind::NotAllowed, CANCEL_MESSAGE));
            };
            let extensions = if self.prf_enabled && self.prf_on_discovery {
                self.prf_results(&id, &request.prf_eval_first)
            } else {
                json!({})
            };
            return Ok(Some(AssertionResponse {
                credential_id: id,
                user_handle: Some(handle),
                client_extension_results: extensions,
            }));
        }

        if let Some(e) = &self.assertion_error {
            return Err(e.clone());
        }
        let Some((id, handle)) = credentials
            .into_iter()
            .find(|(id, _)| request.allow_credentials.contains(id))
        else {
            return Err(CeremonyError::new(CeremonyErrorKind::NotAllowed, CANCEL_MESSAGE));
        };
        let extensions = if self.prf_enabled {
            self.prf_results(&id, &request.prf_eval_first)
        } else {
            json!({})
        };
        Ok(Some(AssertionResponse {
            credential_id: id,
            user_handle: Some(handle),
            client_extension_results: extensions,
        }))
    }

    async fn create_credential(
        &self,
        request: &CreationRequest,
    ) -> Result<Option<AttestationResponse>, CeremonyError> {
        let n = self.creations.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.create_error {
            return Err(e.clone());
        }
        let id = CredentialId(vec![0xC0, n as u8 + 1]);
        self.credentials
            .lock()
            .unwrap()
            .insert(0, (id.clone(), request.user_id.clone()));

        let extensions = match (&request.prf_eval_first, self.prf_enabled, self.prf_on_create) {
            (_, false, _) => json!({ "prf": { "enabled": false } }),
            (Some(salt), true, true) => json!({
                "prf": { "enabled": true, "results": { "first": self.prf(&id, salt) } }
            }),
            _ => json!({ "prf": { "enabled": true } }),
        };
        Ok(Some(AttestationResponse {
            credential_id: id,
            client_extension_results: extensions,
        }))
    }
}

//=============================================================================
// Grant lookup
//=============================================================================

#[derive(Default)]
pub struct StaticGrants {
    pub authz: Option<GrantInfo>,
    pub feegrant: Option<FeegrantInfo>,
}

#[async_trait]
impl GrantLookup for StaticGrants {
    async fn has_authz_grant(
        &self,
        _granter: &str,
        _grantee: &str,
        _msg_type_url: Option<&str>,
    ) -> passkey_session_sdk::Result<Option<GrantInfo>> {
        Ok(self.authz.clone())
    }

    async fn has_feegrant(
        &self,
        _granter: &str,
        _grantee: &str,
    ) -> passkey_session_sdk::Result<Option<FeegrantInfo>> {
        Ok(self.feegrant.clone())
    }
}

pub fn send_grant(expiration: Option<chrono::DateTime<chrono::Utc>>) -> GrantInfo {
    GrantInfo {
        authorization_type: "/cosmos.bank.v1beta1.SendAuthorization".to_string(),
        expiration,
        spend_limit: Vec::new(),
        allow_list: None,
    }
}

pub fn basic_allowance(expiration: Option<chrono::DateTime<chrono::Utc>>) -> FeegrantInfo {
    FeegrantInfo {
        allowance_type: "/cosmos.feegrant.v1beta1.BasicAllowance".to_string(),
        expiration,
        spend_limit: Vec::new(),
    }
}
