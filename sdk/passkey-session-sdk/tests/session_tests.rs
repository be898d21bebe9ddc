use passkey_session_sdk::{
    advanced::messages::Msg,
    core::authenticator::PlatformAuthenticator,
    core::constants::{MSG_EXEC_TYPE_URL, MSG_GRANT_ALLOWANCE_TYPE_URL, MSG_GRANT_TYPE_URL},
    types::{Coin, DeliverTxResponse, FeeOption},
    ChainConfig, DelegationConfig, EphemeralKeyStore, GasPrice, SessionConfig, SessionSigner,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{MockChainClient, MockConnector, ScriptedAuthenticator, PRIMARY, SESSION};

//=============================================================================
// Test Helpers
//=============================================================================

const RPC_URL: &str = "http://localhost:26657";

fn config() -> SessionConfig {
    SessionConfig::new().with_rp_id("wallet.example.com")
}

async fn connect_with(
    primary: &MockChainClient,
    authenticator: Arc<ScriptedAuthenticator>,
) -> anyhow::Result<SessionSigner<MockChainClient>> {
    let authenticator: Arc<dyn PlatformAuthenticator> = authenticator;
    Ok(SessionSigner::builder(MockConnector::new(SESSION))
        .with_config(config())
        .with_authenticator(authenticator)
        .connect(primary)
        .await?)
}

async fn connect(primary: &MockChainClient) -> anyhow::Result<SessionSigner<MockChainClient>> {
    connect_with(primary, Arc::new(ScriptedAuthenticator::new())).await
}

//=============================================================================
// Construction
//=============================================================================

#[test_log::test(tokio::test)]
async fn test_connect_fixes_both_addresses() -> anyhow::Result<()> {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let signer = connect(&primary).await?;

    assert_eq!(signer.primary_address(), PRIMARY);
    assert_eq!(signer.session_address(), SESSION);
    assert!(signer.credential_id().is_some());
    assert_eq!(signer.client().rpc_url, RPC_URL);
    assert_eq!(signer.grants().rest_url()?, "http://localhost:1317");
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_reconnect_in_same_window_uses_same_key() -> anyhow::Result<()> {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let authenticator: Arc<dyn PlatformAuthenticator> = Arc::new(ScriptedAuthenticator::new());
    let connector = MockConnector::new(SESSION);
    let keys = connector.keys.clone();

    let first = SessionSigner::builder(connector)
        .with_config(config())
        .with_authenticator(authenticator.clone())
        .with_window_number(100)
        .connect(&primary)
        .await?;
    let second = SessionSigner::builder(MockConnector {
        keys: keys.clone(),
        ..MockConnector::new(SESSION)
    })
    .with_config(config())
    .with_authenticator(authenticator)
    .with_window_number(100)
    .connect(&primary)
    .await?;

    assert_eq!(first.window().window_number, 100);
    assert_eq!(first.window(), second.window());
    let keys = keys.lock().await;
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0], keys[1]);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_previous_window_derives_different_key() -> anyhow::Result<()> {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let authenticator: Arc<dyn PlatformAuthenticator> = Arc::new(ScriptedAuthenticator::new());
    let connector = MockConnector::new(SESSION);
    let keys = connector.keys.clone();

    let current = SessionSigner::builder(connector)
        .with_config(config())
        .with_authenticator(authenticator.clone())
        .connect(&primary)
        .await?;
    let previous = current.window().previous().expect("not the first window");
    SessionSigner::builder(MockConnector {
        keys: keys.clone(),
        ..MockConnector::new(SESSION)
    })
    .with_config(config())
    .with_authenticator(authenticator)
    .with_window_number(previous.window_number)
    .connect(&primary)
    .await?;

    let keys = keys.lock().await;
    assert_ne!(keys[0], keys[1]);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_random_key_mode_skips_passkey() -> anyhow::Result<()> {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let mut store = EphemeralKeyStore::new();

    let signer = SessionSigner::builder(MockConnector::new(SESSION))
        .with_config(config())
        .with_derived_key(store.key_for("checkout")?)
        .connect(&primary)
        .await?;

    assert_eq!(signer.session_address(), SESSION);
    assert!(signer.credential_id().is_none());
    store.clear();
    assert!(store.is_empty());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_missing_authenticator_is_unsupported() {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let err = SessionSigner::builder(MockConnector::new(SESSION))
        .with_config(config())
        .connect(&primary)
        .await
        .err()
        .expect("connect should fail");
    assert_eq!(err.code().as_str(), "WEBAUTHN_NOT_SUPPORTED");
}

#[test_log::test(tokio::test)]
async fn test_invalid_hostname_fails_before_ceremony() {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let authenticator = Arc::new(ScriptedAuthenticator::new());
    let dyn_authenticator: Arc<dyn PlatformAuthenticator> = authenticator.clone();

    let err = SessionSigner::builder(MockConnector::new(SESSION))
        .with_config(config().with_rp_id("https://wallet.example.com"))
        .with_authenticator(dyn_authenticator)
        .connect(&primary)
        .await
        .err()
        .expect("connect should fail");

    assert_eq!(err.code().as_str(), "INVALID_HOSTNAME");
    assert_eq!(authenticator.assertion_count(), 0);
}

#[test_log::test(tokio::test)]
async fn test_connector_failure_is_client_initialization_error() {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let authenticator: Arc<dyn PlatformAuthenticator> = Arc::new(ScriptedAuthenticator::new());

    let err = SessionSigner::builder(MockConnector::failing())
        .with_config(config())
        .with_authenticator(authenticator)
        .connect(&primary)
        .await
        .err()
        .expect("connect should fail");
    assert_eq!(err.code().as_str(), "CLIENT_INITIALIZATION_FAILED");
}

#[test_log::test(tokio::test)]
async fn test_primary_without_accounts_is_client_initialization_error() {
    let primary = MockChainClient::new(RPC_URL, "");
    let err = connect(&primary).await.err().expect("connect should fail");
    let err = err.downcast::<passkey_session_sdk::SessionSdkError>().unwrap();
    assert_eq!(err.code().as_str(), "CLIENT_INITIALIZATION_FAILED");
}

//=============================================================================
// Delegation
//=============================================================================

#[test_log::test(tokio::test)]
async fn test_generate_delegation_messages_scenario() -> anyhow::Result<()> {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let signer = connect(&primary).await?;

    let msgs = signer.generate_delegation_messages(&DelegationConfig::default())?;

    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].type_url(), MSG_GRANT_TYPE_URL);
    assert_eq!(msgs[1].type_url(), MSG_GRANT_ALLOWANCE_TYPE_URL);
    let json = serde_json::to_value(&msgs)?;
    for msg in json.as_array().unwrap() {
        assert_eq!(msg["value"]["granter"], PRIMARY);
        assert_eq!(msg["value"]["grantee"], SESSION);
    }

    let revoke = signer.revoke_delegation_messages(None)?;
    assert_eq!(revoke.len(), 2);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_authorize_issues_missing_grants_with_primary() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cosmos/authz/v1beta1/grants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "grants": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/cosmos/feegrant/v1beta1/allowance/{}/{}",
            PRIMARY, SESSION
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "allowance": {
                "granter": PRIMARY,
                "grantee": SESSION,
                "allowance": {
                    "@type": "/cosmos.feegrant.v1beta1.BasicAllowance",
                    "spend_limit": [],
                    "expiration": null
                }
            }
        })))
        .mount(&server)
        .await;

    let primary = MockChainClient::new(&server.uri(), PRIMARY);
    let signer = connect(&primary).await?;

    assert!(signer.has_authz_grant(None).await?.is_none());
    assert!(signer.has_feegrant().await?.is_some());

    let tx = signer
        .authorize(&primary, &DelegationConfig::default())
        .await?
        .expect("authz grant was missing");
    assert_eq!(tx.transaction_hash, "A1B2C3");

    let broadcasts = primary.broadcasts().await;
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].signer, PRIMARY);
    assert_eq!(broadcasts[0].fee, FeeOption::Auto);
    let types: Vec<&str> = broadcasts[0].msgs.iter().map(Msg::type_url).collect();
    assert_eq!(types, vec![MSG_GRANT_TYPE_URL]);
    Ok(())
}

//=============================================================================
// Delegated Execution
//=============================================================================

#[test_log::test(tokio::test)]
async fn test_send_wraps_in_exec_with_fee_granter() -> anyhow::Result<()> {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let signer = connect(&primary).await?;

    let tx = signer
        .send("atone1recipient", vec![Coin::new(1_500, "uphoton")], "coffee")
        .await?;
    assert_eq!(tx.height, 42);

    let broadcasts = signer.client().broadcasts().await;
    assert_eq!(broadcasts.len(), 1);
    let broadcast = &broadcasts[0];
    assert_eq!(broadcast.signer, SESSION);
    assert_eq!(broadcast.memo, "coffee");

    let [Msg::Exec(exec)] = broadcast.msgs.as_slice() else {
        panic!("expected a single MsgExec, got {:?}", broadcast.msgs);
    };
    assert_eq!(exec.grantee, SESSION);
    let [Msg::Send(send)] = exec.msgs.as_slice() else {
        panic!("expected a single MsgSend, got {:?}", exec.msgs);
    };
    assert_eq!(send.from_address, PRIMARY);
    assert_eq!(send.to_address, "atone1recipient");

    let FeeOption::Explicit(fee) = &broadcast.fee else {
        panic!("expected explicit fee");
    };
    // 100_000 simulated * 1.4 = 140_000 gas at 0.025uphoton
    assert_eq!(fee.gas, 140_000);
    assert_eq!(fee.amount, vec![Coin::new(3_500, "uphoton")]);
    assert_eq!(fee.granter.as_deref(), Some(PRIMARY));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_send_validates_before_network() -> anyhow::Result<()> {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let signer = connect(&primary).await?;

    let err = signer
        .send("", vec![Coin::new(1, "uphoton")], "")
        .await
        .unwrap_err();
    assert_eq!(err.code().as_str(), "INVALID_ADDRESS");

    let err = signer.send("atone1recipient", vec![], "").await.unwrap_err();
    assert_eq!(err.code().as_str(), "INVALID_AMOUNT");

    assert_eq!(signer.client().simulation_count(), 0);
    assert!(signer.client().broadcasts().await.is_empty());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_custom_wraps_arbitrary_messages() -> anyhow::Result<()> {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let signer = connect(&primary).await?;

    let vote = passkey_session_sdk::advanced::messages::any(
        "/cosmos.gov.v1beta1.MsgVote",
        json!({ "proposalId": "7", "voter": PRIMARY, "option": 1 }),
    );
    signer.custom(vec![vote], "").await?;

    let broadcasts = signer.client().broadcasts().await;
    let json = serde_json::to_value(&broadcasts[0].msgs)?;
    assert_eq!(json[0]["typeUrl"], MSG_EXEC_TYPE_URL);
    assert_eq!(json[0]["value"]["grantee"], SESSION);
    assert_eq!(json[0]["value"]["msgs"][0]["typeUrl"], "/cosmos.gov.v1beta1.MsgVote");
    assert_eq!(json[0]["value"]["msgs"][0]["value"]["voter"], PRIMARY);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_nonzero_code_surfaces_raw_log() -> anyhow::Result<()> {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let raw_log = "failed to execute message; message index: 0: spend limit exceeded";
    let rejecting = MockChainClient::new(RPC_URL, SESSION).with_response(DeliverTxResponse {
        code: 4,
        transaction_hash: "DEADBEEF".to_string(),
        raw_log: Some(raw_log.to_string()),
        ..Default::default()
    });
    let signer = SessionSigner::builder(MockConnectorReturning::new(rejecting))
        .with_config(config())
        .with_derived_key(EphemeralKeyStore::new().key_for("checkout")?)
        .connect(&primary)
        .await?;

    let err = signer
        .send("atone1recipient", vec![Coin::new(1, "uphoton")], "")
        .await
        .unwrap_err();

    assert_eq!(err.code().as_str(), "TRANSACTION_FAILED");
    assert!(err.to_string().contains(raw_log));
    let context = err.context().unwrap();
    assert_eq!(context["rawLog"], raw_log);
    assert_eq!(context["code"], 4);
    assert_eq!(context["txHash"], "DEADBEEF");
    assert_eq!(context["signer"], SESSION);
    assert_eq!(context["granter"], PRIMARY);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_transport_failure_is_broadcast_error() -> anyhow::Result<()> {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let failing = MockChainClient::new(RPC_URL, SESSION).with_transport_failure();
    let signer = SessionSigner::builder(MockConnectorReturning::new(failing))
        .with_config(config())
        .with_derived_key(EphemeralKeyStore::new().key_for("checkout")?)
        .connect(&primary)
        .await?;

    let err = signer
        .send("atone1recipient", vec![Coin::new(1, "uphoton")], "")
        .await
        .unwrap_err();
    assert_eq!(err.code().as_str(), "BROADCAST_FAILED");
    let context = err.context().unwrap();
    assert_eq!(context["signer"], SESSION);
    assert_eq!(context["granter"], PRIMARY);
    Ok(())
}

//=============================================================================
// Fee Denom
//=============================================================================

#[test_log::test(tokio::test)]
async fn test_execution_fee_uses_allowance_denom() -> anyhow::Result<()> {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let mut session = MockChainClient::new(RPC_URL, SESSION);
    session.gas_price = Some(GasPrice {
        amount: 0.5,
        denom: "uphoton".to_string(),
    });
    let signer = SessionSigner::builder(MockConnectorReturning::new(session))
        .with_config(config().with_chain(ChainConfig::default().with_fee_denom("uatone")))
        .with_derived_key(EphemeralKeyStore::new().key_for("checkout")?)
        .connect(&primary)
        .await?;

    let grants = serde_json::to_value(signer.generate_delegation_messages(&DelegationConfig::default())?)?;
    assert_eq!(
        grants[1]["value"]["allowance"]["value"]["spendLimit"][0]["denom"],
        "uatone"
    );

    signer
        .send("atone1recipient", vec![Coin::new(1, "uatone")], "")
        .await?;
    let broadcasts = signer.client().broadcasts().await;
    let FeeOption::Explicit(fee) = &broadcasts[0].fee else {
        panic!("expected explicit fee");
    };
    assert_eq!(fee.amount, vec![Coin::new(3_500, "uatone")]);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_gas_price_in_other_denom_is_rejected() {
    let primary = MockChainClient::new(RPC_URL, PRIMARY);
    let chain = ChainConfig::default()
        .with_fee_denom("uatone")
        .with_gas_price(0.01, "uphoton");

    let err = SessionSigner::builder(MockConnector::new(SESSION))
        .with_config(config().with_chain(chain))
        .with_derived_key(EphemeralKeyStore::new().key_for("checkout").unwrap())
        .connect(&primary)
        .await
        .err()
        .expect("connect should fail");
    assert_eq!(err.code().as_str(), "INVALID_AMOUNT");
}

/// Hands out one preconfigured client.
struct MockConnectorReturning(std::sync::Mutex<Option<MockChainClient>>);

impl MockConnectorReturning {
    fn new(client: MockChainClient) -> Self {
        Self(std::sync::Mutex::new(Some(client)))
    }
}

#[async_trait::async_trait]
impl passkey_session_sdk::ChainConnector for MockConnectorReturning {
    type Client = MockChainClient;

    async fn connect_with_key(
        &self,
        _rpc_url: &str,
        _key: &passkey_session_sdk::DerivedKey,
        _chain: &passkey_session_sdk::ChainConfig,
    ) -> Result<MockChainClient, passkey_session_sdk::error::BoxError> {
        self.0
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| "already connected".into())
    }
}
