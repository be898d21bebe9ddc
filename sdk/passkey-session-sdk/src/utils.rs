use crate::core::constants::{REST_PORT, RPC_PORT};
use crate::error::{Result, SessionSdkError};
use crate::types::Coin;
use url::Url;

//=============================================================================
// Endpoint Helpers
//=============================================================================

/// Derive the REST (LCD) base URL from a CometBFT RPC URL.
///
/// `26657` becomes `1317`, a leading `rpc.` becomes `api.` and `-rpc.`
/// becomes `-api.`. Only `http`/`https` are accepted.
pub fn rpc_to_rest_url(rpc_url: &str) -> Result<String> {
    let invalid = |reason: &str| SessionSdkError::InvalidRpcUrl {
        url: rpc_url.to_string(),
        reason: reason.to_string(),
    };

    let mut url = Url::parse(rpc_url).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("scheme must be http or https"));
    }
    let host = url
        .host_str()
        .ok_or_else(|| invalid("missing host"))?
        .to_string();

    let rest_host = match host.strip_prefix("rpc.") {
        Some(rest) => format!("api.{}", rest),
        None => host.replacen("-rpc.", "-api.", 1),
    };
    if rest_host != host {
        url.set_host(Some(&rest_host))
            .map_err(|e| invalid(&e.to_string()))?;
    }
    if url.port() == Some(RPC_PORT) {
        url.set_port(Some(REST_PORT))
            .map_err(|_| invalid("cannot set port"))?;
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.as_str().trim_end_matches('/').to_string())
}

//=============================================================================
// Input Validation
//=============================================================================

pub fn validate_address(address: &str) -> Result<()> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(SessionSdkError::InvalidAddress(
            "address is empty".to_string(),
        ));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(SessionSdkError::InvalidAddress(address.to_string()));
    }
    Ok(())
}

/// Non-empty list of coins with a denom and a positive integer amount each.
pub fn validate_amount(amount: &[Coin]) -> Result<()> {
    if amount.is_empty() {
        return Err(SessionSdkError::InvalidAmount(
            "amount list is empty".to_string(),
        ));
    }
    for coin in amount {
        if coin.denom.trim().is_empty() {
            return Err(SessionSdkError::InvalidAmount(format!(
                "coin {:?} has no denom",
                coin.amount
            )));
        }
        match coin.amount.parse::<u128>() {
            Ok(n) if n > 0 => {},
            _ => {
                return Err(SessionSdkError::InvalidAmount(format!(
                    "{:?}{} is not a positive integer amount",
                    coin.amount, coin.denom
                )))
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_url_maps_to_rest_url() {
        assert_eq!(
            rpc_to_rest_url("https://chain-rpc.example.com:26657").unwrap(),
            "https://chain-api.example.com:1317"
        );
        assert_eq!(
            rpc_to_rest_url("https://rpc.example.com").unwrap(),
            "https://api.example.com"
        );
        assert_eq!(
            rpc_to_rest_url("http://localhost:26657/").unwrap(),
            "http://localhost:1317"
        );
        assert_eq!(
            rpc_to_rest_url("https://node.example.com:443/atomone").unwrap(),
            "https://node.example.com/atomone"
        );
    }

    #[test]
    fn rejects_bad_rpc_urls() {
        for bad in ["ftp://bad", "not a url", "ws://rpc.example.com:26657", ""] {
            let err = rpc_to_rest_url(bad).unwrap_err();
            assert_eq!(err.code().as_str(), "INVALID_RPC_URL", "{bad}");
        }
    }

    #[test]
    fn amount_validation() {
        assert!(validate_amount(&[Coin::new(1, "uatone")]).is_ok());
        assert!(validate_amount(&[]).is_err());
        assert!(validate_amount(&[Coin::new(0, "uatone")]).is_err());
        assert!(validate_amount(&[Coin {
            denom: "uatone".into(),
            amount: "1.5".into()
        }])
        .is_err());
        assert!(validate_amount(&[Coin::new(1, "")]).is_err());
    }

    #[test]
    fn address_validation() {
        assert!(validate_address("atone1recipient").is_ok());
        assert_eq!(
            validate_address("  ").unwrap_err().code().as_str(),
            "INVALID_ADDRESS"
        );
        assert!(validate_address("atone1 space").is_err());
    }
}
