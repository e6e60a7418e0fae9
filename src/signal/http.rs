//! Shared HTTP plumbing for the upstream clients.
//!
//! Every transport, status and decode failure is folded into a [`FetchError`].

use crate::utils::error::FetchError;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("cryptopulse/", env!("CARGO_PKG_VERSION"));

/// Build a client with a hard request timeout.
pub fn client(timeout: Duration) -> crate::Result<Client> {
    let client = Client::builder().timeout(timeout).user_agent(USER_AGENT).build()?;
    Ok(client)
}

/// Join `path` onto `base`, keeping every segment of `base`.
pub fn join_url(base: &str, path: &str) -> Result<Url, FetchError> {
    let base = if base.ends_with('/') { base.to_string() } else { format!("{base}/") };
    Url::parse(&base)
        .and_then(|b| b.join(path.trim_start_matches('/')))
        .map_err(|e| FetchError::NetworkUnavailable(format!("bad url {base}{path}: {e}")))
}

/// Send the request and return the body of a 2xx response.
pub async fn get_text(req: RequestBuilder) -> Result<String, FetchError> {
    let resp = req.send().await?;
    if let Some(err) = FetchError::from_status(resp.status().as_u16()) {
        return Err(err);
    }
    Ok(resp.text().await?)
}

/// Send the request and decode a 2xx JSON body.
pub async fn get_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, FetchError> {
    let body = get_text(req).await?;
    serde_json::from_str(&body).map_err(FetchError::from)
}

/// Accept `"72"` as well as `72`.
pub fn as_f64(v: &serde_json::Value) -> Option<f64> {
    match v {
        | serde_json::Value::Number(n) => n.as_f64(),
        | serde_json::Value::String(s) => s.trim().parse().ok(),
        | _ => None,
    }
}

/// Integer amounts arrive as strings (`"1000000"`) or plain numbers.
pub fn as_integer_string(v: &serde_json::Value) -> Option<String> {
    match v {
        | serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        | serde_json::Value::Number(n) => n.as_u64().map(|n| n.to_string()),
        | _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_keeps_base_path() {
        let url = join_url("https://api.coingecko.com/api/v3", "coins/markets").unwrap();
        assert_eq!(url.as_str(), "https://api.coingecko.com/api/v3/coins/markets");

        let url = join_url("http://127.0.0.1:8080/", "/fng/").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/fng/");
    }

    #[test]
    fn test_lenient_numbers() {
        assert_eq!(as_f64(&serde_json::json!("72")), Some(72.0));
        assert_eq!(as_f64(&serde_json::json!(0.5)), Some(0.5));
        assert_eq!(as_f64(&serde_json::json!(null)), None);
        assert_eq!(as_integer_string(&serde_json::json!(150000)), Some("150000".to_string()));
        assert_eq!(as_integer_string(&serde_json::json!("42")), Some("42".to_string()));
        assert_eq!(as_integer_string(&serde_json::json!("")), None);
    }

    #[test]
    fn test_join_url_rejects_garbage() {
        assert!(matches!(join_url("not a url", "x"), Err(FetchError::NetworkUnavailable(_))));
    }
}
