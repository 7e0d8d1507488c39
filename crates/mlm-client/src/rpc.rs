//! public json-rpc endpoint client

use crate::error::{ClientError, ProviderError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// http json-rpc client for read-only contract access
pub struct HttpRpc {
    url: String,
    client: Client,
    next_id: AtomicU64,
}

impl HttpRpc {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("http client: {e}")))?;
        Ok(Self {
            url: url.to_string(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("rpc {} -> {}", method, self.url);

        let response = self.client.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Transport(format!("{} returned {}", self.url, status)));
        }

        let body: RpcResponse = response.json().await?;
        if let Some(error) = body.error {
            let mut err = ProviderError::new(error.code, error.message);
            if let Some(data) = error.data {
                err = err.with_data(data);
            }
            return Err(ClientError::from_provider(err));
        }
        Ok(body.result)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_with_error() {
        let body: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":3,"message":"execution reverted","data":"0x"}}"#,
        )
        .unwrap();
        let error = body.error.unwrap();
        assert_eq!(error.code, 3);
        assert_eq!(error.data, Some(json!("0x")));
    }

    #[test]
    fn test_response_null_result() {
        let body: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":7,"result":null}"#).unwrap();
        assert!(body.error.is_none());
        assert!(body.result.is_null());
    }
}
