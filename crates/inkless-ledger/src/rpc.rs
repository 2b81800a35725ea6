//! JSON-RPC 2.0 transport to the ledger node.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::RpcError;

/// HTTP JSON-RPC client bound to one node endpoint. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JsonRpcTransport {
    client: reqwest::Client,
    url: Url,
    next_id: Arc<AtomicU64>,
}

impl JsonRpcTransport {
    /// Build a transport with a per-request timeout.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// The node endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send a request and return its `result` field.
    pub async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, RpcError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
        });

        let resp = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout {
                        method: method.to_string(),
                    }
                } else {
                    RpcError::Transport {
                        method: method.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        if !resp.status().is_success() {
            return Err(RpcError::Http {
                method: method.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| RpcError::InvalidResponse {
            method: method.to_string(),
            reason: format!("invalid JSON: {e}"),
        })?;

        if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
            return Err(RpcError::Node {
                method: method.to_string(),
                code: error.get("code").and_then(|c| c.as_i64()).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown RPC error")
                    .to_string(),
            });
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| RpcError::InvalidResponse {
                method: method.to_string(),
                reason: "missing 'result' field".to_string(),
            })
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(value: &serde_json::Value) -> Option<u128> {
    let s = value.as_str()?.strip_prefix("0x")?;
    if s.is_empty() {
        return None;
    }
    u128::from_str_radix(s, 16).ok()
}

/// Parse `0x`-prefixed hex data.
pub fn parse_data(value: &serde_json::Value) -> Option<Vec<u8>> {
    let s = value.as_str()?.strip_prefix("0x")?;
    hex::decode(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity(&json!("0x539")), Some(1337));
        assert_eq!(parse_quantity(&json!("0x0")), Some(0));
        assert_eq!(parse_quantity(&json!("0x")), None);
        assert_eq!(parse_quantity(&json!("539")), None);
        assert_eq!(parse_quantity(&json!(1337)), None);
    }

    #[test]
    fn data() {
        assert_eq!(parse_data(&json!("0x")), Some(vec![]));
        assert_eq!(parse_data(&json!("0x0102")), Some(vec![1, 2]));
        assert_eq!(parse_data(&json!("0x012")), None);
    }
}
