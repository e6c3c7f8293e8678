//! Solana JSON-RPC 客户端：getBalance 的最小实现
//!
//! 请求体：`{"jsonrpc":"2.0","id":1,"method":"getBalance","params":[address,{"commitment":...}]}`
//! 响应体：`{"result":{"context":{...},"value":<lamports>}}` 或 `{"error":{"code":..,"message":..}}`

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{account::is_valid_solana_address, AccountIdentifier, NetworkEndpoint},
    error::BalanceError,
    service::balance_transport::BalanceTransport,
};

/// JSON-RPC "Invalid params"，节点拒绝地址时返回
const RPC_INVALID_PARAMS: i64 = -32602;

#[derive(Clone)]
pub struct SolanaRpcClient {
    http_client: reqwest::Client,
    commitment: String,
}

impl SolanaRpcClient {
    pub fn new(commitment: impl Into<String>) -> Self {
        // 整体超时由编排器控制，这里只限制建连时间
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client: client,
            commitment: commitment.into(),
        }
    }
}

#[async_trait]
impl BalanceTransport for SolanaRpcClient {
    async fn get_balance(
        &self,
        endpoint: &NetworkEndpoint,
        account: &AccountIdentifier,
    ) -> Result<u64, BalanceError> {
        // 本地校验失败不发起网络请求
        if !is_valid_solana_address(account.as_str()) {
            return Err(BalanceError::InvalidAccount(format!(
                "not a valid base58 public key: {}",
                account
            )));
        }

        let req = JsonRpcRequest::new(
            "getBalance",
            vec![
                serde_json::Value::String(account.to_string()),
                serde_json::json!({ "commitment": self.commitment }),
            ],
        );

        tracing::debug!(
            network = %endpoint.name,
            endpoint = %endpoint.url,
            account = %account.short(),
            "Sending getBalance request"
        );

        let response = self
            .http_client
            .post(&endpoint.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| BalanceError::Transport(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BalanceError::Transport(format!(
                "unexpected HTTP status {}",
                status.as_u16()
            )));
        }

        let body: JsonRpcResponse<BalanceValue> = response
            .json()
            .await
            .map_err(|e| BalanceError::Transport(format!("malformed RPC response: {}", e)))?;

        if let Some(err) = body.error {
            return Err(if err.code == RPC_INVALID_PARAMS {
                BalanceError::InvalidAccount(err.message)
            } else {
                BalanceError::Transport(format!("RPC error {}: {}", err.code, err.message))
            });
        }

        body.result
            .map(|r| r.value)
            .ok_or_else(|| BalanceError::Transport("missing result in RPC response".to_string()))
    }
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: Vec<serde_json::Value>,
}

impl<'a> JsonRpcRequest<'a> {
    fn new(method: &'a str, params: Vec<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        }
    }
}

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct BalanceValue {
    value: u64,
}
