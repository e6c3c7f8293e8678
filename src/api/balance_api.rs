//! 余额查询 API
//!
//! - `POST /balance`：代理模式，按 `network` 查询单个网络
//! - `POST /api/v1/balances`：聚合模式，默认查询注册表中全部网络
//! - `GET  /api/v1/balances/:network/:address`：单网络查询的 GET 形式
//! - `GET  /api/v1/networks`：已知网络列表

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    api::middleware::TraceId,
    app_state::AppState,
    domain::{AggregateResponse, NetworkEndpoint},
    error::AppError,
};

/// 代理请求体
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyBalanceRequest {
    #[serde(default, alias = "wallet")]
    pub public_key: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
}

/// 聚合请求体
#[derive(Debug, Deserialize, ToSchema)]
pub struct AggregateBalanceRequest {
    #[serde(default, alias = "publicKey")]
    pub wallet: Option<String>,
    /// 不传则查询全部网络
    #[serde(default)]
    pub networks: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NetworksResponse {
    pub networks: Vec<NetworkEndpoint>,
}

fn with_trace(trace: &Option<Extension<TraceId>>, err: AppError) -> AppError {
    match trace {
        Some(Extension(t)) => t.attach(err),
        None => err,
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::missing_input(format!("{} is required", field))),
    }
}

#[utoipa::path(
    post,
    path = "/balance",
    request_body = ProxyBalanceRequest,
    responses(
        (status = 200, description = "单网络余额", body = AggregateResponse),
        (status = 400, description = "缺少公钥或网络无效", body = crate::error_body::ErrorBodyDoc),
        (status = 500, description = "内部错误", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn proxy_balance(
    State(state): State<Arc<AppState>>,
    trace: Option<Extension<TraceId>>,
    payload: Result<Json<ProxyBalanceRequest>, JsonRejection>,
) -> Result<Json<AggregateResponse>, AppError> {
    crate::metrics::count_request("POST /balance");
    proxy_balance_inner(&state, payload)
        .await
        .map(Json)
        .map_err(|e| with_trace(&trace, e))
}

async fn proxy_balance_inner(
    state: &AppState,
    payload: Result<Json<ProxyBalanceRequest>, JsonRejection>,
) -> Result<AggregateResponse, AppError> {
    let Json(req) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let public_key = required(req.public_key, "publicKey")?;
    let network = required(req.network, "network")?;
    let endpoint = state.registry.resolve(&network)?.clone();

    Ok(state
        .orchestrator
        .fetch_balances(&public_key, std::slice::from_ref(&endpoint))
        .await?)
}

#[utoipa::path(
    post,
    path = "/api/v1/balances",
    request_body = AggregateBalanceRequest,
    responses(
        (status = 200, description = "各网络余额", body = AggregateResponse),
        (status = 400, description = "缺少钱包地址或网络无效", body = crate::error_body::ErrorBodyDoc),
        (status = 500, description = "内部错误", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn aggregate_balances(
    State(state): State<Arc<AppState>>,
    trace: Option<Extension<TraceId>>,
    payload: Result<Json<AggregateBalanceRequest>, JsonRejection>,
) -> Result<Json<AggregateResponse>, AppError> {
    crate::metrics::count_request("POST /api/v1/balances");
    aggregate_balances_inner(&state, payload)
        .await
        .map(Json)
        .map_err(|e| with_trace(&trace, e))
}

async fn aggregate_balances_inner(
    state: &AppState,
    payload: Result<Json<AggregateBalanceRequest>, JsonRejection>,
) -> Result<AggregateResponse, AppError> {
    let Json(req) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let wallet = required(req.wallet, "wallet")?;

    let endpoints = match req.networks {
        Some(names) if !names.is_empty() => state.registry.select(&names)?,
        _ => state.registry.endpoints().to_vec(),
    };

    Ok(state.orchestrator.fetch_balances(&wallet, &endpoints).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/balances/{network}/{address}",
    params(
        ("network" = String, Path, description = "网络名称：mainnet / testnet"),
        ("address" = String, Path, description = "Base58 公钥"),
    ),
    responses(
        (status = 200, description = "单网络余额", body = AggregateResponse),
        (status = 400, description = "网络无效", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn network_balance(
    State(state): State<Arc<AppState>>,
    trace: Option<Extension<TraceId>>,
    Path((network, address)): Path<(String, String)>,
) -> Result<Json<AggregateResponse>, AppError> {
    crate::metrics::count_request("GET /api/v1/balances/:network/:address");
    let result = async {
        let endpoint = state.registry.resolve(&network)?.clone();
        Ok::<_, AppError>(
            state
                .orchestrator
                .fetch_balances(&address, std::slice::from_ref(&endpoint))
                .await?,
        )
    }
    .await;
    result.map(Json).map_err(|e| with_trace(&trace, e))
}

#[utoipa::path(
    get,
    path = "/api/v1/networks",
    responses((status = 200, description = "已知网络", body = NetworksResponse))
)]
pub async fn list_networks(State(state): State<Arc<AppState>>) -> Json<NetworksResponse> {
    crate::metrics::count_request("GET /api/v1/networks");
    Json(NetworksResponse {
        networks: state.registry.endpoints().to_vec(),
    })
}
