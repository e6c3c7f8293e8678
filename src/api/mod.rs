use std::{any::Any, sync::Arc, time::Instant};

use axum::{
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any as AnyOrigin, CorsLayer},
};
use tracing::Level;
use utoipa::{OpenApi, ToSchema};

use crate::{
    api::middleware::{trace_id_middleware, TraceId},
    app_state::AppState,
    error::AppError,
};

pub mod balance_api;
pub mod middleware;

#[derive(OpenApi)]
#[openapi(
    paths(
        balance_api::proxy_balance,
        balance_api::aggregate_balances,
        balance_api::network_balance,
        balance_api::list_networks,
        health,
    ),
    components(
        schemas(
            balance_api::ProxyBalanceRequest,
            balance_api::AggregateBalanceRequest,
            balance_api::NetworksResponse,
            crate::domain::AggregateResponse,
            crate::domain::BalanceResult,
            crate::domain::NetworkEndpoint,
            HealthResponse,
            crate::error_body::ErrorBodyDoc
        )
    ),
    tags(
        (name = "solbalance", description = "Dual-network Solana balance API")
    )
)]
pub struct ApiDoc;

pub fn routes(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_allow_origins);

    Router::new()
        // 代理模式（兼容旧前端）
        .route("/balance", post(balance_api::proxy_balance))
        .route("/api/v1/balances", post(balance_api::aggregate_balances))
        .route(
            "/api/v1/balances/:network/:address",
            get(balance_api::network_balance),
        )
        .route("/api/v1/networks", get(balance_api::list_networks))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route(
            "/metrics",
            get(|| async { crate::metrics::render_prometheus() }),
        )
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(trace_id_middleware))
                .layer(from_fn(trace_log))
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(cors),
        )
        .with_state(state)
}

/// CORS：`*` 全部放行，否则按逗号分隔的来源列表匹配
fn cors_layer(allow_origins: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, axum::http::HeaderName::from_static("x-trace-id")])
        .expose_headers([axum::http::HeaderName::from_static("x-trace-id")]);

    if allow_origins.trim() == "*" {
        return base.allow_origin(AnyOrigin);
    }

    let origins: Vec<HeaderValue> = allow_origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| HeaderValue::from_str(s).ok())
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

/// panic 信息只进日志，响应体为通用 500
fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    let err = AppError::internal("request handler panicked");
    match TraceId::current() {
        Some(t) => t.attach(err).into_response(),
        None => err.into_response(),
    }
}

async fn not_found(req: Request) -> AppError {
    let err = AppError::not_found(format!("no route for {} {}", req.method(), req.uri().path()));
    match req.extensions().get::<TraceId>() {
        Some(t) => t.attach(err),
        None => err,
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub networks: Vec<String>,
    pub timestamp: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "服务存活", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        networks: state
            .registry
            .names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn trace_log(req: Request, next: axum::middleware::Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_else(|| "-".to_string());
    let start = Instant::now();
    let resp = next.run(req).await;
    let status = resp.status();
    let elapsed = start.elapsed().as_millis();
    tracing::event!(Level::INFO, trace_id=%trace_id, method=%method, path=%path, status=%status.as_u16(), elapsed_ms=%elapsed, "http_request");
    resp
}
