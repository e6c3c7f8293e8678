//! Trace ID 中间件
//! 为每个请求生成唯一的 trace_id，用于全链路追踪

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use uuid::Uuid;

use crate::error::AppError;

pub const TRACE_ID_HEADER: &str = "x-trace-id";

tokio::task_local! {
    // 请求处理期间可用，供拿不到 Request 的位置（如 panic 处理）读取
    static CURRENT_TRACE_ID: TraceId;
}

/// 请求扩展中保存的 trace_id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceId(pub String);

impl TraceId {
    /// 生成新的 trace_id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// 从请求头中提取 trace_id，如果没有则生成新的
    pub fn from_request(req: &Request) -> Self {
        req.headers()
            .get(TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= 128)
            .map(|v| Self(v.to_string()))
            .unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 当前请求的 trace_id（不在请求作用域内时为 None）
    pub fn current() -> Option<Self> {
        CURRENT_TRACE_ID.try_with(|t| t.clone()).ok()
    }

    /// 为错误响应附加 trace_id
    pub fn attach(&self, err: AppError) -> AppError {
        err.with_trace_id(self.0.clone())
    }
}

/// Trace ID 中间件
/// 为每个请求生成或提取 trace_id，并添加到请求扩展和响应头中
pub async fn trace_id_middleware(mut req: Request, next: Next) -> Response {
    let trace_id = TraceId::from_request(&req);
    req.extensions_mut().insert(trace_id.clone());

    let mut response = CURRENT_TRACE_ID
        .scope(trace_id.clone(), next.run(req))
        .await;

    if let Ok(header_value) = HeaderValue::from_str(trace_id.as_str()) {
        response.headers_mut().insert(TRACE_ID_HEADER, header_value);
    }

    response
}
