use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// 单网络余额查询错误
///
/// 除 `MissingInput` 外，其余错误只影响对应网络的结果，不会中断整个聚合请求。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BalanceError {
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("invalid account: {0}")]
    InvalidAccount(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("transport error: timeout after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl BalanceError {
    /// 错误分类（timeout 归入 transport）
    pub fn kind(&self) -> &'static str {
        match self {
            BalanceError::MissingInput(_) => "missing_input",
            BalanceError::InvalidAccount(_) => "invalid_account",
            BalanceError::Transport(_) | BalanceError::Timeout(_) => "transport",
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == "transport"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorCode {
    BadRequest,
    MissingInput,
    InvalidAccount,
    NetworkNotSupported,
    NotFound,
    Internal,
}

impl AppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppErrorCode::BadRequest => "bad_request",
            AppErrorCode::MissingInput => "missing_input",
            AppErrorCode::InvalidAccount => "invalid_account",
            AppErrorCode::NetworkNotSupported => "network_not_supported",
            AppErrorCode::NotFound => "not_found",
            AppErrorCode::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub code: AppErrorCode,
    pub message: String,
    pub status: StatusCode,
    pub trace_id: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<&'a str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        crate::metrics::count_error();
        let body = ErrorBody {
            error: &self.message,
            code: self.code.as_str(),
            trace_id: self.trace_id.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            code: AppErrorCode::BadRequest,
            message: msg.into(),
            status: StatusCode::BAD_REQUEST,
            trace_id: None,
        }
    }

    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self {
            code: AppErrorCode::MissingInput,
            message: msg.into(),
            status: StatusCode::BAD_REQUEST,
            trace_id: None,
        }
    }

    pub fn invalid_account(msg: impl Into<String>) -> Self {
        Self {
            code: AppErrorCode::InvalidAccount,
            message: msg.into(),
            status: StatusCode::BAD_REQUEST,
            trace_id: None,
        }
    }

    pub fn network_not_supported(network: &str) -> Self {
        Self {
            code: AppErrorCode::NetworkNotSupported,
            message: format!("unknown network: {}", network),
            status: StatusCode::BAD_REQUEST,
            trace_id: None,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            code: AppErrorCode::NotFound,
            message: msg.into(),
            status: StatusCode::NOT_FOUND,
            trace_id: None,
        }
    }

    /// 内部错误：详细信息只写日志，响应体使用通用文案
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "unexpected failure");
        Self {
            code: AppErrorCode::Internal,
            message: "internal server error".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            trace_id: None,
        }
    }

    /// 设置追踪ID
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

impl From<BalanceError> for AppError {
    fn from(err: BalanceError) -> Self {
        match err {
            BalanceError::MissingInput(msg) => Self::missing_input(msg),
            BalanceError::InvalidAccount(msg) => Self::invalid_account(msg),
            // 单网络错误正常情况下不会越过编排器；走到这里说明是调用方的意外路径
            other => Self::internal(other),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(format!("invalid JSON body: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    #[test]
    fn test_balance_error_kind() {
        assert_eq!(BalanceError::MissingInput("x".into()).kind(), "missing_input");
        assert_eq!(BalanceError::InvalidAccount("x".into()).kind(), "invalid_account");
        assert_eq!(BalanceError::Transport("x".into()).kind(), "transport");
        assert!(BalanceError::Timeout(Duration::from_secs(10)).is_transport());
    }

    #[test]
    fn test_timeout_message() {
        let err = BalanceError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "transport error: timeout after 1500ms");
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let resp = AppError::missing_input("wallet is required")
            .with_trace_id("t-1")
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["error"], "wallet is required");
        assert_eq!(v["code"], "missing_input");
        assert_eq!(v["trace_id"], "t-1");
    }

    #[tokio::test]
    async fn test_internal_does_not_leak_detail() {
        let resp = AppError::internal("db password=hunter2").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains("internal server error"));
    }
}
