//! solbalance - Solana 双网络余额查询服务
//!
//! 同时向 mainnet / testnet 发起 `getBalance`，单个网络失败不影响其他网络的结果。

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod error_body;
pub mod infrastructure;
pub mod metrics;
pub mod service;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::{AppError, AppErrorCode, BalanceError};

