//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
pub const DEFAULT_TESTNET_RPC_URL: &str = "https://api.testnet.solana.com";

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// 逗号分隔的 CORS 来源，"*" 表示全部放行
    #[serde(default = "default_cors_origins")]
    pub cors_allow_origins: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

/// RPC 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub mainnet_url: String,
    pub testnet_url: String,
    /// 单个网络请求超时（毫秒）
    pub request_timeout_ms: u64,
    /// 整体超时（毫秒），不设置则只受单网络超时约束
    #[serde(default)]
    pub overall_timeout_ms: Option<u64>,
    /// getBalance 的 commitment 级别
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

fn default_cors_origins() -> String {
    "*".to_string()
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Default for ServerConfig {
    fn default() -> Self {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| {
            let port = std::env::var("PORT").unwrap_or_else(|_| "3001".into());
            format!("0.0.0.0:{}", port)
        });
        Self {
            bind_addr,
            cors_allow_origins: std::env::var("CORS_ALLOW_ORIGINS")
                .unwrap_or_else(|_| default_cors_origins()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            mainnet_url: std::env::var("SOLANA_MAINNET_RPC_URL")
                .unwrap_or_else(|_| DEFAULT_MAINNET_RPC_URL.into()),
            testnet_url: std::env::var("SOLANA_TESTNET_RPC_URL")
                .unwrap_or_else(|_| DEFAULT_TESTNET_RPC_URL.into()),
            request_timeout_ms: env_u64("RPC_TIMEOUT_MS").unwrap_or(10_000),
            overall_timeout_ms: env_u64("RPC_OVERALL_TIMEOUT_MS"),
            commitment: std::env::var("RPC_COMMITMENT").unwrap_or_else(|_| default_commitment()),
        }
    }
}

impl RpcConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn overall_timeout(&self) -> Option<Duration> {
        self.overall_timeout_ms.map(Duration::from_millis)
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            rpc: RpcConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("mainnet", &self.rpc.mainnet_url),
            ("testnet", &self.rpc.testnet_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} RPC url must start with http:// or https://", name);
            }
        }

        if self.rpc.request_timeout_ms == 0 {
            anyhow::bail!("RPC_TIMEOUT_MS must be greater than 0");
        }
        if self.rpc.overall_timeout_ms == Some(0) {
            anyhow::bail!("RPC_OVERALL_TIMEOUT_MS must be greater than 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }
}
