//! 网络端点注册表
//!
//! 代理接口和聚合接口共用同一份注册表，端点顺序即聚合时的发起顺序。

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{config::RpcConfig, error::AppError};

pub const MAINNET: &str = "mainnet";
pub const TESTNET: &str = "testnet";

/// 命名的 RPC 连接目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NetworkEndpoint {
    pub name: String,
    pub url: String,
}

impl NetworkEndpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// 不可变的端点注册表
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    endpoints: Vec<NetworkEndpoint>,
}

/// 标准化网络名称：小写 + 集群别名
fn canonical_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.as_str() {
        "mainnet-beta" | "main" => MAINNET.to_string(),
        "test" => TESTNET.to_string(),
        _ => lower,
    }
}

impl NetworkRegistry {
    /// 名称重复时保留第一个
    pub fn new(endpoints: Vec<NetworkEndpoint>) -> Self {
        let mut unique: Vec<NetworkEndpoint> = Vec::with_capacity(endpoints.len());
        for mut ep in endpoints {
            ep.name = canonical_name(&ep.name);
            if !unique.iter().any(|e| e.name == ep.name) {
                unique.push(ep);
            }
        }
        Self { endpoints: unique }
    }

    pub fn from_config(rpc: &RpcConfig) -> Self {
        Self::new(vec![
            NetworkEndpoint::new(MAINNET, rpc.mainnet_url.clone()),
            NetworkEndpoint::new(TESTNET, rpc.testnet_url.clone()),
        ])
    }

    pub fn endpoints(&self) -> &[NetworkEndpoint] {
        &self.endpoints
    }

    pub fn names(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&NetworkEndpoint> {
        let name = canonical_name(name);
        self.endpoints.iter().find(|e| e.name == name)
    }

    /// 按名称解析，未知网络返回 400
    pub fn resolve(&self, name: &str) -> Result<&NetworkEndpoint, AppError> {
        self.get(name)
            .ok_or_else(|| AppError::network_not_supported(name.trim()))
    }

    /// 选择子集（保持调用方给出的顺序，去重）
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<NetworkEndpoint>, AppError> {
        let mut selected: Vec<NetworkEndpoint> = Vec::with_capacity(names.len());
        for name in names {
            let ep = self.resolve(name.as_ref())?;
            if !selected.iter().any(|e| e.name == ep.name) {
                selected.push(ep.clone());
            }
        }
        Ok(selected)
    }
}
