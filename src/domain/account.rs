//! 账户标识
//!
//! 核心逻辑把地址当作不透明字符串，只做非空检查；格式校验在传输层完成。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BalanceError;

/// Solana 公钥解码后的字节长度
pub const SOLANA_PUBKEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountIdentifier(String);

impl AccountIdentifier {
    /// 去除首尾空白后为空则返回 `MissingInput`
    pub fn new(raw: impl AsRef<str>) -> Result<Self, BalanceError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(BalanceError::MissingInput(
                "account identifier is required".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 日志中使用的缩写形式，如 `DYw8…NSKK`
    pub fn short(&self) -> String {
        let s = self.0.as_str();
        if s.chars().count() <= 10 {
            return s.to_string();
        }
        let head: String = s.chars().take(4).collect();
        let tail: String = s
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{}…{}", head, tail)
    }
}

impl fmt::Display for AccountIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 验证Solana地址（Base58编码，32字节）
pub fn is_valid_solana_address(address: &str) -> bool {
    // 典型长度：32-44个字符
    if address.len() < 32 || address.len() > 44 {
        return false;
    }

    match bs58::decode(address).into_vec() {
        Ok(decoded) => decoded.len() == SOLANA_PUBKEY_LEN,
        Err(_) => false,
    }
}
