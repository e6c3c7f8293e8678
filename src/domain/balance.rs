//! 余额结果与单位换算
//!
//! `amount_minor_units` 始终是 RPC 返回的原始 lamports 整数；
//! 换算成 SOL 的显示值属于展示层，单独提供。

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::BalanceError;

/// 1 SOL = 10^9 lamports
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
pub const SOL_DECIMALS: u32 = 9;

/// 单个网络的查询结果，`amount_minor_units` 与 `error` 恰有一个有值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResult {
    pub network: String,
    pub amount_minor_units: Option<u64>,
    pub error: Option<String>,
    /// 精确的显示金额（9 位小数字符串），仅成功时存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_amount: Option<String>,
}

impl BalanceResult {
    pub fn ok(network: impl Into<String>, lamports: u64) -> Self {
        Self {
            network: network.into(),
            amount_minor_units: Some(lamports),
            error: None,
            display_amount: Some(format_display_amount(lamports)),
        }
    }

    pub fn failed(network: impl Into<String>, err: &BalanceError) -> Self {
        Self {
            network: network.into(),
            amount_minor_units: None,
            error: Some(err.to_string()),
            display_amount: None,
        }
    }

    pub fn from_outcome(network: impl Into<String>, outcome: &Result<u64, BalanceError>) -> Self {
        match outcome {
            Ok(lamports) => Self::ok(network, *lamports),
            Err(e) => Self::failed(network, e),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.amount_minor_units.is_some()
    }
}

/// 网络名 → 结果，单次请求内有效
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct AggregateResponse(BTreeMap<String, BalanceResult>);

impl AggregateResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, result: BalanceResult) {
        self.0.insert(result.network.clone(), result);
    }

    pub fn get(&self, network: &str) -> Option<&BalanceResult> {
        self.0.get(network)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BalanceResult)> {
        self.0.iter()
    }
}

impl FromIterator<BalanceResult> for AggregateResponse {
    fn from_iter<I: IntoIterator<Item = BalanceResult>>(iter: I) -> Self {
        let mut agg = Self::new();
        for r in iter {
            agg.insert(r);
        }
        agg
    }
}

/// Lamports 转 SOL（有损：超过 2^53 的值会丢失精度）
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// SOL 转 Lamports（四舍五入到最近的整数，有损）
///
/// `as` 转换是饱和的：负数和 NaN 得到 0，超出范围得到 `u64::MAX`。
pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64).round() as u64
}

/// 精确的十进制显示，如 5000000000 → "5.000000000"
pub fn format_display_amount(lamports: u64) -> String {
    Decimal::from_i128_with_scale(lamports as i128, SOL_DECIMALS).to_string()
}
