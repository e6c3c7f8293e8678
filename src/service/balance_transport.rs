//! 余额查询传输层接口
//! 提供 trait 接口支持 mock 测试

use async_trait::async_trait;

use crate::{
    domain::{AccountIdentifier, NetworkEndpoint},
    error::BalanceError,
};

/// 给定端点和账户，返回最小单位（lamports）余额
///
/// 实现只负责一次请求：不重试、不缓存，超时由调用方控制。
#[async_trait]
pub trait BalanceTransport: Send + Sync {
    async fn get_balance(
        &self,
        endpoint: &NetworkEndpoint,
        account: &AccountIdentifier,
    ) -> Result<u64, BalanceError>;
}
