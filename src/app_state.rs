use std::sync::Arc;

use crate::{
    config::Config,
    domain::NetworkRegistry,
    infrastructure::solana_rpc::SolanaRpcClient,
    service::{balance_orchestrator::BalanceOrchestrator, balance_transport::BalanceTransport},
};

/// 应用状态
/// 包含所有共享资源（均为只读）
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<NetworkRegistry>,
    pub orchestrator: Arc<BalanceOrchestrator>,
}

impl AppState {
    /// 使用真实的 Solana RPC 客户端创建应用状态
    pub fn new(config: Arc<Config>) -> Self {
        let transport = Arc::new(SolanaRpcClient::new(config.rpc.commitment.clone()));
        Self::with_transport(config, transport)
    }

    /// 注入自定义传输层（测试使用）
    pub fn with_transport(config: Arc<Config>, transport: Arc<dyn BalanceTransport>) -> Self {
        let registry = Arc::new(NetworkRegistry::from_config(&config.rpc));
        let orchestrator = Arc::new(BalanceOrchestrator::from_config(transport, &config.rpc));

        tracing::info!(
            networks = ?registry.names(),
            timeout_ms = config.rpc.request_timeout_ms,
            "✅ Balance orchestrator initialized"
        );

        Self {
            config,
            registry,
            orchestrator,
        }
    }
}
