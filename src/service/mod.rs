pub mod balance_orchestrator; // 双网络并发查询
pub mod balance_transport;
pub mod wallet_provider;
pub mod wallet_session;
