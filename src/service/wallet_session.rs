//! 钱包会话
//!
//! 持有显式传入的钱包能力，跟踪连接状态，并用已连接的公钥查询双网络余额。

use std::sync::{Arc, RwLock};

use crate::{
    domain::{AggregateResponse, NetworkRegistry},
    error::BalanceError,
    service::{
        balance_orchestrator::BalanceOrchestrator,
        wallet_provider::{EventSubscription, WalletEvent, WalletProvider},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletStatus {
    Disconnected,
    Connected { public_key: String },
}

impl WalletStatus {
    pub fn public_key(&self) -> Option<&str> {
        match self {
            WalletStatus::Connected { public_key } => Some(public_key),
            WalletStatus::Disconnected => None,
        }
    }
}

pub struct WalletSession {
    provider: Arc<dyn WalletProvider>,
    status: Arc<RwLock<WalletStatus>>,
    _subscription: EventSubscription,
}

fn write_status(status: &RwLock<WalletStatus>, value: WalletStatus) {
    match status.write() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}

impl WalletSession {
    /// 绑定钱包能力并注册 connect/disconnect 监听；会话 drop 时监听自动注销
    pub fn attach(provider: Arc<dyn WalletProvider>) -> Self {
        let status = Arc::new(RwLock::new(WalletStatus::Disconnected));

        // 先注册监听，再读取当前状态
        let status_for_listener = status.clone();
        let subscription = EventSubscription::new(
            provider.clone(),
            Arc::new(move |event: &WalletEvent| {
                let next = match event {
                    WalletEvent::Connect { public_key } => WalletStatus::Connected {
                        public_key: public_key.clone(),
                    },
                    WalletEvent::Disconnect => WalletStatus::Disconnected,
                };
                tracing::debug!(?next, "Wallet status changed");
                write_status(&status_for_listener, next);
            }),
        );

        // 扩展可能已经处于连接状态
        if let Some(public_key) = provider.public_key() {
            write_status(&status, WalletStatus::Connected { public_key });
        }

        Self {
            provider,
            status,
            _subscription: subscription,
        }
    }

    pub fn status(&self) -> WalletStatus {
        match self.status.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn public_key(&self) -> Option<String> {
        self.status().public_key().map(str::to_string)
    }

    pub async fn connect(&self) -> anyhow::Result<String> {
        let public_key = self.provider.connect().await?;
        write_status(
            &self.status,
            WalletStatus::Connected {
                public_key: public_key.clone(),
            },
        );
        tracing::info!("Wallet connected");
        Ok(public_key)
    }

    pub async fn disconnect(&self) -> anyhow::Result<()> {
        self.provider.disconnect().await?;
        write_status(&self.status, WalletStatus::Disconnected);
        tracing::info!("Wallet disconnected");
        Ok(())
    }

    /// 用当前连接的公钥查询注册表中所有网络的余额
    pub async fn check_balances(
        &self,
        orchestrator: &BalanceOrchestrator,
        registry: &NetworkRegistry,
    ) -> Result<AggregateResponse, BalanceError> {
        let public_key = self.public_key().ok_or_else(|| {
            BalanceError::MissingInput("connect the wallet first".to_string())
        })?;
        orchestrator
            .fetch_balances(&public_key, registry.endpoints())
            .await
    }
}
