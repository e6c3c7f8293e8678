//! 钱包扩展能力接口
//!
//! 钱包扩展（如浏览器插件）以显式能力对象的形式传入，不依赖任何全局单例。

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use anyhow::Result;
use async_trait::async_trait;

/// 钱包事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    Connect { public_key: String },
    Disconnect,
}

pub type ListenerId = u64;

/// 事件监听器
pub trait WalletListener: Send + Sync {
    fn on_event(&self, event: &WalletEvent);
}

impl<F> WalletListener for F
where
    F: Fn(&WalletEvent) + Send + Sync,
{
    fn on_event(&self, event: &WalletEvent) {
        self(event)
    }
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// 请求连接，成功返回公钥
    async fn connect(&self) -> Result<String>;

    async fn disconnect(&self) -> Result<()>;

    fn public_key(&self) -> Option<String>;

    fn is_connected(&self) -> bool {
        self.public_key().is_some()
    }

    fn subscribe(&self, listener: Arc<dyn WalletListener>) -> ListenerId;

    fn unsubscribe(&self, id: ListenerId);
}

/// 作用域订阅：drop 时自动取消注册
#[must_use = "dropping the subscription unregisters the listener"]
pub struct EventSubscription {
    provider: Arc<dyn WalletProvider>,
    id: ListenerId,
}

impl EventSubscription {
    pub fn new(provider: Arc<dyn WalletProvider>, listener: Arc<dyn WalletListener>) -> Self {
        let id = provider.subscribe(listener);
        Self { provider, id }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.provider.unsubscribe(self.id);
    }
}

/// 内存实现，用于开发和测试
pub struct InMemoryWalletProvider {
    account: String,
    connected: Mutex<bool>,
    reject_reason: Mutex<Option<String>>,
    listeners: Mutex<BTreeMap<ListenerId, Arc<dyn WalletListener>>>,
    next_id: AtomicU64,
}

impl InMemoryWalletProvider {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            connected: Mutex::new(false),
            reject_reason: Mutex::new(None),
            listeners: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 模拟用户拒绝连接请求
    pub fn reject_connections(&self, reason: Option<String>) {
        *lock(&self.reject_reason) = reason;
    }

    /// 模拟用户直接在扩展里连接/断开（不经过 connect()/disconnect()）
    pub fn set_connected_externally(&self, connected: bool) {
        *lock(&self.connected) = connected;
        let event = if connected {
            WalletEvent::Connect {
                public_key: self.account.clone(),
            }
        } else {
            WalletEvent::Disconnect
        };
        self.emit(&event);
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    fn emit(&self, event: &WalletEvent) {
        // 先复制再回调，避免回调里再次订阅/取消时死锁
        let listeners: Vec<_> = lock(&self.listeners).values().cloned().collect();
        for l in listeners {
            l.on_event(event);
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl WalletProvider for InMemoryWalletProvider {
    async fn connect(&self) -> Result<String> {
        if let Some(reason) = lock(&self.reject_reason).clone() {
            anyhow::bail!(reason);
        }
        *lock(&self.connected) = true;
        self.emit(&WalletEvent::Connect {
            public_key: self.account.clone(),
        });
        Ok(self.account.clone())
    }

    async fn disconnect(&self) -> Result<()> {
        *lock(&self.connected) = false;
        self.emit(&WalletEvent::Disconnect);
        Ok(())
    }

    fn public_key(&self) -> Option<String> {
        if *lock(&self.connected) {
            Some(self.account.clone())
        } else {
            None
        }
    }

    fn subscribe(&self, listener: Arc<dyn WalletListener>) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.listeners).insert(id, listener);
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        lock(&self.listeners).remove(&id);
    }
}
