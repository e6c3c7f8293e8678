//! 多网络余额查询编排
//!
//! 对每个端点并发发起一次查询，单个网络失败或超时只影响自己的结果槽位。
//! 只有账户为空（或未选择任何网络）时整个请求直接失败，且不会发起任何网络调用。

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use futures::future::join_all;

use crate::{
    config::RpcConfig,
    domain::{AccountIdentifier, AggregateResponse, BalanceResult, NetworkEndpoint},
    error::BalanceError,
    service::balance_transport::BalanceTransport,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct BalanceOrchestrator {
    transport: Arc<dyn BalanceTransport>,
    request_timeout: Duration,
    overall_timeout: Option<Duration>,
}

impl BalanceOrchestrator {
    pub fn new(transport: Arc<dyn BalanceTransport>) -> Self {
        Self {
            transport,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            overall_timeout: None,
        }
    }

    pub fn from_config(transport: Arc<dyn BalanceTransport>, rpc: &RpcConfig) -> Self {
        Self::new(transport)
            .with_request_timeout(rpc.request_timeout())
            .with_overall_timeout(rpc.overall_timeout())
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_overall_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.overall_timeout = timeout;
        self
    }

    /// 所有子请求同时开始，因此整体截止时间等价于每个子请求取两者较小值
    fn effective_timeout(&self) -> Duration {
        match self.overall_timeout {
            Some(overall) => overall.min(self.request_timeout),
            None => self.request_timeout,
        }
    }

    /// 查询账户在各网络上的余额
    ///
    /// 返回的聚合结果中每个（去重后的）网络恰好一条记录。
    pub async fn fetch_balances(
        &self,
        account: &str,
        endpoints: &[NetworkEndpoint],
    ) -> Result<AggregateResponse, BalanceError> {
        let account = AccountIdentifier::new(account)?;
        if endpoints.is_empty() {
            return Err(BalanceError::MissingInput(
                "at least one network is required".to_string(),
            ));
        }

        let started = Instant::now();
        let timeout = self.effective_timeout();

        let results = join_all(
            endpoints
                .iter()
                .map(|endpoint| self.fetch_one(endpoint, &account, timeout)),
        )
        .await;

        let aggregate: AggregateResponse = results.into_iter().collect();

        tracing::info!(
            account = %account.short(),
            networks = aggregate.len(),
            succeeded = aggregate.iter().filter(|(_, r)| r.is_ok()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Balance fan-out completed"
        );

        Ok(aggregate)
    }

    async fn fetch_one(
        &self,
        endpoint: &NetworkEndpoint,
        account: &AccountIdentifier,
        timeout: Duration,
    ) -> BalanceResult {
        let start = Instant::now();
        let outcome = match tokio::time::timeout(
            timeout,
            self.transport.get_balance(endpoint, account),
        )
        .await
        {
            Ok(res) => res,
            Err(_) => Err(BalanceError::Timeout(timeout)),
        };
        let elapsed = start.elapsed().as_millis();

        match &outcome {
            Ok(lamports) => {
                crate::metrics::observe_balance_query(&endpoint.name, "ok", elapsed);
                tracing::debug!(
                    network = %endpoint.name,
                    lamports = *lamports,
                    elapsed_ms = elapsed as u64,
                    "Balance fetched"
                );
            }
            Err(e) => {
                crate::metrics::observe_balance_query(&endpoint.name, e.kind(), elapsed);
                tracing::warn!(
                    network = %endpoint.name,
                    endpoint = %endpoint.url,
                    error = %e,
                    elapsed_ms = elapsed as u64,
                    "Balance fetch failed"
                );
            }
        }

        BalanceResult::from_outcome(endpoint.name.clone(), &outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;

    #[derive(Clone)]
    enum Reply {
        Lamports(u64),
        Fail(BalanceError),
        Hang,
        Slow(Duration, u64),
    }

    struct MockTransport {
        replies: HashMap<String, Reply>,
        calls: AtomicUsize,
        completed: AtomicUsize,
    }

    impl MockTransport {
        fn new(replies: Vec<(&str, Reply)>) -> Arc<Self> {
            Arc::new(Self {
                replies: replies
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                calls: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn completed(&self) -> usize {
            self.completed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BalanceTransport for MockTransport {
        async fn get_balance(
            &self,
            endpoint: &NetworkEndpoint,
            _account: &AccountIdentifier,
        ) -> Result<u64, BalanceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.get(&endpoint.name) {
                Some(Reply::Lamports(v)) => Ok(*v),
                Some(Reply::Fail(e)) => Err(e.clone()),
                Some(Reply::Slow(delay, v)) => {
                    tokio::time::sleep(*delay).await;
                    self.completed.fetch_add(1, Ordering::SeqCst);
                    Ok(*v)
                }
                Some(Reply::Hang) | None => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }

    fn endpoints() -> Vec<NetworkEndpoint> {
        vec![
            NetworkEndpoint::new("mainnet", "http://mainnet.invalid"),
            NetworkEndpoint::new("testnet", "http://testnet.invalid"),
        ]
    }

    #[tokio::test]
    async fn test_mainnet_ok_testnet_transport_error() {
        let transport = MockTransport::new(vec![
            ("mainnet", Reply::Lamports(5_000_000_000)),
            (
                "testnet",
                Reply::Fail(BalanceError::Transport("connection refused".into())),
            ),
        ]);
        let orchestrator = BalanceOrchestrator::new(transport.clone());

        let agg = orchestrator
            .fetch_balances("Abc123", &endpoints())
            .await
            .unwrap();

        assert_eq!(agg.len(), 2);
        let mainnet = agg.get("mainnet").unwrap();
        assert_eq!(mainnet.amount_minor_units, Some(5_000_000_000));
        assert_eq!(mainnet.error, None);

        let testnet = agg.get("testnet").unwrap();
        assert_eq!(testnet.amount_minor_units, None);
        assert!(testnet.error.as_deref().unwrap().starts_with("transport error"));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_account_fails_fast_without_calls() {
        let transport = MockTransport::new(vec![("mainnet", Reply::Lamports(1))]);
        let orchestrator = BalanceOrchestrator::new(transport.clone());

        for account in ["", "  "] {
            let err = orchestrator
                .fetch_balances(account, &endpoints())
                .await
                .unwrap_err();
            assert!(matches!(err, BalanceError::MissingInput(_)));
        }
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_endpoint_list_is_rejected() {
        let transport = MockTransport::new(vec![]);
        let orchestrator = BalanceOrchestrator::new(transport.clone());

        let err = orchestrator.fetch_balances("Abc123", &[]).await.unwrap_err();
        assert!(matches!(err, BalanceError::MissingInput(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_isolated() {
        let transport = MockTransport::new(vec![
            ("mainnet", Reply::Hang),
            ("testnet", Reply::Lamports(42)),
        ]);
        let orchestrator = BalanceOrchestrator::new(transport)
            .with_request_timeout(Duration::from_millis(50));

        let started = Instant::now();
        let agg = orchestrator
            .fetch_balances("Abc123", &endpoints())
            .await
            .unwrap();

        // 并发执行：总耗时约等于一个超时周期
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(agg.get("testnet").unwrap().amount_minor_units, Some(42));

        let mainnet = agg.get("mainnet").unwrap();
        assert_eq!(mainnet.amount_minor_units, None);
        assert_eq!(
            mainnet.error.as_deref(),
            Some("transport error: timeout after 50ms")
        );
    }

    #[tokio::test]
    async fn test_requests_run_concurrently() {
        let delay = Duration::from_millis(300);
        let transport = MockTransport::new(vec![
            ("mainnet", Reply::Slow(delay, 1)),
            ("testnet", Reply::Slow(delay, 2)),
        ]);
        let orchestrator = BalanceOrchestrator::new(transport.clone());

        let started = Instant::now();
        let agg = orchestrator
            .fetch_balances("Abc123", &endpoints())
            .await
            .unwrap();
        let elapsed = started.elapsed();

        // 顺序执行至少需要 2 * delay
        assert!(elapsed < delay * 2, "elapsed {:?}", elapsed);
        assert_eq!(agg.get("mainnet").unwrap().amount_minor_units, Some(1));
        assert_eq!(agg.get("testnet").unwrap().amount_minor_units, Some(2));
        assert_eq!(transport.completed(), 2);
    }

    #[tokio::test]
    async fn test_dropping_fetch_cancels_in_flight_requests() {
        let transport = MockTransport::new(vec![
            ("mainnet", Reply::Slow(Duration::from_millis(200), 1)),
            ("testnet", Reply::Slow(Duration::from_millis(200), 2)),
        ]);
        let orchestrator = BalanceOrchestrator::new(transport.clone());

        let endpoints = endpoints();
        let aborted = tokio::time::timeout(
            Duration::from_millis(50),
            orchestrator.fetch_balances("Abc123", &endpoints),
        )
        .await;
        assert!(aborted.is_err());
        assert_eq!(transport.calls(), 2);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(transport.completed(), 0);
    }

    #[tokio::test]
    async fn test_overall_timeout_caps_request_timeout() {
        let transport = MockTransport::new(vec![
            ("mainnet", Reply::Hang),
            ("testnet", Reply::Hang),
        ]);
        let orchestrator = BalanceOrchestrator::new(transport)
            .with_request_timeout(Duration::from_secs(30))
            .with_overall_timeout(Some(Duration::from_millis(40)));

        let agg = orchestrator
            .fetch_balances("Abc123", &endpoints())
            .await
            .unwrap();
        for (_, r) in agg.iter() {
            assert_eq!(r.error.as_deref(), Some("transport error: timeout after 40ms"));
        }
    }

    #[tokio::test]
    async fn test_invalid_account_is_per_network() {
        let transport = MockTransport::new(vec![
            (
                "mainnet",
                Reply::Fail(BalanceError::InvalidAccount("Invalid param: WrongSize".into())),
            ),
            ("testnet", Reply::Lamports(7)),
        ]);
        let orchestrator = BalanceOrchestrator::new(transport);

        let agg = orchestrator
            .fetch_balances("Abc123", &endpoints())
            .await
            .unwrap();
        assert_eq!(
            agg.get("mainnet").unwrap().error.as_deref(),
            Some("invalid account: Invalid param: WrongSize")
        );
        assert_eq!(agg.get("testnet").unwrap().amount_minor_units, Some(7));
    }

    #[tokio::test]
    async fn test_exactly_one_field_populated() {
        let transport = MockTransport::new(vec![
            ("mainnet", Reply::Lamports(0)),
            (
                "testnet",
                Reply::Fail(BalanceError::Transport("HTTP 503".into())),
            ),
        ]);
        let orchestrator = BalanceOrchestrator::new(transport);

        let agg = orchestrator
            .fetch_balances("Abc123", &endpoints())
            .await
            .unwrap();
        for (name, r) in agg.iter() {
            assert_eq!(name, &r.network);
            assert!(r.amount_minor_units.is_some() ^ r.error.is_some());
        }
    }

    #[tokio::test]
    async fn test_repeated_calls_are_identical() {
        let transport = MockTransport::new(vec![
            ("mainnet", Reply::Lamports(123)),
            (
                "testnet",
                Reply::Fail(BalanceError::Transport("HTTP 429".into())),
            ),
        ]);
        let orchestrator = BalanceOrchestrator::new(transport.clone());

        let first = orchestrator
            .fetch_balances("Abc123", &endpoints())
            .await
            .unwrap();
        let second = orchestrator
            .fetch_balances("Abc123", &endpoints())
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(transport.calls(), 4);
    }

    #[tokio::test]
    async fn test_default_timeout_is_ten_seconds() {
        let orchestrator = BalanceOrchestrator::new(MockTransport::new(vec![]));
        assert_eq!(orchestrator.effective_timeout(), Duration::from_secs(10));
    }
}
