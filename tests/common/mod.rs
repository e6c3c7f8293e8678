//! 测试辅助模块
//! 提供可控的传输层、假 RPC 节点和测试应用

#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::Request,
    response::Response,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use solbalance::{
    api,
    app_state::AppState,
    config::Config,
    domain::{AccountIdentifier, NetworkEndpoint},
    error::BalanceError,
    service::balance_transport::BalanceTransport,
};

pub const TEST_PUBKEY: &str = "DYw8jCTfwHNRJhhmFcbXvVDTqWMEVFBX6ZKUmG5CNSKK";

#[derive(Clone)]
pub enum Reply {
    Lamports(u64),
    Fail(BalanceError),
    Hang,
    Panic(&'static str),
}

/// 按网络名返回预设结果的传输层
pub struct MockTransport {
    replies: HashMap<String, Reply>,
    calls: AtomicUsize,
}

impl MockTransport {
    pub fn new(replies: impl IntoIterator<Item = (&'static str, Reply)>) -> Arc<Self> {
        Arc::new(Self {
            replies: replies
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
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
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(0)
            }
            Some(Reply::Panic(msg)) => panic!("{}", msg),
            None => Err(BalanceError::Transport("no reply configured".into())),
        }
    }
}

pub fn test_config() -> Config {
    let mut config = Config::from_env().expect("default config");
    config.rpc.mainnet_url = "http://mainnet.invalid".into();
    config.rpc.testnet_url = "http://testnet.invalid".into();
    config
}

/// 使用 mock 传输层创建测试路由
pub fn create_test_app(transport: Arc<dyn BalanceTransport>) -> Router {
    create_test_app_with_config(test_config(), transport)
}

pub fn create_test_app_with_config(config: Config, transport: Arc<dyn BalanceTransport>) -> Router {
    let state = Arc::new(AppState::with_transport(Arc::new(config), transport));
    api::routes(state)
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub async fn body_json(resp: Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// 启动一个只认 getBalance 的假 Solana 节点，返回其 URL
pub async fn spawn_fake_rpc(lamports: u64) -> String {
    let app = Router::new().route(
        "/",
        post(move |Json(req): Json<Value>| async move {
            let id = req.get("id").cloned().unwrap_or(json!(1));
            Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "context": { "slot": 1 }, "value": lamports }
            }))
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake rpc");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}
