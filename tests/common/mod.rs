//! Shared utilities for integration tests.
//!
//! A gateway is started on an ephemeral port over the in-process broker, and
//! backend services are simulated by tasks consuming the request topics.

#![allow(dead_code)]

use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use news_gateway::broker::memory::MemoryBroker;
use news_gateway::broker::{
    BrokerError, OutboundMessage, Publisher, ReplySource, CORRELATION_HEADER, KIND_HEADER,
};
use news_gateway::config::GatewayConfig;
use news_gateway::http::HttpServer;
use news_gateway::lifecycle::{build_bridge, serve_until, Shutdown};

/// Grace period for draining the server and the pumps.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// A running gateway.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub broker: MemoryBroker,
    pub config: GatewayConfig,
    pub client: reqwest::Client,
    pub pumps: Arc<Shutdown>,
    stop: Option<oneshot::Sender<()>>,
    served: Option<JoinHandle<std::io::Result<()>>>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Ask the gateway to stop, as a shutdown signal would.
    pub fn begin_shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    /// Wait until the server has drained and the reply pumps have stopped.
    pub async fn stopped(&mut self) -> std::io::Result<()> {
        match self.served.take() {
            Some(handle) => handle.await.map_err(std::io::Error::other)?,
            None => Ok(()),
        }
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.begin_shutdown();
    }
}

/// Config with a short round trip ceiling so timeouts are quick to observe.
pub fn test_config(round_trip: Duration) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.timeouts.round_trip_secs = round_trip.as_secs().max(1);
    config
}

/// Start a gateway over a fresh in-process broker.
pub async fn spawn_gateway(config: GatewayConfig) -> TestGateway {
    spawn_gateway_failing(config, &[]).await
}

/// Start a gateway whose publishes to `failing_topics` always fail.
pub async fn spawn_gateway_failing(config: GatewayConfig, failing_topics: &[&str]) -> TestGateway {
    let broker = MemoryBroker::new();
    let pumps = Shutdown::new();

    let publisher = FailingTopics {
        inner: broker.clone(),
        failing: failing_topics.iter().map(|t| t.to_string()).collect(),
    };
    let consumer_side = broker.clone();
    let bridge = build_bridge(
        &config,
        Arc::new(publisher),
        move |topic| Ok(Arc::new(consumer_side.subscribe(topic)) as Arc<dyn ReplySource>),
        &pumps,
    )
    .unwrap();

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&config, Arc::new(bridge));

    let pumps = Arc::new(pumps);
    let (stop, stop_rx) = oneshot::channel::<()>();
    let served = tokio::spawn({
        let pumps = pumps.clone();
        async move {
            let stop = async move {
                let _ = stop_rx.await;
            };
            serve_until(server, listener, stop, &pumps, SHUTDOWN_GRACE).await
        }
    });

    TestGateway {
        addr,
        broker,
        config,
        client: reqwest::Client::new(),
        pumps,
        stop: Some(stop),
        served: Some(served),
    }
}

/// Publisher that rejects a fixed set of topics.
struct FailingTopics {
    inner: MemoryBroker,
    failing: HashSet<String>,
}

#[async_trait]
impl Publisher for FailingTopics {
    async fn publish(&self, topic: &str, message: OutboundMessage) -> Result<(), BrokerError> {
        if self.failing.contains(topic) {
            return Err(BrokerError::Delivery {
                topic: topic.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.inner.publish(topic, message).await
    }
}

/// What a simulated backend answers with.
#[derive(Debug, Clone)]
pub struct Reply {
    pub topic: String,
    pub payload: String,
    pub kind: Option<&'static str>,
    pub delay: Duration,
    /// Send without the correlation id, like a backend that does not echo it.
    pub untagged: bool,
}

impl Reply {
    pub fn on(topic: &str, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.to_string(),
            payload: payload.into(),
            kind: None,
            delay: Duration::ZERO,
            untagged: false,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn kind(mut self, kind: &'static str) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn untagged(mut self) -> Self {
        self.untagged = true;
        self
    }
}

/// Start a programmable backend consuming `topic`.
///
/// `f` receives every command string; each returned reply is published on
/// its own task, so slow replies do not hold up later commands.
pub fn start_programmable_backend<F, Fut>(broker: &MemoryBroker, topic: &str, f: F)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Reply>> + Send + 'static,
{
    let requests = broker.subscribe(topic);
    let broker = broker.clone();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok(request) = requests.receive_next().await {
            let f = f.clone();
            let broker = broker.clone();
            tokio::spawn(async move {
                let command = String::from_utf8_lossy(&request.payload).into_owned();
                let Some(reply) = f(command).await else {
                    return;
                };
                tokio::time::sleep(reply.delay).await;

                let mut message = OutboundMessage::new(reply.payload);
                if !reply.untagged {
                    if let Some(id) = request.header(CORRELATION_HEADER) {
                        message = message.with_correlation_id(id);
                    }
                }
                if let Some(kind) = reply.kind {
                    message = message.with_header(KIND_HEADER, kind);
                }
                let _ = broker.publish(&reply.topic, message).await;
            });
        }
    });
}
