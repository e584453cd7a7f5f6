//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID, CORS)
//! - Bind server to listener
//! - Stop accepting on shutdown and drain in-flight requests

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post, MethodRouter},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::bridge::{Bridge, CommandEncoder};
use crate::config::GatewayConfig;
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::allow;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<Bridge>,
    pub encoder: Arc<CommandEncoder>,
}

/// HTTP front of the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over `bridge`.
    pub fn new(config: &GatewayConfig, bridge: Arc<Bridge>) -> Self {
        let state = AppState {
            bridge,
            encoder: Arc::new(CommandEncoder::new(
                config.broker.topics.clone(),
                config.news.clone(),
            )),
        };

        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let routes: [(&str, MethodRouter<AppState>); 6] = [
            ("/newslist", get(handlers::news_list).options(|| async { allow("GET, OPTIONS") })),
            (
                "/newslist/filtered",
                get(handlers::filtered_list).options(|| async { allow("GET, OPTIONS") }),
            ),
            (
                "/newslist/filtered/date",
                get(handlers::filter_by_date).options(|| async { allow("GET, OPTIONS") }),
            ),
            ("/newsdetail", get(handlers::news_detail).options(|| async { allow("GET, OPTIONS") })),
            ("/comments", get(handlers::comments_by_news).options(|| async { allow("GET, OPTIONS") })),
            ("/addcomment", post(handlers::add_comment).options(|| async { allow("POST, OPTIONS") })),
        ];

        let mut router = Router::new().route(
            "/",
            get(handlers::root).options(|| async { allow("GET, OPTIONS") }),
        );
        for (path, method_router) in routes {
            router = router
                .route(path, method_router.clone())
                .route(&format!("{path}/"), method_router);
        }

        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
        )
    }

    /// The assembled router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
