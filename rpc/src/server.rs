//! Axum-based HTTP server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use qnode_node::QNode;
use tokio::net::TcpListener;

use crate::error::RpcError;
use crate::handlers;
use crate::middleware::{rate_limit, HEALTH_PATH};

/// Every route, wrapped in the per-client rate limiter.
pub fn build_router(node: Arc<QNode>) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(handlers::health))
        .route("/wallet/create", post(handlers::create_wallet))
        .route("/wallet/balance/:address", get(handlers::wallet_balance))
        .route("/wallet/activity/:address", post(handlers::wallet_activity))
        .route("/transaction/send", post(handlers::send_transaction))
        .route("/transaction/receive", post(handlers::receive_transaction))
        .route("/validator/register", post(handlers::register_validator))
        .route("/block/mine", post(handlers::mine_block))
        .route("/block/receive", post(handlers::receive_block))
        .route("/blockchain", get(handlers::blockchain))
        .route("/blockchain/status", get(handlers::status))
        .route("/security/suspicious", get(handlers::suspicious))
        .route("/ledger/snapshot", get(handlers::ledger_snapshot))
        .route("/treasury/init", post(handlers::treasury_init))
        .route("/treasury/distribute", post(handlers::treasury_distribute))
        .route("/peers", get(handlers::peers))
        .route("/peers/add", post(handlers::add_peer))
        .route("/peers/sync", post(handlers::sync_from_peer))
        .route("/sync", post(handlers::sync))
        .route("/metrics", get(handlers::metrics))
        .layer(axum::middleware::from_fn_with_state(node.clone(), rate_limit))
        .with_state(node)
}

pub struct RpcServer {
    node: Arc<QNode>,
}

impl RpcServer {
    pub fn new(node: Arc<QNode>) -> Self {
        Self { node }
    }

    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.node))
    }

    /// Serve on `listener` until `shutdown` resolves, then drain in-flight
    /// requests.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        match listener.local_addr() {
            Ok(addr) => tracing::info!(%addr, "HTTP API listening"),
            Err(e) => tracing::warn!(error = %e, "HTTP API listening on an unknown address"),
        }
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| RpcError::Server(e.to_string()))
    }

    /// Bind `addr` and serve until `shutdown` resolves.
    pub async fn bind_and_serve<F>(self, addr: &str, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RpcError::Server(format!("cannot bind {addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }
}
