//! Per-client rate limiting.
//!
//! Every request except the liveness probe is counted against the client
//! IP's sliding window. Rejected requests get a 429 with `Retry-After` and
//! never reach a handler.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use qnode_node::QNode;

use crate::error::RpcError;

pub const HEALTH_PATH: &str = "/health";

/// The requesting client, as recorded in the suspicious-activity log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientSource(pub String);

impl ClientSource {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn client_ip(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(State(node): State<Arc<QNode>>, mut req: Request, next: Next) -> Response {
    let source = client_ip(&req);
    req.extensions_mut().insert(ClientSource(source.clone()));

    if req.uri().path() == HEALTH_PATH {
        return next.run(req).await;
    }

    match node.check_rate_limit(&source) {
        Ok(()) => next.run(req).await,
        Err(e) => {
            tracing::warn!(%source, path = req.uri().path(), "rate limit exceeded");
            RpcError::from(e).into_response()
        }
    }
}
