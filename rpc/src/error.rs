//! RPC error types and their HTTP rendering.

use axum::extract::rejection::JsonRejection;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use qnode_ledger::{LedgerError, SyncRejection};
use qnode_network::PeerError;
use qnode_node::NodeError;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("metrics are disabled")]
    MetricsDisabled,

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error("server error: {0}")]
    Server(String),
}

impl From<JsonRejection> for RpcError {
    fn from(rejection: JsonRejection) -> Self {
        RpcError::InvalidRequest(rejection.body_text())
    }
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::MetricsDisabled => StatusCode::NOT_FOUND,
            RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RpcError::Node(e) => match e {
                NodeError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                NodeError::TreasuryKeyMismatch => StatusCode::UNAUTHORIZED,
                NodeError::Peer(PeerError::Malicious(_))
                | NodeError::Peer(PeerError::UntrustedTreasury { .. })
                | NodeError::Sync(SyncRejection::UntrustedTreasury { .. }) => {
                    StatusCode::FORBIDDEN
                }
                NodeError::Network(_) => StatusCode::BAD_GATEWAY,
                NodeError::Io(_) | NodeError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }

    /// `{"success": false, "error": ...}` plus whatever detail lets the
    /// client correct itself.
    fn body(&self) -> Value {
        let mut body = json!({ "success": false, "error": self.to_string() });
        let RpcError::Node(node_error) = self else {
            return body;
        };
        match node_error {
            NodeError::Admission {
                expected_nonce,
                pending,
                ..
            } => {
                body["expected_nonce"] = json!(expected_nonce);
                body["pending_transactions"] = json!(pending);
            }
            NodeError::RateLimited {
                max_requests,
                window_secs,
                ..
            } => {
                body["error"] = json!("Rate limit exceeded");
                body["message"] = json!(format!(
                    "Maximum {max_requests} requests per {window_secs} seconds"
                ));
            }
            NodeError::Peer(PeerError::UntrustedTreasury { official, .. }) => {
                body["message"] = json!(
                    "peer anchors on a different treasury and is excluded from consensus"
                );
                body["official_treasury"] = json!(official);
            }
            NodeError::Sync(SyncRejection::UntrustedTreasury { received, official }) => {
                body["message"] = json!(
                    "chain anchors on a different treasury and is excluded from consensus"
                );
                body["received_treasury"] = json!(received);
                body["official_treasury"] = json!(official);
            }
            NodeError::Ledger(LedgerError::TreasuryInitialised(balance)) => {
                body["current_balance"] = json!(balance);
            }
            _ => {}
        }
        body
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(self.body());
        match &self {
            RpcError::Node(NodeError::RateLimited {
                retry_after_secs, ..
            }) => (
                status,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnode_ledger::AdmissionError;
    use qnode_types::Address;

    #[test]
    fn admission_errors_carry_nonce_detail() {
        let err = RpcError::from(NodeError::Admission {
            error: AdmissionError::StaleNonce {
                expected: 3,
                received: 1,
            },
            expected_nonce: 3,
            pending: 2,
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let body = err.body();
        assert_eq!(body["success"], false);
        assert_eq!(body["expected_nonce"], 3);
        assert_eq!(body["pending_transactions"], 2);
    }

    #[test]
    fn status_codes_follow_the_error_class() {
        let forbidden = RpcError::from(NodeError::Sync(SyncRejection::UntrustedTreasury {
            received: None,
            official: Address::new("Qofficial"),
        }));
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(forbidden.body()["official_treasury"], "Qofficial");

        let unauthorized = RpcError::from(NodeError::TreasuryKeyMismatch);
        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

        let limited = RpcError::from(NodeError::RateLimited {
            max_requests: 100,
            window_secs: 60,
            retry_after_secs: 12,
        });
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        let response = limited.into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "12");
    }
}
