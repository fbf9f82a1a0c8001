//! Outbound calls to other nodes.
//!
//! [`PeerClient`] is the seam between node logic and HTTP so tests can swap
//! in a recording client. [`HttpPeerClient`] talks to the node API over
//! `reqwest` with a short timeout for gossip and a longer one for probes.

use async_trait::async_trait;
use qnode_ledger::{Block, LedgerSnapshot, Transaction};
use qnode_types::Address;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::NetworkError;

pub const DEFAULT_GOSSIP_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The parts of a peer's `/blockchain/status` answer this node reads.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerStatus {
    #[serde(default)]
    pub treasury: Option<Address>,
    #[serde(default)]
    pub blocks: Option<usize>,
}

#[async_trait]
pub trait PeerClient: Send + Sync {
    /// `GET {peer}/blockchain/status`.
    async fn fetch_status(&self, peer: &str) -> Result<PeerStatus, NetworkError>;

    /// `GET {peer}/ledger/snapshot`.
    async fn fetch_snapshot(&self, peer: &str) -> Result<LedgerSnapshot, NetworkError>;

    /// `POST {peer}/block/receive`.
    async fn post_block(&self, peer: &str, block: &Block) -> Result<(), NetworkError>;

    /// `POST {peer}/transaction/receive`.
    async fn post_transaction(&self, peer: &str, tx: &Transaction) -> Result<(), NetworkError>;
}

#[derive(Clone)]
pub struct HttpPeerClient {
    client: Client,
    gossip_timeout: Duration,
    probe_timeout: Duration,
}

impl HttpPeerClient {
    pub fn new(gossip_timeout: Duration, probe_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            gossip_timeout,
            probe_timeout,
        }
    }

    async fn send(&self, url: String, request: RequestBuilder) -> Result<Response, NetworkError> {
        let response = request.send().await.map_err(|source| NetworkError::Http {
            url: url.clone(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        timeout: Duration,
    ) -> Result<T, NetworkError> {
        let request = self.client.get(&url).timeout(timeout);
        let response = self.send(url.clone(), request).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| NetworkError::Http { url, source })
    }
}

impl Default for HttpPeerClient {
    fn default() -> Self {
        Self::new(DEFAULT_GOSSIP_TIMEOUT, DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_status(&self, peer: &str) -> Result<PeerStatus, NetworkError> {
        self.get_json(format!("{peer}/blockchain/status"), self.probe_timeout)
            .await
    }

    async fn fetch_snapshot(&self, peer: &str) -> Result<LedgerSnapshot, NetworkError> {
        self.get_json(format!("{peer}/ledger/snapshot"), self.probe_timeout)
            .await
    }

    async fn post_block(&self, peer: &str, block: &Block) -> Result<(), NetworkError> {
        let url = format!("{peer}/block/receive");
        let request = self.client.post(&url).json(block).timeout(self.gossip_timeout);
        self.send(url, request).await.map(|_| ())
    }

    async fn post_transaction(&self, peer: &str, tx: &Transaction) -> Result<(), NetworkError> {
        let url = format!("{peer}/transaction/receive");
        let request = self.client.post(&url).json(tx).timeout(self.gossip_timeout);
        self.send(url, request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ignores_unknown_fields() {
        let status: PeerStatus = serde_json::from_str(
            r#"{"blocks": 4, "treasury": "Qabc", "valid": true, "validators": 2}"#,
        )
        .unwrap();
        assert_eq!(status.treasury, Some(Address::new("Qabc")));
        assert_eq!(status.blocks, Some(4));
    }

    #[test]
    fn status_without_treasury() {
        let status: PeerStatus = serde_json::from_str(r#"{"treasury": null}"#).unwrap();
        assert!(status.treasury.is_none());
        let status: PeerStatus = serde_json::from_str("{}").unwrap();
        assert!(status.treasury.is_none());
    }

    #[tokio::test]
    async fn unreachable_peer_is_an_error() {
        let client = HttpPeerClient::new(Duration::from_millis(200), Duration::from_millis(200));
        // Port 9 (discard) on localhost is essentially never listening.
        let result = client.fetch_status("http://127.0.0.1:9").await;
        assert!(matches!(result, Err(NetworkError::Http { .. })));
    }
}
