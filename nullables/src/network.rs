//! Nullable peer client: scripted peer answers, recorded gossip.

use async_trait::async_trait;
use qnode_ledger::{Block, LedgerSnapshot, Transaction};
use qnode_network::{NetworkError, PeerClient, PeerStatus};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    statuses: HashMap<String, PeerStatus>,
    snapshots: HashMap<String, LedgerSnapshot>,
    sent_blocks: Vec<(String, Block)>,
    sent_transactions: Vec<(String, Transaction)>,
    status_requests: Vec<String>,
}

/// A [`PeerClient`] that never touches the network.
///
/// Peers answer with whatever status or snapshot was scripted for them;
/// unscripted peers behave as unreachable. Every outbound block and
/// transaction is recorded for assertions.
#[derive(Default)]
pub struct NullPeerClient {
    state: Mutex<State>,
}

impl NullPeerClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Script the `/blockchain/status` answer of `peer`.
    pub fn set_status(&self, peer: &str, status: PeerStatus) {
        self.state().statuses.insert(peer.to_string(), status);
    }

    /// Script the `/ledger/snapshot` answer of `peer`.
    pub fn set_snapshot(&self, peer: &str, snapshot: LedgerSnapshot) {
        self.state().snapshots.insert(peer.to_string(), snapshot);
    }

    pub fn sent_blocks(&self) -> Vec<(String, Block)> {
        self.state().sent_blocks.clone()
    }

    pub fn sent_transactions(&self) -> Vec<(String, Transaction)> {
        self.state().sent_transactions.clone()
    }

    /// Peers whose status has been queried, in order.
    pub fn status_requests(&self) -> Vec<String> {
        self.state().status_requests.clone()
    }

    pub fn reset(&self) {
        let mut state = self.state();
        state.sent_blocks.clear();
        state.sent_transactions.clear();
        state.status_requests.clear();
    }

    fn unreachable(url: String) -> NetworkError {
        NetworkError::Status { url, status: 503 }
    }
}

#[async_trait]
impl PeerClient for NullPeerClient {
    async fn fetch_status(&self, peer: &str) -> Result<PeerStatus, NetworkError> {
        let mut state = self.state();
        state.status_requests.push(peer.to_string());
        state
            .statuses
            .get(peer)
            .cloned()
            .ok_or_else(|| Self::unreachable(format!("{peer}/blockchain/status")))
    }

    async fn fetch_snapshot(&self, peer: &str) -> Result<LedgerSnapshot, NetworkError> {
        self.state()
            .snapshots
            .get(peer)
            .cloned()
            .ok_or_else(|| Self::unreachable(format!("{peer}/ledger/snapshot")))
    }

    async fn post_block(&self, peer: &str, block: &Block) -> Result<(), NetworkError> {
        self.state()
            .sent_blocks
            .push((peer.to_string(), block.clone()));
        Ok(())
    }

    async fn post_transaction(&self, peer: &str, tx: &Transaction) -> Result<(), NetworkError> {
        self.state()
            .sent_transactions
            .push((peer.to_string(), tx.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnode_types::Address;

    #[tokio::test]
    async fn scripted_status_is_returned() {
        let client = NullPeerClient::new();
        client.set_status(
            "http://a",
            PeerStatus {
                treasury: Some(Address::new("Qt")),
                blocks: Some(1),
            },
        );
        let status = client.fetch_status("http://a").await.unwrap();
        assert_eq!(status.treasury, Some(Address::new("Qt")));
        assert!(client.fetch_status("http://b").await.is_err());
        assert_eq!(client.status_requests(), vec!["http://a", "http://b"]);
    }

    #[tokio::test]
    async fn gossip_is_recorded() {
        let client = NullPeerClient::new();
        client.post_block("http://a", &Block::genesis()).await.unwrap();
        assert_eq!(client.sent_blocks().len(), 1);
        client.reset();
        assert!(client.sent_blocks().is_empty());
    }
}
