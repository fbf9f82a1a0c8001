//! Best-effort gossip of blocks and transactions.
//!
//! A broadcast is handed to a background task after the local mutation it
//! reports has committed. Each target gets its own request, bounded by the
//! client's timeout; failures are logged and counted, never surfaced to the
//! caller of the local operation.

use qnode_ledger::{Block, Transaction};
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};

use crate::client::PeerClient;

/// Payload of a gossip round.
#[derive(Clone, Debug)]
pub enum Gossip {
    Block(Block),
    Transaction(Transaction),
}

impl Gossip {
    fn kind(&self) -> &'static str {
        match self {
            Self::Block(_) => "block",
            Self::Transaction(_) => "transaction",
        }
    }
}

/// Outcome of a broadcast round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastResult {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Broadcaster {
    client: Arc<dyn PeerClient>,
}

impl Broadcaster {
    pub fn new(client: Arc<dyn PeerClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<dyn PeerClient> {
        &self.client
    }

    /// Send `gossip` to every target concurrently. Returns immediately; the
    /// handle resolves once every request has finished or timed out.
    pub fn broadcast(&self, targets: Vec<String>, gossip: Gossip) -> JoinHandle<BroadcastResult> {
        let client = Arc::clone(&self.client);
        let gossip = Arc::new(gossip);
        tokio::spawn(async move {
            let mut requests = JoinSet::new();
            for peer in targets {
                let client = Arc::clone(&client);
                let gossip = Arc::clone(&gossip);
                requests.spawn(async move {
                    let outcome = match gossip.as_ref() {
                        Gossip::Block(block) => client.post_block(&peer, block).await,
                        Gossip::Transaction(tx) => client.post_transaction(&peer, tx).await,
                    };
                    if let Err(e) = &outcome {
                        tracing::debug!(%peer, kind = gossip.kind(), error = %e, "gossip failed");
                    }
                    outcome.is_ok()
                });
            }

            let mut result = BroadcastResult::default();
            while let Some(joined) = requests.join_next().await {
                match joined {
                    Ok(true) => result.sent += 1,
                    _ => result.failed += 1,
                }
            }
            if result.sent + result.failed > 0 {
                tracing::debug!(
                    kind = gossip.kind(),
                    sent = result.sent,
                    failed = result.failed,
                    "broadcast finished"
                );
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PeerStatus;
    use crate::error::NetworkError;
    use async_trait::async_trait;
    use qnode_ledger::LedgerSnapshot;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        down: Vec<String>,
        blocks: Mutex<Vec<String>>,
        txs: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PeerClient for Recorder {
        async fn fetch_status(&self, _peer: &str) -> Result<PeerStatus, NetworkError> {
            Ok(PeerStatus::default())
        }

        async fn fetch_snapshot(&self, peer: &str) -> Result<LedgerSnapshot, NetworkError> {
            Err(NetworkError::Status {
                url: peer.to_string(),
                status: 404,
            })
        }

        async fn post_block(&self, peer: &str, _block: &Block) -> Result<(), NetworkError> {
            if self.down.iter().any(|p| p == peer) {
                return Err(NetworkError::Status {
                    url: peer.to_string(),
                    status: 503,
                });
            }
            self.blocks.lock().unwrap().push(peer.to_string());
            Ok(())
        }

        async fn post_transaction(&self, peer: &str, _tx: &Transaction) -> Result<(), NetworkError> {
            self.txs.lock().unwrap().push(peer.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn block_reaches_every_live_target() {
        let recorder = Arc::new(Recorder {
            down: vec!["http://down".into()],
            ..Default::default()
        });
        let broadcaster = Broadcaster::new(recorder.clone());
        let targets = vec!["http://a".into(), "http://down".into(), "http://b".into()];
        let result = broadcaster
            .broadcast(targets, Gossip::Block(Block::genesis()))
            .await
            .unwrap();
        assert_eq!(result, BroadcastResult { sent: 2, failed: 1 });
        let mut seen = recorder.blocks.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["http://a".to_string(), "http://b".to_string()]);
    }

    #[tokio::test]
    async fn transaction_uses_transaction_endpoint() {
        let recorder = Arc::new(Recorder::default());
        let broadcaster = Broadcaster::new(recorder.clone());
        let tx = Block::genesis().transactions[0].clone();
        let result = broadcaster
            .broadcast(vec!["http://a".into()], Gossip::Transaction(tx))
            .await
            .unwrap();
        assert_eq!(result.sent, 1);
        assert_eq!(recorder.txs.lock().unwrap().len(), 1);
        assert!(recorder.blocks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_targets_is_a_noop() {
        let broadcaster = Broadcaster::new(Arc::new(Recorder::default()));
        let result = broadcaster
            .broadcast(Vec::new(), Gossip::Block(Block::genesis()))
            .await
            .unwrap();
        assert_eq!(result, BroadcastResult::default());
    }
}
