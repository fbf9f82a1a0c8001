//! Known peers, the malicious set, and treasury-anchor verification.
//!
//! A peer is identified by its base URL with trailing slashes removed. Once
//! a peer is flagged malicious it is dropped from the peer list and never
//! re-admitted or gossiped to.

use qnode_types::Address;

use crate::client::PeerClient;
use crate::error::PeerError;

/// Outcome of asking a candidate peer for its treasury.
#[derive(Clone, Debug, PartialEq)]
pub enum PeerVerdict {
    /// The peer reports the official treasury.
    Trusted,
    /// The peer reports no treasury or a different one.
    Untrusted { reported: Option<Address> },
    /// The probe itself failed (timeout, refused connection, bad status).
    Unreachable { reason: String },
}

/// Query `peer` for its self-reported treasury and compare it against the
/// official one.
pub async fn probe_peer(client: &dyn PeerClient, peer: &str, official: &Address) -> PeerVerdict {
    match client.fetch_status(peer).await {
        Ok(status) if status.treasury.as_ref() == Some(official) => PeerVerdict::Trusted,
        Ok(status) => PeerVerdict::Untrusted {
            reported: status.treasury,
        },
        Err(e) => PeerVerdict::Unreachable {
            reason: e.to_string(),
        },
    }
}

#[derive(Clone, Debug, Default)]
pub struct PeerRegistry {
    peers: Vec<String>,
    malicious: Vec<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical form of a peer URL: surrounding whitespace and trailing
    /// slashes removed.
    pub fn normalize(url: &str) -> String {
        url.trim().trim_end_matches('/').to_string()
    }

    /// Cheap pre-probe checks: non-empty, not malicious, not yet known.
    /// Expects a normalized URL.
    pub fn check_admissible(&self, peer: &str) -> Result<(), PeerError> {
        if peer.is_empty() {
            return Err(PeerError::EmptyUrl);
        }
        if self.is_malicious(peer) {
            return Err(PeerError::Malicious(peer.to_string()));
        }
        if self.contains(peer) {
            return Err(PeerError::AlreadyRegistered(peer.to_string()));
        }
        Ok(())
    }

    /// Apply a probe verdict for `peer`: trusted peers are registered,
    /// untrusted ones flagged malicious, unreachable ones left alone.
    pub fn apply_verdict(
        &mut self,
        peer: &str,
        verdict: PeerVerdict,
        official: &Address,
    ) -> Result<(), PeerError> {
        match verdict {
            PeerVerdict::Trusted => {
                // Re-check: another request may have raced us while probing.
                self.check_admissible(peer)?;
                self.peers.push(peer.to_string());
                tracing::info!(peer, "peer added");
                Ok(())
            }
            PeerVerdict::Untrusted { reported } => {
                self.mark_malicious(peer);
                tracing::warn!(
                    peer,
                    reported = ?reported,
                    official = %official,
                    "peer reports a foreign treasury, flagged malicious"
                );
                Err(PeerError::UntrustedTreasury {
                    peer: peer.to_string(),
                    reported,
                    official: official.clone(),
                })
            }
            PeerVerdict::Unreachable { reason } => {
                tracing::debug!(peer, %reason, "peer probe failed");
                Err(PeerError::Unreachable {
                    peer: peer.to_string(),
                    reason,
                })
            }
        }
    }

    /// Flag `peer` malicious and drop it from the peer list. Returns `true`
    /// if it was not already flagged.
    pub fn mark_malicious(&mut self, peer: &str) -> bool {
        self.peers.retain(|p| p != peer);
        if self.is_malicious(peer) {
            return false;
        }
        self.malicious.push(peer.to_string());
        true
    }

    pub fn is_malicious(&self, peer: &str) -> bool {
        self.malicious.iter().any(|p| p == peer)
    }

    pub fn contains(&self, peer: &str) -> bool {
        self.peers.iter().any(|p| p == peer)
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn malicious(&self) -> &[String] {
        &self.malicious
    }

    /// Peers eligible for gossip.
    pub fn broadcast_targets(&self) -> Vec<String> {
        self.peers
            .iter()
            .filter(|p| !self.is_malicious(p))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn malicious_count(&self) -> usize {
        self.malicious.len()
    }
}
