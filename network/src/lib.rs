//! Networking layer for qnode.
//!
//! Tracks known and malicious peers, limits inbound request rates, and
//! talks to other nodes over HTTP for probing, snapshot pulls and gossip.

pub mod broadcast;
pub mod client;
pub mod error;
pub mod peer_manager;
pub mod rate_limit;

pub use broadcast::{BroadcastResult, Broadcaster, Gossip};
pub use client::{HttpPeerClient, PeerClient, PeerStatus};
pub use error::{NetworkError, PeerError};
pub use peer_manager::{probe_peer, PeerRegistry, PeerVerdict};
pub use rate_limit::SlidingWindowLimiter;
