//! Nullable infrastructure for deterministic testing.
//!
//! Time, randomness and peer I/O sit behind traits ([`qnode_types::Clock`],
//! [`rand::RngCore`], [`qnode_network::PeerClient`]). The implementations
//! here return scripted values, are driven programmatically and never touch
//! the network.

pub mod clock;
pub mod network;
pub mod random;

pub use clock::NullClock;
pub use network::NullPeerClient;
pub use random::NullRandom;
