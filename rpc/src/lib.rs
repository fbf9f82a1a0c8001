//! HTTP API for the qnode node.
//!
//! Provides endpoints for:
//! - Wallet creation, balances and activity pings
//! - Transaction submission and validator registration
//! - Block production and peer-to-peer block/transaction gossip
//! - Chain views, status and the suspicious-activity log
//! - Treasury initialisation and distribution
//! - Peer registration and chain synchronisation
//! - Prometheus metrics

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use error::RpcError;
pub use middleware::ClientSource;
pub use server::{build_router, RpcServer};
