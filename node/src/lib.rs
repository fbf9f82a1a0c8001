//! qnode full node.
//!
//! The node is the coordinator that:
//! - Builds, signs and admits client transactions
//! - Produces blocks and validates blocks gossiped by peers
//! - Adopts longer valid chains anchored on the official treasury
//! - Probes and tracks peers, flagging ones on a foreign treasury
//! - Rate-limits clients and logs suspicious activity

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;
pub mod suspicious;

pub use config::{LimitsConfig, NodeConfig};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::{
    ChainView, NodeDeps, PeerList, QNode, ReceiveOutcome, StatusReport, SubmitOutcome,
    SuspiciousReport, TransferRequest, TreasuryInit, LOCAL_SOURCE,
};
pub use shutdown::ShutdownController;
pub use suspicious::{SuspicionCategory, SuspiciousActivity, SuspiciousLog};
