//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use qnode_types::{Address, Amount, ProtocolParams, CANONICAL_TREASURY};

use crate::NodeError;

/// Configuration for a qnode node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Interface the HTTP API binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Port the HTTP API listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory for the persisted ledger snapshot.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// This node's treasury account. Anything other than the canonical
    /// treasury isolates the node from the public network.
    #[serde(default = "default_treasury_address")]
    pub treasury_address: Address,

    /// Amount minted into an empty treasury by `treasury_init`.
    #[serde(default = "default_treasury_initial_amount")]
    pub treasury_initial_amount: Amount,

    /// Mint the initial treasury supply at startup if the treasury is empty.
    #[serde(default = "default_true")]
    pub auto_init_treasury: bool,

    /// Peer base URLs to probe and register on startup.
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to expose Prometheus metrics at `/metrics`.
    #[serde(default)]
    pub enable_metrics: bool,

    /// Load `ledger.json` from `data_dir` at startup and write it back at
    /// shutdown.
    #[serde(default)]
    pub persist_ledger: bool,

    /// Protocol parameters.
    #[serde(default)]
    pub ledger: ProtocolParams,

    /// Abuse-resistance and peer I/O limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// The `[limits]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: usize,

    /// Number of suspicious-activity records kept in memory.
    #[serde(default = "default_suspicious_log_capacity")]
    pub suspicious_log_capacity: usize,

    /// Timeout for gossip posts to a peer.
    #[serde(default = "default_peer_timeout_secs")]
    pub peer_timeout_secs: u64,

    /// Timeout for status probes and snapshot pulls.
    #[serde(default = "default_peer_probe_timeout_secs")]
    pub peer_probe_timeout_secs: u64,
}

impl LimitsConfig {
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }

    pub fn peer_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_probe_timeout_secs)
    }
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./qnode_data")
}

fn default_treasury_address() -> Address {
    Address::new(CANONICAL_TREASURY)
}

fn default_treasury_initial_amount() -> Amount {
    Amount::new(1_000_000.0)
}

fn default_true() -> bool {
    true
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_rate_limit_max_requests() -> usize {
    100
}

fn default_suspicious_log_capacity() -> usize {
    1000
}

fn default_peer_timeout_secs() -> u64 {
    2
}

fn default_peer_probe_timeout_secs() -> u64 {
    5
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Whether this node anchors on the network-wide treasury.
    pub fn is_official_treasury(&self) -> bool {
        self.treasury_address.as_str() == CANONICAL_TREASURY
    }

    /// Where the ledger snapshot lives when persistence is on.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger.json")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.port)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_limit_window_secs: default_rate_limit_window_secs(),
            rate_limit_max_requests: default_rate_limit_max_requests(),
            suspicious_log_capacity: default_suspicious_log_capacity(),
            peer_timeout_secs: default_peer_timeout_secs(),
            peer_probe_timeout_secs: default_peer_probe_timeout_secs(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            data_dir: default_data_dir(),
            treasury_address: default_treasury_address(),
            treasury_initial_amount: default_treasury_initial_amount(),
            auto_init_treasury: default_true(),
            bootstrap_peers: Vec::new(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            persist_ledger: false,
            ledger: ProtocolParams::default(),
            limits: LimitsConfig::default(),
        }
    }
}
