//! qnode daemon: entry point for running a qnode node.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use qnode_ledger::{Ledger, LedgerSnapshot};
use qnode_node::{init_logging, LogFormat, NodeConfig, NodeDeps, QNode, ShutdownController};
use qnode_rpc::RpcServer;
use qnode_types::{Address, CANONICAL_TREASURY};

#[derive(Parser)]
#[command(name = "qnode-daemon", about = "qnode proof-of-stake ledger node")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "QNODE_CONFIG")]
    config: Option<PathBuf>,

    /// Interface the HTTP API binds to.
    #[arg(long, env = "QNODE_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// HTTP API port.
    #[arg(long, env = "QNODE_PORT")]
    port: Option<u16>,

    /// Directory for the persisted ledger.
    #[arg(long, env = "QNODE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Treasury address this node anchors on. Anything but the canonical
    /// treasury isolates the node from the network.
    #[arg(long, env = "QNODE_TREASURY_ADDRESS")]
    treasury_address: Option<String>,

    /// Bootstrap peer URLs (comma-separated: "http://1.2.3.4:5000,http://5.6.7.8:5000").
    #[arg(long, env = "QNODE_BOOTSTRAP_PEERS", value_delimiter = ',')]
    bootstrap_peers: Vec<String>,

    /// Enable the Prometheus metrics endpoint.
    #[arg(long, env = "QNODE_ENABLE_METRICS")]
    metrics: bool,

    /// Load the ledger from the data directory at startup and save it on exit.
    #[arg(long, env = "QNODE_PERSIST_LEDGER")]
    persist_ledger: bool,

    /// Do not mint the initial treasury supply at startup.
    #[arg(long, env = "QNODE_NO_AUTO_INIT")]
    no_auto_init: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "QNODE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "QNODE_LOG_FORMAT")]
    log_format: Option<String>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Start the node.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Print a fresh key pair as JSON. Nothing is written to disk.
    Keygen,
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node.
    Run,
}

/// File (or default) config with CLI flags and env vars layered on top.
fn resolve_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let base = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(&path.to_string_lossy())
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NodeConfig::default(),
    };

    Ok(NodeConfig {
        listen_addr: cli.listen_addr.clone().unwrap_or(base.listen_addr),
        port: cli.port.unwrap_or(base.port),
        data_dir: cli.data_dir.clone().unwrap_or(base.data_dir),
        treasury_address: cli
            .treasury_address
            .as_deref()
            .map(Address::new)
            .unwrap_or(base.treasury_address),
        bootstrap_peers: if cli.bootstrap_peers.is_empty() {
            base.bootstrap_peers
        } else {
            cli.bootstrap_peers.clone()
        },
        enable_metrics: cli.metrics || base.enable_metrics,
        persist_ledger: cli.persist_ledger || base.persist_ledger,
        auto_init_treasury: !cli.no_auto_init && base.auto_init_treasury,
        log_level: cli.log_level.clone().unwrap_or(base.log_level),
        log_format: cli.log_format.clone().unwrap_or(base.log_format),
        ..base
    })
}

/// The persisted ledger if there is one anchored on `treasury`, else a
/// fresh ledger holding only genesis.
fn load_ledger(config: &NodeConfig, path: &Path) -> Ledger {
    let fresh = || Ledger::new(config.ledger.clone(), Some(config.treasury_address.clone()));
    if !path.exists() {
        return fresh();
    }
    let snapshot = match LedgerSnapshot::load(path) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable ledger file, starting fresh");
            return fresh();
        }
    };
    if snapshot.treasury_address.as_ref() != Some(&config.treasury_address) {
        tracing::warn!(
            path = %path.display(),
            stored = ?snapshot.treasury_address,
            configured = %config.treasury_address,
            "persisted ledger anchors on another treasury, starting fresh"
        );
        return fresh();
    }
    match Ledger::from_snapshot(snapshot, config.ledger.clone()) {
        Ok(ledger) => {
            tracing::info!(path = %path.display(), blocks = ledger.len(), "ledger loaded");
            ledger
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "invalid ledger file, starting fresh");
            fresh()
        }
    }
}

fn save_ledger(snapshot: &LedgerSnapshot, config: &NodeConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating {}", config.data_dir.display()))?;
    let path = config.ledger_path();
    snapshot
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), blocks = snapshot.len(), "ledger saved");
    Ok(())
}

async fn bootstrap(node: &QNode, peers: &[String]) {
    for peer in peers {
        match node.add_peer(peer).await {
            Ok(_) => match node.sync_from_peer(peer).await {
                Ok(outcome) => {
                    tracing::info!(%peer, blocks = outcome.new_length, "synced from bootstrap peer")
                }
                Err(e) => tracing::debug!(%peer, error = %e, "kept local chain"),
            },
            Err(e) => tracing::warn!(%peer, error = %e, "bootstrap peer rejected"),
        }
    }
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    if !config.is_official_treasury() {
        tracing::warn!(
            configured = %config.treasury_address,
            official = CANONICAL_TREASURY,
            "non-canonical treasury: honest peers will treat this node as malicious"
        );
    }

    let ledger = if config.persist_ledger {
        load_ledger(&config, &config.ledger_path())
    } else {
        Ledger::new(config.ledger.clone(), Some(config.treasury_address.clone()))
    };
    let deps = NodeDeps::production(&config);
    let node = Arc::new(QNode::with_ledger(config.clone(), ledger, deps));

    if config.auto_init_treasury && node.balance(&config.treasury_address).await.is_zero() {
        if let Err(e) = node.treasury_init(None).await {
            tracing::warn!(error = %e, "treasury initialisation skipped");
        }
    }
    if !config.bootstrap_peers.is_empty() {
        tracing::info!(peers = %config.bootstrap_peers.join(", "), "contacting bootstrap peers");
        bootstrap(&node, &config.bootstrap_peers).await;
    }

    let shutdown = Arc::new(ShutdownController::new());
    let signal_listener = Arc::clone(&shutdown);
    tokio::spawn(async move { signal_listener.wait_for_signal().await });

    tracing::info!(
        addr = %config.bind_addr(),
        treasury = %config.treasury_address,
        metrics = config.enable_metrics,
        "starting qnode"
    );
    RpcServer::new(Arc::clone(&node))
        .bind_and_serve(&config.bind_addr(), shutdown.signalled())
        .await?;

    let gossip = node.flush_gossip().await;
    tracing::debug!(sent = gossip.sent, failed = gossip.failed, "pending gossip flushed");
    if config.persist_ledger {
        save_ledger(&node.snapshot().await, &config)?;
    }
    tracing::info!("qnode daemon exited cleanly");
    Ok(())
}

fn keygen() -> anyhow::Result<()> {
    let wallet = qnode_crypto::generate_keypair();
    let json = serde_json::json!({
        "address": wallet.address,
        "public_key": wallet.public_key,
        "private_key": wallet.private_key.expose(),
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Keygen => keygen(),
        Command::Node { action: NodeAction::Run } => {
            let config = resolve_config(&cli)?;
            let format: LogFormat = config.log_format.parse()?;
            init_logging(format, &config.log_level)?;
            run(config).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("qnode-daemon").chain(args.iter().copied()))
            .expect("valid args")
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "--port",
            "6001",
            "--treasury-address",
            "Qlocal",
            "--bootstrap-peers",
            "http://a:5000,http://b:5000",
            "--no-auto-init",
            "node",
            "run",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.port, 6001);
        assert_eq!(config.treasury_address, Address::new("Qlocal"));
        assert_eq!(config.bootstrap_peers, vec!["http://a:5000", "http://b:5000"]);
        assert!(!config.auto_init_treasury);
        assert!(!config.is_official_treasury());
    }

    #[test]
    fn file_settings_are_the_base() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qnode.toml");
        std::fs::write(&path, "port = 7000\nlog_level = \"debug\"\n").unwrap();

        let cli = parse(&["--config", path.to_str().unwrap(), "--log-level", "warn", "node", "run"]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.log_level, "warn");
        assert!(config.is_official_treasury());
    }

    #[test]
    fn persisted_ledger_with_foreign_treasury_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let foreign = Ledger::new(Default::default(), Some(Address::new("Qforeign")));
        foreign.snapshot().save(&path).unwrap();

        let ledger = load_ledger(&NodeConfig::default(), &path);
        assert_eq!(ledger.treasury(), Some(&Address::new(CANONICAL_TREASURY)));
        assert_eq!(ledger.len(), 1);
    }
}
