//! The qnode node: the lock-guarded ledger plus everything around it.
//!
//! Every ledger read-modify-write runs under one exclusive lock. Gossip is
//! handed to a background task after the lock is released, so a slow peer
//! never holds up local mutation.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use qnode_crypto::{generate_keypair, keypair_from_private};
use qnode_ledger::{
    AccountInfo, Block, Ledger, LedgerSnapshot, SyncOutcome, SyncRejection, Transaction, TxType,
};
use qnode_network::{
    probe_peer, BroadcastResult, Broadcaster, Gossip, HttpPeerClient, PeerClient, PeerError,
    PeerRegistry, SlidingWindowLimiter,
};
use qnode_types::{
    Address, Amount, Clock, KeyPair, PrivateKey, SystemClock, Timestamp, TxHash,
    CANONICAL_TREASURY,
};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::suspicious::{
    classify_admission, classify_block, SuspicionCategory, SuspiciousActivity, SuspiciousLog,
};

const SECS_PER_DAY: f64 = 24.0 * 3600.0;

/// Source label for operations the node triggers itself.
pub const LOCAL_SOURCE: &str = "local";

/// External collaborators a node is wired with.
pub struct NodeDeps {
    pub clock: Arc<dyn Clock>,
    pub peer_client: Arc<dyn PeerClient>,
    pub rng: Box<dyn RngCore + Send>,
    pub metrics: Arc<NodeMetrics>,
}

impl NodeDeps {
    /// Wall clock, HTTP peers and an entropy-seeded RNG.
    pub fn production(config: &NodeConfig) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            peer_client: Arc::new(HttpPeerClient::new(
                config.limits.peer_timeout(),
                config.limits.peer_probe_timeout(),
            )),
            rng: Box::new(StdRng::from_entropy()),
            metrics: Arc::new(NodeMetrics::new()),
        }
    }
}

/// A client request to transfer funds. The node signs on the sender's
/// behalf with the supplied key.
pub struct TransferRequest {
    pub sender: Address,
    pub recipient: Address,
    pub amount: Amount,
    pub fee: Option<Amount>,
    pub nonce: Option<u64>,
    pub private_key: PrivateKey,
}

#[derive(Clone, Debug, Serialize)]
pub struct SubmitOutcome {
    pub transaction: Transaction,
    pub hash: TxHash,
    pub next_expected_nonce: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiveOutcome {
    Accepted,
    AlreadyPresent,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatusReport {
    pub blocks: usize,
    pub pending_transactions: usize,
    pub validators: usize,
    pub validator_list: Vec<Address>,
    pub min_stake: Amount,
    pub block_reward: Amount,
    pub valid: bool,
    pub treasury: Option<Address>,
    pub treasury_balance: Amount,
    pub inactivity_threshold_days: f64,
    pub is_official_treasury: bool,
    pub malicious_peers_count: usize,
    pub balance_consistent: bool,
    pub suspicious_activities_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChainView {
    pub length: usize,
    pub chain: Vec<Block>,
    pub pending_transactions: usize,
    pub validators: usize,
    pub valid: bool,
    pub treasury: Option<Address>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PeerList {
    pub peers: Vec<String>,
    pub malicious_peers: Vec<String>,
    pub total_peers: usize,
    pub total_malicious: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct SuspiciousReport {
    pub total: usize,
    pub activities: Vec<SuspiciousActivity>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TreasuryInit {
    pub treasury_address: Address,
    pub amount: Amount,
    pub block: Option<Block>,
}

struct LedgerState {
    ledger: Ledger,
    rng: Box<dyn RngCore + Send>,
}

pub struct QNode {
    config: NodeConfig,
    official_treasury: Address,
    state: Mutex<LedgerState>,
    peers: RwLock<PeerRegistry>,
    limiter: StdMutex<SlidingWindowLimiter>,
    suspicious: StdMutex<SuspiciousLog>,
    clock: Arc<dyn Clock>,
    broadcaster: Broadcaster,
    gossip_tasks: StdMutex<Vec<JoinHandle<BroadcastResult>>>,
    metrics: Arc<NodeMetrics>,
}

impl QNode {
    /// A node with a fresh ledger holding only genesis.
    pub fn new(config: NodeConfig, deps: NodeDeps) -> Self {
        let ledger = Ledger::new(config.ledger.clone(), Some(config.treasury_address.clone()));
        Self::with_ledger(config, ledger, deps)
    }

    /// A node resuming from an existing ledger (e.g. a loaded snapshot).
    pub fn with_ledger(config: NodeConfig, ledger: Ledger, deps: NodeDeps) -> Self {
        let limiter = SlidingWindowLimiter::new(
            config.limits.rate_limit_window(),
            config.limits.rate_limit_max_requests,
        );
        let suspicious = SuspiciousLog::new(config.limits.suspicious_log_capacity);
        let node = Self {
            official_treasury: Address::new(CANONICAL_TREASURY),
            state: Mutex::new(LedgerState {
                ledger,
                rng: deps.rng,
            }),
            peers: RwLock::new(PeerRegistry::new()),
            limiter: StdMutex::new(limiter),
            suspicious: StdMutex::new(suspicious),
            clock: deps.clock,
            broadcaster: Broadcaster::new(deps.peer_client),
            gossip_tasks: StdMutex::new(Vec::new()),
            metrics: deps.metrics,
            config,
        };
        if let Ok(state) = node.state.try_lock() {
            node.observe(&state.ledger);
        }
        node
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    pub fn official_treasury(&self) -> &Address {
        &self.official_treasury
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ── Abuse resistance ────────────────────────────────────────────────

    /// Count a request from `source` against its sliding window.
    pub fn check_rate_limit(&self, source: &str) -> Result<(), NodeError> {
        self.check_rate_limit_at(source, Instant::now())
    }

    /// [`Self::check_rate_limit`] at an explicit instant. Idle sources are
    /// forgotten once per window.
    pub fn check_rate_limit_at(&self, source: &str, now: Instant) -> Result<(), NodeError> {
        let mut limiter = self.limiter.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = limiter.prune_if_due(now);
        if dropped > 0 {
            tracing::debug!(dropped, tracked = limiter.tracked_sources(), "idle rate-limit sources pruned");
        }
        if limiter.check_at(source, now) {
            return Ok(());
        }
        self.metrics.requests_rate_limited.inc();
        tracing::debug!(source, "rate limit exceeded");
        let retry_after_secs = limiter
            .retry_after(source, now)
            .map(|d| d.as_secs().max(1))
            .unwrap_or(1);
        Err(NodeError::RateLimited {
            max_requests: limiter.max_requests(),
            window_secs: limiter.window().as_secs(),
            retry_after_secs,
        })
    }

    /// Sources the rate limiter currently remembers.
    pub fn rate_limited_sources(&self) -> usize {
        self.limiter
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .tracked_sources()
    }

    fn record_suspicious(&self, category: SuspicionCategory, details: serde_json::Value, source: &str) {
        self.metrics
            .suspicious_events
            .with_label_values(&[category.as_str()])
            .inc();
        self.suspicious
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .record(category, details, source, self.clock.now());
    }

    pub fn suspicious_activities(&self, limit: usize) -> SuspiciousReport {
        let log = self.suspicious.lock().unwrap_or_else(|e| e.into_inner());
        SuspiciousReport {
            total: log.len(),
            activities: log.recent(limit),
        }
    }

    // ── Transactions ────────────────────────────────────────────────────

    /// Build, sign and admit a transfer from a client request, then gossip
    /// it.
    pub async fn submit_transaction(
        &self,
        request: TransferRequest,
        source: &str,
    ) -> Result<SubmitOutcome, NodeError> {
        if request.sender.is_system() {
            return Err(NodeError::SystemSender);
        }
        let wallet = keypair_from_private(request.private_key)?;
        if wallet.address != request.sender {
            return Err(NodeError::KeyMismatch {
                sender: request.sender,
            });
        }

        let now = self.clock.now();
        let outcome = {
            let mut state = self.state.lock().await;
            let ledger = &mut state.ledger;
            let nonce = request
                .nonce
                .unwrap_or_else(|| ledger.expected_nonce(&request.sender));
            let fee = request.fee.unwrap_or(ledger.params().default_fee);
            let mut tx = Transaction::transfer(
                request.sender.clone(),
                request.recipient,
                request.amount,
                fee,
                nonce,
                now,
            );
            tx.sign(&wallet)?;
            let hash = self.admit(ledger, tx.clone(), source, now)?;
            SubmitOutcome {
                next_expected_nonce: ledger.expected_nonce(&request.sender),
                transaction: tx,
                hash,
            }
        };

        self.gossip(Gossip::Transaction(outcome.transaction.clone()))
            .await;
        Ok(outcome)
    }

    /// A transaction gossiped by a peer. Already-pending transactions are
    /// acknowledged without change.
    pub async fn receive_transaction(
        &self,
        tx: Transaction,
        source: &str,
    ) -> Result<ReceiveOutcome, NodeError> {
        if tx.is_system() {
            return Err(NodeError::SystemSender);
        }
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        if state.ledger.mempool().contains(&tx.hash()) {
            return Ok(ReceiveOutcome::AlreadyPresent);
        }
        self.admit(&mut state.ledger, tx, source, now)?;
        Ok(ReceiveOutcome::Accepted)
    }

    /// Admission with suspicious-activity recording and metrics. Called
    /// with the ledger lock held.
    fn admit(
        &self,
        ledger: &mut Ledger,
        tx: Transaction,
        source: &str,
        now: Timestamp,
    ) -> Result<TxHash, NodeError> {
        match ledger.add_transaction(tx.clone(), now) {
            Ok(hash) => {
                self.metrics.transactions_admitted.inc();
                self.observe(ledger);
                Ok(hash)
            }
            Err(error) => {
                self.metrics.transactions_rejected.inc();
                if let Some((category, details)) = classify_admission(&tx, &error, now) {
                    self.record_suspicious(category, details, source);
                }
                tracing::debug!(sender = %tx.sender, %error, "transaction rejected");
                Err(NodeError::Admission {
                    expected_nonce: ledger.expected_nonce(&tx.sender),
                    pending: ledger.mempool().pending_for(&tx.sender),
                    error,
                })
            }
        }
    }

    // ── Validators and blocks ───────────────────────────────────────────

    pub async fn register_validator(&self, address: &Address, stake: Amount) -> Result<(), NodeError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        state.ledger.register_validator(address, stake, now)?;
        self.observe(&state.ledger);
        Ok(())
    }

    /// Assemble a block from the mempool, append it, and gossip it.
    pub async fn produce_block(&self) -> Result<Block, NodeError> {
        let now = self.clock.now();
        let block = {
            let mut state = self.state.lock().await;
            let LedgerState { ledger, rng } = &mut *state;
            let block = ledger.create_block(rng.as_mut(), now);
            self.observe(ledger);
            block
        }
        .ok_or(NodeError::NothingToProduce)?;

        self.metrics.blocks_produced.inc();
        self.gossip(Gossip::Block(block.clone())).await;
        Ok(block)
    }

    /// A block gossiped by a peer: validate fully, then append or refuse.
    pub async fn receive_block(&self, block: Block, source: &str) -> Result<(), NodeError> {
        let now = self.clock.now();
        let index = block.index;
        let mut state = self.state.lock().await;
        match state.ledger.accept_block(block, now) {
            Ok(()) => {
                self.metrics.blocks_accepted.inc();
                self.observe(&state.ledger);
                Ok(())
            }
            Err(rejection) => {
                self.metrics.blocks_rejected.inc();
                if let Some((category, details)) = classify_block(index, &rejection) {
                    self.record_suspicious(category, details, source);
                }
                tracing::info!(index, %rejection, source, "block rejected");
                Err(rejection.into())
            }
        }
    }

    // ── Synchronisation ─────────────────────────────────────────────────

    /// Adopt `candidate` iff it anchors on the official treasury, is
    /// strictly longer, and validates.
    pub async fn sync(&self, candidate: LedgerSnapshot) -> Result<SyncOutcome, NodeError> {
        let mut state = self.state.lock().await;
        match state.ledger.adopt_if_longer(candidate, &self.official_treasury) {
            Ok(outcome) => {
                self.metrics.syncs_adopted.inc();
                self.observe(&state.ledger);
                Ok(outcome)
            }
            Err(rejection) => {
                self.metrics.syncs_rejected.inc();
                match &rejection {
                    SyncRejection::UntrustedTreasury { received, .. } => {
                        tracing::warn!(received = ?received, "refused chain with a foreign treasury");
                    }
                    other => tracing::debug!(reason = %other, "chain not adopted"),
                }
                Err(rejection.into())
            }
        }
    }

    /// Pull `peer`'s snapshot and apply fork choice. A peer serving a chain
    /// with a foreign treasury is flagged malicious.
    pub async fn sync_from_peer(&self, peer: &str) -> Result<SyncOutcome, NodeError> {
        let peer = PeerRegistry::normalize(peer);
        if self.peers.read().await.is_malicious(&peer) {
            return Err(PeerError::Malicious(peer).into());
        }
        let snapshot = self.broadcaster.client().fetch_snapshot(&peer).await?;
        let result = self.sync(snapshot).await;
        if let Err(NodeError::Sync(SyncRejection::UntrustedTreasury { .. })) = &result {
            let mut peers = self.peers.write().await;
            if peers.mark_malicious(&peer) {
                tracing::warn!(%peer, "peer served a foreign-treasury chain, flagged malicious");
            }
            self.observe_peers(&peers);
        }
        result
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.state.lock().await.ledger.snapshot()
    }

    // ── Read-only views ─────────────────────────────────────────────────

    pub async fn status(&self) -> StatusReport {
        let malicious_peers_count = self.peers.read().await.malicious_count();
        let suspicious_activities_count = self
            .suspicious
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len();
        let state = self.state.lock().await;
        let ledger = &state.ledger;
        let treasury = ledger.treasury().cloned();
        StatusReport {
            blocks: ledger.len(),
            pending_transactions: ledger.mempool().len(),
            validators: ledger.validators().len(),
            validator_list: ledger.validators().addresses().cloned().collect(),
            min_stake: ledger.params().min_stake,
            block_reward: ledger.params().block_reward,
            valid: ledger.is_chain_valid(),
            treasury_balance: treasury
                .as_ref()
                .map(|t| ledger.balance(t))
                .unwrap_or_default(),
            is_official_treasury: treasury.as_ref() == Some(&self.official_treasury),
            treasury,
            inactivity_threshold_days: ledger.params().inactivity_threshold_secs as f64
                / SECS_PER_DAY,
            malicious_peers_count,
            balance_consistent: ledger.verify_balance_consistency(),
            suspicious_activities_count,
        }
    }

    pub async fn chain_view(&self) -> ChainView {
        let state = self.state.lock().await;
        let ledger = &state.ledger;
        ChainView {
            length: ledger.len(),
            chain: ledger.chain().to_vec(),
            pending_transactions: ledger.mempool().len(),
            validators: ledger.validators().len(),
            valid: ledger.is_chain_valid(),
            treasury: ledger.treasury().cloned(),
        }
    }

    pub async fn account_info(&self, address: &Address) -> AccountInfo {
        let now = self.clock.now();
        self.state.lock().await.ledger.account_info(address, now)
    }

    pub async fn balance(&self, address: &Address) -> Amount {
        self.state.lock().await.ledger.balance(address)
    }

    pub async fn expected_nonce(&self, address: &Address) -> u64 {
        self.state.lock().await.ledger.expected_nonce(address)
    }

    pub async fn is_chain_valid(&self) -> bool {
        self.state.lock().await.ledger.is_chain_valid()
    }

    pub async fn verify_balance_consistency(&self) -> bool {
        self.state.lock().await.ledger.verify_balance_consistency()
    }

    // ── Wallets and activity ────────────────────────────────────────────

    /// Record activity for `address`; returns the recorded time.
    pub async fn touch_activity(&self, address: &Address) -> Timestamp {
        let now = self.clock.now();
        self.state.lock().await.ledger.touch(address, now);
        now
    }

    /// Generate a key pair and record the new address's first activity.
    /// The node does not keep the private key.
    pub async fn create_wallet(&self) -> KeyPair {
        let wallet = generate_keypair();
        self.touch_activity(&wallet.address).await;
        tracing::info!(address = %wallet.address, "wallet created");
        wallet
    }

    // ── Treasury ────────────────────────────────────────────────────────

    /// Mint the initial supply into an empty treasury and settle it.
    pub async fn treasury_init(&self, amount: Option<Amount>) -> Result<TreasuryInit, NodeError> {
        let amount = amount.unwrap_or(self.config.treasury_initial_amount);
        let now = self.clock.now();
        let (treasury_address, block) = {
            let mut state = self.state.lock().await;
            let LedgerState { ledger, rng } = &mut *state;
            let block = ledger.init_treasury(amount, rng.as_mut(), now)?;
            self.observe(ledger);
            let treasury = ledger
                .treasury()
                .cloned()
                .unwrap_or_else(|| self.config.treasury_address.clone());
            (treasury, block)
        };
        tracing::info!(treasury = %treasury_address, %amount, "treasury initialised");
        if let Some(block) = &block {
            self.metrics.blocks_produced.inc();
            self.gossip(Gossip::Block(block.clone())).await;
        }
        Ok(TreasuryInit {
            treasury_address,
            amount,
            block,
        })
    }

    /// Queue one fee-less `DISTRIBUTION` of `amount` to each recipient,
    /// signed with the treasury key. Recipients whose transaction is
    /// refused are skipped.
    pub async fn treasury_distribute(
        &self,
        recipients: &[Address],
        amount: Amount,
        private_key: PrivateKey,
    ) -> Result<Vec<Transaction>, NodeError> {
        let wallet = keypair_from_private(private_key)?;
        let now = self.clock.now();
        let admitted = {
            let mut state = self.state.lock().await;
            let ledger = &mut state.ledger;
            let treasury = ledger
                .treasury()
                .cloned()
                .ok_or(qnode_ledger::LedgerError::NoTreasury)?;
            if wallet.address != treasury {
                return Err(NodeError::TreasuryKeyMismatch);
            }

            let mut admitted = Vec::with_capacity(recipients.len());
            for recipient in recipients {
                let mut tx = Transaction::transfer(
                    treasury.clone(),
                    recipient.clone(),
                    amount,
                    Amount::ZERO,
                    ledger.expected_nonce(&treasury),
                    now,
                )
                .with_type(TxType::Distribution);
                tx.sign(&wallet)?;
                match self.admit(ledger, tx.clone(), LOCAL_SOURCE, now) {
                    Ok(_) => admitted.push(tx),
                    Err(e) => tracing::warn!(%recipient, error = %e, "distribution skipped"),
                }
            }
            admitted
        };

        for tx in &admitted {
            self.gossip(Gossip::Transaction(tx.clone())).await;
        }
        Ok(admitted)
    }

    // ── Peers ───────────────────────────────────────────────────────────

    /// Probe `url` for its treasury and register it if it matches.
    pub async fn add_peer(&self, url: &str) -> Result<Vec<String>, NodeError> {
        let peer = PeerRegistry::normalize(url);
        self.peers.read().await.check_admissible(&peer)?;

        let verdict = probe_peer(
            self.broadcaster.client().as_ref(),
            &peer,
            &self.official_treasury,
        )
        .await;

        let mut peers = self.peers.write().await;
        let result = peers.apply_verdict(&peer, verdict, &self.official_treasury);
        self.observe_peers(&peers);
        result?;
        Ok(peers.peers().to_vec())
    }

    pub async fn peers(&self) -> PeerList {
        let peers = self.peers.read().await;
        PeerList {
            peers: peers.peers().to_vec(),
            malicious_peers: peers.malicious().to_vec(),
            total_peers: peers.len(),
            total_malicious: peers.malicious_count(),
        }
    }

    // ── Gossip ──────────────────────────────────────────────────────────

    async fn gossip(&self, gossip: Gossip) {
        let targets = self.peers.read().await.broadcast_targets();
        if targets.is_empty() {
            return;
        }
        let handle = self.broadcaster.broadcast(targets, gossip);
        let mut tasks = self.gossip_tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
    }

    /// Wait for every in-flight broadcast to finish.
    pub async fn flush_gossip(&self) -> BroadcastResult {
        let tasks: Vec<_> = {
            let mut tasks = self.gossip_tasks.lock().unwrap_or_else(|e| e.into_inner());
            tasks.drain(..).collect()
        };
        let mut total = BroadcastResult::default();
        for task in tasks {
            if let Ok(result) = task.await {
                total.sent += result.sent;
                total.failed += result.failed;
            }
        }
        total
    }

    // ── Metrics ─────────────────────────────────────────────────────────

    fn observe(&self, ledger: &Ledger) {
        self.metrics.chain_length.set(ledger.len() as i64);
        self.metrics.mempool_size.set(ledger.mempool().len() as i64);
        self.metrics
            .validator_count
            .set(ledger.validators().len() as i64);
    }

    fn observe_peers(&self, peers: &PeerRegistry) {
        self.metrics.peer_count.set(peers.len() as i64);
        self.metrics
            .malicious_peer_count
            .set(peers.malicious_count() as i64);
    }
}
