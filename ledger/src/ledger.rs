//! The ledger state machine: chain, account state and mempool.
//!
//! Every mutating operation validates first and mutates only once every
//! check has passed, so a rejection leaves chain, mempool and balances
//! exactly as they were. Callers serialise access (one lock around the
//! whole `Ledger`).

use qnode_types::{Address, Amount, BlockHash, ProtocolParams, Timestamp, TxHash};
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::block::Block;
use crate::error::{AdmissionError, BlockRejection, ChainError, LedgerError};
use crate::mempool::Mempool;
use crate::snapshot::LedgerSnapshot;
use crate::transaction::{Transaction, TxType};
use crate::validators::ValidatorSet;

const SECS_PER_DAY: f64 = 24.0 * 3600.0;

/// Account view returned by [`Ledger::account_info`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AccountInfo {
    pub address: Address,
    pub balance: Amount,
    pub staked: Amount,
    pub total: Amount,
    pub is_validator: bool,
    pub last_activity: Timestamp,
    pub inactive_time: f64,
    pub inactive_days: f64,
    pub is_inactive: bool,
}

/// One address whose live balance disagrees with a replay of the chain.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BalanceDiscrepancy {
    pub address: Address,
    pub replayed: Amount,
    pub recorded: Amount,
}

/// Balances as they would stand after applying a prefix of a block.
struct BalanceOverlay<'a> {
    base: &'a BTreeMap<Address, Amount>,
    delta: HashMap<Address, Amount>,
}

impl<'a> BalanceOverlay<'a> {
    fn new(base: &'a BTreeMap<Address, Amount>) -> Self {
        Self {
            base,
            delta: HashMap::new(),
        }
    }

    fn available(&self, address: &Address) -> Amount {
        self.base.get(address).copied().unwrap_or_default()
            + self.delta.get(address).copied().unwrap_or_default()
    }

    fn apply(&mut self, tx: &Transaction) {
        if !tx.is_system() {
            *self.delta.entry(tx.sender.clone()).or_default() -= tx.total_debit();
        }
        *self.delta.entry(tx.recipient.clone()).or_default() += tx.amount;
    }
}

/// Chain plus derived account state.
#[derive(Clone, Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    mempool: Mempool,
    validators: ValidatorSet,
    balances: BTreeMap<Address, Amount>,
    last_activity: BTreeMap<Address, Timestamp>,
    transaction_history: HashSet<TxHash>,
    params: ProtocolParams,
    treasury: Option<Address>,
}

impl Ledger {
    /// A fresh ledger holding only the genesis block.
    pub fn new(params: ProtocolParams, treasury: Option<Address>) -> Self {
        let genesis = Block::genesis();
        let transaction_history = genesis.tx_hashes().collect();
        Self {
            chain: vec![genesis],
            mempool: Mempool::new(),
            validators: ValidatorSet::new(),
            balances: BTreeMap::new(),
            last_activity: BTreeMap::new(),
            transaction_history,
            params,
            treasury,
        }
    }

    /// Rebuild a ledger from a snapshot. The snapshot's consensus constants
    /// (`min_stake`, `block_reward`, inactivity threshold) override `params`.
    /// Replay history is derived from the chain.
    pub fn from_snapshot(
        snapshot: LedgerSnapshot,
        mut params: ProtocolParams,
    ) -> Result<Self, ChainError> {
        if snapshot.chain.is_empty() {
            return Err(ChainError::Empty);
        }
        params.min_stake = snapshot.min_stake;
        params.block_reward = snapshot.block_reward;
        params.inactivity_threshold_secs = snapshot.inactivity_threshold;

        let transaction_history = snapshot.chain.iter().flat_map(Block::tx_hashes).collect();
        Ok(Self {
            chain: snapshot.chain,
            mempool: Mempool::from_transactions(snapshot.pending_transactions),
            validators: snapshot.validators,
            balances: snapshot.balances,
            last_activity: snapshot.last_activity,
            transaction_history,
            params,
            treasury: snapshot.treasury_address,
        })
    }

    /// Serializable copy of the full ledger state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            chain: self.chain.clone(),
            pending_transactions: self.mempool.transactions().cloned().collect(),
            validators: self.validators.clone(),
            balances: self.balances.clone(),
            last_activity: self.last_activity.clone(),
            min_stake: self.params.min_stake,
            block_reward: self.params.block_reward,
            transaction_fees_pool: self.mempool.fees_pool(),
            treasury_address: self.treasury.clone(),
            inactivity_threshold: self.params.inactivity_threshold_secs,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// The last block. The chain always holds at least genesis.
    pub fn tip(&self) -> &Block {
        // `new` and `from_snapshot` both guarantee a non-empty chain.
        &self.chain[self.chain.len() - 1]
    }

    pub fn tip_hash(&self) -> &BlockHash {
        &self.tip().hash
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    pub fn validators(&self) -> &ValidatorSet {
        &self.validators
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn treasury(&self) -> Option<&Address> {
        self.treasury.as_ref()
    }

    pub fn balance(&self, address: &Address) -> Amount {
        self.balances.get(address).copied().unwrap_or_default()
    }

    pub fn staked(&self, address: &Address) -> Amount {
        self.validators.stake_of(address).unwrap_or_default()
    }

    pub fn balances(&self) -> &BTreeMap<Address, Amount> {
        &self.balances
    }

    pub fn last_activity(&self, address: &Address) -> Option<Timestamp> {
        self.last_activity.get(address).copied()
    }

    pub fn is_settled(&self, hash: &TxHash) -> bool {
        self.transaction_history.contains(hash)
    }

    // ── Activity ────────────────────────────────────────────────────────

    /// Record activity for `address`, resetting its inactivity clock.
    pub fn touch(&mut self, address: &Address, now: Timestamp) {
        self.last_activity.insert(address.clone(), now);
    }

    pub fn account_info(&self, address: &Address, now: Timestamp) -> AccountInfo {
        let balance = self.balance(address);
        let staked = self.staked(address);
        let last_activity = self.last_activity(address);
        let inactive_time = last_activity
            .map(|t| t.elapsed_since(now).max(0.0))
            .unwrap_or(0.0);
        AccountInfo {
            address: address.clone(),
            balance,
            staked,
            total: balance + staked,
            is_validator: self.validators.contains(address),
            last_activity: last_activity.unwrap_or(Timestamp::EPOCH),
            inactive_time,
            inactive_days: inactive_time / SECS_PER_DAY,
            is_inactive: inactive_time > self.params.inactivity_threshold_secs as f64,
        }
    }

    // ── Nonces ──────────────────────────────────────────────────────────

    /// `1 + max nonce` over `address`'s non-SYSTEM transactions in the chain
    /// and mempool, or 0 when there are none.
    pub fn expected_nonce(&self, address: &Address) -> u64 {
        self.nonce_baseline(address, &HashSet::new())
    }

    fn nonce_baseline(&self, address: &Address, exclude_pending: &HashSet<TxHash>) -> u64 {
        if address.is_system() {
            return 0;
        }
        let pending = self
            .mempool
            .max_nonce_for(address, exclude_pending)
            .map_or(0, |n| n.saturating_add(1));
        self.settled_next_nonce(address).max(pending)
    }

    /// Next nonce for `address` counting only settled transactions.
    fn settled_next_nonce(&self, address: &Address) -> u64 {
        self.chain
            .iter()
            .flat_map(|b| b.transactions.iter())
            .filter(|tx| &tx.sender == address && !tx.is_system())
            .map(|tx| tx.nonce.saturating_add(1))
            .max()
            .unwrap_or(0)
    }

    // ── Admission ───────────────────────────────────────────────────────

    /// Admit `tx` to the mempool or reject it without changing anything.
    pub fn add_transaction(
        &mut self,
        tx: Transaction,
        now: Timestamp,
    ) -> Result<TxHash, AdmissionError> {
        tx.validate(now, self.params.tx_max_age_secs)?;
        let hash = tx.hash();

        if tx.is_system() {
            tracing::debug!(recipient = %tx.recipient, amount = %tx.amount, "system transaction admitted");
            self.mempool.push(hash.clone(), tx);
            return Ok(hash);
        }

        if tx.nonce == u64::MAX {
            return Err(AdmissionError::NonceExhausted(tx.nonce));
        }
        let expected = self.expected_nonce(&tx.sender);
        if tx.nonce < expected {
            return Err(AdmissionError::StaleNonce {
                expected,
                received: tx.nonce,
            });
        }
        if self.transaction_history.contains(&hash) {
            return Err(AdmissionError::AlreadySettled(hash));
        }
        if self.mempool.contains(&hash) {
            return Err(AdmissionError::DuplicatePending(hash));
        }
        let pending = self.mempool.pending_for(&tx.sender);
        if pending >= self.params.max_pending_per_address {
            return Err(AdmissionError::PoolQuotaExceeded {
                pending,
                max: self.params.max_pending_per_address,
            });
        }
        let available = self.balance(&tx.sender);
        let needed = tx.total_debit();
        if available < needed {
            return Err(AdmissionError::InsufficientFunds { needed, available });
        }

        tracing::debug!(
            sender = %tx.sender,
            nonce = tx.nonce,
            hash = %hash.short(),
            "transaction admitted"
        );
        let sender = tx.sender.clone();
        self.mempool.push(hash.clone(), tx);
        self.touch(&sender, now);
        Ok(hash)
    }

    /// Queue a SYSTEM `MINT` of `amount` to `address`. The balance is
    /// credited when the transaction settles in a block.
    pub fn mint(
        &mut self,
        address: &Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<TxHash, AdmissionError> {
        let tx = Transaction::system(address.clone(), amount, TxType::Mint, now);
        let hash = self.add_transaction(tx, now)?;
        self.touch(address, now);
        Ok(hash)
    }

    // ── Staking ─────────────────────────────────────────────────────────

    /// Move `stake` from `address`'s spendable balance into its stake.
    pub fn register_validator(
        &mut self,
        address: &Address,
        stake: Amount,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        if stake < self.params.min_stake {
            return Err(LedgerError::StakeBelowMinimum {
                stake,
                min: self.params.min_stake,
            });
        }
        let available = self.balance(address);
        if available < stake {
            return Err(LedgerError::InsufficientStakeFunds {
                needed: stake,
                available,
            });
        }
        *self.balances.entry(address.clone()).or_default() -= stake;
        self.validators.add_stake(address, stake);
        self.touch(address, now);
        tracing::info!(validator = %address, %stake, "validator registered");
        Ok(())
    }

    /// Stake-weighted random proposer. A fresh draw on every call.
    pub fn select_validator<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(Address, Amount)> {
        self.validators.select(rng)
    }

    // ── Block production ────────────────────────────────────────────────

    /// Assemble, apply and append a block from the front of the mempool.
    ///
    /// Returns `None` when the mempool is empty or nothing survives the
    /// re-check. While no validator holds stake the block is proposed by
    /// SYSTEM with stake 0.
    pub fn create_block<R: Rng + ?Sized>(&mut self, rng: &mut R, now: Timestamp) -> Option<Block> {
        if self.mempool.is_empty() {
            return None;
        }
        let (validator, stake) = self
            .select_validator(rng)
            .unwrap_or_else(|| (Address::system(), Amount::ZERO));

        let max_age = self.params.tx_max_age_secs;
        let mut overlay = BalanceOverlay::new(&self.balances);
        let mut next_nonce: HashMap<&Address, u64> = HashMap::new();
        let mut included = Vec::new();
        // Expired or superseded entries can never settle.
        let mut evicted = HashSet::new();
        for (hash, tx) in self.mempool.front(self.params.max_block_size) {
            if !tx.is_valid(now, max_age) {
                evicted.insert(hash.clone());
                continue;
            }
            if !tx.is_system() {
                let floor = *next_nonce
                    .entry(&tx.sender)
                    .or_insert_with(|| self.settled_next_nonce(&tx.sender));
                if tx.nonce < floor {
                    if tx.nonce < self.settled_next_nonce(&tx.sender) {
                        evicted.insert(hash.clone());
                    }
                    continue;
                }
                if overlay.available(&tx.sender) < tx.total_debit() {
                    continue;
                }
                next_nonce.insert(&tx.sender, tx.nonce.saturating_add(1));
            }
            overlay.apply(tx);
            included.push(tx.clone());
        }
        if !evicted.is_empty() {
            tracing::debug!(count = evicted.len(), "evicting unsettleable transactions");
            self.mempool.remove(&evicted);
        }
        if included.is_empty() {
            return None;
        }

        let block = Block::new(
            self.chain.len() as u64,
            now,
            included,
            self.tip_hash().clone(),
            validator,
            stake,
        );
        tracing::info!(
            index = block.index,
            validator = %block.validator,
            txs = block.transactions.len(),
            hash = %block.hash.short(),
            "block produced"
        );
        self.apply_block(block.clone(), now);
        Some(block)
    }

    // ── Block acceptance ────────────────────────────────────────────────

    /// Validate a peer's block against local state and append it.
    pub fn accept_block(&mut self, block: Block, now: Timestamp) -> Result<(), BlockRejection> {
        self.check_block(&block, now)?;
        tracing::info!(
            index = block.index,
            validator = %block.validator,
            txs = block.transactions.len(),
            "block accepted"
        );
        self.apply_block(block, now);
        Ok(())
    }

    fn check_block(&self, block: &Block, now: Timestamp) -> Result<(), BlockRejection> {
        let computed = block.compute_hash();
        if block.hash != computed {
            return Err(BlockRejection::HashMismatch {
                stored: block.hash.clone(),
                computed,
            });
        }
        let expected_index = self.chain.len() as u64;
        if block.index != expected_index {
            return Err(BlockRejection::WrongIndex {
                expected: expected_index,
                received: block.index,
            });
        }
        if &block.previous_hash != self.tip_hash() {
            return Err(BlockRejection::WrongPrevious {
                expected: self.tip_hash().clone(),
                received: block.previous_hash.clone(),
            });
        }

        let block_hashes: HashSet<TxHash> = block.tx_hashes().collect();
        let mut seen = HashSet::new();
        let mut overlay = BalanceOverlay::new(&self.balances);
        let mut next_nonce: HashMap<&Address, u64> = HashMap::new();
        for tx in &block.transactions {
            let hash = tx.hash();
            if let Err(reason) = tx.validate(now, self.params.tx_max_age_secs) {
                return Err(BlockRejection::InvalidTransaction { hash, reason });
            }
            if self.transaction_history.contains(&hash) || !seen.insert(hash.clone()) {
                return Err(BlockRejection::Replay(hash));
            }
            if !tx.is_system() {
                if tx.nonce == u64::MAX {
                    return Err(BlockRejection::NonceExhausted {
                        hash,
                        sender: tx.sender.clone(),
                    });
                }
                let expected = match next_nonce.get(&tx.sender) {
                    Some(&n) => n,
                    None => self.nonce_baseline(&tx.sender, &block_hashes),
                };
                if tx.nonce < expected {
                    return Err(BlockRejection::InvalidNonce {
                        hash,
                        sender: tx.sender.clone(),
                        expected,
                        received: tx.nonce,
                    });
                }
                next_nonce.insert(&tx.sender, tx.nonce.saturating_add(1));

                let available = overlay.available(&tx.sender);
                let needed = tx.total_debit();
                if available < needed {
                    return Err(BlockRejection::InsufficientFunds {
                        hash,
                        needed,
                        available,
                    });
                }
            }
            overlay.apply(tx);
        }

        if !block.validator.is_system() {
            match self.validators.stake_of(&block.validator) {
                None => return Err(BlockRejection::UnknownValidator(block.validator.clone())),
                Some(recorded) if recorded != block.stake => {
                    return Err(BlockRejection::StakeMismatch {
                        validator: block.validator.clone(),
                        recorded,
                        claimed: block.stake,
                    })
                }
                Some(_) => {}
            }
        }

        if block.transactions.len() > self.params.max_block_size {
            return Err(BlockRejection::Oversized {
                count: block.transactions.len(),
                max: self.params.max_block_size,
            });
        }
        Ok(())
    }

    /// Settle a validated block: balances, reward, history, chain, mempool.
    fn apply_block(&mut self, block: Block, now: Timestamp) {
        let mut settled = HashSet::with_capacity(block.transactions.len());
        for tx in &block.transactions {
            if !tx.is_system() {
                *self.balances.entry(tx.sender.clone()).or_default() -= tx.total_debit();
            }
            *self.balances.entry(tx.recipient.clone()).or_default() += tx.amount;
            let hash = tx.hash();
            self.transaction_history.insert(hash.clone());
            settled.insert(hash);
        }
        if !block.validator.is_system() {
            let reward = self.params.block_reward + block.collected_fees();
            *self.balances.entry(block.validator.clone()).or_default() += reward;
            self.last_activity.insert(block.validator.clone(), now);
        }
        self.chain.push(block);
        self.mempool.remove(&settled);
    }

    // ── Validation and audit ────────────────────────────────────────────

    /// Hash linkage and per-transaction validity of the whole chain.
    pub fn validate_chain(&self) -> Result<(), ChainError> {
        validate_chain(&self.chain, self.params.tx_max_age_secs)
    }

    pub fn is_chain_valid(&self) -> bool {
        self.validate_chain().is_ok()
    }

    /// Addresses whose `balance + staked` differs from a replay of the
    /// chain by more than the configured tolerance.
    pub fn audit(&self) -> Vec<BalanceDiscrepancy> {
        let replayed = replay_balances(&self.chain, self.params.block_reward);
        let tolerance = self.params.balance_tolerance;

        let addresses: BTreeSet<&Address> = replayed
            .keys()
            .chain(self.balances.keys())
            .chain(self.validators.addresses())
            .collect();
        addresses
            .into_iter()
            .filter_map(|address| {
                let replayed = replayed.get(address).copied().unwrap_or_default();
                let recorded = self.balance(address) + self.staked(address);
                (!replayed.approx_eq(recorded, tolerance)).then(|| BalanceDiscrepancy {
                    address: address.clone(),
                    replayed,
                    recorded,
                })
            })
            .collect()
    }

    pub fn verify_balance_consistency(&self) -> bool {
        self.audit().is_empty()
    }

    /// Queue a treasury MINT and settle it in a block. Only allowed while the
    /// treasury holds nothing.
    pub fn init_treasury<R: Rng + ?Sized>(
        &mut self,
        amount: Amount,
        rng: &mut R,
        now: Timestamp,
    ) -> Result<Option<Block>, LedgerError> {
        let treasury = self.treasury.clone().ok_or(LedgerError::NoTreasury)?;
        if !amount.is_positive() {
            return Err(LedgerError::NonPositiveTreasuryAmount(amount));
        }
        let current = self.balance(&treasury);
        if current.is_positive() {
            return Err(LedgerError::TreasuryInitialised(current));
        }
        self.mint(&treasury, amount, now)?;
        Ok(self.create_block(rng, now))
    }
}

/// Linkage and transaction validity, judging each transaction's freshness
/// against the timestamp of the block that contains it.
pub fn validate_chain(chain: &[Block], max_age_secs: u64) -> Result<(), ChainError> {
    let genesis = chain.first().ok_or(ChainError::Empty)?;
    if !genesis.is_genesis_shaped() {
        return Err(ChainError::BadGenesis);
    }
    for pair in chain.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        if !current.has_valid_hash() {
            return Err(ChainError::HashMismatch {
                index: current.index,
            });
        }
        if current.previous_hash != previous.hash {
            return Err(ChainError::BrokenLink {
                index: current.index,
            });
        }
        for tx in &current.transactions {
            if let Err(reason) = tx.validate(current.timestamp, max_age_secs) {
                return Err(ChainError::InvalidTransaction {
                    index: current.index,
                    hash: tx.hash(),
                    reason,
                });
            }
        }
    }
    Ok(())
}

/// Balances implied by replaying `chain` from genesis.
pub fn replay_balances(chain: &[Block], block_reward: Amount) -> BTreeMap<Address, Amount> {
    let mut balances: BTreeMap<Address, Amount> = BTreeMap::new();
    for block in chain {
        for tx in &block.transactions {
            if !tx.is_system() {
                *balances.entry(tx.sender.clone()).or_default() -= tx.total_debit();
            }
            *balances.entry(tx.recipient.clone()).or_default() += tx.amount;
        }
        if !block.validator.is_system() {
            *balances.entry(block.validator.clone()).or_default() +=
                block_reward + block.collected_fees();
        }
    }
    balances
}
