//! HTTP request handlers.
//!
//! Each handler parses its payload, calls one [`QNode`] operation and
//! renders the result as JSON. Domain failures surface as [`RpcError`].

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use qnode_ledger::{Block, LedgerSnapshot, Transaction};
use qnode_node::{
    ChainView, PeerList, QNode, ReceiveOutcome, StatusReport, SuspiciousReport, TransferRequest,
};
use qnode_types::{Address, Amount, PrivateKey};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::RpcError;
use crate::middleware::ClientSource;

type NodeState = State<Arc<QNode>>;
type Payload<T> = Result<Json<T>, JsonRejection>;

const DEFAULT_SUSPICIOUS_LIMIT: usize = 100;

// ── Liveness ─────────────────────────────────────────────────────────────

pub async fn health(State(node): NodeState) -> Json<Value> {
    Json(json!({ "status": "online", "port": node.config().port }))
}

// ── Wallet ───────────────────────────────────────────────────────────────

pub async fn create_wallet(State(node): NodeState) -> Json<Value> {
    let wallet = node.create_wallet().await;
    Json(json!({
        "success": true,
        "wallet": {
            "address": wallet.address,
            "public_key": wallet.public_key,
            "private_key": wallet.private_key.expose(),
        },
        "message": "Wallet created. Keep the private key safe: the node does not store it.",
    }))
}

pub async fn wallet_balance(
    State(node): NodeState,
    Path(address): Path<Address>,
) -> Json<qnode_ledger::AccountInfo> {
    Json(node.account_info(&address).await)
}

pub async fn wallet_activity(
    State(node): NodeState,
    Path(address): Path<Address>,
) -> Json<Value> {
    let last_activity = node.touch_activity(&address).await;
    Json(json!({
        "success": true,
        "message": "Activity updated",
        "last_activity": last_activity,
    }))
}

// ── Transactions ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SendTransactionRequest {
    pub sender: Address,
    pub recipient: Address,
    pub amount: Amount,
    #[serde(default)]
    pub fee: Option<Amount>,
    #[serde(default)]
    pub nonce: Option<u64>,
    pub private_key: String,
}

pub async fn send_transaction(
    State(node): NodeState,
    Extension(source): Extension<ClientSource>,
    payload: Payload<SendTransactionRequest>,
) -> Result<Json<Value>, RpcError> {
    let Json(req) = payload?;
    let request = TransferRequest {
        sender: req.sender,
        recipient: req.recipient,
        amount: req.amount,
        fee: req.fee,
        nonce: req.nonce,
        private_key: PrivateKey::new(req.private_key),
    };
    let outcome = node.submit_transaction(request, source.as_str()).await?;
    Ok(Json(json!({
        "success": true,
        "transaction": outcome.transaction,
        "hash": outcome.hash,
        "message": "Transaction added to the pool",
        "next_expected_nonce": outcome.next_expected_nonce,
    })))
}

pub async fn receive_transaction(
    State(node): NodeState,
    Extension(source): Extension<ClientSource>,
    payload: Payload<Transaction>,
) -> Result<Json<Value>, RpcError> {
    let Json(tx) = payload?;
    let message = match node.receive_transaction(tx, source.as_str()).await? {
        ReceiveOutcome::Accepted => "Transaction received and added",
        ReceiveOutcome::AlreadyPresent => "Transaction already present",
    };
    Ok(Json(json!({ "success": true, "message": message })))
}

// ── Validators and blocks ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterValidatorRequest {
    pub address: Address,
    pub stake: Amount,
}

pub async fn register_validator(
    State(node): NodeState,
    payload: Payload<RegisterValidatorRequest>,
) -> Result<Json<Value>, RpcError> {
    let Json(req) = payload?;
    node.register_validator(&req.address, req.stake).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Validator registered with stake {}", req.stake),
    })))
}

pub async fn mine_block(State(node): NodeState) -> Result<Json<Value>, RpcError> {
    let block = node.produce_block().await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Block #{} created", block.index),
        "block": block,
    })))
}

pub async fn receive_block(
    State(node): NodeState,
    Extension(source): Extension<ClientSource>,
    payload: Payload<Block>,
) -> Result<Json<Value>, RpcError> {
    let Json(block) = payload?;
    let index = block.index;
    node.receive_block(block, source.as_str()).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Block #{index} received and validated"),
    })))
}

// ── Chain views ──────────────────────────────────────────────────────────

pub async fn blockchain(State(node): NodeState) -> Json<ChainView> {
    Json(node.chain_view().await)
}

pub async fn status(State(node): NodeState) -> Json<StatusReport> {
    Json(node.status().await)
}

#[derive(Deserialize)]
pub struct SuspiciousQuery {
    pub limit: Option<usize>,
}

pub async fn suspicious(
    State(node): NodeState,
    Query(query): Query<SuspiciousQuery>,
) -> Json<SuspiciousReport> {
    Json(node.suspicious_activities(query.limit.unwrap_or(DEFAULT_SUSPICIOUS_LIMIT)))
}

pub async fn ledger_snapshot(State(node): NodeState) -> Json<LedgerSnapshot> {
    Json(node.snapshot().await)
}

// ── Treasury ─────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct TreasuryInitRequest {
    pub amount: Option<Amount>,
}

/// The body is optional: an empty request mints the configured amount.
pub async fn treasury_init(State(node): NodeState, body: Bytes) -> Result<Json<Value>, RpcError> {
    let req: TreasuryInitRequest = if body.is_empty() {
        TreasuryInitRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| RpcError::InvalidRequest(e.to_string()))?
    };
    let init = node.treasury_init(req.amount).await?;
    let balance = node.balance(&init.treasury_address).await;
    Ok(Json(json!({
        "success": true,
        "message": format!("Treasury initialised with {} tokens", init.amount),
        "treasury_address": init.treasury_address,
        "balance": balance,
    })))
}

#[derive(Deserialize)]
pub struct DistributeRequest {
    pub recipients: Vec<Address>,
    pub amount: Amount,
    pub private_key: String,
}

pub async fn treasury_distribute(
    State(node): NodeState,
    payload: Payload<DistributeRequest>,
) -> Result<Json<Value>, RpcError> {
    let Json(req) = payload?;
    let transactions = node
        .treasury_distribute(&req.recipients, req.amount, PrivateKey::new(req.private_key))
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("{} distributions created", transactions.len()),
        "transactions": transactions,
    })))
}

// ── Peers and sync ───────────────────────────────────────────────────────

pub async fn peers(State(node): NodeState) -> Json<PeerList> {
    Json(node.peers().await)
}

#[derive(Deserialize)]
pub struct AddPeerRequest {
    #[serde(default)]
    pub peer: Option<String>,
}

pub async fn add_peer(
    State(node): NodeState,
    payload: Payload<AddPeerRequest>,
) -> Result<Json<Value>, RpcError> {
    let Json(req) = payload?;
    let peer = req
        .peer
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| RpcError::InvalidRequest("missing peer URL".to_string()))?;
    let peers = node.add_peer(&peer).await?;
    Ok(Json(json!({ "success": true, "peers": peers })))
}

pub async fn sync_from_peer(
    State(node): NodeState,
    payload: Payload<AddPeerRequest>,
) -> Result<Json<Value>, RpcError> {
    let Json(req) = payload?;
    let peer = req
        .peer
        .ok_or_else(|| RpcError::InvalidRequest("missing peer URL".to_string()))?;
    let outcome = node.sync_from_peer(&peer).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Blockchain synchronised",
        "previous_length": outcome.previous_length,
        "new_length": outcome.new_length,
    })))
}

#[derive(Deserialize)]
pub struct SyncRequest {
    pub blockchain: LedgerSnapshot,
}

pub async fn sync(
    State(node): NodeState,
    payload: Payload<SyncRequest>,
) -> Result<Json<Value>, RpcError> {
    let Json(req) = payload?;
    let outcome = node.sync(req.blockchain).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Blockchain synchronised",
        "previous_length": outcome.previous_length,
        "new_length": outcome.new_length,
    })))
}

// ── Metrics ──────────────────────────────────────────────────────────────

pub async fn metrics(State(node): NodeState) -> Result<impl IntoResponse, RpcError> {
    if !node.config().enable_metrics {
        return Err(RpcError::MetricsDisabled);
    }
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        node.metrics().encode(),
    ))
}
