//! RPC request handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::RpcError;
use dcns_node::{
    BatchOutcome, BufferDump, ChainView, DomainLease, DomainStatus, EntryReceipt, NewEntry,
    RawEntry, RejectedEntry, Resolution, Resolver,
};
use dcns_types::{Block, ChainKind, ChainScope, NodeId};

type AppState = Arc<Resolver>;
type RpcResult<T> = Result<Json<T>, RpcError>;

/// All routes, sharing one resolver.
pub fn router(resolver: Arc<Resolver>) -> Router {
    Router::new()
        .route("/debug/alive", get(alive))
        .route("/debug/dump_buffer", get(dump_buffer))
        .route("/debug/force_block", get(force_block))
        .route("/debug/get_quota", get(get_quota))
        .route("/nodes/new", post(register_nodes))
        .route("/nodes/resolve", get(resolve))
        .route("/nodes/chain", get(chain))
        .route("/dns/register", post(register_entry))
        .route("/dns/new", post(new_entries))
        .route("/dns/request", post(lookup))
        .route("/dns/status", post(status))
        .route("/wallet/info/:address", get(wallet_info))
        .route("/wallet/transfer", post(transfer))
        .route("/data/save", get(save))
        .with_state(resolver)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RpcError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| RpcError::InvalidRequest(rejection.body_text()))
}

fn parse_node_id(raw: &str) -> Result<NodeId, RpcError> {
    raw.parse()
        .map_err(|e: dcns_types::TypesError| RpcError::InvalidRequest(e.to_string()))
}

// ── Query parameters ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    #[serde(rename = "type")]
    pub chain_type: Option<String>,
}

impl ScopeQuery {
    /// Selected chains; both when the parameter is absent.
    fn scope(&self) -> Result<ChainScope, RpcError> {
        match self.chain_type.as_deref() {
            None | Some("") => Ok(ChainScope::Both),
            Some(raw) => raw
                .parse()
                .map_err(|e: dcns_types::TypesError| RpcError::InvalidRequest(e.to_string())),
        }
    }
}

// ── Liveness and debug ───────────────────────────────────────────────────

async fn alive() -> Json<Value> {
    Json(json!({ "alive": true }))
}

async fn dump_buffer(
    State(resolver): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> RpcResult<BTreeMap<ChainKind, BufferDump>> {
    Ok(Json(resolver.dump_pending(query.scope()?)))
}

async fn force_block(
    State(resolver): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> RpcResult<BTreeMap<ChainKind, Block>> {
    Ok(Json(resolver.mine(query.scope()?)))
}

async fn get_quota(
    State(resolver): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> RpcResult<BTreeMap<ChainKind, i64>> {
    Ok(Json(resolver.chain_quota(query.scope()?)))
}

// ── Peers and chains ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterNodesRequest {
    pub nodes: Vec<String>,
    #[serde(rename = "type")]
    pub chain_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterNodesResponse {
    pub message: String,
    pub total_nodes: usize,
}

async fn register_nodes(
    State(resolver): State<AppState>,
    payload: Result<Json<RegisterNodesRequest>, JsonRejection>,
) -> RpcResult<RegisterNodesResponse> {
    let request = body(payload)?;
    if request.nodes.is_empty() {
        return Err(RpcError::InvalidRequest("nodes must not be empty".into()));
    }
    let scope = ScopeQuery {
        chain_type: request.chain_type,
    }
    .scope()?;
    for node in &request.nodes {
        resolver.register_node(node, scope)?;
    }
    Ok(Json(RegisterNodesResponse {
        message: format!("{} node(s) added to the {scope} network", request.nodes.len()),
        total_nodes: resolver.network_size(scope),
    }))
}

/// Acknowledgment that consensus is running in the background.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub message: String,
    #[serde(rename = "type")]
    pub scope: ChainScope,
}

/// Peers call this after every mine, so it never waits on other peers.
/// Each chain logs its own consensus outcome.
async fn resolve(
    State(resolver): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> RpcResult<ResolveResponse> {
    let scope = query.scope()?;
    let started = resolver.spawn_resolve_conflicts(scope).len();
    tracing::debug!(%scope, chains = started, "consensus started");
    Ok(Json(ResolveResponse {
        message: "resolution started".into(),
        scope,
    }))
}

async fn chain(
    State(resolver): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> RpcResult<ChainView> {
    Ok(Json(resolver.dump_chain(query.scope()?)))
}

// ── Hostnames ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterEntryRequest {
    pub hostname: String,
    pub ip: String,
    pub port: u16,
    pub lease_years: u32,
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterEntryResponse {
    #[serde(flatten)]
    pub receipt: EntryReceipt,
    /// Payer's balance after the charge.
    pub balance: i64,
}

async fn register_entry(
    State(resolver): State<AppState>,
    payload: Result<Json<RegisterEntryRequest>, JsonRejection>,
) -> RpcResult<RegisterEntryResponse> {
    let request = body(payload)?;
    let payer = match request.wallet_address.as_deref() {
        Some(addr) => parse_node_id(addr)?,
        None => resolver.owner().clone(),
    };
    let entry = NewEntry::register(&request.hostname, &request.ip, request.port, request.lease_years)
        .paid_by(payer.clone());
    let receipt = resolver.new_entry(entry)?;
    Ok(Json(RegisterEntryResponse {
        receipt,
        balance: resolver.get_user_tokens(&payer),
    }))
}

/// Body is an object of client keys to entries; each entry is checked on its own.
async fn new_entries(
    State(resolver): State<AppState>,
    payload: Result<Json<BTreeMap<String, Value>>, JsonRejection>,
) -> RpcResult<BatchOutcome> {
    let entries = body(payload)?;
    if entries.is_empty() {
        return Err(RpcError::InvalidRequest("no entries submitted".into()));
    }

    let mut malformed = Vec::new();
    let mut raw_entries = Vec::new();
    for (key, value) in entries {
        match serde_json::from_value::<RawEntry>(value) {
            Ok(raw) => raw_entries.push(RawEntry { key, ..raw }),
            Err(e) => malformed.push(RejectedEntry {
                key,
                reason: format!("validation failed: {e}"),
            }),
        }
    }

    let mut outcome = resolver.submit_dns_entries(raw_entries);
    outcome.rejected.extend(malformed);
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct HostnameRequest {
    pub hostname: String,
}

async fn lookup(
    State(resolver): State<AppState>,
    payload: Result<Json<HostnameRequest>, JsonRejection>,
) -> RpcResult<Resolution> {
    let request = body(payload)?;
    Ok(Json(resolver.lookup(&request.hostname)?))
}

async fn status(
    State(resolver): State<AppState>,
    payload: Result<Json<HostnameRequest>, JsonRejection>,
) -> RpcResult<DomainStatus> {
    let request = body(payload)?;
    dcns_node::entry::validate_hostname(&request.hostname)?;
    Ok(Json(resolver.check_domain_status(&request.hostname)))
}

// ── Wallet ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletInfoResponse {
    pub address: NodeId,
    pub balance: i64,
    pub domains: Vec<DomainLease>,
}

async fn wallet_info(
    State(resolver): State<AppState>,
    Path(address): Path<String>,
) -> RpcResult<WalletInfoResponse> {
    let address = parse_node_id(&address)?;
    Ok(Json(WalletInfoResponse {
        balance: resolver.get_user_tokens(&address),
        domains: resolver.domains_of(&address),
        address,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResponse {
    pub from: NodeId,
    pub to: NodeId,
    pub amount: i64,
    /// Sender's balance after the transfer.
    pub balance: i64,
}

async fn transfer(
    State(resolver): State<AppState>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> RpcResult<TransferResponse> {
    let request = body(payload)?;
    let from = parse_node_id(&request.from)?;
    let to = parse_node_id(&request.to)?;
    let balance = resolver.transfer_tokens(&from, &to, request.amount)?;
    Ok(Json(TransferResponse {
        from,
        to,
        amount: request.amount,
        balance,
    }))
}

// ── Persistence ──────────────────────────────────────────────────────────

async fn save(State(resolver): State<AppState>) -> RpcResult<Value> {
    resolver.save_data()?;
    Ok(Json(json!({ "saved": true })))
}
