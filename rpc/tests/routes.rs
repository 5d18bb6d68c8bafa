//! Route tests against an in-memory resolver, plus one real socket round trip.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceExt;

use dcns_network::{ChainFetcher, HttpPeerClient, PeerNotifier};
use dcns_node::{LedgerParams, Resolver, ResolverDeps};
use dcns_nullables::{NullCacheStore, NullChainStore, NullClock, NullPeerNetwork, NullStagingStore};
use dcns_rpc::{router, RpcServer};
use dcns_types::{ChainKind, NodeId};

fn resolver() -> Arc<Resolver> {
    resolver_on(NodeId::new("owner"), Arc::new(NullPeerNetwork::new()))
}

fn resolver_on(owner: NodeId, network: Arc<NullPeerNetwork>) -> Arc<Resolver> {
    Arc::new(Resolver::new(
        owner,
        LedgerParams::default(),
        ResolverDeps {
            chains: Arc::new(NullChainStore::new()),
            staging: Arc::new(NullStagingStore::new()),
            cache: Arc::new(NullCacheStore::new()),
            fetcher: network.clone(),
            notifier: network,
            clock: Arc::new(NullClock::new(1_000)),
        },
    ))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

fn lease(hostname: &str, years: u32) -> Value {
    json!({
        "hostname": hostname,
        "ip": "192.0.2.1",
        "port": 8080,
        "lease_years": years,
    })
}

#[tokio::test]
async fn alive() {
    let app = router(resolver());
    let (status, body) = get(&app, "/debug/alive").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "alive": true }));
}

#[tokio::test]
async fn register_then_resolve_before_and_after_sealing() {
    let app = router(resolver());

    let (status, body) = post(&app, "/dns/register", lease("alice.dc", 1)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["hostname"], "alice.dc");
    assert_eq!(body["chain_kind"], "register");
    assert_eq!(body["cost"], 4);
    assert_eq!(body["flushed"], false);
    assert_eq!(body["balance"], 6);

    let (status, body) = post(&app, "/dns/status", json!({ "hostname": "alice.dc" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], true);
    assert_eq!(body["on_chain"], false);
    assert_eq!(body["chain_kind"], "register");

    let (status, body) = post(&app, "/dns/request", json!({ "hostname": "alice.dc" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ip": "192.0.2.1", "port": 8080, "on_chain": false }));

    let (status, blocks) = get(&app, "/debug/force_block").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(blocks["register"]["index"], 2);
    assert_eq!(blocks["dns"]["index"], 2);

    let (_, body) = post(&app, "/dns/request", json!({ "hostname": "alice.dc" })).await;
    assert_eq!(body["on_chain"], true);
}

#[tokio::test]
async fn taken_hostname_is_a_conflict() {
    let app = router(resolver());
    let (status, _) = post(&app, "/dns/register", lease("bob.dc", 1)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(&app, "/dns/register", lease("bob.dc", 1)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_registered");
}

#[tokio::test]
async fn unaffordable_lease_is_payment_required() {
    let app = router(resolver());
    let mut request = lease("pricey.dc", 5);
    request["wallet_address"] = json!("pauper");

    let (status, body) = post(&app, "/dns/register", request).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "insufficient_balance");

    let (_, status_body) = post(&app, "/dns/status", json!({ "hostname": "pricey.dc" })).await;
    assert_eq!(status_body["exists"], false);
}

#[tokio::test]
async fn unknown_hostname_is_not_found() {
    let app = router(resolver());
    let (status, body) = post(&app, "/dns/request", json!({ "hostname": "ghost.dc" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn malformed_requests_are_bad_requests() {
    let app = router(resolver());

    let (status, body) = post(&app, "/dns/register", json!({ "hostname": "x.dc" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = post(&app, "/dns/register", lease("x.dc", 0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&app, "/dns/status", json!({ "hostname": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/nodes/chain?type=bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&app, "/nodes/new", json!({ "nodes": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_rejects_entries_individually() {
    let app = router(resolver());
    let (status, body) = post(
        &app,
        "/dns/new",
        json!({
            "ok": { "hostname": "a.dc", "ip": "10.0.0.1", "port": 53 },
            "no_ip": { "hostname": "b.dc", "port": 53 },
            "bad_port": { "hostname": "c.dc", "ip": "10.0.0.1", "port": 70000 },
            "not_an_object": 7,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["accepted"], json!(["ok"]));

    let mut rejected: Vec<&str> = body["rejected"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["key"].as_str().unwrap())
        .collect();
    rejected.sort_unstable();
    assert_eq!(rejected, ["bad_port", "no_ip", "not_an_object"]);

    let (_, dump) = get(&app, "/debug/dump_buffer?type=dns").await;
    assert_eq!(dump["dns"]["staged"].as_array().unwrap().len(), 1);
    assert!(dump.get("register").is_none());
}

#[tokio::test]
async fn wallet_info_and_transfer() {
    let app = router(resolver());
    post(&app, "/dns/register", lease("owned.dc", 2)).await;
    get(&app, "/debug/force_block?type=register").await;

    let (status, info) = get(&app, "/wallet/info/owner").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["address"], "owner");
    // 10 initial, 6 for the lease, 10 reward for the sealed block.
    assert_eq!(info["balance"], 14);
    assert_eq!(info["domains"][0]["hostname"], "owned.dc");
    assert_eq!(info["domains"][0]["expired"], false);

    let (status, body) = post(
        &app,
        "/wallet/transfer",
        json!({ "from": "owner", "to": "friend", "amount": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["balance"], 9);

    let (_, friend) = get(&app, "/wallet/info/friend").await;
    assert_eq!(friend["balance"], 15);
    assert_eq!(friend["domains"], json!([]));

    let (status, body) = post(
        &app,
        "/wallet/transfer",
        json!({ "from": "friend", "to": "owner", "amount": 100 }),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "insufficient_balance");
}

#[tokio::test]
async fn chain_shapes_follow_type_parameter() {
    let app = router(resolver());

    let (_, both) = get(&app, "/nodes/chain").await;
    assert_eq!(both["register_length"], 1);
    assert_eq!(both["dns_length"], 1);
    assert_eq!(both["register_chain"][0]["proof"], 100);

    let (_, single) = get(&app, "/nodes/chain?type=dns").await;
    assert_eq!(single["length"], 1);
    assert!(single.get("register_chain").is_none());

    let (_, quota) = get(&app, "/debug/get_quota?type=register").await;
    assert!(quota["register"].is_i64());
}

#[tokio::test]
async fn peers_and_consensus() {
    let app = router(resolver());
    let (status, body) = post(
        &app,
        "/nodes/new",
        json!({ "nodes": ["10.0.0.2:5000", "10.0.0.3:5000"], "type": "dns" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["total_nodes"], 2);

    let (status, body) = post(&app, "/nodes/new", json!({ "nodes": [" "] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = get(&app, "/nodes/resolve").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "resolution started", "type": "both" }));

    let (status, _) = get(&app, "/nodes/resolve?type=bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn resolve_answers_before_a_slow_peer_does() {
    let leader = resolver_on(NodeId::new("leader"), Arc::new(NullPeerNetwork::new()));
    for _ in 0..3 {
        leader.mine_dns_block();
    }
    let longer = leader.ledger(ChainKind::Dns).len();
    assert!(longer > 1);

    let network = Arc::new(NullPeerNetwork::new());
    network.serve_slowly(
        "10.0.0.2:5000",
        ChainKind::Dns,
        Duration::from_millis(300),
        leader.ledger(ChainKind::Dns).dump(),
    );
    let follower = resolver_on(NodeId::new("owner"), network.clone());
    let app = router(Arc::clone(&follower));
    post(&app, "/nodes/new", json!({ "nodes": ["10.0.0.2:5000"], "type": "dns" })).await;

    let (status, body) = get(&app, "/nodes/resolve?type=dns").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "resolution started", "type": "dns" }));
    // The peer has not answered yet, so nothing can have been adopted.
    assert_eq!(follower.ledger(ChainKind::Dns).len(), 1);

    tokio::time::timeout(Duration::from_secs(5), async {
        while follower.ledger(ChainKind::Dns).len() != longer {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("longer peer chain adopted in the background");
    assert_eq!(follower.ledger(ChainKind::Dns).chain(), leader.ledger(ChainKind::Dns).chain());
    assert_eq!(network.fetches(), vec![("10.0.0.2:5000".to_string(), ChainKind::Dns)]);
}

#[tokio::test]
async fn save_reports_success() {
    let app = router(resolver());
    let (status, body) = get(&app, "/data/save").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "saved": true }));
}

#[tokio::test]
async fn peer_client_talks_to_a_live_server() {
    let resolver = resolver();
    resolver.mine_dns_block();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let server = RpcServer::new(0, Arc::clone(&resolver));
    let handle = tokio::spawn(async move { server.serve(listener, shutdown_rx).await });

    let client = HttpPeerClient::with_timeout(Duration::from_secs(5)).unwrap();
    let dump = client.fetch_chain(&addr, ChainKind::Dns).await.unwrap();
    assert_eq!(dump.length, 2);
    assert_eq!(dump.chain, resolver.ledger(ChainKind::Dns).chain());

    client.notify_resolve(&addr, ChainKind::Register).await.unwrap();
    drop(client);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}
