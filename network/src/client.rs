//! HTTP client for peer chain dumps and resolve triggers.

use std::time::Duration;

use async_trait::async_trait;

use crate::peer::{ChainFetcher, PeerNotifier};
use crate::NetworkError;
use dcns_types::{ChainDump, ChainKind};

/// Default overall request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for talking to other DCNS nodes.
///
/// `GET http://{peer}/nodes/chain?type={kind}` returns a [`ChainDump`];
/// `GET http://{peer}/nodes/resolve?type={kind}` triggers consensus there.
#[derive(Clone)]
pub struct HttpPeerClient {
    http_client: reqwest::Client,
}

impl HttpPeerClient {
    pub fn new() -> Result<Self, NetworkError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a client whose requests (and connects) give up after `timeout`.
    ///
    /// Fails if the TLS backend cannot be initialized.
    pub fn with_timeout(timeout: Duration) -> Result<Self, NetworkError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| NetworkError::ClientSetup(e.to_string()))?;
        Ok(Self { http_client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, NetworkError> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                NetworkError::Timeout(format!("{url}: {e}"))
            } else if e.is_connect() {
                NetworkError::Unreachable(format!("{url}: {e}"))
            } else {
                NetworkError::RequestFailed(format!("{url}: {e}"))
            }
        })?;

        if !response.status().is_success() {
            return Err(NetworkError::RequestFailed(format!(
                "{url}: HTTP status {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

/// `http://{peer}{path}?type={kind}`, keeping an explicit scheme if given.
pub fn peer_url(peer: &str, path: &str, kind: ChainKind) -> String {
    let base = peer.trim().trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{base}{path}?type={kind}")
    } else {
        format!("http://{base}{path}?type={kind}")
    }
}

#[async_trait]
impl ChainFetcher for HttpPeerClient {
    async fn fetch_chain(&self, peer: &str, kind: ChainKind) -> Result<ChainDump, NetworkError> {
        let url = peer_url(peer, "/nodes/chain", kind);
        let response = self.get(&url).await?;
        response.json::<ChainDump>().await.map_err(|e| {
            NetworkError::InvalidResponse(format!("failed to parse chain dump from {peer}: {e}"))
        })
    }
}

#[async_trait]
impl PeerNotifier for HttpPeerClient {
    async fn notify_resolve(&self, peer: &str, kind: ChainKind) -> Result<(), NetworkError> {
        let url = peer_url(peer, "/nodes/resolve", kind);
        self.get(&url).await.map(|_| ())
    }
}
