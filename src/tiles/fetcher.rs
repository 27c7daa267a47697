use crate::core::space::TileCoord;
use crate::prelude::Duration;
use crate::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;

/// Shared async HTTP client optimized for tile fetching
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent("slippy/0.1.0")
        .timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(16)
        .build()
        .expect("failed to build reqwest async client")
});

/// Completion event for one tile fetch, delivered back to the owning layer
#[derive(Debug)]
pub struct FetchOutcome {
    pub coord: TileCoord,
    pub data: Result<Vec<u8>>,
}

/// Asynchronous "fetch tile bytes" collaborator
///
/// The engine never interprets the bytes; decoding stays with the embedding
/// application. Implementations report failure through the `Result`, a failed
/// fetch is never retried.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetcher that downloads tiles over HTTP(S) with the shared client
pub struct HttpFetcher;

#[async_trait]
impl TileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = HTTP_CLIENT
            .get(url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {} for {}", response.status(), url).into());
        }

        Ok(response.bytes().await.map_err(|e| e.to_string())?.to_vec())
    }
}
