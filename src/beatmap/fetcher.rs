//! HTTP retrieval of beatmap metadata pages, behind a trait so the policy
//! evaluator never constructs an HTTP client directly.

use std::time::Duration;

use reqwest::Client;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// The raw body of a successfully fetched beatmap page.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub status: u16,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },
}

/// Retrieves a beatmap page by URL. Implemented for production by
/// [`ReqwestFetcher`]; tests substitute a canned in-memory implementation.
pub trait BeatmapFetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
    ) -> impl std::future::Future<Output = Result<FetchedBody, FetchError>> + Send;
}

/// Production fetcher backed by `reqwest`, with the 10s connect + 10s read
/// timeouts required by the policy evaluator.
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()
            .expect("static reqwest client configuration is always valid");
        Self { client }
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl BeatmapFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedBody, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                reason: source.to_string(),
            })?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|source| FetchError::Network {
            url: url.to_string(),
            reason: source.to_string(),
        })?;
        Ok(FetchedBody { status, text })
    }
}
