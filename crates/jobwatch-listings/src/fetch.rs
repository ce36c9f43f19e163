//! Careers page retrieval.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::ListingsError;

/// Default user agent; some careers sites refuse requests without one.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 jobwatch/0.1";

/// Something that can retrieve the raw listing page.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ListingsError>;
}

/// Fetches the listing page over HTTP.
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, ListingsError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, ListingsError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ListingsError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "fetched listing page");
        Ok(body)
    }
}
