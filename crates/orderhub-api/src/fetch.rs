use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::error::AppError;

/// Upper bound on a downloaded catalog document.
pub const MAX_CATALOG_BYTES: usize = 5 * 1024 * 1024;

/// Downloads partner catalog documents.
#[derive(Clone)]
pub struct CatalogFetcher {
    client: reqwest::Client,
}

impl CatalogFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, AppError> {
        debug!("Fetching catalog from {}", url);

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!("Catalog fetch from {} failed: {}", url, e);
                AppError::CatalogFetch(e.without_url().to_string())
            })?;

        if response.content_length().is_some_and(|len| len > MAX_CATALOG_BYTES as u64) {
            warn!("Catalog at {} is larger than {} bytes", url, MAX_CATALOG_BYTES);
            return Err(too_large());
        }

        // Content-Length can be absent or wrong; count what actually arrives
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            warn!("Reading catalog body from {} failed: {}", url, e);
            AppError::CatalogFetch(e.without_url().to_string())
        })? {
            if body.len() + chunk.len() > MAX_CATALOG_BYTES {
                warn!("Catalog at {} is larger than {} bytes", url, MAX_CATALOG_BYTES);
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

fn too_large() -> AppError {
    AppError::CatalogFetch(format!("catalog exceeds {} bytes", MAX_CATALOG_BYTES))
}

/// Accepts only absolute http(s) URLs.
pub fn parse_catalog_url(raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw.trim()).map_err(|_| AppError::field("url", "Enter a valid URL."))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(AppError::field("url", "Enter a valid URL.")),
    }
}
