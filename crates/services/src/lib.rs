use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lehra_audio::{AssetLoader, AudioClip, AudioDecoder, LoadError};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("asset store url must start with http:// or https://, got {0}")]
    InvalidBaseUrl(String),
    #[error("could not build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Loads lehra recordings from a remote asset store. Locations produced by the
/// asset locator are resolved relative to `base_url`.
#[derive(Clone)]
pub struct HttpAssetLoader {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAssetLoader {
    pub fn new(base_url: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(StoreError::InvalidBaseUrl(base_url));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, location: &str) -> String {
        format!("{}/{}", self.base_url, location.trim_start_matches('/'))
    }
}

fn extension(location: &str) -> Option<String> {
    location
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.contains('/'))
        .map(str::to_string)
}

#[async_trait]
impl AssetLoader for HttpAssetLoader {
    async fn load(&self, location: &str) -> Result<Arc<AudioClip>, LoadError> {
        let url = self.url_for(location);
        debug!(%url, "fetching remote asset");
        let transport = |err: reqwest::Error| LoadError::Transport {
            location: location.to_string(),
            reason: err.to_string(),
        };

        let response = self.client.get(&url).send().await.map_err(transport)?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                warn!(%url, "remote asset missing");
                return Err(LoadError::NotFound(location.to_string()));
            }
            status if !status.is_success() => {
                return Err(LoadError::Transport {
                    location: location.to_string(),
                    reason: format!("http status {}", status),
                });
            }
            _ => {}
        }
        let bytes = response.bytes().await.map_err(transport)?.to_vec();
        info!(%url, bytes = bytes.len(), "remote asset downloaded");

        let ext = extension(location);
        let decoded =
            tokio::task::spawn_blocking(move || AudioDecoder::decode_bytes(bytes, ext.as_deref()))
                .await
                .map_err(|err| LoadError::Decode {
                    location: location.to_string(),
                    reason: err.to_string(),
                })?;
        decoded.map(Arc::new).map_err(|err| LoadError::Decode {
            location: location.to_string(),
            reason: format!("{:#}", err),
        })
    }
}
